// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch so learning curves survive the
// run:
//
//   epoch,train_loss,val_loss,val_acc
//   1,3.124500,3.089200,0.118000
//   ...
//
// Output file: {checkpoint_dir}/metrics.csv. The header is
// written once; later runs append, so a resumed training keeps
// one continuous curve.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    /// Average masked loss over all training batches
    pub train_loss: f64,
    /// Average masked loss on the dev set
    pub val_loss: f64,
    /// Token-level accuracy over non-PAD dev positions
    pub val_acc: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, val_acc: f64) -> Self {
        Self { epoch, train_loss, val_loss, val_acc }
    }

    /// True when this epoch beats the best validation accuracy so far.
    pub fn is_improvement(&self, best_acc: f64) -> bool {
        self.val_acc > best_acc
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,val_loss,val_acc")?;
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.val_loss, m.val_acc,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement_compares_accuracy() {
        let m = EpochMetrics::new(2, 2.5, 2.3, 0.31);
        assert!(m.is_improvement(0.25));
        assert!(!m.is_improvement(0.31));
        assert!(!m.is_improvement(0.40));
    }
}
