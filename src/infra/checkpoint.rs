// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// One training checkpoint is:
//
//   {name}.mpk.gz            module weights (CompactRecorder)
//   {name}_optim.mpk.gz      optimizer state (CompactRecorder)
//   meta.json                {epoch, iter, best_acc}
//   generator_config.json    architecture, so inference can
//                            rebuild the exact model shape
//
// load(save(x)) reconstructs an equivalent training position:
// resume restores counters, weights, optimizer state, and the
// best validation accuracy seen so far. A resume that was
// explicitly requested but cannot be satisfied (missing or
// corrupt files) is fatal at startup.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::module::Module;
use burn::record::{CompactRecorder, Record, Recorder};
use burn::tensor::backend::Backend;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Resume position and accumulated early-stopping state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Epoch index training stops inside of / resumes at
    pub epoch: usize,
    /// Batch iteration within that epoch
    pub iter: usize,
    /// Best validation accuracy observed so far
    pub best_acc: f64,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ── Module weights ────────────────────────────────────────

    pub fn save_module<B: Backend, M: Module<B>>(&self, name: &str, module: M) -> Result<()> {
        let path = self.dir.join(name);
        CompactRecorder::new()
            .record(module.into_record(), path.clone())
            .with_context(|| format!("failed to save '{}' checkpoint", path.display()))?;
        tracing::debug!("Saved module record '{name}'");
        Ok(())
    }

    pub fn load_module<B: Backend, M: Module<B>>(
        &self,
        name: &str,
        module: M,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.dir.join(name);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("cannot load checkpoint '{}'", path.display()))?;
        Ok(module.load_record(record))
    }

    // ── Optimizer state ───────────────────────────────────────

    pub fn save_record<B: Backend, R: Record<B>>(&self, name: &str, record: R) -> Result<()> {
        let path = self.dir.join(name);
        CompactRecorder::new()
            .record(record, path.clone())
            .with_context(|| format!("failed to save record '{}'", path.display()))?;
        Ok(())
    }

    pub fn load_record<B: Backend, R: Record<B>>(
        &self,
        name: &str,
        device: &B::Device,
    ) -> Result<R> {
        let path = self.dir.join(name);
        CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("cannot load record '{}'", path.display()))
    }

    // ── Resume metadata ───────────────────────────────────────

    pub fn save_meta(&self, meta: &CheckpointMeta) -> Result<()> {
        self.save_json("meta.json", meta)
    }

    pub fn load_meta(&self) -> Result<CheckpointMeta> {
        self.load_json("meta.json")
    }

    // ── Sidecar JSON (meta, generator architecture) ───────────

    pub fn save_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("cannot write '{}'", path.display()))?;
        Ok(())
    }

    pub fn load_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("cannot read '{}' — has training run here?", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("'{}' is not valid JSON", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_round_trip() {
        let dir = std::env::temp_dir().join(format!("kbqa-ckpt-{}", std::process::id()));
        let manager = CheckpointManager::new(&dir);

        let meta = CheckpointMeta { epoch: 3, iter: 12, best_acc: 0.42 };
        manager.save_meta(&meta).unwrap();
        let loaded = manager.load_meta().unwrap();

        // Resume continues at epoch 3 / iteration 12 with best_acc 0.42,
        // never reset to zero
        assert_eq!(loaded, meta);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_meta_is_an_error() {
        let dir = std::env::temp_dir().join(format!("kbqa-ckpt-empty-{}", std::process::id()));
        let manager = CheckpointManager::new(&dir);
        assert!(manager.load_meta().is_err());
        std::fs::remove_dir_all(dir).ok();
    }
}
