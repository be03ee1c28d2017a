// ============================================================
// Layer 6 — Resolver Cache
// ============================================================
// Persistent lexical-graph identifier → lemma table, stored as
// TSV ("id<TAB>lemma" per line). The pipeline triggers `save()`
// after a scan that added entries, but otherwise treats cache
// population as an external side effect: a miss is a Resolution
// error and the example that needed it is skipped. There is no
// network fallback by design.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::errors::ExampleError;
use crate::domain::traits::LexicalResolver;

pub struct ResolverCache {
    path: PathBuf,
    entries: HashMap<String, String>,
    dirty: bool,
}

impl ResolverCache {
    /// Load the cache file; a missing file starts an empty cache
    /// (every lookup will then fail, skipping its example).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            tracing::warn!(
                "Resolver cache '{}' does not exist — starting empty",
                path.display()
            );
            return Ok(Self { path, entries: HashMap::new(), dirty: false });
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read resolver cache '{}'", path.display()))?;

        let mut entries = HashMap::new();
        for line in raw.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            match line.split_once('\t') {
                Some((id, lemma)) => {
                    entries.insert(id.to_string(), lemma.to_string());
                }
                None => tracing::warn!("Skipping malformed cache line: '{line}'"),
            }
        }

        tracing::info!(
            "Loaded resolver cache '{}' ({} entries)",
            path.display(),
            entries.len()
        );
        Ok(Self { path, entries, dirty: false })
    }

    /// Add or replace an entry. Marks the cache for saving.
    pub fn insert(&mut self, id: impl Into<String>, lemma: impl Into<String>) {
        self.entries.insert(id.into(), lemma.into());
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist the table back to its TSV file if anything changed.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        // Sorted output keeps the file diffable between runs
        let mut lines: Vec<String> = self
            .entries
            .iter()
            .map(|(id, lemma)| format!("{id}\t{lemma}"))
            .collect();
        lines.sort();

        std::fs::write(&self.path, lines.join("\n"))
            .with_context(|| format!("cannot write resolver cache '{}'", self.path.display()))?;

        self.dirty = false;
        tracing::debug!("Saved resolver cache ({} entries)", self.entries.len());
        Ok(())
    }
}

impl LexicalResolver for ResolverCache {
    fn resolve(&mut self, id: &str) -> Result<String, ExampleError> {
        self.entries
            .get(id)
            .cloned()
            .ok_or_else(|| ExampleError::Resolution {
                id: id.to_string(),
                reason: "identifier not present in the cache".to_string(),
            })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("kbqa-resolver-{name}-{}.tsv", std::process::id()))
    }

    #[test]
    fn test_round_trip_through_tsv() {
        let path = temp_path("roundtrip");
        let mut cache = ResolverCache {
            path: path.clone(),
            entries: HashMap::new(),
            dirty: false,
        };
        cache.insert("bn:00071570n", "sky");
        cache.insert("bn:00012345n", "france");
        cache.save().unwrap();

        let mut reloaded = ResolverCache::load(&path).unwrap();
        assert_eq!(reloaded.resolve("bn:00071570n").unwrap(), "sky");
        assert_eq!(reloaded.len(), 2);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let cache = ResolverCache::load(temp_path("does-not-exist")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_miss_is_a_resolution_error() {
        let mut cache = ResolverCache {
            path: temp_path("miss"),
            entries: HashMap::new(),
            dirty: false,
        };
        assert!(matches!(
            cache.resolve("bn:0n"),
            Err(ExampleError::Resolution { .. }),
        ));
    }
}
