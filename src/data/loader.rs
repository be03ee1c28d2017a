// ============================================================
// Layer 4 — Knowledge-Base Loader
// ============================================================
// Reads the knowledge base: one JSON array of records, each with
// question / answer / relation / c1 / c2 fields. Parsing is
// strict — a KB that does not deserialise is a startup failure,
// not a skippable example.

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::kb::KbRecord;

pub struct KbLoader;

impl KbLoader {
    /// Load every record from a KB JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<KbRecord>> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read knowledge base '{}'", path.display()))?;

        let records: Vec<KbRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("knowledge base '{}' is not valid JSON", path.display()))?;

        tracing::info!("Loaded knowledge base: {} records", records.len());
        Ok(records)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_record_fields() {
        let json = r#"[{
            "question": "what is the capital of france?",
            "answer": "paris",
            "relation": "place",
            "c1": "france",
            "c2": "paris::bn:00060599n"
        }]"#;
        let records: Vec<KbRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].relation, "place");
        assert_eq!(records[0].c2, "paris::bn:00060599n");
    }
}
