// ============================================================
// Layer 2 — Example Builders
// ============================================================
// Turns knowledge-base records into training examples for each
// model family. Per-example failures (malformed concept, cache
// miss, unknown relation, absent answer span, yes/no answers,
// text that tokenizes to nothing) skip the record and are
// counted; anything else is a real error and aborts the scan.

use crate::data::aligner::SpanAligner;
use crate::data::tagger::TagEncoder;
use crate::data::vocabulary::{split_words_punctuation, Vocabulary};
use crate::domain::concept::ConceptRef;
use crate::domain::errors::ExampleError;
use crate::domain::kb::{relation_to_int, KbRecord};
use crate::domain::span::Span;
use crate::domain::traits::LexicalResolver;

/// How a scan over the knowledge base went.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExampleCounts {
    pub kept:    usize,
    pub skipped: usize,
}

impl ExampleCounts {
    fn keep(&mut self) {
        self.kept += 1;
    }

    fn skip(&mut self, index: usize, err: &ExampleError) {
        self.skipped += 1;
        tracing::debug!("Skipping record {index}: {err}");
    }
}

/// The first `floor(len * pct)` records of the knowledge base.
pub fn kb_slice(records: &[KbRecord], pct: f64) -> &[KbRecord] {
    let keep = ((records.len() as f64) * pct) as usize;
    &records[..keep.min(records.len())]
}

fn log_progress(scanned: usize, total: usize) {
    // Coarse progress: one line roughly every 10%
    let step = (total / 10).max(1);
    if scanned % step == 0 {
        tracing::info!("Scanned {scanned}/{total} records");
    }
}

fn index_tokens(tokens: &[String], vocab: &Vocabulary) -> Vec<u32> {
    tokens
        .iter()
        .map(|tok| vocab.word2index(tok).unwrap_or_else(|| vocab.unk_id()))
        .collect()
}

/// (question ids, relation class) pairs for the relation classifier.
pub fn classifier_examples(
    records: &[KbRecord],
    vocab:   &Vocabulary,
) -> (Vec<Vec<u32>>, Vec<usize>, ExampleCounts) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut counts = ExampleCounts::default();

    for (i, record) in records.iter().enumerate() {
        log_progress(i, records.len());
        let ids = vocab.sentence2indices(&record.question.trim().to_lowercase());
        if ids.is_empty() {
            counts.skip(i, &ExampleError::EmptySentence);
            continue;
        }
        match relation_to_int(&record.relation) {
            Ok(class) => {
                xs.push(ids);
                ys.push(class);
                counts.keep();
            }
            Err(err) => counts.skip(i, &err),
        }
    }

    (xs, ys, counts)
}

/// (question ids, per-token tags) pairs for question concept
/// tagging: both c1 and c2 are aligned, absent spans tag nothing.
pub fn question_tagger_examples<R: LexicalResolver>(
    records:  &[KbRecord],
    vocab:    &Vocabulary,
    resolver: &mut R,
) -> (Vec<Vec<u32>>, Vec<Vec<usize>>, ExampleCounts) {
    let encoder = TagEncoder::new(2);
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut counts = ExampleCounts::default();

    for (i, record) in records.iter().enumerate() {
        log_progress(i, records.len());
        let question = record.question.trim().to_lowercase();
        let tokens = split_words_punctuation(&question);

        match tag_both_concepts(&question, &tokens, record, resolver) {
            Ok(spans) => {
                ys.push(encoder.encode(tokens.len(), &spans));
                xs.push(index_tokens(&tokens, vocab));
                counts.keep();
            }
            Err(err) => counts.skip(i, &err),
        }
    }

    (xs, ys, counts)
}

fn tag_both_concepts<R: LexicalResolver>(
    sentence: &str,
    tokens:   &[String],
    record:   &KbRecord,
    resolver: &mut R,
) -> Result<[Span; 2], ExampleError> {
    if tokens.is_empty() {
        return Err(ExampleError::EmptySentence);
    }
    let c1 = ConceptRef::parse(&record.c1.trim().to_lowercase())?;
    let c2 = ConceptRef::parse(&record.c2.trim().to_lowercase())?;
    Ok([
        SpanAligner::align(sentence, tokens, &c1, resolver)?,
        SpanAligner::align(sentence, tokens, &c2, resolver)?,
    ])
}

/// (answer ids, per-token tags) pairs for answer concept tagging.
/// Bare yes/no answers carry no concept surface form and are
/// skipped, as are answers where c2 cannot be located at all.
pub fn answer_tagger_examples<R: LexicalResolver>(
    records:  &[KbRecord],
    vocab:    &Vocabulary,
    resolver: &mut R,
) -> (Vec<Vec<u32>>, Vec<Vec<usize>>, ExampleCounts) {
    let encoder = TagEncoder::new(1);
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut counts = ExampleCounts::default();

    for (i, record) in records.iter().enumerate() {
        log_progress(i, records.len());
        let answer = record.answer.trim().to_lowercase();
        let tokens = split_words_punctuation(&answer);

        match tag_answer_concept(&answer, &tokens, record, resolver) {
            Ok(span) => {
                ys.push(encoder.encode(tokens.len(), &[span]));
                xs.push(index_tokens(&tokens, vocab));
                counts.keep();
            }
            Err(err) => counts.skip(i, &err),
        }
    }

    (xs, ys, counts)
}

fn tag_answer_concept<R: LexicalResolver>(
    answer:   &str,
    tokens:   &[String],
    record:   &KbRecord,
    resolver: &mut R,
) -> Result<Span, ExampleError> {
    if tokens.is_empty() {
        return Err(ExampleError::EmptySentence);
    }
    if answer == "yes" || answer == "no" {
        return Err(ExampleError::YesNoAnswer);
    }
    let c2 = ConceptRef::parse(&record.c2.trim().to_lowercase())?;
    let span = SpanAligner::align(answer, tokens, &c2, resolver)?;
    if !span.is_present() {
        return Err(ExampleError::SpanAbsent);
    }
    Ok(span)
}

/// (question ids, answer ids) pairs for the generator, both with
/// EOS appended. Questions index against the encoder vocabulary,
/// answers against the decoder vocabulary.
pub fn generator_examples(
    records:      &[KbRecord],
    source_vocab: &Vocabulary,
    target_vocab: &Vocabulary,
) -> (Vec<Vec<u32>>, Vec<Vec<u32>>, ExampleCounts) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut counts = ExampleCounts::default();

    for (i, record) in records.iter().enumerate() {
        log_progress(i, records.len());

        let mut question = source_vocab.sentence2indices(&record.question.trim().to_lowercase());
        question.push(source_vocab.eos_id());
        let mut answer = target_vocab.sentence2indices(&record.answer.trim().to_lowercase());
        answer.push(target_vocab.eos_id());

        xs.push(question);
        ys.push(answer);
        counts.keep();
    }

    (xs, ys, counts)
}

// ─── Unit Tests ───────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapResolver(HashMap<String, String>);

    impl LexicalResolver for MapResolver {
        fn resolve(&mut self, id: &str) -> Result<String, ExampleError> {
            self.0.get(id).cloned().ok_or_else(|| ExampleError::Resolution {
                id: id.to_string(),
                reason: "not in table".to_string(),
            })
        }
    }

    fn record(question: &str, answer: &str, relation: &str, c1: &str, c2: &str) -> KbRecord {
        KbRecord {
            question: question.to_string(),
            answer:   answer.to_string(),
            relation: relation.to_string(),
            c1:       c1.to_string(),
            c2:       c2.to_string(),
        }
    }

    fn vocab() -> Vocabulary {
        Vocabulary::from_words([
            "what", "is", "the", "capital", "of", "france", "paris", "?", "color", "sky", "blue",
        ])
    }

    #[test]
    fn test_classifier_skips_unknown_relations() {
        let records = vec![
            record("what is the capital of france?", "paris", "place", "france", "paris"),
            record("what color is the sky?", "blue", "flavour", "sky", "blue"),
        ];
        let (xs, ys, counts) = classifier_examples(&records, &vocab());
        assert_eq!(counts.kept, 1);
        assert_eq!(counts.skipped, 1);
        assert_eq!(ys, vec![10]); // "place"
        assert_eq!(xs[0].len(), 7);
    }

    #[test]
    fn test_question_tagger_aligns_both_concepts() {
        let records = vec![record(
            "What is the capital of France?",
            "paris",
            "place",
            "France",
            "capital",
        )];
        let mut resolver = MapResolver(HashMap::new());
        let (xs, ys, counts) = question_tagger_examples(&records, &vocab(), &mut resolver);

        assert_eq!(counts.kept, 1);
        // tokens: what is the capital of france ?
        // c1 "france" at 5 → Begin+End slot 0; c2 "capital" at 3 → slot 3
        assert_eq!(ys[0], vec![6, 6, 6, 3, 6, 0, 6]);
        assert_eq!(xs[0].len(), 7);
    }

    #[test]
    fn test_question_tagger_skips_on_resolution_failure() {
        let records = vec![record(
            "what color is the sky?",
            "blue",
            "color",
            "bn:00071570n",
            "blue",
        )];
        let mut resolver = MapResolver(HashMap::new());
        let (_, _, counts) = question_tagger_examples(&records, &vocab(), &mut resolver);
        assert_eq!(counts.kept, 0);
        assert_eq!(counts.skipped, 1);
    }

    #[test]
    fn test_answer_tagger_skips_yes_no_and_absent() {
        let records = vec![
            record("is france a country?", "Yes", "isa", "france", "country"),
            record("what is the capital of france?", "paris", "place", "france", "berlin"),
            record("what is the capital of france?", "paris", "place", "france", "paris"),
        ];
        let mut resolver = MapResolver(HashMap::new());
        let (xs, ys, counts) = answer_tagger_examples(&records, &vocab(), &mut resolver);

        assert_eq!(counts.kept, 1);
        assert_eq!(counts.skipped, 2);
        assert_eq!(xs.len(), 1);
        assert_eq!(ys[0], vec![0]); // single-token answer → Begin+End
    }

    #[test]
    fn test_empty_text_is_skipped_not_encoded() {
        // An empty question would otherwise reach the encoder as a
        // zero-length sequence
        let records = vec![
            record("", "paris", "place", "france", "paris"),
            record("   ", "paris", "place", "france", "paris"),
        ];
        let (xs, _, counts) = classifier_examples(&records, &vocab());
        assert!(xs.is_empty());
        assert_eq!(counts.skipped, 2);

        let mut resolver = MapResolver(HashMap::new());
        let (xs, _, counts) = question_tagger_examples(&records, &vocab(), &mut resolver);
        assert!(xs.is_empty());
        assert_eq!(counts.skipped, 2);

        let blank_answer = vec![record("is france a country?", "", "isa", "france", "country")];
        let (xs, _, counts) = answer_tagger_examples(&blank_answer, &vocab(), &mut resolver);
        assert!(xs.is_empty());
        assert_eq!(counts.skipped, 1);
    }

    #[test]
    fn test_generator_examples_append_eos() {
        let v = vocab();
        let records = vec![record(
            "what is the capital of france?",
            "paris",
            "place",
            "france",
            "paris",
        )];
        let (xs, ys, counts) = generator_examples(&records, &v, &v);

        assert_eq!(counts.kept, 1);
        assert_eq!(*xs[0].last().unwrap(), v.eos_id());
        assert_eq!(ys[0], vec![v.word2index("paris").unwrap(), v.eos_id()]);
    }

    #[test]
    fn test_kb_slice_takes_leading_fraction() {
        let records: Vec<KbRecord> = (0..10)
            .map(|i| record(&format!("q{i}"), "a", "isa", "x", "y"))
            .collect();
        assert_eq!(kb_slice(&records, 0.7).len(), 7);
        assert_eq!(kb_slice(&records, 1.0).len(), 10);
        assert_eq!(kb_slice(&records, 0.0).len(), 0);
    }
}
