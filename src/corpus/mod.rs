use include_dir::{include_dir, Dir};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;
use std::fmt;

use crate::error::{CorpusError, EmptyReferenceText};

static CORPUS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/corpus");

const PARAGRAPHS_FILE: &str = "paragraphs.json";

/// The text a participant has to reproduce; never empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceText {
    text: String,
    chars: Vec<char>,
}

impl ReferenceText {
    pub fn new(text: impl Into<String>) -> Result<Self, EmptyReferenceText> {
        let text = text.into();
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Err(EmptyReferenceText);
        }
        Ok(Self { text, chars })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn char_count(&self) -> usize {
        self.chars.len()
    }
}

impl fmt::Display for ReferenceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl TryFrom<&str> for ReferenceText {
    type Error = EmptyReferenceText;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Supplies one reference text per session
pub trait Corpus: Send {
    fn next_reference_text(&mut self) -> ReferenceText;
}

/// Always hands out the same text (custom prompts)
#[derive(Debug, Clone)]
pub struct FixedCorpus {
    text: ReferenceText,
}

impl FixedCorpus {
    pub fn new(text: ReferenceText) -> Self {
        Self { text }
    }
}

impl Corpus for FixedCorpus {
    fn next_reference_text(&mut self) -> ReferenceText {
        self.text.clone()
    }
}

#[derive(Deserialize)]
struct ParagraphFile {
    paragraphs: Vec<String>,
}

/// Uniform random pick from a fixed set of paragraphs
pub struct ParagraphCorpus {
    paragraphs: Vec<ReferenceText>,
    rng: StdRng,
}

impl ParagraphCorpus {
    /// The paragraphs bundled with the binary
    pub fn embedded() -> Result<Self, CorpusError> {
        Self::with_rng(load_embedded()?, StdRng::from_entropy())
    }

    pub fn with_rng(paragraphs: Vec<ReferenceText>, rng: StdRng) -> Result<Self, CorpusError> {
        if paragraphs.is_empty() {
            return Err(CorpusError::Empty);
        }
        Ok(Self { paragraphs, rng })
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }
}

impl Corpus for ParagraphCorpus {
    fn next_reference_text(&mut self) -> ReferenceText {
        // with_rng rejects an empty set, so choose always yields
        let text = self
            .paragraphs
            .choose(&mut self.rng)
            .unwrap_or(&self.paragraphs[0])
            .clone();
        debug!("selected reference text of {} chars", text.char_count());
        text
    }
}

fn load_embedded() -> Result<Vec<ReferenceText>, CorpusError> {
    let file = CORPUS_DIR
        .get_file(PARAGRAPHS_FILE)
        .ok_or_else(|| CorpusError::MissingFile(PARAGRAPHS_FILE.to_string()))?;
    let contents = file
        .contents_utf8()
        .ok_or_else(|| CorpusError::NotUtf8(PARAGRAPHS_FILE.to_string()))?;
    parse_paragraphs(contents)
}

fn parse_paragraphs(json: &str) -> Result<Vec<ReferenceText>, CorpusError> {
    let parsed: ParagraphFile = serde_json::from_str(json)?;
    let paragraphs: Vec<ReferenceText> = parsed
        .paragraphs
        .into_iter()
        .filter_map(|p| ReferenceText::new(p).ok())
        .collect();
    if paragraphs.is_empty() {
        return Err(CorpusError::Empty);
    }
    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_reference_text_rejects_empty() {
        assert_eq!(ReferenceText::new(""), Err(EmptyReferenceText));
        assert!(ReferenceText::try_from(" ").is_ok());
    }

    #[test]
    fn test_reference_text_counts_chars_not_bytes() {
        let text = ReferenceText::new("naïve").unwrap();
        assert_eq!(text.char_count(), 5);
        assert_eq!(text.as_str(), "naïve");
        assert_eq!(text.to_string(), "naïve");
    }

    #[test]
    fn test_embedded_corpus_loads() {
        let corpus = ParagraphCorpus::embedded().unwrap();
        assert_eq!(corpus.len(), 5);
        assert!(!corpus.is_empty());
    }

    #[test]
    fn test_paragraph_corpus_picks_from_set() {
        let texts = vec![
            ReferenceText::new("alpha").unwrap(),
            ReferenceText::new("beta").unwrap(),
            ReferenceText::new("gamma").unwrap(),
        ];
        let mut corpus =
            ParagraphCorpus::with_rng(texts.clone(), StdRng::seed_from_u64(7)).unwrap();

        let mut seen = HashSet::new();
        for _ in 0..100 {
            let picked = corpus.next_reference_text();
            assert!(texts.contains(&picked));
            seen.insert(picked.as_str().to_string());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_paragraph_corpus_requires_text() {
        let result = ParagraphCorpus::with_rng(vec![], StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(CorpusError::Empty)));
    }

    #[test]
    fn test_parse_skips_empty_paragraphs() {
        let parsed = parse_paragraphs(r#"{"name": "t", "paragraphs": ["", "ok"]}"#).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].as_str(), "ok");

        let err = parse_paragraphs(r#"{"name": "t", "paragraphs": [""]}"#).unwrap_err();
        assert!(matches!(err, CorpusError::Empty));
    }

    #[test]
    fn test_fixed_corpus_repeats() {
        let mut corpus = FixedCorpus::new(ReferenceText::new("hi").unwrap());
        assert_eq!(corpus.next_reference_text().as_str(), "hi");
        assert_eq!(corpus.next_reference_text().as_str(), "hi");
    }
}
