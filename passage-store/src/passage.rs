use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Location metadata attached to a passage at indexing time
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PassageMetadata {
    /// Name of the source document (file name as uploaded)
    pub source: Option<String>,

    /// Chunk identifier within the source document
    pub chunk_id: Option<String>,

    /// PDF page number, when the loader knew it
    pub page: Option<u32>,

    /// Custom metadata fields
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

/// A passage of document text with its location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    /// The passage text
    pub text: String,

    /// Additional metadata
    #[serde(default)]
    pub metadata: PassageMetadata,
}

impl Passage {
    /// Create a passage attributed to `source` / `chunk_id`
    pub fn new(
        text: impl Into<String>,
        source: impl Into<String>,
        chunk_id: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            metadata: PassageMetadata {
                source: Some(source.into()),
                chunk_id: Some(chunk_id.into()),
                ..Default::default()
            },
        }
    }

    /// Create a passage with explicit metadata
    pub fn with_metadata(text: impl Into<String>, metadata: PassageMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// Set the page number
    pub fn with_page(mut self, page: u32) -> Self {
        self.metadata.page = Some(page);
        self
    }

    /// Number of whitespace-separated words in the text
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_passage_creation() {
        let passage = Passage::new("Total deposits rose 2.1%.", "q2.pdf", "7").with_page(3);
        assert_eq!(passage.metadata.source.as_deref(), Some("q2.pdf"));
        assert_eq!(passage.metadata.chunk_id.as_deref(), Some("7"));
        assert_eq!(passage.metadata.page, Some(3));
    }

    #[test]
    fn test_word_count() {
        let passage = Passage::new("  one two\nthree\tfour  ", "a", "0");
        assert_eq!(passage.word_count(), 4);
        assert_eq!(Passage::new("", "a", "0").word_count(), 0);
    }

    #[test]
    fn test_metadata_custom_fields_roundtrip_through_flatten() {
        let json = r#"{"text":"x","metadata":{"source":"a.pdf","chunk_id":"1","page":null,"loader":"pdf"}}"#;
        let passage: Passage = serde_json::from_str(json).unwrap();
        assert_eq!(passage.metadata.source.as_deref(), Some("a.pdf"));
        assert_eq!(
            passage.metadata.custom.get("loader"),
            Some(&serde_json::Value::String("pdf".to_string()))
        );
    }

    #[test]
    fn test_missing_metadata_defaults() {
        let passage: Passage = serde_json::from_str(r#"{"text":"bare"}"#).unwrap();
        assert_eq!(passage.metadata, PassageMetadata::default());
    }
}
