use crate::error::Result;
use crate::passage::Passage;
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One nearest-neighbour hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityHit {
    /// The passage that was found
    pub passage: Passage,

    /// Distance from the query vector (non-negative, lower is better)
    pub distance: f32,
}

impl SimilarityHit {
    pub fn new(passage: Passage, distance: f32) -> Self {
        Self { passage, distance }
    }
}

/// Nearest-neighbour search over a pre-built passage index.
///
/// Implementations return at most `count` hits ordered by ascending distance.
/// An index smaller than `count` yields fewer hits, and an empty or missing
/// index yields an empty vector rather than an error.
#[async_trait]
pub trait SimilaritySource: Send + Sync {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SimilarityHit>>;
}

/// Replays a fixed set of hits regardless of the query text.
///
/// Used to re-rank result sets exported from a real index, and as the test
/// double for the engine.
#[derive(Debug, Clone, Default)]
pub struct RecordedSource {
    hits: Vec<SimilarityHit>,
}

impl RecordedSource {
    pub fn new(mut hits: Vec<SimilarityHit>) -> Self {
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Self { hits }
    }

    /// Load hits from a JSON array of `{ "passage": ..., "distance": ... }`
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        info!("Loading recorded hits from {}", path.display());
        let content = tokio::fs::read(path).await?;
        let hits: Vec<SimilarityHit> = serde_json::from_slice(&content)?;
        debug!("Loaded {} recorded hits", hits.len());
        Ok(Self::new(hits))
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[async_trait]
impl SimilaritySource for RecordedSource {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SimilarityHit>> {
        debug!("Replaying up to {count} hits for '{query}'");
        Ok(self.hits.iter().take(count).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn hit(text: &str, distance: f32) -> SimilarityHit {
        SimilarityHit::new(Passage::new(text, "doc.pdf", "0"), distance)
    }

    #[tokio::test]
    async fn test_search_orders_by_distance_and_truncates() {
        let source = RecordedSource::new(vec![hit("c", 0.9), hit("a", 0.1), hit("b", 0.5)]);

        let hits = source.search("anything", 2).await.unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.passage.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_search_returns_fewer_when_index_is_small() {
        let source = RecordedSource::new(vec![hit("a", 0.1)]);
        assert_eq!(source.search("q", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_source_returns_empty() {
        let source = RecordedSource::default();
        assert!(source.is_empty());
        assert!(source.search("q", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_from_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hits.json");
        let hits = vec![hit("second", 0.7), hit("first", 0.2)];
        std::fs::write(&path, serde_json::to_vec(&hits).unwrap()).unwrap();

        let source = RecordedSource::from_json_file(&path).await.unwrap();
        assert_eq!(source.len(), 2);
        let found = source.search("q", 1).await.unwrap();
        assert_eq!(found[0].passage.text, "first");
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = RecordedSource::from_json_file(&temp_dir.path().join("nope.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::SourceError::Io(_)));
    }
}
