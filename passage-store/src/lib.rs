//! # Passage Store
//!
//! Data model and collaborator contract for the similarity search that feeds
//! the ranking engine. Index construction and embeddings live elsewhere; this
//! crate only describes what a search hands back.
//!
//! ## Features
//!
//! - `Passage` with source / chunk / page metadata
//! - `SimilaritySource` trait: `search(query, count)` returning hits ordered by
//!   ascending distance
//! - `RecordedSource`: replays hits exported from a real index (JSON)
//!
//! ## Example
//!
//! ```no_run
//! use docqa_passage_store::{RecordedSource, SimilaritySource};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = RecordedSource::from_json_file(Path::new("hits.json")).await?;
//!     let hits = source.search("net interest margin", 12).await?;
//!
//!     println!("Found {} passages", hits.len());
//!     Ok(())
//! }
//! ```

mod error;
mod passage;
mod source;

pub use error::{Result, SourceError};
pub use passage::{Passage, PassageMetadata};
pub use source::{RecordedSource, SimilarityHit, SimilaritySource};
