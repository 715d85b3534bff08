//! Embedding and similarity machinery for text sensors.
//!
//! - `embeddings`: the `Embedder` capability and its fastembed-backed
//!   implementation
//! - `similarity`: cosine similarity and best-match selection over a
//!   sensor's paragraph embeddings

pub mod embeddings;
mod similarity;

pub use embeddings::{Embedder, EmbeddingError, FastembedModel};
pub use similarity::{best_match, cosine_similarity, SimilarityError};

/// Default embedding model, matching what the service has always shipped with
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
