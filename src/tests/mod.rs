use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use crate::app::App;
use crate::config::Config;
use crate::semantic::{Embedder, EmbeddingError};


/// Probe texts containing this marker make the mock fail, simulating a
/// reachable-but-broken provider.
pub const EMBED_FAIL_MARKER: &str = "EMBED_FAIL";
/// Probe texts containing this marker embed to the zero vector.
pub const ZERO_VECTOR_MARKER: &str = "ZERO_VECTOR";

const MOCK_DIMS: usize = 128;

/// Deterministic in-process embedder: counts of hashed character
/// trigrams. Similar texts share trigrams, so cosine similarity behaves
/// the way tests need it to without downloading a model.
pub struct MockEmbedder;

impl MockEmbedder {
    pub fn new() -> Self {
        Self
    }
}

impl Embedder for MockEmbedder {
    fn name(&self) -> &str {
        "mock-trigram"
    }

    fn dimensions(&self) -> usize {
        MOCK_DIMS
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.contains(EMBED_FAIL_MARKER) {
            return Err(EmbeddingError::EmbeddingFailed(
                "mock embedder failure".to_string(),
            ));
        }

        let mut vector = vec![0.0f32; MOCK_DIMS];
        if text.contains(ZERO_VECTOR_MARKER) {
            return Ok(vector);
        }

        let chars: Vec<char> = text.to_lowercase().chars().collect();
        if chars.len() < 3 {
            let mut hasher = DefaultHasher::new();
            chars.hash(&mut hasher);
            vector[(hasher.finish() as usize) % MOCK_DIMS] += 1.0;
            return Ok(vector);
        }

        for trigram in chars.windows(3) {
            let mut hasher = DefaultHasher::new();
            trigram.hash(&mut hasher);
            vector[(hasher.finish() as usize) % MOCK_DIMS] += 1.0;
        }

        Ok(vector)
    }
}

/// Creates an isolated App backed by the mock embedder and a unique temp
/// directory, so parallel tests never collide.
pub fn create_app() -> (Arc<App>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let config = Arc::new(RwLock::new(
        Config::load_with(tmp.path().to_str().unwrap()).expect("failed to load config"),
    ));

    let app = Arc::new(App::with_embedder(config, Arc::new(MockEmbedder::new())));
    (app, tmp)
}

/// Creates an App whose model can never load (invalid model name), for
/// exercising the service-unavailable path without touching the network.
pub fn create_app_without_model() -> (Arc<App>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let mut config = Config::load_with(tmp.path().to_str().unwrap()).expect("failed to load config");
    config.semantic.model = "nonexistent-model".to_string();

    let app = Arc::new(App::new(Arc::new(RwLock::new(config))));
    (app, tmp)
}
