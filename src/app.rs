//! Application core: the sensor store, the embedding-model handle, and
//! every consumer-facing operation. Transport layers (HTTP, CLI) call
//! into this and only format the results.

use crate::config::Config;
use crate::semantic::{best_match, Embedder, EmbeddingError, FastembedModel, SimilarityError};
use crate::sensors::{split_paragraphs, BulkOutcome, EmbeddedParagraph, SensorRecord, SensorStore};
use crate::validate::{
    validate_batch, validate_name_id, validate_paragraphs, validate_text, ValidationError,
    MAX_PROBE_TEXT_LEN, MAX_SENSOR_TEXT_LEN,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("text sensor '{name_id}' not found. {}", known_sensors_hint(.known))]
    NotFound { name_id: String, known: Vec<String> },

    #[error("text sensor '{name_id}' is in corrupted state (text exists but no paragraph data). Please recreate the sensor")]
    Corrupted { name_id: String },

    #[error("embedding model is not available: {reason}")]
    ModelUnavailable { reason: String },

    #[error("error generating embedding for paragraph {position}: {source}")]
    ParagraphEmbedding {
        /// 1-based position of the paragraph that failed
        position: usize,
        source: EmbeddingError,
    },

    #[error("error generating embedding for input text: {source}")]
    QueryEmbedding { source: EmbeddingError },

    #[error("error calculating similarity: {0}")]
    Similarity(#[from] SimilarityError),
}

fn known_sensors_hint(known: &[String]) -> String {
    if known.is_empty() {
        "No sensors have been created yet".to_string()
    } else {
        format!("Available sensors: {}", known.join(", "))
    }
}

/// Embedding-model handle state. A failed load sticks until an explicit
/// reload so callers see a stable service-unavailable condition instead
/// of a retry storm.
enum ModelState {
    Unloaded,
    Loaded(Arc<dyn Embedder>),
    Failed(String),
}

/// Model health as reported by `/health` and the reload endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub model: String,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a similarity check: the best-scoring stored paragraph.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityMatch {
    pub confidence_score: f32,
    pub matched_paragraph: String,
}

/// Sensor listing: nameId -> original text, plus the count.
#[derive(Debug, Clone, Serialize)]
pub struct SensorList {
    pub sensors: BTreeMap<String, String>,
    pub count: usize,
}

pub struct App {
    config: Arc<RwLock<Config>>,
    model: Mutex<ModelState>,
    pub(crate) store: RwLock<SensorStore>,
}

impl App {
    /// Create an app with no model loaded yet. The model is loaded on
    /// first use (or eagerly via [`App::init_model`]).
    pub fn new(config: Arc<RwLock<Config>>) -> Self {
        Self {
            config,
            model: Mutex::new(ModelState::Unloaded),
            store: RwLock::new(SensorStore::new()),
        }
    }

    /// Create an app with an already-constructed embedding provider.
    pub fn with_embedder(config: Arc<RwLock<Config>>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            config,
            model: Mutex::new(ModelState::Loaded(embedder)),
            store: RwLock::new(SensorStore::new()),
        }
    }

    /// Eagerly load the embedding model, logging the outcome. The daemon
    /// calls this at startup; a failure leaves the service degraded
    /// rather than refusing to start.
    pub fn init_model(&self) {
        match self.ensure_model() {
            Ok(model) => log::info!(
                "embedding model '{}' loaded ({} dimensions)",
                model.name(),
                model.dimensions()
            ),
            Err(err) => log::error!("starting degraded, no embedding model: {err}"),
        }
    }

    /// Get the loaded model, loading it if this is the first use.
    /// A previous load failure is returned as-is; only an explicit
    /// reload retries.
    fn ensure_model(&self) -> Result<Arc<dyn Embedder>, AppError> {
        let mut state = self.model.lock().expect("model lock poisoned");

        match &*state {
            ModelState::Loaded(model) => Ok(model.clone()),
            ModelState::Failed(reason) => Err(AppError::ModelUnavailable {
                reason: reason.clone(),
            }),
            ModelState::Unloaded => match self.load_model() {
                Ok(model) => {
                    let model: Arc<dyn Embedder> = Arc::new(model);
                    *state = ModelState::Loaded(model.clone());
                    Ok(model)
                }
                Err(err) => {
                    let reason = err.to_string();
                    *state = ModelState::Failed(reason.clone());
                    Err(AppError::ModelUnavailable { reason })
                }
            },
        }
    }

    fn load_model(&self) -> Result<FastembedModel, EmbeddingError> {
        let (model_name, cache_dir, timeout) = {
            let config = self.config.read().unwrap();
            (
                config.semantic.model.clone(),
                config.base_path(),
                Duration::from_secs(config.semantic.download_timeout_secs),
            )
        };

        log::info!("loading embedding model '{model_name}'");
        FastembedModel::load(&model_name, cache_dir, Some(timeout))
    }

    /// Drop the current model (or failure state) and load it again,
    /// atomically swapping the handle. Embeddings already stored for
    /// existing sensors are left untouched.
    pub fn reload_model(&self) -> Result<ModelStatus, AppError> {
        let mut state = self.model.lock().expect("model lock poisoned");

        match self.load_model() {
            Ok(model) => {
                *state = ModelState::Loaded(Arc::new(model));
                drop(state);
                log::info!("embedding model reloaded");
                Ok(self.model_status())
            }
            Err(err) => {
                let reason = err.to_string();
                *state = ModelState::Failed(reason.clone());
                log::error!("model reload failed: {reason}");
                Err(AppError::ModelUnavailable { reason })
            }
        }
    }

    pub fn model_status(&self) -> ModelStatus {
        let configured = self.config.read().unwrap().semantic.model.clone();
        let state = self.model.lock().expect("model lock poisoned");

        match &*state {
            ModelState::Loaded(model) => ModelStatus {
                model: model.name().to_string(),
                loaded: true,
                error: None,
            },
            ModelState::Failed(reason) => ModelStatus {
                model: configured,
                loaded: false,
                error: Some(reason.clone()),
            },
            ModelState::Unloaded => ModelStatus {
                model: configured,
                loaded: false,
                error: None,
            },
        }
    }

    /// Create (or replace) a sensor from a block of text.
    ///
    /// The record is staged locally and only published into the store
    /// once every paragraph has embedded successfully; a failed create
    /// leaves no partial state behind. Returns the stored paragraph
    /// count.
    pub fn create_sensor(&self, name_id: &str, text: &str) -> Result<usize, AppError> {
        let name_id = validate_name_id(name_id)?;
        let text = validate_text(text, MAX_SENSOR_TEXT_LEN, "text")?;
        let model = self.ensure_model()?;

        let paragraphs = validate_paragraphs(split_paragraphs(&text))?;

        let mut embedded = Vec::with_capacity(paragraphs.len());
        for (idx, paragraph) in paragraphs.into_iter().enumerate() {
            let embedding = model
                .encode(&paragraph)
                .map_err(|source| AppError::ParagraphEmbedding {
                    position: idx + 1,
                    source,
                })?;
            embedded.push(EmbeddedParagraph {
                text: paragraph,
                embedding,
            });
        }

        let record = SensorRecord {
            text,
            paragraphs: embedded,
        };
        let count = record.paragraphs.len();

        self.store
            .write()
            .unwrap()
            .insert(name_id.clone(), record);

        log::info!("sensor '{name_id}' created with {count} paragraphs");
        Ok(count)
    }

    /// Create many sensors at once, create-if-absent.
    ///
    /// The whole batch is validated up front; any invalid entry fails
    /// the call before anything is stored. After that, entries are
    /// processed independently: existing sensors are skipped (bulk never
    /// overwrites), failures are recorded and do not stop the rest.
    pub fn bulk_create_sensors(
        &self,
        batch: &BTreeMap<String, String>,
    ) -> Result<BulkOutcome, AppError> {
        let entries = validate_batch(batch)?;
        self.ensure_model()?;

        let mut outcome = BulkOutcome::default();
        for (name_id, text) in entries {
            if self.store.read().unwrap().has_intact(&name_id) {
                outcome.skipped.push(name_id);
                continue;
            }

            match self.create_sensor(&name_id, &text) {
                Ok(_) => outcome.created.push(name_id),
                Err(err) => {
                    log::warn!("bulk create failed for sensor '{name_id}': {err}");
                    outcome.failed.push(name_id);
                }
            }
        }

        Ok(outcome)
    }

    /// Score `text` against every paragraph of the named sensor and
    /// return the best match.
    pub fn check_similarity(&self, name_id: &str, text: &str) -> Result<SimilarityMatch, AppError> {
        let name_id = validate_name_id(name_id)?;
        let text = validate_text(text, MAX_PROBE_TEXT_LEN, "input text")?;
        let model = self.ensure_model()?;

        let store = self.store.read().unwrap();
        let record = match store.get(&name_id) {
            Some(record) => record,
            None => {
                return Err(AppError::NotFound {
                    known: store.known_ids(),
                    name_id,
                })
            }
        };

        if !record.is_intact() {
            return Err(AppError::Corrupted { name_id });
        }

        let query = model
            .encode(&text)
            .map_err(|source| AppError::QueryEmbedding { source })?;

        let (score, best) = best_match(&query, &record.paragraphs)?;

        Ok(SimilarityMatch {
            confidence_score: score,
            matched_paragraph: best.text.clone(),
        })
    }

    pub fn list_sensors(&self) -> SensorList {
        let sensors = self.store.read().unwrap().list();
        let count = sensors.len();
        SensorList { sensors, count }
    }

    /// Delete a sensor. Removal is idempotent: deleting an absent sensor
    /// succeeds and returns `false`.
    pub fn delete_sensor(&self, name_id: &str) -> Result<bool, AppError> {
        let name_id = validate_name_id(name_id)?;

        let removed = self.store.write().unwrap().remove(&name_id).is_some();
        if removed {
            log::info!("sensor '{name_id}' deleted");
        }

        Ok(removed)
    }
}
