//! The trained-model boundary consumed by the publisher.
//!
//! Training happens upstream; this crate only needs a narrow view of the
//! finished model: its preprocessing transform, its scoring function, a
//! serialized artifact, and two *capability-style* accessors for training
//! hyperparameters and per-feature embeddings. Capabilities return `Option`
//! so a model variant that lacks them degrades to omitted provenance fields
//! instead of failing the publish.

use crate::frame::MetaFrame;
use std::collections::BTreeMap;
use thiserror::Error;

/// Error raised by a model's preprocessing, scoring, or serialization.
#[derive(Debug, Error)]
pub enum ModelError {
  /// A column the model requires was not present in the frame.
  #[error("model input column '{0}' missing from frame")]
  MissingInput(String),
  /// The model could not score the supplied rows.
  #[error("scoring failed: {0}")]
  Scoring(String),
  /// The model artifact could not be serialized.
  #[error("artifact serialization failed: {0}")]
  Serialization(String),
}

/// Training hyperparameters read from a model that exposes them.
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperparameters {
  /// Last completed epoch of the learning-rate schedule, when recorded.
  pub last_epoch: Option<u64>,
  /// The training learning rate.
  pub learning_rate: f64,
  /// The training batch size.
  pub batch_size: usize,
}

/// Shape of one categorical feature's learned embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddingShape {
  /// Number of entries in the embedding table.
  pub num_embeddings: u64,
  /// Dimensionality of each embedding vector.
  pub embedding_dim: u64,
}

/// A trained per-user anomaly-detection model, as seen by the publisher.
pub trait TrainedModel: Send + Sync {
  /// Applies the model's own preprocessing to a frame, returning only the
  /// columns the model actually consumes. Used on a one-row sample to infer
  /// the input side of the model signature.
  fn prepare(&self, frame: &MetaFrame) -> Result<MetaFrame, ModelError>;

  /// Scores rows, yielding one anomaly score per row.
  fn anomaly_score(&self, frame: &MetaFrame) -> Result<Vec<f64>, ModelError>;

  /// Training hyperparameters, if this model variant records them.
  fn hyperparameters(&self) -> Option<Hyperparameters>;

  /// Embedding shapes per categorical feature, if this model variant holds
  /// embeddings. The map contains only features that actually have one;
  /// `None` means the capability itself is absent.
  fn embeddings(&self) -> Option<BTreeMap<String, EmbeddingShape>>;

  /// Serializes the model into the artifact payload logged to the registry.
  fn artifact_bytes(&self) -> Result<Vec<u8>, ModelError>;
}
