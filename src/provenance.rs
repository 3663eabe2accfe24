//! Training provenance derived from the model and its event window.
//!
//! Pure derivation over in-memory structures: no registry calls happen
//! here. The publisher logs the result in a single batched call.

use crate::frame::MetaFrame;
use crate::model::TrainedModel;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

/// Algorithm name recorded with every run.
pub const ALGORITHM_NAME: &str = "Denoising Autoencoder";

/// Sentinel recorded when the learning-rate schedule has no epoch counter.
pub const UNKNOWN_EPOCH: &str = "unknown";

/// Error raised when the training window cannot be derived.
#[derive(Debug, Error)]
pub enum ProvenanceError {
  /// The configured timestamp column is not present in the frame.
  #[error("timestamp column '{0}' missing from frame")]
  MissingTimestampColumn(String),
  /// The timestamp column holds no non-null values.
  #[error("timestamp column '{0}' is empty")]
  EmptyTimestampColumn(String),
  /// The timestamp column holds values that are not timestamps.
  #[error("timestamp column '{0}' does not hold timestamps")]
  NotTimestamps(String),
}

/// The time bounds and size of the window the model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingWindow {
  /// Earliest event timestamp in the window.
  pub start: DateTime<Utc>,
  /// Latest event timestamp in the window.
  pub end: DateTime<Utc>,
  /// Non-null timestamp count, recorded as the version `count` tag.
  pub count: u64,
}

/// Everything logged to the run: params, metrics, and the window.
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
  /// Descriptive params (algorithm, hyperparameters, window bounds).
  pub params: BTreeMap<String, String>,
  /// Per-feature embedding capacity metrics.
  pub metrics: BTreeMap<String, f64>,
  /// The training window, reused for the model-version tags.
  pub window: TrainingWindow,
}

/// Derives params, metrics, and the training window for one publish.
///
/// Hyperparameters and embeddings are capabilities the model may not have;
/// absent capabilities degrade to omitted fields. Only a missing or
/// malformed timestamp column fails the derivation, since the window is
/// required for both the logged params and the version tags.
pub fn extract(
  model: &dyn TrainedModel,
  frame: &MetaFrame,
  timestamp_column: &str,
) -> Result<Provenance, ProvenanceError> {
  let window = training_window(frame, timestamp_column)?;

  let mut params = BTreeMap::new();
  params.insert("Algorithm".to_string(), ALGORITHM_NAME.to_string());
  if let Some(hp) = model.hyperparameters() {
    let epochs = hp
      .last_epoch
      .map(|e| e.to_string())
      .unwrap_or_else(|| UNKNOWN_EPOCH.to_string());
    params.insert("Epochs".to_string(), epochs);
    params.insert("Learning rate".to_string(), hp.learning_rate.to_string());
    params.insert("Batch size".to_string(), hp.batch_size.to_string());
  }
  params.insert("Start Epoch".to_string(), window.start.to_rfc3339());
  params.insert("End Epoch".to_string(), window.end.to_rfc3339());
  params.insert("Log Count".to_string(), frame.num_rows().to_string());

  let mut metrics = BTreeMap::new();
  if let Some(embeddings) = model.embeddings() {
    for (feature, shape) in embeddings {
      metrics.insert(
        format!("embedding-{feature}-num_embeddings"),
        shape.num_embeddings as f64,
      );
      metrics.insert(
        format!("embedding-{feature}-embedding_dim"),
        shape.embedding_dim as f64,
      );
    }
  }

  Ok(Provenance {
    params,
    metrics,
    window,
  })
}

fn training_window(
  frame: &MetaFrame,
  timestamp_column: &str,
) -> Result<TrainingWindow, ProvenanceError> {
  let column = frame
    .column(timestamp_column)
    .ok_or_else(|| ProvenanceError::MissingTimestampColumn(timestamp_column.to_string()))?;
  let (min, max) = match (column.min(), column.max()) {
    (Some(min), Some(max)) => (min, max),
    _ => return Err(ProvenanceError::EmptyTimestampColumn(timestamp_column.to_string())),
  };
  let (start, end) = match (min.as_timestamp(), max.as_timestamp()) {
    (Some(start), Some(end)) => (start, end),
    _ => return Err(ProvenanceError::NotTimestamps(timestamp_column.to_string())),
  };
  Ok(TrainingWindow {
    start,
    end,
    count: column.count(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::{Column, Scalar};
  use crate::model::{EmbeddingShape, Hyperparameters, ModelError};
  use chrono::TimeZone;

  struct FixtureModel {
    hyperparameters: Option<Hyperparameters>,
    embeddings: Option<BTreeMap<String, EmbeddingShape>>,
  }

  impl TrainedModel for FixtureModel {
    fn prepare(&self, frame: &MetaFrame) -> Result<MetaFrame, ModelError> {
      Ok(frame.clone())
    }

    fn anomaly_score(&self, frame: &MetaFrame) -> Result<Vec<f64>, ModelError> {
      Ok(vec![0.0; frame.num_rows()])
    }

    fn hyperparameters(&self) -> Option<Hyperparameters> {
      self.hyperparameters.clone()
    }

    fn embeddings(&self) -> Option<BTreeMap<String, EmbeddingShape>> {
      self.embeddings.clone()
    }

    fn artifact_bytes(&self) -> Result<Vec<u8>, ModelError> {
      Ok(Vec::new())
    }
  }

  fn frame(stamps: &[i64]) -> MetaFrame {
    let values = stamps
      .iter()
      .map(|s| Scalar::Timestamp(Utc.timestamp_opt(*s, 0).unwrap()))
      .collect();
    MetaFrame::new(vec![Column::new("timestamp", values)]).unwrap()
  }

  fn shapes(features: &[(&str, u64, u64)]) -> BTreeMap<String, EmbeddingShape> {
    features
      .iter()
      .map(|(name, n, d)| {
        (
          name.to_string(),
          EmbeddingShape {
            num_embeddings: *n,
            embedding_dim: *d,
          },
        )
      })
      .collect()
  }

  #[test]
  fn test_two_metrics_per_embedded_feature() {
    let model = FixtureModel {
      hyperparameters: None,
      embeddings: Some(shapes(&[("app", 100, 8), ("city", 50, 4), ("device", 10, 2)])),
    };
    let provenance = extract(&model, &frame(&[1, 2, 3]), "timestamp").unwrap();
    assert_eq!(provenance.metrics.len(), 6);
    assert_eq!(provenance.metrics["embedding-app-num_embeddings"], 100.0);
    assert_eq!(provenance.metrics["embedding-city-embedding_dim"], 4.0);
  }

  #[test]
  fn test_absent_capabilities_omit_fields() {
    let model = FixtureModel {
      hyperparameters: None,
      embeddings: None,
    };
    let provenance = extract(&model, &frame(&[5]), "timestamp").unwrap();
    assert!(provenance.metrics.is_empty());
    assert!(!provenance.params.contains_key("Epochs"));
    assert!(!provenance.params.contains_key("Learning rate"));
    assert_eq!(provenance.params["Algorithm"], ALGORITHM_NAME);
  }

  #[test]
  fn test_missing_epoch_counter_records_sentinel() {
    let model = FixtureModel {
      hyperparameters: Some(Hyperparameters {
        last_epoch: None,
        learning_rate: 0.001,
        batch_size: 512,
      }),
      embeddings: None,
    };
    let provenance = extract(&model, &frame(&[5]), "timestamp").unwrap();
    assert_eq!(provenance.params["Epochs"], UNKNOWN_EPOCH);
    assert_eq!(provenance.params["Learning rate"], "0.001");
    assert_eq!(provenance.params["Batch size"], "512");
  }

  #[test]
  fn test_window_bounds_and_count() {
    let model = FixtureModel {
      hyperparameters: None,
      embeddings: None,
    };
    let provenance = extract(&model, &frame(&[300, 100, 200]), "timestamp").unwrap();
    assert_eq!(
      provenance.window.start,
      Utc.timestamp_opt(100, 0).unwrap()
    );
    assert_eq!(provenance.window.end, Utc.timestamp_opt(300, 0).unwrap());
    assert_eq!(provenance.window.count, 3);
    assert_eq!(provenance.params["Log Count"], "3");
  }

  #[test]
  fn test_missing_timestamp_column_is_an_error() {
    let model = FixtureModel {
      hyperparameters: None,
      embeddings: None,
    };
    let result = extract(&model, &frame(&[1]), "event_time");
    assert!(matches!(
      result,
      Err(ProvenanceError::MissingTimestampColumn(_))
    ));
  }
}
