//! Input/output contract inference for a model artifact.
//!
//! The registry requires a signature alongside every logged artifact, so
//! unlike provenance this derivation is mandatory: a model that cannot
//! preprocess or score a one-row sample aborts the publish attempt.

use crate::frame::{DataType, MetaFrame};
use crate::model::{ModelError, TrainedModel};
use serde::Serialize;
use thiserror::Error;

/// Error raised during signature inference.
#[derive(Debug, Error)]
pub enum SignatureError {
  /// The frame has no rows to sample.
  #[error("cannot infer a signature from an empty frame")]
  EmptyFrame,
  /// Preprocessing or scoring failed on the sample row.
  #[error(transparent)]
  Model(#[from] ModelError),
}

/// One retained input column and its inferred type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColSpec {
  /// Column name as consumed by the model.
  pub name: String,
  /// Inferred column type.
  #[serde(rename = "type")]
  pub dtype: DataType,
}

/// The declared input/output schema accompanying a logged artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSignature {
  /// Schema of the columns the model actually consumes, in model order.
  pub inputs: Vec<ColSpec>,
  /// Aggregate type of the scoring output.
  pub output: DataType,
}

/// Infers the signature by running one representative row through the
/// model's own preprocessing and scoring paths.
///
/// The retained input set comes from `prepare`: columns present in the raw
/// row but discarded by preprocessing do not appear in the signature. Types
/// are inferred from the raw frame so the contract describes what callers
/// supply, not the model's internal encoding.
pub fn infer(model: &dyn TrainedModel, frame: &MetaFrame) -> Result<ModelSignature, SignatureError> {
  if frame.num_rows() == 0 {
    return Err(SignatureError::EmptyFrame);
  }
  let sample = frame.head(1);
  let prepared = model.prepare(&sample)?;

  let inputs = prepared
    .columns()
    .iter()
    .map(|col| ColSpec {
      name: col.name().to_string(),
      // The raw column carries the caller-facing type; prepared columns may
      // already be numerically encoded.
      dtype: frame.column(col.name()).unwrap_or(col).infer_type(),
    })
    .collect();

  model.anomaly_score(&sample)?;

  Ok(ModelSignature {
    inputs,
    // Scores are one double per row.
    output: DataType::Double,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::{Column, Scalar};
  use crate::model::{EmbeddingShape, Hyperparameters};
  use chrono::{TimeZone, Utc};
  use std::collections::BTreeMap;

  struct SelectiveModel {
    keep: Vec<String>,
    fail_scoring: bool,
  }

  impl TrainedModel for SelectiveModel {
    fn prepare(&self, frame: &MetaFrame) -> Result<MetaFrame, ModelError> {
      let columns = self
        .keep
        .iter()
        .map(|name| {
          frame
            .column(name)
            .cloned()
            .ok_or_else(|| ModelError::MissingInput(name.clone()))
        })
        .collect::<Result<Vec<Column>, ModelError>>()?;
      Ok(MetaFrame::new(columns).expect("selected columns share row count"))
    }

    fn anomaly_score(&self, frame: &MetaFrame) -> Result<Vec<f64>, ModelError> {
      if self.fail_scoring {
        return Err(ModelError::Scoring("fixture failure".to_string()));
      }
      Ok(vec![0.5; frame.num_rows()])
    }

    fn hyperparameters(&self) -> Option<Hyperparameters> {
      None
    }

    fn embeddings(&self) -> Option<BTreeMap<String, EmbeddingShape>> {
      None
    }

    fn artifact_bytes(&self) -> Result<Vec<u8>, ModelError> {
      Ok(Vec::new())
    }
  }

  fn fixture_frame() -> MetaFrame {
    MetaFrame::new(vec![
      Column::new("app", vec![Scalar::Str("mail".into()), Scalar::Str("docs".into())]),
      Column::new("bytes_sent", vec![Scalar::Int(100), Scalar::Int(250)]),
      Column::new(
        "timestamp",
        vec![
          Scalar::Timestamp(Utc.timestamp_opt(1, 0).unwrap()),
          Scalar::Timestamp(Utc.timestamp_opt(2, 0).unwrap()),
        ],
      ),
    ])
    .unwrap()
  }

  #[test]
  fn test_signature_keeps_only_prepared_columns() {
    let model = SelectiveModel {
      keep: vec!["app".to_string(), "bytes_sent".to_string()],
      fail_scoring: false,
    };
    let signature = infer(&model, &fixture_frame()).unwrap();
    assert_eq!(
      signature.inputs,
      vec![
        ColSpec {
          name: "app".to_string(),
          dtype: DataType::String
        },
        ColSpec {
          name: "bytes_sent".to_string(),
          dtype: DataType::Long
        },
      ]
    );
    assert_eq!(signature.output, DataType::Double);
  }

  #[test]
  fn test_scoring_failure_aborts_inference() {
    let model = SelectiveModel {
      keep: vec!["app".to_string()],
      fail_scoring: true,
    };
    assert!(matches!(
      infer(&model, &fixture_frame()),
      Err(SignatureError::Model(ModelError::Scoring(_)))
    ));
  }

  #[test]
  fn test_missing_model_input_aborts_inference() {
    let model = SelectiveModel {
      keep: vec!["nonexistent".to_string()],
      fail_scoring: false,
    };
    assert!(matches!(
      infer(&model, &fixture_frame()),
      Err(SignatureError::Model(ModelError::MissingInput(_)))
    ));
  }

  #[test]
  fn test_empty_frame_is_an_error() {
    let model = SelectiveModel {
      keep: vec![],
      fail_scoring: false,
    };
    assert!(matches!(
      infer(&model, &MetaFrame::empty()),
      Err(SignatureError::EmptyFrame)
    ));
  }
}
