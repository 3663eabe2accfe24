//! The model-writer pipeline stage.
//!
//! Single input, single output: every [`ModelBatch`] that arrives is
//! published to the registry, then forwarded unchanged. A publish failure
//! is logged with full context and contained here; it never reaches the
//! pipeline's error channel, so downstream stages always see the message.
//! At most one publish attempt is made per message; retries belong to the
//! operator, not this layer.

use crate::batch::ModelBatch;
use crate::error::StreamError;
use crate::input::Input;
use crate::output::Output;
use crate::publisher::{ModelPublisher, PermissionOutcome};
use crate::transformer::{Transformer, TransformerConfig};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Default component name for this stage.
pub const STAGE_NAME: &str = "mlflow-model-writer";

/// Pipeline stage that publishes each incoming model batch to the registry
/// and forwards the batch downstream.
#[derive(Clone)]
pub struct ModelWriterStage {
  publisher: Arc<ModelPublisher>,
  config: TransformerConfig<ModelBatch>,
}

impl ModelWriterStage {
  /// Creates a stage around a configured publisher.
  pub fn new(publisher: Arc<ModelPublisher>) -> Self {
    Self {
      publisher,
      config: TransformerConfig::default().with_name(STAGE_NAME.to_string()),
    }
  }

  /// Sets the stage name used in logs.
  #[must_use]
  pub fn with_name(mut self, name: String) -> Self {
    self.config.name = Some(name);
    self
  }
}

impl Input for ModelWriterStage {
  type Input = ModelBatch;
  type InputStream = Pin<Box<dyn Stream<Item = ModelBatch> + Send>>;
}

impl Output for ModelWriterStage {
  type Output = ModelBatch;
  type OutputStream = Pin<Box<dyn Stream<Item = ModelBatch> + Send>>;
}

#[async_trait]
impl Transformer for ModelWriterStage {
  async fn transform(&mut self, input: Self::InputStream) -> Self::OutputStream {
    let publisher = self.publisher.clone();
    let stage = self.clone();
    Box::pin(input.then(move |batch| {
      let publisher = publisher.clone();
      let stage = stage.clone();
      async move {
        match publisher.publish(&batch).await {
          Ok(receipt) => {
            debug!(
              user = batch.user_id(),
              model = %receipt.model_name,
              version = %receipt.version,
              run_id = %receipt.run_id,
              "published model version"
            );
            if let PermissionOutcome::Failed(reason) = &receipt.permissions {
              warn!(
                user = batch.user_id(),
                model = %receipt.model_name,
                reason = %reason,
                "model published but permissions were not applied"
              );
            }
          }
          Err(err) => {
            let err = StreamError::new(
              Box::new(err),
              stage.create_error_context(Some(batch.clone())),
              stage.component_info(),
            );
            error!(
              component = %err.component.name,
              user = batch.user_id(),
              error = %err,
              "model publish failed; forwarding message"
            );
          }
        }
        batch
      }
    }))
  }

  fn config(&self) -> &TransformerConfig<ModelBatch> {
    &self.config
  }

  fn config_mut(&mut self) -> &mut TransformerConfig<ModelBatch> {
    &mut self.config
  }
}
