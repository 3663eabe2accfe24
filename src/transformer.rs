//! The transformer trait pipeline stages implement.
//!
//! A transformer turns one async stream into another. Stages in this crate
//! work on whole messages: the model-writer stage consumes and re-emits
//! [`crate::batch::ModelBatch`] items, treating publication as a side
//! effect rather than a transformation.

use crate::error::{ComponentInfo, ErrorAction, ErrorContext, ErrorStrategy, StreamError};
use crate::input::Input;
use crate::output::Output;
use async_trait::async_trait;

/// Configuration shared by all transformers: an error strategy and an
/// optional name used in logs and error reports.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformerConfig<M>
where
  M: std::fmt::Debug + Clone + Send + Sync,
{
  /// How the transformer responds to item failures.
  pub error_strategy: ErrorStrategy<M>,
  /// Name identifying this transformer instance.
  pub name: Option<String>,
}

impl<M: std::fmt::Debug + Clone + Send + Sync> Default for TransformerConfig<M> {
  fn default() -> Self {
    Self {
      error_strategy: ErrorStrategy::Stop,
      name: None,
    }
  }
}

impl<M: std::fmt::Debug + Clone + Send + Sync> TransformerConfig<M> {
  /// Sets the error strategy.
  #[must_use]
  pub fn with_error_strategy(mut self, strategy: ErrorStrategy<M>) -> Self {
    self.error_strategy = strategy;
    self
  }

  /// Sets the name.
  #[must_use]
  pub fn with_name(mut self, name: String) -> Self {
    self.name = Some(name);
    self
  }
}

/// A component that transforms an input stream into an output stream.
#[async_trait]
pub trait Transformer: Input + Output
where
  Self::Input: std::fmt::Debug + Clone + Send + Sync,
{
  /// Transforms the input stream.
  async fn transform(&mut self, input: Self::InputStream) -> Self::OutputStream;

  /// Resolves the action for a failed item from the configured strategy.
  fn handle_error(&self, error: &StreamError<Self::Input>) -> ErrorAction {
    match &self.config().error_strategy {
      ErrorStrategy::Stop => ErrorAction::Stop,
      ErrorStrategy::Skip => ErrorAction::Skip,
      ErrorStrategy::Retry(n) if error.retries < *n => ErrorAction::Retry,
      ErrorStrategy::Retry(_) => ErrorAction::Stop,
      ErrorStrategy::Custom(handler) => handler(error),
    }
  }

  /// Builds an error context for a failed item.
  fn create_error_context(&self, item: Option<Self::Input>) -> ErrorContext<Self::Input> {
    let info = self.component_info();
    ErrorContext {
      timestamp: chrono::Utc::now(),
      item,
      component_name: info.name,
      component_type: info.type_name,
    }
  }

  /// Identifies this component in logs and error reports.
  fn component_info(&self) -> ComponentInfo {
    ComponentInfo {
      name: self
        .config()
        .name
        .clone()
        .unwrap_or_else(|| "transformer".to_string()),
      type_name: std::any::type_name::<Self>().to_string(),
    }
  }

  /// Returns the transformer's configuration.
  fn config(&self) -> &TransformerConfig<Self::Input>;

  /// Returns the transformer's configuration mutably.
  fn config_mut(&mut self) -> &mut TransformerConfig<Self::Input>;
}
