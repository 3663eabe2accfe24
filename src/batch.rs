//! The message payload accepted by the model-writer stage.

use crate::frame::MetaFrame;
use crate::model::TrainedModel;
use std::fmt;
use std::sync::Arc;

/// One user's trained model plus the event metadata it was trained on.
///
/// The stage forwards the same batch it received; publication is a side
/// effect, never a transformation. The model is shared behind an `Arc` so
/// forwarding is cheap and downstream stages observe the identical object.
#[derive(Clone)]
pub struct ModelBatch {
  user_id: String,
  model: Arc<dyn TrainedModel>,
  meta: MetaFrame,
}

impl ModelBatch {
  /// Creates a batch from a user id, trained model, and metadata frame.
  pub fn new(user_id: impl Into<String>, model: Arc<dyn TrainedModel>, meta: MetaFrame) -> Self {
    Self {
      user_id: user_id.into(),
      model,
      meta,
    }
  }

  /// The user this model belongs to.
  pub fn user_id(&self) -> &str {
    &self.user_id
  }

  /// The trained model.
  pub fn model(&self) -> &Arc<dyn TrainedModel> {
    &self.model
  }

  /// The event metadata frame attached to this batch.
  pub fn meta(&self) -> &MetaFrame {
    &self.meta
  }
}

impl fmt::Debug for ModelBatch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ModelBatch")
      .field("user_id", &self.user_id)
      .field("rows", &self.meta.num_rows())
      .finish()
  }
}
