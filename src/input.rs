//! Input trait for components that consume a stream.

use futures::Stream;

/// Typing for a component's inbound stream.
///
/// Implemented by transformers and consumers; the pipeline wiring uses it
/// to check that an upstream output type matches a downstream input type.
pub trait Input
where
  Self::Input: Send + 'static,
{
  /// The item type this component accepts.
  type Input;
  /// The stream type yielding those items.
  type InputStream: Stream<Item = Self::Input> + Send + 'static;
}
