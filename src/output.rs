//! Output trait for components that produce a stream.

use futures::Stream;

/// Typing for a component's outbound stream.
///
/// Implemented by transformers and producers; paired with [`crate::Input`]
/// it makes stage connections type-checked.
pub trait Output
where
  Self::Output: Send + 'static,
{
  /// The item type this component emits.
  type Output;
  /// The stream type yielding those items.
  type OutputStream: Stream<Item = Self::Output> + Send + 'static;
}
