//! Stream-level error handling for pipeline stages.
//!
//! Domain errors (registry, templates, models) live with the modules that
//! raise them; this module carries the stage-facing machinery: what a
//! component does when an item fails ([`ErrorAction`]), how that policy is
//! configured ([`ErrorStrategy`]), and the context attached to a failure
//! ([`StreamError`]).

use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Action a stage takes in response to a failed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorAction {
  /// Stop processing the stream.
  Stop,
  /// Drop the failed item and continue.
  Skip,
  /// Retry the failed item.
  Retry,
}

type CustomErrorHandler<T> = Arc<dyn Fn(&StreamError<T>) -> ErrorAction + Send + Sync>;

/// Per-stage policy for responding to item failures.
pub enum ErrorStrategy<T> {
  /// Stop on the first failure.
  Stop,
  /// Skip failed items and continue.
  Skip,
  /// Retry up to the given number of attempts, then stop.
  Retry(usize),
  /// Decide per failure with a custom handler.
  Custom(CustomErrorHandler<T>),
}

impl<T> ErrorStrategy<T>
where
  T: fmt::Debug + Clone + Send + Sync,
{
  /// Wraps a handler function as a custom strategy.
  pub fn new_custom<F>(f: F) -> Self
  where
    F: Fn(&StreamError<T>) -> ErrorAction + Send + Sync + 'static,
  {
    Self::Custom(Arc::new(f))
  }
}

impl<T> Clone for ErrorStrategy<T> {
  fn clone(&self) -> Self {
    match self {
      ErrorStrategy::Stop => ErrorStrategy::Stop,
      ErrorStrategy::Skip => ErrorStrategy::Skip,
      ErrorStrategy::Retry(n) => ErrorStrategy::Retry(*n),
      ErrorStrategy::Custom(handler) => ErrorStrategy::Custom(handler.clone()),
    }
  }
}

impl<T> fmt::Debug for ErrorStrategy<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ErrorStrategy::Stop => write!(f, "ErrorStrategy::Stop"),
      ErrorStrategy::Skip => write!(f, "ErrorStrategy::Skip"),
      ErrorStrategy::Retry(n) => write!(f, "ErrorStrategy::Retry({})", n),
      ErrorStrategy::Custom(_) => write!(f, "ErrorStrategy::Custom"),
    }
  }
}

impl<T> PartialEq for ErrorStrategy<T> {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (ErrorStrategy::Stop, ErrorStrategy::Stop) => true,
      (ErrorStrategy::Skip, ErrorStrategy::Skip) => true,
      (ErrorStrategy::Retry(a), ErrorStrategy::Retry(b)) => a == b,
      (ErrorStrategy::Custom(_), ErrorStrategy::Custom(_)) => true,
      _ => false,
    }
  }
}

/// Name and type of the component reporting an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
  /// Configured component name.
  pub name: String,
  /// Rust type name of the component.
  pub type_name: String,
}

impl ComponentInfo {
  /// Creates component info from a name and type name.
  pub fn new(name: String, type_name: String) -> Self {
    Self { name, type_name }
  }
}

/// When and where a failure happened, and the item that caused it.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorContext<T> {
  /// Time the failure was observed.
  pub timestamp: DateTime<Utc>,
  /// The item being processed, when available.
  pub item: Option<T>,
  /// Name of the failing component.
  pub component_name: String,
  /// Type of the failing component.
  pub component_type: String,
}

/// A failure raised while processing one stream item.
#[derive(Debug)]
pub struct StreamError<T> {
  /// The underlying error.
  pub source: Box<dyn Error + Send + Sync>,
  /// Context captured at the failure site.
  pub context: ErrorContext<T>,
  /// The component that reported the failure.
  pub component: ComponentInfo,
  /// How many times this item has been retried.
  pub retries: usize,
}

impl<T> StreamError<T> {
  /// Creates a stream error with a zero retry count.
  pub fn new(
    source: Box<dyn Error + Send + Sync>,
    context: ErrorContext<T>,
    component: ComponentInfo,
  ) -> Self {
    Self {
      source,
      context,
      component,
      retries: 0,
    }
  }
}

impl<T: fmt::Debug> fmt::Display for StreamError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "error in {} ({}): {}",
      self.component.name, self.component.type_name, self.source
    )
  }
}

impl<T: fmt::Debug> Error for StreamError<T> {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    Some(self.source.as_ref())
  }
}
