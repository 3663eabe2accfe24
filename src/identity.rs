//! Deterministic naming for a user's registered model and experiment.
//!
//! Both names are derived from configurable templates so deployments can
//! shard experiments however they like (flat, per-user, hashed buckets).
//! Resolution is pure: the same user id and templates always produce the
//! same identity, and the publisher resolves once per publish and threads
//! the result through every step so registration and versioning agree.

use md5::{Digest, Md5};
use thiserror::Error;

/// Default registered-model name template.
pub const DEFAULT_MODEL_NAME_TEMPLATE: &str = "dfp-{user_id}";

/// Default experiment path template.
pub const DEFAULT_EXPERIMENT_TEMPLATE: &str = "/dfp-models/{reg_model_name}";

/// Error raised while rendering a naming template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
  /// The template references a placeholder this resolver does not supply.
  #[error("unknown placeholder '{{{0}}}' in template")]
  UnknownPlaceholder(String),
  /// A `{` was opened but never closed.
  #[error("unclosed placeholder in template '{0}'")]
  UnclosedPlaceholder(String),
}

/// The resolved identity of one user's model in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserModelIdentity {
  /// The raw user identifier the identity was derived from.
  pub user_id: String,
  /// The registered-model name.
  pub model_name: String,
  /// The experiment path grouping this user's runs.
  pub experiment_path: String,
}

/// The pair of naming templates configured on the publisher.
///
/// The model-name template accepts `{user_id}`. The experiment template
/// additionally accepts `{user_md5}` (md5 hex digest of the user id) and
/// `{reg_model_name}` (the already-resolved model name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplates {
  model_name: String,
  experiment_path: String,
}

impl Default for NameTemplates {
  fn default() -> Self {
    Self {
      model_name: DEFAULT_MODEL_NAME_TEMPLATE.to_string(),
      experiment_path: DEFAULT_EXPERIMENT_TEMPLATE.to_string(),
    }
  }
}

impl NameTemplates {
  /// Creates templates from explicit format strings.
  pub fn new(model_name: impl Into<String>, experiment_path: impl Into<String>) -> Self {
    Self {
      model_name: model_name.into(),
      experiment_path: experiment_path.into(),
    }
  }

  /// Sets the model-name template.
  #[must_use]
  pub fn with_model_name(mut self, template: impl Into<String>) -> Self {
    self.model_name = template.into();
    self
  }

  /// Sets the experiment-path template.
  #[must_use]
  pub fn with_experiment_path(mut self, template: impl Into<String>) -> Self {
    self.experiment_path = template.into();
    self
  }

  /// Resolves the identity for a user.
  pub fn resolve(&self, user_id: &str) -> Result<UserModelIdentity, TemplateError> {
    let model_name = render(&self.model_name, &[("user_id", user_id)])?;
    let user_md5 = md5_hex(user_id);
    let experiment_path = render(
      &self.experiment_path,
      &[
        ("user_id", user_id),
        ("user_md5", &user_md5),
        ("reg_model_name", &model_name),
      ],
    )?;
    Ok(UserModelIdentity {
      user_id: user_id.to_string(),
      model_name,
      experiment_path,
    })
  }
}

fn md5_hex(input: &str) -> String {
  let mut hasher = Md5::new();
  hasher.update(input.as_bytes());
  format!("{:x}", hasher.finalize())
}

/// Substitutes `{placeholder}` occurrences from the supplied bindings.
/// `{{` and `}}` escape literal braces.
fn render(template: &str, bindings: &[(&str, &str)]) -> Result<String, TemplateError> {
  let mut out = String::with_capacity(template.len());
  let mut chars = template.chars().peekable();
  while let Some(c) = chars.next() {
    match c {
      '{' if chars.peek() == Some(&'{') => {
        chars.next();
        out.push('{');
      }
      '}' if chars.peek() == Some(&'}') => {
        chars.next();
        out.push('}');
      }
      '{' => {
        let mut name = String::new();
        let mut closed = false;
        for inner in chars.by_ref() {
          if inner == '}' {
            closed = true;
            break;
          }
          name.push(inner);
        }
        if !closed {
          return Err(TemplateError::UnclosedPlaceholder(template.to_string()));
        }
        match bindings.iter().find(|(key, _)| *key == name) {
          Some((_, value)) => out.push_str(value),
          None => return Err(TemplateError::UnknownPlaceholder(name)),
        }
      }
      other => out.push(other),
    }
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_templates_for_alice() {
    let identity = NameTemplates::default().resolve("alice").unwrap();
    assert_eq!(identity.model_name, "dfp-alice");
    assert_eq!(identity.experiment_path, "/dfp-models/dfp-alice");
    assert_eq!(identity.user_id, "alice");
  }

  #[test]
  fn test_resolution_is_deterministic() {
    let templates = NameTemplates::new("dfp-{user_id}", "/buckets/{user_md5}/{reg_model_name}");
    let first = templates.resolve("bob@example.com").unwrap();
    let second = templates.resolve("bob@example.com").unwrap();
    assert_eq!(first, second);
  }

  #[test]
  fn test_md5_placeholder_matches_known_digest() {
    let templates = NameTemplates::new("{user_id}", "/{user_md5}");
    let identity = templates.resolve("alice").unwrap();
    // md5("alice")
    assert_eq!(
      identity.experiment_path,
      "/6384e2b2184bcbf58eccf10ca7a6563c"
    );
  }

  #[test]
  fn test_unknown_placeholder_is_an_error() {
    let templates = NameTemplates::new("dfp-{tenant}", "/dfp-models/{reg_model_name}");
    assert_eq!(
      templates.resolve("alice"),
      Err(TemplateError::UnknownPlaceholder("tenant".to_string()))
    );
  }

  #[test]
  fn test_unclosed_placeholder_is_an_error() {
    let templates = NameTemplates::new("dfp-{user_id", "/x");
    assert!(matches!(
      templates.resolve("alice"),
      Err(TemplateError::UnclosedPlaceholder(_))
    ));
  }

  #[test]
  fn test_escaped_braces_render_literally() {
    let templates = NameTemplates::new("{{dfp}}-{user_id}", "/x");
    let identity = templates.resolve("alice").unwrap();
    assert_eq!(identity.model_name, "{dfp}-alice");
  }
}
