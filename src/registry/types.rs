//! Domain and wire types shared by the registry client implementations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named grouping of runs in the tracking backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Experiment {
  /// Backend-assigned experiment identifier.
  pub experiment_id: String,
  /// The experiment path this crate resolved it by.
  pub name: String,
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
  /// The publish completed and the version was created.
  Finished,
  /// The publish failed partway; the run is closed in a failed state.
  Failed,
}

/// An explicit handle to one open run.
///
/// The backend's notion of a "current run" is deliberately not modeled:
/// every call that touches a run takes the handle, and the publisher owns
/// terminating it on every exit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
  /// Backend-assigned run identifier.
  pub run_id: String,
  /// The experiment this run is scoped to.
  pub experiment_id: String,
  /// The run's artifact root, used to resolve underlying artifact URIs.
  pub artifact_uri: String,
}

/// One immutable version of a registered model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelVersion {
  /// The registered model this version belongs to.
  pub name: String,
  /// Backend-assigned version number, as reported by the registry.
  pub version: String,
}

/// The declared runtime environment logged next to the model artifact so
/// consumers can rebuild a compatible serving environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSpec {
  /// Package channels to resolve dependencies from.
  pub channels: Vec<String>,
  /// Base dependencies of the environment.
  pub dependencies: Vec<String>,
  /// Packages installed via pip.
  pub pip: Vec<String>,
  /// Environment name.
  pub name: String,
}

impl Default for EnvironmentSpec {
  fn default() -> Self {
    Self {
      channels: vec!["defaults".to_string(), "conda-forge".to_string()],
      dependencies: vec!["python=3.8".to_string(), "pip".to_string()],
      pip: vec!["mlflow".to_string(), "dfencoder".to_string()],
      name: "mlflow-env".to_string(),
    }
  }
}

/// Error codes reported by the tracking backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
  /// The named resource already exists. Expected during idempotent
  /// registration and treated as success by the publisher.
  ResourceAlreadyExists,
  /// The named resource does not exist.
  ResourceDoesNotExist,
  /// A request parameter was rejected.
  InvalidParameterValue,
  /// The caller is not permitted to perform the operation.
  PermissionDenied,
  /// The backend failed internally.
  InternalError,
  /// Any code this crate does not recognize.
  #[serde(other)]
  Unknown,
}

/// Error raised by a registry client.
#[derive(Debug, Error)]
pub enum RegistryError {
  /// The backend rejected the request with a structured error.
  #[error("registry error {code:?}: {message}")]
  Api {
    /// Backend error code.
    code: ErrorCode,
    /// Backend error message.
    message: String,
  },
  /// The HTTP exchange itself failed.
  #[error("registry transport error: {0}")]
  Transport(#[from] reqwest::Error),
  /// The backend's response could not be decoded.
  #[error("malformed registry response: {0}")]
  Decode(#[from] serde_json::Error),
}

impl RegistryError {
  /// Constructs a structured backend error.
  pub fn api(code: ErrorCode, message: impl Into<String>) -> Self {
    RegistryError::Api {
      code,
      message: message.into(),
    }
  }

  /// True when the backend reported the resource as already existing.
  pub fn is_already_exists(&self) -> bool {
    matches!(
      self,
      RegistryError::Api {
        code: ErrorCode::ResourceAlreadyExists,
        ..
      }
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_code_parses_backend_spelling() {
    let code: ErrorCode = serde_json::from_str("\"RESOURCE_ALREADY_EXISTS\"").unwrap();
    assert_eq!(code, ErrorCode::ResourceAlreadyExists);
  }

  #[test]
  fn test_unrecognized_code_maps_to_unknown() {
    let code: ErrorCode = serde_json::from_str("\"TEMPORARILY_UNAVAILABLE\"").unwrap();
    assert_eq!(code, ErrorCode::Unknown);
  }

  #[test]
  fn test_already_exists_detection() {
    let err = RegistryError::api(ErrorCode::ResourceAlreadyExists, "model exists");
    assert!(err.is_already_exists());
    let other = RegistryError::api(ErrorCode::InternalError, "boom");
    assert!(!other.is_already_exists());
  }

  #[test]
  fn test_environment_spec_serializes_pip_packages() {
    let spec = EnvironmentSpec::default();
    let json = serde_json::to_value(&spec).unwrap();
    assert_eq!(json["name"], "mlflow-env");
    assert_eq!(json["pip"][1], "dfencoder");
  }
}
