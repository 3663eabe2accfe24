//! Best-effort ACL propagation for models registered in Databricks.
//!
//! Databricks tracks registered-model permissions outside the MLflow API,
//! so after registration the publisher pushes the configured group ACL
//! through the workspace's administrative endpoints. The remote PATCH has
//! overwrite-or-create semantics, which makes repeated application
//! converge to the same ACL.

use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use thiserror::Error;

/// Environment variable carrying the workspace base URL.
pub const DATABRICKS_HOST_VAR: &str = "DATABRICKS_HOST";

/// Environment variable carrying the workspace API token.
pub const DATABRICKS_TOKEN_VAR: &str = "DATABRICKS_TOKEN";

/// Error raised while applying model permissions.
#[derive(Debug, Error)]
pub enum PermissionError {
  /// A required environment variable is not set.
  #[error("environment variable {0} must be set to apply model permissions")]
  MissingEnv(&'static str),
  /// The HTTP exchange failed.
  #[error("permission request failed: {0}")]
  Transport(#[from] reqwest::Error),
  /// The workspace response did not carry the registered-model id.
  #[error("malformed workspace response: {0}")]
  MalformedResponse(String),
}

/// Permission levels assignable to a group on a registered model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLevel {
  /// Read-only access to the model and its versions.
  CanRead,
  /// Edit access.
  CanEdit,
  /// Full management access.
  CanManage,
  /// May manage staging version transitions.
  CanManageStagingVersions,
  /// May manage production version transitions.
  CanManageProductionVersions,
}

/// Group-to-level ACL applied to a registered model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabricksPermissions {
  acl: BTreeMap<String, PermissionLevel>,
}

impl DatabricksPermissions {
  /// Creates an empty permission spec.
  pub fn new() -> Self {
    Self::default()
  }

  /// Grants a group a permission level.
  #[must_use]
  pub fn grant(mut self, group: impl Into<String>, level: PermissionLevel) -> Self {
    self.acl.insert(group.into(), level);
    self
  }

  /// True when no grants are configured.
  pub fn is_empty(&self) -> bool {
    self.acl.is_empty()
  }

  fn access_control_list(&self) -> AccessControlRequest<'_> {
    AccessControlRequest {
      access_control_list: self
        .acl
        .iter()
        .map(|(group, level)| AccessControlEntry {
          group_name: group,
          permission_level: *level,
        })
        .collect(),
    }
  }
}

#[derive(Debug, Serialize)]
struct AccessControlEntry<'a> {
  group_name: &'a str,
  permission_level: PermissionLevel,
}

#[derive(Debug, Serialize)]
struct AccessControlRequest<'a> {
  access_control_list: Vec<AccessControlEntry<'a>>,
}

fn credentials_from_env() -> Result<(String, String), PermissionError> {
  let host =
    env::var(DATABRICKS_HOST_VAR).map_err(|_| PermissionError::MissingEnv(DATABRICKS_HOST_VAR))?;
  let token = env::var(DATABRICKS_TOKEN_VAR)
    .map_err(|_| PermissionError::MissingEnv(DATABRICKS_TOKEN_VAR))?;
  Ok((host, token))
}

/// Applies the ACL to a registered model in the workspace named by the
/// `DATABRICKS_HOST`/`DATABRICKS_TOKEN` environment variables.
///
/// Two calls: a GET to translate the model name into the workspace's
/// numeric id, then a PATCH of the ACL onto that id's permissions
/// resource.
pub async fn apply_model_permissions(
  http: &reqwest::Client,
  model_name: &str,
  spec: &DatabricksPermissions,
) -> Result<(), PermissionError> {
  let (host, token) = credentials_from_env()?;
  let host = host.trim_end_matches('/');

  let lookup: serde_json::Value = http
    .get(format!(
      "{host}/api/2.0/mlflow/databricks/registered-models/get"
    ))
    .bearer_auth(&token)
    .query(&[("name", model_name)])
    .send()
    .await?
    .error_for_status()?
    .json()
    .await?;

  let model_id = lookup
    .pointer("/registered_model_databricks/id")
    .and_then(|id| id.as_str())
    .ok_or_else(|| {
      PermissionError::MalformedResponse(format!(
        "no registered_model_databricks.id for '{model_name}'"
      ))
    })?;

  http
    .patch(format!(
      "{host}/api/2.0/preview/permissions/registered-models/{model_id}"
    ))
    .bearer_auth(&token)
    .json(&spec.access_control_list())
    .send()
    .await?
    .error_for_status()?;

  Ok(())
}
