//! The publish state machine: one run, one artifact, one model version.
//!
//! A publish walks `Idle → ExperimentResolved → RunOpen → ArtifactLogged →
//! ModelRegistered → VersionCreated → Closed`. The single most important
//! invariant is run closure: once a run is opened it is terminated on every
//! exit path, success or failure, before `publish` returns. The run handle
//! is explicit and threaded through each step; there is no ambient
//! "current run" anywhere in this crate.

use crate::batch::ModelBatch;
use crate::identity::{NameTemplates, TemplateError, UserModelIdentity};
use crate::model::ModelError;
use crate::permissions::{apply_model_permissions, DatabricksPermissions, PermissionError};
use crate::provenance::{self, Provenance, ProvenanceError};
use crate::registry::{
  DeploymentTarget, EnvironmentSpec, RegistryClient, RegistryError, RunHandle, RunStatus,
};
use crate::signature::{self, ModelSignature, SignatureError};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Run name recorded for every publish attempt.
pub const RUN_NAME: &str = "Autoencoder model training run";

/// Artifact path prefix; the run id is appended to keep paths collision-free
/// across runs and users.
const ARTIFACT_PREFIX: &str = "dfencoder";

/// Default timestamp column read for the training window.
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "timestamp";

/// Why a publish attempt failed.
#[derive(Debug, Error)]
pub enum PublishError {
  /// A naming template could not be rendered.
  #[error("identity resolution failed: {0}")]
  Template(#[from] TemplateError),
  /// The training window could not be derived.
  #[error("provenance extraction failed: {0}")]
  Provenance(#[from] ProvenanceError),
  /// Signature inference failed; the registry requires a contract.
  #[error("signature inference failed: {0}")]
  Signature(#[from] SignatureError),
  /// The model artifact could not be serialized.
  #[error("artifact serialization failed: {0}")]
  Artifact(#[source] ModelError),
  /// The tracking/registry backend rejected a call.
  #[error("registry call failed: {0}")]
  Registry(#[from] RegistryError),
}

/// How the optional permission-propagation step concluded.
///
/// Partial success is deliberately visible: a model can be published while
/// its ACL was not applied, and callers decide how loudly to report that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionOutcome {
  /// No permission spec was configured.
  NotRequested,
  /// A spec was configured but the deployment target is not Databricks.
  TargetMismatch,
  /// The ACL was applied.
  Applied,
  /// The ACL could not be applied; registration still succeeded.
  Failed(String),
}

/// The terminal record of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
  /// The registered-model name the version was created under.
  pub model_name: String,
  /// The backend-assigned version number.
  pub version: String,
  /// The run that produced the artifact.
  pub run_id: String,
  /// How permission propagation concluded.
  pub permissions: PermissionOutcome,
}

/// Publishes trained per-user models to the registry.
pub struct ModelPublisher {
  client: Arc<dyn RegistryClient>,
  templates: NameTemplates,
  timestamp_column: String,
  environment: EnvironmentSpec,
  permissions: Option<DatabricksPermissions>,
  deployment_target: DeploymentTarget,
  http: reqwest::Client,
}

impl ModelPublisher {
  /// Creates a publisher over a registry client.
  pub fn new(client: Arc<dyn RegistryClient>, deployment_target: DeploymentTarget) -> Self {
    Self {
      client,
      templates: NameTemplates::default(),
      timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
      environment: EnvironmentSpec::default(),
      permissions: None,
      deployment_target,
      http: reqwest::Client::new(),
    }
  }

  /// Sets the naming templates.
  #[must_use]
  pub fn with_templates(mut self, templates: NameTemplates) -> Self {
    self.templates = templates;
    self
  }

  /// Sets the timestamp column the training window is read from.
  #[must_use]
  pub fn with_timestamp_column(mut self, column: impl Into<String>) -> Self {
    self.timestamp_column = column.into();
    self
  }

  /// Sets the runtime-environment spec logged with each artifact.
  #[must_use]
  pub fn with_environment(mut self, environment: EnvironmentSpec) -> Self {
    self.environment = environment;
    self
  }

  /// Configures the Databricks permission spec. Applied only when the
  /// deployment target is Databricks.
  #[must_use]
  pub fn with_permissions(mut self, permissions: DatabricksPermissions) -> Self {
    self.permissions = Some(permissions);
    self
  }

  /// Publishes one trained model: resolves the identity, opens a run, logs
  /// provenance and the artifact, and registers a new model version.
  ///
  /// Everything derivable without the backend (identity, provenance,
  /// signature, artifact bytes) is computed before the run opens, so a
  /// malformed batch never leaves an open run behind. Once the run exists
  /// it is terminated on every path out of this function.
  pub async fn publish(&self, batch: &ModelBatch) -> Result<PublishReceipt, PublishError> {
    let identity = self.templates.resolve(batch.user_id())?;
    let provenance =
      provenance::extract(batch.model().as_ref(), batch.meta(), &self.timestamp_column)?;
    let signature = signature::infer(batch.model().as_ref(), batch.meta())?;
    let payload = batch
      .model()
      .artifact_bytes()
      .map_err(PublishError::Artifact)?;

    let experiment = self
      .client
      .get_or_create_experiment(&identity.experiment_path)
      .await?;
    let run = self
      .client
      .create_run(&experiment.experiment_id, RUN_NAME)
      .await?;

    let result = self
      .publish_in_run(&run, &identity, &provenance, &signature, &payload)
      .await;

    match result {
      Ok(receipt) => {
        self.client.terminate_run(&run, RunStatus::Finished).await?;
        debug!(
          user = %identity.user_id,
          model = %receipt.model_name,
          version = %receipt.version,
          "model upload complete"
        );
        Ok(receipt)
      }
      Err(publish_err) => {
        if let Err(close_err) = self.client.terminate_run(&run, RunStatus::Failed).await {
          warn!(
            run_id = %run.run_id,
            error = %close_err,
            "failed to close run after publish error"
          );
        }
        Err(publish_err)
      }
    }
  }

  /// Steps 3–5 of the state machine, scoped to an open run.
  async fn publish_in_run(
    &self,
    run: &RunHandle,
    identity: &UserModelIdentity,
    provenance: &Provenance,
    signature: &ModelSignature,
    payload: &[u8],
  ) -> Result<PublishReceipt, PublishError> {
    self
      .client
      .log_batch(run, &provenance.params, &provenance.metrics)
      .await?;

    let artifact_path = format!("{ARTIFACT_PREFIX}-{}", run.run_id);
    self
      .client
      .log_model_artifact(run, &artifact_path, payload, signature, &self.environment)
      .await?;

    match self
      .client
      .create_registered_model(&identity.model_name)
      .await
    {
      Ok(()) => debug!(model = %identity.model_name, "registered model"),
      Err(err) if err.is_already_exists() => {}
      Err(err) => return Err(err.into()),
    }

    let permissions = self.propagate_permissions(&identity.model_name).await;

    let source = self.client.resolve_artifact_uri(run, &artifact_path).await?;
    let mut tags = BTreeMap::new();
    tags.insert("start".to_string(), provenance.window.start.to_rfc3339());
    tags.insert("end".to_string(), provenance.window.end.to_rfc3339());
    tags.insert("count".to_string(), provenance.window.count.to_string());

    let version = self
      .client
      .create_model_version(&identity.model_name, &source, &run.run_id, &tags)
      .await?;

    Ok(PublishReceipt {
      model_name: identity.model_name.clone(),
      version: version.version,
      run_id: run.run_id.clone(),
      permissions,
    })
  }

  /// Best-effort ACL propagation. Never fails the publish.
  async fn propagate_permissions(&self, model_name: &str) -> PermissionOutcome {
    let Some(spec) = &self.permissions else {
      return PermissionOutcome::NotRequested;
    };
    if self.deployment_target != DeploymentTarget::Databricks {
      return PermissionOutcome::TargetMismatch;
    }
    match apply_model_permissions(&self.http, model_name, spec).await {
      Ok(()) => PermissionOutcome::Applied,
      Err(err @ PermissionError::MissingEnv(_)) => {
        error!(model = model_name, error = %err, "cannot apply model permissions");
        PermissionOutcome::Failed(err.to_string())
      }
      Err(err) => {
        error!(model = model_name, error = %err, "error applying model permissions");
        PermissionOutcome::Failed(err.to_string())
      }
    }
  }
}
