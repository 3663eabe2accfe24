//! The client abstraction the publisher drives.
//!
//! The tracking/registry backend is a remote service; this trait is the
//! seam between the publish state machine and its transport. The REST
//! implementation lives in [`crate::registry::rest`]; tests substitute an
//! in-memory implementation.

use crate::registry::types::{Experiment, ModelVersion, RegistryError, RunHandle, RunStatus};
use crate::registry::EnvironmentSpec;
use crate::signature::ModelSignature;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Client-side view of the tracking/registry backend.
///
/// Run lifetime discipline: `create_run` hands back an explicit
/// [`RunHandle`], and the caller must pass every handle it opened to
/// `terminate_run` exactly once before returning, on success and failure
/// alike. The backend owns all persisted entities; this client never caches
/// them.
#[async_trait]
pub trait RegistryClient: Send + Sync {
  /// Resolves an experiment by path, creating it if it does not exist.
  async fn get_or_create_experiment(&self, path: &str) -> Result<Experiment, RegistryError>;

  /// Starts a new run scoped to an experiment.
  async fn create_run(
    &self,
    experiment_id: &str,
    run_name: &str,
  ) -> Result<RunHandle, RegistryError>;

  /// Closes a run with its terminal status.
  async fn terminate_run(&self, run: &RunHandle, status: RunStatus) -> Result<(), RegistryError>;

  /// Logs params and metrics in one batched call to bound round trips.
  async fn log_batch(
    &self,
    run: &RunHandle,
    params: &BTreeMap<String, String>,
    metrics: &BTreeMap<String, f64>,
  ) -> Result<(), RegistryError>;

  /// Logs the model artifact under `artifact_path` within the run,
  /// annotated with its signature and runtime environment. Returns the
  /// run-relative model URI (`runs:/<run_id>/<artifact_path>`).
  async fn log_model_artifact(
    &self,
    run: &RunHandle,
    artifact_path: &str,
    payload: &[u8],
    signature: &ModelSignature,
    environment: &EnvironmentSpec,
  ) -> Result<String, RegistryError>;

  /// Resolves the underlying storage URI for an artifact so the pointer
  /// survives outside the run's lifetime.
  async fn resolve_artifact_uri(
    &self,
    run: &RunHandle,
    artifact_path: &str,
  ) -> Result<String, RegistryError>;

  /// Requests creation of a registered model by name. Callers treat an
  /// already-exists error as success; any other error is fatal.
  async fn create_registered_model(&self, name: &str) -> Result<(), RegistryError>;

  /// Creates a new version of a registered model pointing at the resolved
  /// artifact source.
  async fn create_model_version(
    &self,
    name: &str,
    source: &str,
    run_id: &str,
    tags: &BTreeMap<String, String>,
  ) -> Result<ModelVersion, RegistryError>;
}
