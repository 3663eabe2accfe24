//! REST implementation of [`RegistryClient`] over the MLflow 2.0 wire API.

use crate::registry::client::RegistryClient;
use crate::registry::types::{
  EnvironmentSpec, ErrorCode, Experiment, ModelVersion, RegistryError, RunHandle, RunStatus,
};
use crate::signature::ModelSignature;
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

/// The kind of deployment the tracking endpoint points at.
///
/// Resolved once from the tracking URI at configuration time; the publisher
/// branches on this value instead of re-inspecting the URI per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentTarget {
  /// A managed Databricks workspace. Permission propagation applies here.
  Databricks,
  /// Any self-hosted or otherwise unmanaged tracking server.
  SelfHosted,
}

impl DeploymentTarget {
  /// Classifies a tracking URI.
  pub fn from_tracking_uri(uri: &str) -> Self {
    if uri == "databricks" || uri.starts_with("databricks://") {
      DeploymentTarget::Databricks
    } else {
      DeploymentTarget::SelfHosted
    }
  }
}

/// Configuration for the REST registry client.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
  /// Base tracking URI, e.g. `http://mlflow:5000`.
  pub tracking_uri: String,
  /// Optional bearer token for authenticated backends.
  pub token: Option<String>,
  /// Request timeout.
  pub timeout: Duration,
}

impl RegistryConfig {
  /// Creates a configuration for a tracking URI.
  pub fn new(tracking_uri: impl Into<String>) -> Self {
    Self {
      tracking_uri: tracking_uri.into(),
      token: None,
      timeout: Duration::from_secs(30),
    }
  }

  /// Sets the bearer token.
  #[must_use]
  pub fn with_token(mut self, token: impl Into<String>) -> Self {
    self.token = Some(token.into());
    self
  }

  /// Sets the request timeout.
  #[must_use]
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// The deployment target this URI points at.
  pub fn deployment_target(&self) -> DeploymentTarget {
    DeploymentTarget::from_tracking_uri(&self.tracking_uri)
  }
}

/// [`RegistryClient`] backed by the MLflow REST API.
pub struct RestRegistryClient {
  base_url: String,
  token: Option<String>,
  http: reqwest::Client,
}

impl RestRegistryClient {
  /// Builds a client from configuration.
  pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
    let http = reqwest::Client::builder()
      .timeout(config.timeout)
      .build()?;
    Ok(Self {
      base_url: config.tracking_uri.trim_end_matches('/').to_string(),
      token: config.token,
      http,
    })
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}/api/2.0/mlflow/{}", self.base_url, path)
  }

  fn artifact_endpoint(&self, run_id: &str, path: &str) -> String {
    format!(
      "{}/api/2.0/mlflow-artifacts/artifacts/{}/{}",
      self.base_url, run_id, path
    )
  }

  fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, &str)],
  ) -> Result<T, RegistryError> {
    let request = self.authorize(self.http.get(self.endpoint(path)).query(query));
    decode(request.send().await?).await
  }

  async fn post_json<T: DeserializeOwned>(
    &self,
    path: &str,
    body: &serde_json::Value,
  ) -> Result<T, RegistryError> {
    let request = self.authorize(self.http.post(self.endpoint(path)).json(body));
    decode(request.send().await?).await
  }

  async fn put_artifact(
    &self,
    run_id: &str,
    path: &str,
    payload: Vec<u8>,
  ) -> Result<(), RegistryError> {
    let request = self.authorize(self.http.put(self.artifact_endpoint(run_id, path)).body(payload));
    let response = request.send().await?;
    if response.status().is_success() {
      Ok(())
    } else {
      Err(api_error(response).await)
    }
  }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
  #[serde(default = "unknown_code")]
  error_code: ErrorCode,
  #[serde(default)]
  message: String,
}

fn unknown_code() -> ErrorCode {
  ErrorCode::Unknown
}

async fn api_error(response: reqwest::Response) -> RegistryError {
  let status = response.status();
  let text = response.text().await.unwrap_or_default();
  match serde_json::from_str::<ApiErrorBody>(&text) {
    Ok(body) => RegistryError::api(body.error_code, body.message),
    Err(_) => RegistryError::api(ErrorCode::Unknown, format!("HTTP {status}: {text}")),
  }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RegistryError> {
  if response.status().is_success() {
    Ok(response.json::<T>().await?)
  } else {
    Err(api_error(response).await)
  }
}

#[derive(Debug, Deserialize)]
struct ExperimentResponse {
  experiment: Experiment,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
  experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
  run_id: String,
  experiment_id: String,
  artifact_uri: String,
}

#[derive(Debug, Deserialize)]
struct RunBody {
  info: RunInfo,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
  run: RunBody,
}

#[derive(Debug, Deserialize)]
struct ModelVersionResponse {
  model_version: ModelVersion,
}

#[derive(Debug, Serialize)]
struct KeyValue<'a, V> {
  key: &'a str,
  value: V,
}

#[async_trait]
impl RegistryClient for RestRegistryClient {
  async fn get_or_create_experiment(&self, path: &str) -> Result<Experiment, RegistryError> {
    match self
      .get_json::<ExperimentResponse>("experiments/get-by-name", &[("experiment_name", path)])
      .await
    {
      Ok(found) => Ok(found.experiment),
      Err(RegistryError::Api {
        code: ErrorCode::ResourceDoesNotExist,
        ..
      }) => {
        let created: CreateExperimentResponse = self
          .post_json("experiments/create", &json!({ "name": path }))
          .await?;
        Ok(Experiment {
          experiment_id: created.experiment_id,
          name: path.to_string(),
        })
      }
      Err(other) => Err(other),
    }
  }

  async fn create_run(
    &self,
    experiment_id: &str,
    run_name: &str,
  ) -> Result<RunHandle, RegistryError> {
    let response: RunResponse = self
      .post_json(
        "runs/create",
        &json!({
          "experiment_id": experiment_id,
          "run_name": run_name,
          "start_time": Utc::now().timestamp_millis(),
        }),
      )
      .await?;
    Ok(RunHandle {
      run_id: response.run.info.run_id,
      experiment_id: response.run.info.experiment_id,
      artifact_uri: response.run.info.artifact_uri,
    })
  }

  async fn terminate_run(&self, run: &RunHandle, status: RunStatus) -> Result<(), RegistryError> {
    let _: serde_json::Value = self
      .post_json(
        "runs/update",
        &json!({
          "run_id": run.run_id,
          "status": status,
          "end_time": Utc::now().timestamp_millis(),
        }),
      )
      .await?;
    Ok(())
  }

  async fn log_batch(
    &self,
    run: &RunHandle,
    params: &BTreeMap<String, String>,
    metrics: &BTreeMap<String, f64>,
  ) -> Result<(), RegistryError> {
    let now = Utc::now().timestamp_millis();
    let params: Vec<_> = params
      .iter()
      .map(|(key, value)| KeyValue {
        key,
        value: value.as_str(),
      })
      .collect();
    let metrics: Vec<_> = metrics
      .iter()
      .map(|(key, value)| {
        json!({ "key": key, "value": value, "timestamp": now, "step": 0 })
      })
      .collect();
    let _: serde_json::Value = self
      .post_json(
        "runs/log-batch",
        &json!({
          "run_id": run.run_id,
          "params": params,
          "metrics": metrics,
        }),
      )
      .await?;
    Ok(())
  }

  async fn log_model_artifact(
    &self,
    run: &RunHandle,
    artifact_path: &str,
    payload: &[u8],
    signature: &ModelSignature,
    environment: &EnvironmentSpec,
  ) -> Result<String, RegistryError> {
    self
      .put_artifact(
        &run.run_id,
        &format!("{artifact_path}/model.bin"),
        payload.to_vec(),
      )
      .await?;
    // The model descriptor rides alongside the weights so a reloader can
    // recover the contract and environment without the run.
    let descriptor = serde_json::to_vec(&json!({
      "artifact_path": artifact_path,
      "run_id": run.run_id,
      "signature": signature,
      "environment": environment,
    }))?;
    self
      .put_artifact(&run.run_id, &format!("{artifact_path}/MLmodel"), descriptor)
      .await?;
    Ok(format!("runs:/{}/{}", run.run_id, artifact_path))
  }

  async fn resolve_artifact_uri(
    &self,
    run: &RunHandle,
    artifact_path: &str,
  ) -> Result<String, RegistryError> {
    // The run handle already carries its artifact root from run creation;
    // the underlying URI is root-relative and outlives the run.
    Ok(format!(
      "{}/{}",
      run.artifact_uri.trim_end_matches('/'),
      artifact_path
    ))
  }

  async fn create_registered_model(&self, name: &str) -> Result<(), RegistryError> {
    let _: serde_json::Value = self
      .post_json("registered-models/create", &json!({ "name": name }))
      .await?;
    Ok(())
  }

  async fn create_model_version(
    &self,
    name: &str,
    source: &str,
    run_id: &str,
    tags: &BTreeMap<String, String>,
  ) -> Result<ModelVersion, RegistryError> {
    let tags: Vec<_> = tags
      .iter()
      .map(|(key, value)| KeyValue {
        key,
        value: value.as_str(),
      })
      .collect();
    let response: ModelVersionResponse = self
      .post_json(
        "model-versions/create",
        &json!({
          "name": name,
          "source": source,
          "run_id": run_id,
          "tags": tags,
        }),
      )
      .await?;
    Ok(response.model_version)
  }
}
