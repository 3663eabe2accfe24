//! Tracking/registry backend access.
//!
//! The publisher only ever talks to the backend through the
//! [`RegistryClient`] trait; the REST implementation is one binding of it.

/// The `RegistryClient` trait the publisher drives.
pub mod client;
/// REST binding of the client over the MLflow 2.0 API.
pub mod rest;
/// Domain and wire types shared by client implementations.
pub mod types;

pub use client::RegistryClient;
pub use rest::{DeploymentTarget, RegistryConfig, RestRegistryClient};
pub use types::{
  EnvironmentSpec, ErrorCode, Experiment, ModelVersion, RegistryError, RunHandle, RunStatus,
};
