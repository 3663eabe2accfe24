//! # modelweave
//!
//! Streaming publication of per-user anomaly-detection models to an
//! MLflow-compatible registry.
//!
//! One stage of a larger pipeline: a message arrives carrying a trained
//! model plus the user's recent event metadata, the stage publishes the
//! model (experiment, run, provenance, signature, artifact, registered
//! version, optional Databricks ACL), and the message flows downstream
//! unchanged. Publication is a side effect; a failed publish is logged and
//! contained, never a dropped message.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use modelweave::publisher::ModelPublisher;
//! use modelweave::registry::{RegistryConfig, RestRegistryClient};
//! use modelweave::stage::ModelWriterStage;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RegistryConfig::new("http://mlflow:5000");
//! let target = config.deployment_target();
//! let client = Arc::new(RestRegistryClient::new(config)?);
//! let publisher = Arc::new(ModelPublisher::new(client, target));
//! let stage = ModelWriterStage::new(publisher);
//! # let _ = stage;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

/// Message payload accepted by the stage.
pub mod batch;
/// Stream-level error strategies and contexts.
pub mod error;
/// Columnar event-metadata frame.
pub mod frame;
/// Deterministic model/experiment naming.
pub mod identity;
/// Input stream typing trait.
pub mod input;
/// The trained-model boundary.
pub mod model;
/// Output stream typing trait.
pub mod output;
/// Databricks ACL propagation.
pub mod permissions;
/// Training provenance extraction.
pub mod provenance;
/// The publish state machine.
pub mod publisher;
/// Registry client abstraction and REST binding.
pub mod registry;
/// Model signature inference.
pub mod signature;
/// The model-writer pipeline stage.
pub mod stage;
/// The transformer trait stages implement.
pub mod transformer;

pub use batch::ModelBatch;
pub use input::Input;
pub use output::Output;
pub use transformer::{Transformer, TransformerConfig};
