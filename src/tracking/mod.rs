//! Model tracking
//!
//! - [`registry`] - versioned model blobs addressed by `models:/` URIs
//! - [`run_params`] - per-run metadata pointing inference at a model version

pub mod registry;
pub mod run_params;

pub use registry::{ModelRegistry, ModelUri, RegistryEntry, VersionRef};
pub use run_params::{RunParams, RunStore};
