//! Artifact hand-off between training and serving

pub mod loader;
pub mod store;

pub use loader::{artifact_key, ArtifactLoader, MODEL_JSON, MODEL_ONNX, THRESHOLD_JSON};
pub use store::{ArtifactStore, HttpArtifactStore, InMemoryArtifactStore, LocalArtifactStore};
