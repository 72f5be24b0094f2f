//! Offline training: dataset loading, splitting, fitting, threshold
//! selection and artifact writing

pub mod dataset;
pub mod pipeline;
pub mod split;

pub use dataset::Dataset;
pub use pipeline::{TrainingOutcome, TrainingPipeline};
pub use split::stratified_split;
