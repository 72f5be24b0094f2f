//! Decision threshold: selection under a precision constraint, and the
//! persisted value the service decides with

pub mod curve;
pub mod selector;
pub mod value;

pub use curve::{precision_recall_curve, PrecisionRecallPoint};
pub use selector::{select_threshold, ThresholdSelection, UnsatisfiableReason, DEFAULT_THRESHOLD};
pub use value::{parse_threshold_artifact, Threshold};
