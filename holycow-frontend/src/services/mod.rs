pub mod artifacts;
pub mod error_classifier;
pub mod generator;
pub mod providers;

pub use artifacts::ArtifactStore;
pub use error_classifier::FailureCategory;
pub use generator::{GenerationError, GenerationOutcome, ImageGenerator};
