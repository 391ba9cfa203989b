//! Domain types for the medalforge pipeline.
//!
//! This module contains the core data structures:
//! - Request: What the client asked for
//! - Progress: Events streamed while a run is in flight
//! - Artifact: Saved files and the final result
//! - Run: Lifecycle state

pub mod artifact;
pub mod progress;
pub mod request;
pub mod run;

// Re-export commonly used types
pub use artifact::{ArtifactLink, GeneratedArtifact, GenerationResult, ViewKind};
pub use progress::{FanOut, NoopSink, ProgressEvent, ProgressKind, ProgressSink};
pub use request::{GenerationRequest, ReferenceImage, SupplementaryFile};
pub use run::RunState;
