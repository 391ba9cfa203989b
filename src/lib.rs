//! medalforge - Sequential mockup generation for engraved medals
//!
//! Drives a remote generative-image model to produce a fixed set of design
//! variants for one event: P propositions, each rendered as a flat view and
//! then as a three-quarter view seeded with that flat result.
//!
//! # Architecture
//!
//! - Remote calls are issued strictly one at a time, each with its own timeout
//! - A failed unit is logged and skipped; the run always completes
//! - Progress events stream to a caller-owned sink as units are attempted
//!
//! # Modules
//!
//! - `adapters`: Remote image generators (Gemini)
//! - `core`: Pipeline, prompts, timeouts, aggregation
//! - `domain`: Data structures (Request, ProgressEvent, Artifact, Run)
//! - `storage`: Where artifacts are written
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Generate three propositions for an event
//! medalforge generate --label "Trail des Volcans 2026" \
//!     --description "Volcano silhouette, walnut, orange UV accents" \
//!     --reference logo.png
//!
//! # List files of a job
//! medalforge outputs <output-id>
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod storage;

// Re-export main types at crate root for convenience
pub use crate::config::GeneratorConfig;
pub use crate::core::{CancelToken, GenerationError, GenerationPipeline, RemoteError, RunOptions};
pub use crate::domain::{
    GenerationRequest, GenerationResult, NoopSink, ProgressEvent, ProgressKind, ProgressSink,
    ViewKind,
};
