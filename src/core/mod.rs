//! Core generation logic.
//!
//! This module contains:
//! - Prompt: Prompt construction per view and variation
//! - Timeout: Per-call timeout and cancellation racing
//! - Pipeline: The sequential generation engine
//! - Aggregator: Final result assembly
//! - ProgressLog: JSONL persistence of progress events

pub mod aggregator;
pub mod cancel;
pub mod pipeline;
pub mod progress_log;
pub mod prompt;
pub mod timeout;

// Re-export commonly used types
pub use aggregator::{ResultAggregator, NOTHING_GENERATED_MESSAGE};
pub use cancel::CancelToken;
pub use pipeline::{
    output_id_for, GenerationError, GenerationPipeline, RunOptions, RunReport, UnitFailure,
    UnitFailureReason,
};
pub use progress_log::{ProgressLog, ProgressLogWriter, PROGRESS_LOG_FILE};
pub use prompt::{
    build_prompt, concept_direction, enrich_description, three_quarter_from_flat_prompt,
    CONCEPT_DIRECTIONS,
};
pub use timeout::{call_with_cancel, call_with_timeout, RemoteError, IMAGE_CALL_TIMEOUT};
