//! Error taxonomy for the rule-extraction and profiling pipeline.

use thiserror::Error;

/// Failures that abort a pipeline request.
///
/// Text extraction never appears here: a failed extraction degrades to empty
/// text. Rule updates never appear either: a failed update yields an empty
/// rule-set which the caller must not store.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// LLM call or JSON-array parse failed during initial extraction.
    #[error("rule extraction failed: {0}")]
    RuleExtractionFailed(String),

    /// LLM call failed or returned no code while generating a script.
    #[error("script generation failed: {0}")]
    ScriptGenerationFailed(String),

    /// The generated script kept failing until the retry budget ran out.
    #[error("script execution failed after {attempts} attempt(s): {last_error}")]
    ScriptExecutionFailed { attempts: u32, last_error: String },

    /// The document has no rules to profile against.
    #[error("no rules found")]
    NoRules,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn extraction(err: impl std::fmt::Display) -> Self {
        PipelineError::RuleExtractionFailed(err.to_string())
    }

    pub fn generation(err: impl std::fmt::Display) -> Self {
        PipelineError::ScriptGenerationFailed(err.to_string())
    }
}

/// Why a single script attempt failed. Every variant feeds the same retry logic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("failed to spawn '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("exited with status {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("I/O error while waiting for script: {0}")]
    Io(String),

    #[error("timed out after {0}s")]
    Timeout(u64),
}
