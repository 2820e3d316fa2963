//! Error types for promptdump.

use std::path::PathBuf;

use crate::output::OutputError;
use crate::policy::PolicyError;
use crate::source::SourceError;
use crate::walker::WalkError;

/// Top-level error type for promptdump operations.
#[derive(Debug, thiserror::Error)]
pub enum PromptDumpError {
    #[error("failed to process sources: {0}")]
    Processing(#[from] SourceError),

    #[error("aggregation cancelled")]
    Cancelled,

    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("no sources given")]
    NoSources,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk error: {0}")]
    Walk(#[from] WalkError),

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

/// Map an error to its exit code.
pub fn exit_code(error: &PromptDumpError) -> i32 {
    match error {
        PromptDumpError::Io(_) => 1,
        PromptDumpError::Output(_) => 1,
        PromptDumpError::Policy(_) => 2,
        PromptDumpError::Walk(_) => 2,
        PromptDumpError::PathNotFound(_) => 3,
        PromptDumpError::NoSources => 5,
        PromptDumpError::Processing(_) => 6,
        PromptDumpError::Cancelled => 130,
    }
}
