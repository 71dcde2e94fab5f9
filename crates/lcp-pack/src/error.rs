use std::path::PathBuf;

use thiserror::Error;

/// Failure of one pipeline stage. Each variant is a distinct stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input could not be opened or is not a readable zip package.
    #[error("cannot read input package {path}: {reason}")]
    InputUnreadable { path: PathBuf, reason: String },

    /// The output file could not be created.
    #[error("cannot create output package {path}: {source}")]
    OutputUncreatable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A resource could not be read, encrypted or copied.
    #[error("failed to process resource {resource}: {reason}")]
    Processing { resource: String, reason: String },

    /// The output archive could not be finished and flushed.
    #[error("failed to finalize output package: {0}")]
    WriterClose(String),

    /// The finished output could not be re-read for size and digest.
    #[error("failed to checksum output package: {0}")]
    Checksum(#[source] std::io::Error),
}

impl PipelineError {
    /// Stage name used in logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InputUnreadable { .. } => "input",
            Self::OutputUncreatable { .. } => "output",
            Self::Processing { .. } => "process",
            Self::WriterClose(_) => "close",
            Self::Checksum(_) => "checksum",
        }
    }
}
