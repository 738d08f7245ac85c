//! Error types shared across the scan pipeline.
//!
//! Every variant here is local to one scan specification: the orchestrator
//! records it against that entry and moves on to the next one.
use crate::export::NormalizeError;
use crate::invoke::wait::WaitError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("scanner executable not found at {}", .0.display())]
    ToolNotFound(PathBuf),

    #[error("failed to launch scanner: {0}")]
    LaunchFailed(String),

    #[error("scanner finished without rewriting {}", .0.display())]
    ExportNotWritten(PathBuf),

    #[error("waiting for scanner: {0}")]
    Wait(#[from] WaitError),

    #[error("normalising export: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("backup to {} failed: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type ScanResult<T> = Result<T, ScanError>;
