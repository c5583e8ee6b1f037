//! Error types for the channel, the run controller, and interpreters.

use std::io;

use thiserror::Error;

/// Failures creating or attaching a [`SharedChannel`](crate::shared_buffer::SharedChannel).
///
/// All of these are setup errors: when one is returned no run can start.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel capacity must be positive (got {capacity})")]
    InvalidCapacity { capacity: usize },
    #[error("could not reserve {bytes} bytes for the shared channel")]
    Allocation { bytes: usize },
    #[error("shared region pointer is null")]
    NullRegion,
    #[error("shared region must be {align}-byte aligned")]
    Misaligned { align: usize },
    #[error("shared region of {len} bytes is too small (need at least {min})")]
    RegionTooSmall { len: usize, min: usize },
}

impl ChannelError {
    /// True for the errors raised while reserving memory in `create`.
    pub fn is_allocation(&self) -> bool {
        matches!(self, Self::InvalidCapacity { .. } | Self::Allocation { .. })
    }
}

/// Errors surfaced by the [`RunController`](crate::pipeline::RunController).
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("channel setup failed: {0}")]
    Channel(#[from] ChannelError),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
    #[error("background worker is no longer running")]
    WorkerGone,
}

/// Errors produced while interpreting a program.
///
/// Everything except [`ScriptError::Canceled`] ends a run with `RunFailed`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScriptError {
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: unknown variable `{name}`")]
    UnknownVariable { line: usize, name: String },
    #[error("line {line}: type mismatch: {message}")]
    TypeMismatch { line: usize, message: String },
    #[error("line {line}: division by zero")]
    DivisionByZero { line: usize },
    #[error("line {line}: {message}")]
    Runtime { line: usize, message: String },
    #[error("run canceled")]
    Canceled,
}

pub type ScriptResult<T> = Result<T, ScriptError>;
