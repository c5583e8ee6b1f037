//! Notification envelope between the foreground and the background worker.
//!
//! ```text
//! foreground ── WorkerCommand ──▶ worker      (Init, Run, Shutdown)
//! foreground ◀── WorkerEvent ─── worker       (Ready, InputRequested,
//!                                              OutputProduced, RunFinished,
//!                                              RunFailed)
//! ```
//!
//! Everything the foreground loop can receive is a [`Message`]: worker events
//! plus whatever other foreground sources (a stdin reader) feed the same
//! channel.

use std::sync::Arc;

use crate::shared_buffer::SharedChannel;
use crate::types::{RequestId, RunId};

/// Foreground → background.
#[derive(Debug)]
pub enum WorkerCommand {
    /// Hand the worker the channel it will block on.
    Init(Arc<SharedChannel>),
    /// Interpret `source` from scratch.
    Run { run: RunId, source: String },
    /// Exit the worker loop.
    Shutdown,
}

/// Background → foreground. Never blocks the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Worker received its channel and accepts runs.
    Ready,
    /// The worker is parked until the foreground answers.
    InputRequested {
        run: RunId,
        id: RequestId,
        prompt: String,
    },
    OutputProduced { run: RunId, text: String },
    RunFinished { run: RunId, text: String },
    RunFailed { run: RunId, message: String },
}

impl WorkerEvent {
    /// The run this event belongs to (`None` for `Ready`).
    pub fn run(&self) -> Option<RunId> {
        match self {
            Self::Ready => None,
            Self::InputRequested { run, .. }
            | Self::OutputProduced { run, .. }
            | Self::RunFinished { run, .. }
            | Self::RunFailed { run, .. } => Some(*run),
        }
    }

    /// True for the events that end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunFinished { .. } | Self::RunFailed { .. })
    }
}

/// Unified foreground message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Worker(WorkerEvent),
    /// A line of user input (without its line terminator).
    Line(String),
    /// The user input source closed.
    Closed,
}

impl From<WorkerEvent> for Message {
    fn from(event: WorkerEvent) -> Self {
        Self::Worker(event)
    }
}
