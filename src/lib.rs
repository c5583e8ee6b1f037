//! # pcode-runner
//!
//! Runs a small pseudocode language on a background thread, with a
//! synchronous `input` statement backed by a shared memory channel.
//!
//! ## Architecture
//!
//! ```text
//!  foreground                                   worker thread
//! ┌──────────────────────┐   WorkerCommand    ┌──────────────────────┐
//! │ RunController        │ ─────────────────▶ │ Interpreter::run     │
//! │   Responder          │                    │   InputBridge        │
//! │   recv() ◀── Message │ ◀───────────────── │     (parks)          │
//! └──────────┬───────────┘    WorkerEvent     └──────────┬───────────┘
//!            │                                           │
//!            └──────────────▶ SharedChannel ◀────────────┘
//!                 [u32 control word][capacity bytes of UTF-8]
//! ```
//!
//! The control word moves `Idle → Waiting → Ready → Idle`; only a reset
//! (restart or shutdown) forces it back to `Idle` from anywhere.
//!
//! ## Modules
//!
//! - [`shared_buffer`] - The shared control word plus text buffer
//! - [`pipeline`] - Controller, worker, blocking input call, futex wake
//! - [`input`] - Responder and stdin line reader
//! - [`script`] - Interpreter seam and the bundled interpreter
//! - [`events`] - Commands and notifications between the two threads
//! - [`console`] - Terminal rendering of run events
//! - [`config`] - Runner configuration
//! - [`error`] - Error types

pub mod config;
pub mod console;
pub mod error;
pub mod events;
pub mod input;
pub mod pipeline;
pub mod script;
pub mod shared_buffer;
pub mod types;

pub use config::{RunnerConfig, RunnerFlags};
pub use error::{ChannelError, RunnerError, ScriptError};
pub use events::{Message, WorkerCommand, WorkerEvent};
pub use pipeline::RunController;
pub use script::{Host, Interpreter, ScriptInterpreter};
pub use shared_buffer::SharedChannel;
pub use types::{ChannelState, PendingRequest, RequestId, RunId};
