//! Run pipeline
//!
//! ```text
//! RunController (foreground)                      worker thread
//! ──────────────────────────                      ─────────────
//! start_run ── WorkerCommand::Run ─────────────▶  Interpreter::run
//!                                                   └─ InputBridge::request_input
//!     ◀──────────── Message::Worker(..) ───────────      (parks on SharedChannel)
//! submit ── Responder: write, Ready, wake ─────▶        resumes
//! ```
//!
//! - [`controller`] owns the channel, the worker and the responder.
//! - [`worker`] is the background loop plus the per-run [`Host`](crate::script::Host).
//! - [`bridge`] is the blocking input call.
//! - [`wake`] wraps the futex wait/wake on the control word.

pub mod bridge;
pub mod controller;
pub mod wake;
pub mod worker;

pub use bridge::{InputBridge, RunGuard};
pub use controller::RunController;
