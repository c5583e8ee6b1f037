//! Interpreter seam and the bundled pseudocode interpreter.
//!
//! The worker only knows [`Interpreter`]. An interpreter talks to the outside
//! world exclusively through its [`Host`]:
//!
//! ```text
//! Interpreter::run(source, host)
//!     ├─ host.write_output(text)    → OutputProduced (never blocks)
//!     ├─ host.request_input(prompt) → InputRequested, parks until answered
//!     └─ host.is_canceled()         → true once a newer run was started
//! ```

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod samples;
pub mod value;

pub use eval::ScriptInterpreter;
pub use value::Value;

use crate::error::ScriptResult;

/// Summary text reported with `RunFinished` by [`ScriptInterpreter`].
pub const FINISHED_TEXT: &str = "Program finished successfully";

/// What a running program can ask of its environment.
pub trait Host {
    /// Blocking "ask the user". Returns an empty string when the request was
    /// canceled, exactly as if the user had submitted nothing.
    fn request_input(&mut self, prompt: &str) -> String;

    /// Emit one line of program output.
    fn write_output(&mut self, text: &str);

    /// Whether this run has been superseded and should stop.
    fn is_canceled(&self) -> bool;
}

/// Runs a program to completion on the worker thread.
pub trait Interpreter: Send + 'static {
    /// Interpret `source`. `Ok` carries the `RunFinished` summary.
    fn run(&mut self, source: &str, host: &mut dyn Host) -> ScriptResult<String>;
}
