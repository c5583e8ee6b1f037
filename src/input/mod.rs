//! User input: where answers come from and how they reach the worker.

pub mod reader;
pub mod responder;

pub use reader::StdinReader;
pub use responder::Responder;
