//! Background worker thread.
//!
//! Blocks on the command channel and runs one program at a time. The worker
//! owns the [`InputBridge`] for its whole life; it is created on `Init`.

use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::bridge::{InputBridge, RunGuard};
use crate::error::ScriptError;
use crate::events::{Message, WorkerCommand, WorkerEvent};
use crate::script::{Host, Interpreter};

pub const WORKER_THREAD_NAME: &str = "pcode-worker";

/// Stack for the worker thread. Parsing and evaluation recurse, bounded by
/// the parser's nesting limits.
pub const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// RUN CONTEXT
// =============================================================================

/// The [`Host`] a single run sees.
pub struct RunContext<'a> {
    bridge: &'a mut InputBridge,
    events: &'a Sender<Message>,
    guard: RunGuard,
    disconnected: bool,
}

impl<'a> RunContext<'a> {
    pub fn new(bridge: &'a mut InputBridge, events: &'a Sender<Message>, guard: RunGuard) -> Self {
        Self {
            bridge,
            events,
            guard,
            disconnected: false,
        }
    }
}

impl Host for RunContext<'_> {
    fn request_input(&mut self, prompt: &str) -> String {
        self.bridge.request_input(&self.guard, prompt)
    }

    fn write_output(&mut self, text: &str) {
        let event = WorkerEvent::OutputProduced {
            run: self.guard.run(),
            text: text.to_string(),
        };
        if self.events.send(event.into()).is_err() {
            self.disconnected = true;
        }
    }

    fn is_canceled(&self) -> bool {
        self.disconnected || !self.guard.is_current()
    }
}

// =============================================================================
// WORKER LOOP
// =============================================================================

/// Spawn the worker thread.
pub fn spawn<I: Interpreter>(
    interpreter: I,
    commands: Receiver<WorkerCommand>,
    events: Sender<Message>,
    generation: Arc<AtomicU64>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || run_worker(interpreter, commands, events, generation))
}

fn run_worker<I: Interpreter>(
    mut interpreter: I,
    commands: Receiver<WorkerCommand>,
    events: Sender<Message>,
    generation: Arc<AtomicU64>,
) {
    let mut bridge: Option<InputBridge> = None;

    while let Ok(command) = commands.recv() {
        match command {
            WorkerCommand::Init(channel) => {
                debug!(capacity = channel.capacity(), "worker received channel");
                bridge = Some(InputBridge::new(channel, events.clone()));
                if events.send(WorkerEvent::Ready.into()).is_err() {
                    break;
                }
            }
            WorkerCommand::Run { run, source } => {
                let guard = RunGuard::new(generation.clone(), run);
                if !guard.is_current() {
                    debug!(%run, "skipping superseded run");
                    continue;
                }

                let Some(bridge) = bridge.as_mut() else {
                    warn!(%run, "run requested before init");
                    let failed = WorkerEvent::RunFailed {
                        run,
                        message: "worker has not been initialized".to_string(),
                    };
                    if events.send(failed.into()).is_err() {
                        break;
                    }
                    continue;
                };

                info!(%run, bytes = source.len(), "run started");
                let mut host = RunContext::new(bridge, &events, guard);
                let event = match interpreter.run(&source, &mut host) {
                    Ok(text) => WorkerEvent::RunFinished { run, text },
                    Err(ScriptError::Canceled) => {
                        info!(%run, "run canceled");
                        continue;
                    }
                    Err(err) => {
                        debug!(%run, error = %err, "run failed");
                        WorkerEvent::RunFailed {
                            run,
                            message: err.to_string(),
                        }
                    }
                };
                if events.send(event.into()).is_err() {
                    break;
                }
            }
            WorkerCommand::Shutdown => break,
        }
    }

    debug!("worker exiting");
}
