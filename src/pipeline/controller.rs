//! Foreground side of the runner.
//!
//! [`RunController`] owns the shared channel, the worker thread and the
//! [`Responder`]. Every message the foreground consumes goes through
//! `recv`/`recv_timeout`/`try_recv`, which drop events of superseded runs
//! and keep the pending request up to date.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::worker;
use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::events::{Message, WorkerCommand, WorkerEvent};
use crate::input::responder::Responder;
use crate::script::Interpreter;
use crate::shared_buffer::SharedChannel;
use crate::types::{PendingRequest, RunId};

/// How often a blocking `recv` checks that the worker is still alive.
const WORKER_POLL: Duration = Duration::from_millis(100);

pub struct RunController {
    config: RunnerConfig,
    channel: Arc<SharedChannel>,
    commands: Sender<WorkerCommand>,
    tx: Sender<Message>,
    rx: Receiver<Message>,
    responder: Responder,
    generation: Arc<AtomicU64>,
    active: Option<RunId>,
    ready: bool,
    worker: Option<JoinHandle<()>>,
}

impl RunController {
    /// Create the channel, spawn the worker and hand it the channel.
    pub fn spawn<I: Interpreter>(
        config: RunnerConfig,
        interpreter: I,
    ) -> Result<Self, RunnerError> {
        let channel = Arc::new(SharedChannel::create(config.capacity)?);
        let (tx, rx) = mpsc::channel();
        let (commands, command_rx) = mpsc::channel();
        let generation = Arc::new(AtomicU64::new(0));

        let handle = worker::spawn(interpreter, command_rx, tx.clone(), generation.clone())?;
        commands
            .send(WorkerCommand::Init(channel.clone()))
            .map_err(|_| RunnerError::WorkerGone)?;
        info!(capacity = config.capacity, "run controller started");

        Ok(Self {
            config,
            responder: Responder::new(channel.clone()),
            channel,
            commands,
            tx,
            rx,
            generation,
            active: None,
            ready: false,
            worker: Some(handle),
        })
    }

    /// Start interpreting `source`, superseding any run still in flight.
    ///
    /// The generation is bumped before the reset so that a stale run woken by
    /// the reset (or about to park) already sees itself as canceled.
    pub fn start_run(&mut self, source: impl Into<String>) -> Result<RunId, RunnerError> {
        let run = RunId(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
        if let Some(previous) = self.active.replace(run) {
            info!(%previous, %run, "superseding active run");
        }

        self.channel.reset();
        if let Some(dropped) = self.responder.clear() {
            debug!(id = %dropped.id, "discarded pending request of previous run");
        }

        self.commands
            .send(WorkerCommand::Run {
                run,
                source: source.into(),
            })
            .map_err(|_| RunnerError::WorkerGone)?;
        info!(%run, "run requested");
        Ok(run)
    }

    /// Answer the pending input request. False if there was nothing to answer.
    pub fn submit(&mut self, text: &str) -> bool {
        self.responder.submit(text)
    }

    /// Answer the pending input request with an empty response.
    pub fn cancel_input(&mut self) -> bool {
        self.responder.cancel()
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.responder.pending()
    }

    pub fn active_run(&self) -> Option<RunId> {
        self.active
    }

    /// Whether the worker has reported `Ready`.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn channel(&self) -> &Arc<SharedChannel> {
        &self.channel
    }

    /// A sender onto the foreground message channel, for other input sources.
    pub fn sender(&self) -> Sender<Message> {
        self.tx.clone()
    }

    // -------------------------------------------------------------------------
    // Receiving
    // -------------------------------------------------------------------------

    /// Block until the next relevant message.
    pub fn recv(&mut self) -> Result<Message, RunnerError> {
        loop {
            match self.rx.recv_timeout(WORKER_POLL) {
                Ok(message) => {
                    if let Some(message) = self.accept(message) {
                        return Ok(message);
                    }
                }
                Err(RecvTimeoutError::Timeout) => self.check_worker()?,
                Err(RecvTimeoutError::Disconnected) => return Err(RunnerError::WorkerGone),
            }
        }
    }

    /// Like [`recv`](Self::recv), giving up after `timeout`.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Message>, RunnerError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(message) => {
                    if let Some(message) = self.accept(message) {
                        return Ok(Some(message));
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.check_worker()?;
                    return Ok(None);
                }
                Err(RecvTimeoutError::Disconnected) => return Err(RunnerError::WorkerGone),
            }
        }
    }

    pub fn try_recv(&mut self) -> Result<Option<Message>, RunnerError> {
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    if let Some(message) = self.accept(message) {
                        return Ok(Some(message));
                    }
                }
                Err(TryRecvError::Empty) => {
                    self.check_worker()?;
                    return Ok(None);
                }
                Err(TryRecvError::Disconnected) => return Err(RunnerError::WorkerGone),
            }
        }
    }

    /// Filter stale events and update controller state. `None` means drop.
    fn accept(&mut self, message: Message) -> Option<Message> {
        if let Message::Worker(event) = &message {
            if !self.observe(event) {
                return None;
            }
        }
        Some(message)
    }

    fn observe(&mut self, event: &WorkerEvent) -> bool {
        match event.run() {
            None => self.ready = true,
            Some(run) if Some(run) != self.active => {
                debug!(%run, "dropping event from superseded run");
                return false;
            }
            Some(_) => {}
        }

        match event {
            WorkerEvent::InputRequested { run, id, prompt } => {
                self.responder.on_input_requested(PendingRequest {
                    run: *run,
                    id: *id,
                    prompt: prompt.clone(),
                });
            }
            WorkerEvent::RunFinished { run, .. } | WorkerEvent::RunFailed { run, .. } => {
                debug!(%run, "run ended");
                self.active = None;
                self.responder.clear();
            }
            WorkerEvent::Ready | WorkerEvent::OutputProduced { .. } => {}
        }
        true
    }

    fn check_worker(&self) -> Result<(), RunnerError> {
        match &self.worker {
            Some(handle) if !handle.is_finished() => Ok(()),
            _ => Err(RunnerError::WorkerGone),
        }
    }
}

impl Drop for RunController {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.channel.reset();
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        debug!("run controller stopped");
    }
}
