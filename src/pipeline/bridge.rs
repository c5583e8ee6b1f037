//! Blocking input call: the worker-side half of the protocol.
//!
//! ```text
//! worker thread                         foreground
//! ─────────────                         ──────────
//! Idle → Waiting
//! send InputRequested ───────────────▶  Responder::on_input_requested
//! wait_while(Waiting)   (parked)              │ user types
//!        │                              write_text, Waiting → Ready, notify_one
//!        ◀─────────────────────────────────────┘
//! state == Ready? read_text, clear, Ready → Idle
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;

use tracing::{debug, warn};

use crate::events::{Message, WorkerEvent};
use crate::shared_buffer::SharedChannel;
use crate::types::{ChannelState, RequestId, RunId};

// =============================================================================
// RUN GUARD
// =============================================================================

/// Tells a running program whether it is still the controller's current run.
#[derive(Debug, Clone)]
pub struct RunGuard {
    generation: Arc<AtomicU64>,
    run: RunId,
}

impl RunGuard {
    pub fn new(generation: Arc<AtomicU64>, run: RunId) -> Self {
        Self { generation, run }
    }

    pub fn run(&self) -> RunId {
        self.run
    }

    /// False once a newer run was started (or the controller shut down).
    #[inline]
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.run.0
    }
}

// =============================================================================
// INPUT BRIDGE
// =============================================================================

/// Gives the interpreter a synchronous "ask the user" over the shared channel.
///
/// Lives on the worker thread for as long as the worker does, so request ids
/// are never reused. `request_input` takes `&mut self`: a second request
/// cannot be issued until the first has returned.
pub struct InputBridge {
    channel: Arc<SharedChannel>,
    events: Sender<Message>,
    next_id: u64,
}

impl InputBridge {
    pub fn new(channel: Arc<SharedChannel>, events: Sender<Message>) -> Self {
        Self {
            channel,
            events,
            next_id: 0,
        }
    }

    pub fn channel(&self) -> &Arc<SharedChannel> {
        &self.channel
    }

    /// Block until the foreground answers, returning its text.
    ///
    /// Returns an empty string if the wait was canceled by a reset, if the
    /// run was already superseded, or if the foreground is gone.
    pub fn request_input(&mut self, guard: &RunGuard, prompt: &str) -> String {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        let run = guard.run();

        if let Err(state) = self.channel.transition(ChannelState::Idle, ChannelState::Waiting) {
            warn!(%run, %id, %state, "input requested while channel was not idle; resetting");
            self.channel.reset();
            if let Err(state) = self.channel.transition(ChannelState::Idle, ChannelState::Waiting) {
                warn!(%run, %id, %state, "channel still busy; input request dropped");
                return String::new();
            }
        }

        // Checked after publishing Waiting: a reset that raced ahead of the
        // store above has already bumped the generation.
        if !guard.is_current() {
            debug!(%run, %id, "run superseded before input request");
            self.channel.reset();
            return String::new();
        }

        debug!(%run, %id, prompt, "requesting input");
        let request = WorkerEvent::InputRequested {
            run,
            id,
            prompt: prompt.to_string(),
        };
        if self.events.send(request.into()).is_err() {
            warn!(%run, %id, "foreground gone; input request dropped");
            self.channel.reset();
            return String::new();
        }

        self.channel.wait_while(ChannelState::Waiting);

        let state = self.channel.state();
        if state != ChannelState::Ready {
            debug!(%run, %id, %state, "woken without a response; treating as canceled");
            return String::new();
        }

        let text = self.channel.read_text();
        self.channel.clear();
        if let Err(state) = self.channel.transition(ChannelState::Ready, ChannelState::Idle) {
            debug!(%run, %id, %state, "channel reset while the response was read");
        }
        debug!(%run, %id, bytes = text.len(), "received input");
        text
    }
}
