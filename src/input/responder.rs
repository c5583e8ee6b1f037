//! Foreground side of the blocking input call.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::shared_buffer::SharedChannel;
use crate::types::{ChannelState, PendingRequest};

/// Tracks the outstanding input request and writes answers into the channel.
pub struct Responder {
    channel: Arc<SharedChannel>,
    pending: Option<PendingRequest>,
}

impl Responder {
    pub fn new(channel: Arc<SharedChannel>) -> Self {
        Self {
            channel,
            pending: None,
        }
    }

    pub fn on_input_requested(&mut self, request: PendingRequest) {
        debug!(run = %request.run, id = %request.id, "input pending");
        if let Some(previous) = self.pending.replace(request) {
            warn!(id = %previous.id, "unanswered request replaced by a newer one");
        }
    }

    /// Write `text` as the response and wake the worker.
    ///
    /// Only valid while a request is pending and the channel is `Waiting`;
    /// otherwise nothing is written and `false` is returned.
    pub fn submit(&mut self, text: &str) -> bool {
        let Some(request) = self.pending.take() else {
            debug!("no pending input request; submission ignored");
            return false;
        };

        let state = self.channel.state();
        if state != ChannelState::Waiting {
            warn!(id = %request.id, %state, "channel is not waiting; response dropped");
            return false;
        }

        let written = self.channel.write_text(text);
        if written < text.len() {
            debug!(id = %request.id, written, len = text.len(), "response truncated");
        }
        if let Err(state) = self.channel.transition(ChannelState::Waiting, ChannelState::Ready) {
            warn!(id = %request.id, %state, "channel left waiting before the response landed");
            return false;
        }
        self.channel.notify_one();
        debug!(run = %request.run, id = %request.id, "response delivered");
        true
    }

    /// Answer the pending request with nothing.
    pub fn cancel(&mut self) -> bool {
        self.submit("")
    }

    /// Forget the pending request without answering it.
    pub fn clear(&mut self) -> Option<PendingRequest> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RequestId, RunId};

    fn request(id: u64) -> PendingRequest {
        PendingRequest {
            run: RunId(1),
            id: RequestId(id),
            prompt: "X".into(),
        }
    }

    fn responder() -> (Arc<SharedChannel>, Responder) {
        let channel = Arc::new(SharedChannel::create(16).unwrap());
        (channel.clone(), Responder::new(channel))
    }

    #[test]
    fn test_submit_without_pending_is_ignored() {
        let (channel, mut responder) = responder();
        channel.transition(ChannelState::Idle, ChannelState::Waiting).unwrap();

        assert!(!responder.submit("hello"));
        assert_eq!(channel.state(), ChannelState::Waiting);
        assert_eq!(channel.read_text(), "");
    }

    #[test]
    fn test_submit_requires_waiting() {
        let (channel, mut responder) = responder();
        responder.on_input_requested(request(1));

        assert!(!responder.submit("hello"));
        assert_eq!(channel.state(), ChannelState::Idle);
        assert_eq!(channel.read_text(), "");
        assert!(responder.pending().is_none());
    }

    #[test]
    fn test_submit_publishes_ready() {
        let (channel, mut responder) = responder();
        channel.transition(ChannelState::Idle, ChannelState::Waiting).unwrap();
        responder.on_input_requested(request(1));

        assert!(responder.submit("hello"));
        assert_eq!(channel.state(), ChannelState::Ready);
        assert_eq!(channel.read_text(), "hello");
        assert!(!responder.submit("again"));
    }

    #[test]
    fn test_cancel_sends_empty() {
        let (channel, mut responder) = responder();
        channel.write_text("old");
        channel.transition(ChannelState::Idle, ChannelState::Waiting).unwrap();
        responder.on_input_requested(request(1));

        assert!(responder.cancel());
        assert_eq!(channel.state(), ChannelState::Ready);
        assert_eq!(channel.read_text(), "");
    }

    #[test]
    fn test_submit_after_response_published_is_dropped() {
        let (channel, mut responder) = responder();
        channel.transition(ChannelState::Idle, ChannelState::Waiting).unwrap();
        responder.on_input_requested(request(1));
        assert!(responder.submit("first"));

        // A second request id arriving while the first answer is unread.
        responder.on_input_requested(request(2));
        assert!(!responder.submit("second"));
        assert_eq!(channel.read_text(), "first");
        assert_eq!(
            channel.transition_log(),
            vec![
                (ChannelState::Idle, ChannelState::Waiting, false),
                (ChannelState::Waiting, ChannelState::Ready, false),
            ]
        );
    }

    #[test]
    fn test_newer_request_replaces_older() {
        let (_channel, mut responder) = responder();
        responder.on_input_requested(request(1));
        responder.on_input_requested(request(2));
        assert_eq!(responder.pending().map(|r| r.id), Some(RequestId(2)));
        assert_eq!(responder.clear().map(|r| r.id), Some(RequestId(2)));
        assert!(responder.pending().is_none());
    }
}
