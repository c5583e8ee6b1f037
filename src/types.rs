//! Core protocol types shared by both sides of the channel.

use std::fmt;

// =============================================================================
// CHANNEL STATE
// =============================================================================

/// Value of the channel's control word.
///
/// Lifecycle: `Idle → Waiting → Ready → Idle`, once per input statement.
/// A reset forces `Idle` from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum ChannelState {
    /// No request outstanding. Buffer contents are stale.
    #[default]
    Idle = 0,
    /// Background thread is parked, expecting a response.
    Waiting = 1,
    /// Foreground wrote a response; background has not consumed it yet.
    Ready = 2,
}

impl From<u32> for ChannelState {
    fn from(value: u32) -> Self {
        match value {
            1 => Self::Waiting,
            2 => Self::Ready,
            _ => Self::Idle,
        }
    }
}

impl From<ChannelState> for u32 {
    fn from(state: ChannelState) -> Self {
        state as u32
    }
}

impl ChannelState {
    /// Whether `self → next` is one of the protocol's ordinary transitions.
    ///
    /// Resets (`* → Idle`) do not go through this check.
    pub fn can_transition(self, next: ChannelState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Waiting) | (Self::Waiting, Self::Ready) | (Self::Ready, Self::Idle)
        )
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Waiting => "waiting",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}

// =============================================================================
// IDS
// =============================================================================

/// Identifies one `start_run` call. Increases monotonically per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(pub u64);

/// Identifies one blocking input call. Never reused by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run#{}", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

// =============================================================================
// PENDING REQUEST
// =============================================================================

/// An input request the foreground has been told about but not answered yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub run: RunId,
    pub id: RequestId,
    pub prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_raw() {
        assert_eq!(ChannelState::from(0), ChannelState::Idle);
        assert_eq!(ChannelState::from(1), ChannelState::Waiting);
        assert_eq!(ChannelState::from(2), ChannelState::Ready);
        assert_eq!(ChannelState::from(77), ChannelState::Idle); // Invalid -> default
        assert_eq!(u32::from(ChannelState::Ready), 2);
    }

    #[test]
    fn test_transition_totality() {
        use ChannelState::*;
        let all = [Idle, Waiting, Ready];
        let mut allowed = Vec::new();
        for from in all {
            for to in all {
                if from.can_transition(to) {
                    allowed.push((from, to));
                }
            }
        }
        assert_eq!(allowed, vec![(Idle, Waiting), (Waiting, Ready), (Ready, Idle)]);
    }

    #[test]
    fn test_display() {
        assert_eq!(ChannelState::Waiting.to_string(), "waiting");
        assert_eq!(RunId(3).to_string(), "run#3");
        assert_eq!(RequestId(9).to_string(), "req#9");
    }
}
