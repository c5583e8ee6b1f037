//! Runner configuration.

use bitflags::bitflags;

use crate::shared_buffer::DEFAULT_CAPACITY;

bitflags! {
    /// Front-end behaviour flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RunnerFlags: u32 {
        /// Echo submitted answers (useful when stdin is not a terminal).
        const ECHO_INPUT = 1 << 0;
        /// Print the `RunFinished` summary line.
        const SHOW_SUMMARY = 1 << 1;
        /// Style prompts, summaries and errors with terminal colors.
        const COLOR = 1 << 2;
    }
}

impl Default for RunnerFlags {
    fn default() -> Self {
        Self::SHOW_SUMMARY | Self::COLOR
    }
}

/// Settings for one [`RunController`](crate::pipeline::RunController).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Text capacity of the shared channel in bytes (answers are truncated
    /// to `capacity - 1`).
    pub capacity: usize,
    pub flags: RunnerFlags,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            flags: RunnerFlags::default(),
        }
    }
}

impl RunnerConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_flags(mut self, flags: RunnerFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Turn a flag on or off.
    pub fn set(mut self, flag: RunnerFlags, enabled: bool) -> Self {
        self.flags.set(flag, enabled);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.capacity, 8192);
        assert!(config.flags.contains(RunnerFlags::SHOW_SUMMARY | RunnerFlags::COLOR));
        assert!(!config.flags.contains(RunnerFlags::ECHO_INPUT));
    }

    #[test]
    fn test_builders() {
        let config = RunnerConfig::default()
            .with_capacity(64)
            .set(RunnerFlags::COLOR, false)
            .set(RunnerFlags::ECHO_INPUT, true);
        assert_eq!(config.capacity, 64);
        assert_eq!(config.flags, RunnerFlags::SHOW_SUMMARY | RunnerFlags::ECHO_INPUT);
    }
}
