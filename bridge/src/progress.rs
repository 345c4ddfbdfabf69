//! Completion tracking for the three channels of an `action`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Overall outcome of the action.
    Global,
    Internet,
    Bluetooth,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Global, Channel::Internet, Channel::Bluetooth];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Channel::Global => "global",
            Channel::Internet => "internet",
            Channel::Bluetooth => "bluetooth",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic per-channel completion flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ActionProgress {
    global: bool,
    internet: bool,
    bluetooth: bool,
}

impl ActionProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once: on the call that completes the last channel.
    pub fn mark_done(&mut self, channel: Channel) -> bool {
        let flag = match channel {
            Channel::Global => &mut self.global,
            Channel::Internet => &mut self.internet,
            Channel::Bluetooth => &mut self.bluetooth,
        };
        if *flag {
            tracing::warn!(%channel, "channel completed twice");
            return false;
        }
        *flag = true;
        self.is_complete()
    }

    #[must_use]
    pub fn is_done(&self, channel: Channel) -> bool {
        match channel {
            Channel::Global => self.global,
            Channel::Internet => self.internet,
            Channel::Bluetooth => self.bluetooth,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.global && self.internet && self.bluetooth
    }
}
