//! Notification states broadcast by the usage monitor
//!
//! The monitor writes one ASCII decimal code per state change. This client only
//! cares about the identity of the state, never about why it changed.

use std::fmt;

/// A visual notification state received from the upstream monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationState {
    /// No data received yet
    Unknown,
    /// The required break has been taken
    BreakOver,
    /// A break is in progress
    Break,
    /// Normal typing activity
    Typing,
    /// Typing faster than the configured threshold
    Overspeed,
    /// A break is overdue
    BreakDue,
}

impl NotificationState {
    /// Map a wire code to a state. Unrecognized codes yield `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(NotificationState::Unknown),
            0 => Some(NotificationState::BreakOver),
            1 => Some(NotificationState::Break),
            2 => Some(NotificationState::Typing),
            3 => Some(NotificationState::Overspeed),
            4 => Some(NotificationState::BreakDue),
            _ => None,
        }
    }

    /// The wire code for this state
    pub fn code(self) -> i32 {
        match self {
            NotificationState::Unknown => -1,
            NotificationState::BreakOver => 0,
            NotificationState::Break => 1,
            NotificationState::Typing => 2,
            NotificationState::Overspeed => 3,
            NotificationState::BreakDue => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NotificationState::Unknown => "UNKNOWN",
            NotificationState::BreakOver => "BREAK_OVER",
            NotificationState::Break => "BREAK",
            NotificationState::Typing => "TYPING",
            NotificationState::Overspeed => "OVERSPEED",
            NotificationState::BreakDue => "BREAK_DUE",
        }
    }
}

impl fmt::Display for NotificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
