//! Poll lifecycle events
//!
//! Published by the coordinator on every observable transition so display
//! surfaces, loggers and tests can follow a poll without polling it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::poll::{PollId, PollState};

/// All poll lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PollEvent {
    /// A poll became current and should be shown
    PollActivated {
        poll_id: PollId,
        title: String,
        choices: Vec<String>,
        state: PollState,
        timestamp: DateTime<Utc>,
    },

    /// The current poll moved to another phase
    PhaseChanged {
        poll_id: PollId,
        from: PollState,
        to: PollState,
        timestamp: DateTime<Utc>,
    },

    /// Voting ended and a provisional winner was picked
    WinnerPredicted {
        poll_id: PollId,
        /// 0-based choice index, `None` when no choice can fire
        choice: Option<usize>,
        label: Option<String>,
        tally: Vec<u64>,
        timestamp: DateTime<Utc>,
    },

    /// The results phase ended and the authoritative winner was resolved
    PollConcluded {
        poll_id: PollId,
        choice: Option<usize>,
        label: Option<String>,
        fired: bool,
        timestamp: DateTime<Utc>,
    },

    /// The poll is no longer current and should be hidden
    PollDeactivated {
        poll_id: PollId,
        reason: DeactivationReason,
        timestamp: DateTime<Utc>,
    },

    /// A deferred poll could not be built
    BuildFailed {
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl PollEvent {
    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PollEvent::PollActivated { timestamp, .. } => *timestamp,
            PollEvent::PhaseChanged { timestamp, .. } => *timestamp,
            PollEvent::WinnerPredicted { timestamp, .. } => *timestamp,
            PollEvent::PollConcluded { timestamp, .. } => *timestamp,
            PollEvent::PollDeactivated { timestamp, .. } => *timestamp,
            PollEvent::BuildFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            PollEvent::PollActivated { .. } => "poll_activated",
            PollEvent::PhaseChanged { .. } => "phase_changed",
            PollEvent::WinnerPredicted { .. } => "winner_predicted",
            PollEvent::PollConcluded { .. } => "poll_concluded",
            PollEvent::PollDeactivated { .. } => "poll_deactivated",
            PollEvent::BuildFailed { .. } => "build_failed",
        }
    }

    /// Get the poll ID if this event is poll-scoped
    pub fn poll_id(&self) -> Option<PollId> {
        match self {
            PollEvent::PollActivated { poll_id, .. } => Some(*poll_id),
            PollEvent::PhaseChanged { poll_id, .. } => Some(*poll_id),
            PollEvent::WinnerPredicted { poll_id, .. } => Some(*poll_id),
            PollEvent::PollConcluded { poll_id, .. } => Some(*poll_id),
            PollEvent::PollDeactivated { poll_id, .. } => Some(*poll_id),
            PollEvent::BuildFailed { .. } => None,
        }
    }
}

/// Why a poll stopped being current
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeactivationReason {
    /// The results phase ran out
    Concluded,
    /// A competing poll took over; the poll was re-queued
    Preempted,
}

impl std::fmt::Display for DeactivationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeactivationReason::Concluded => write!(f, "concluded"),
            DeactivationReason::Preempted => write!(f, "preempted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = PollEvent::PollDeactivated {
            poll_id: PollId::new(),
            reason: DeactivationReason::Preempted,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"poll_deactivated\""));
        assert!(json.contains("\"reason\":\"preempted\""));

        let parsed: PollEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_event_accessors() {
        let id = PollId::new();
        let event = PollEvent::PhaseChanged {
            poll_id: id,
            from: PollState::Voting,
            to: PollState::Results,
            timestamp: Utc::now(),
        };
        assert_eq!(event.poll_id(), Some(id));
        assert_eq!(event.event_type(), "phase_changed");

        let failed = PollEvent::BuildFailed {
            error: "bad colour".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(failed.poll_id(), None);
    }
}
