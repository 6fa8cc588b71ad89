//! Poll phases and their countdown timers

use serde::{Deserialize, Serialize};

use crate::config::PollSettings;

/// Lifecycle phase of a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    /// Optional pre-voting phase showing custom content
    Cover,
    /// Choices are visible and votes are accepted
    Voting,
    /// Winner is shown; votes are no longer accepted. Terminal.
    Results,
}

impl PollState {
    /// Whether queued votes are drained into the poll in this phase
    pub fn accepts_votes(&self) -> bool {
        !matches!(self, Self::Results)
    }

    /// Configured length of this phase in seconds
    pub fn configured_duration(&self, settings: &PollSettings) -> u32 {
        match self {
            Self::Cover => settings.cover_duration,
            Self::Voting => settings.poll_duration,
            Self::Results => settings.results_duration,
        }
    }
}

impl std::fmt::Display for PollState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cover => write!(f, "cover"),
            Self::Voting => write!(f, "voting"),
            Self::Results => write!(f, "results"),
        }
    }
}

/// Seconds remaining in each phase.
///
/// A raw value may dip below zero by at most one tick before the driver
/// notices the expiry; [`PhaseTimers::remaining`] clamps it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseTimers {
    pub cover: f64,
    pub voting: f64,
    pub results: f64,
}

impl PhaseTimers {
    pub fn get(&self, state: PollState) -> f64 {
        match state {
            PollState::Cover => self.cover,
            PollState::Voting => self.voting,
            PollState::Results => self.results,
        }
    }

    pub fn set(&mut self, state: PollState, seconds: f64) {
        match state {
            PollState::Cover => self.cover = seconds,
            PollState::Voting => self.voting = seconds,
            PollState::Results => self.results = seconds,
        }
    }

    /// Count the timer for `state` down by `elapsed` seconds
    pub fn decay(&mut self, state: PollState, elapsed: f64) {
        let current = self.get(state);
        self.set(state, current - elapsed);
    }

    pub fn is_expired(&self, state: PollState) -> bool {
        self.get(state) <= 0.0
    }

    /// Observable seconds remaining, never negative
    pub fn remaining(&self, state: PollState) -> f64 {
        self.get(state).max(0.0)
    }
}
