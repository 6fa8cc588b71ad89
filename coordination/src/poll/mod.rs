//! Polls: choices, votes, the per-poll state machine and its builders

pub mod builder;
pub mod choice;
pub mod pollable;
pub mod standard;
pub mod state;
pub mod tracked;
pub mod view;
pub mod vote;

pub use builder::{BuildError, BuildResult, DeferredBuild, PollBuilder, PollSetupBuilder};
pub use choice::{format_thousands, Choice, OnChosen};
pub use pollable::Pollable;
pub use standard::{Canvas, Conclusion, CoverDrawer, Poll, PollId};
pub use state::{PhaseTimers, PollState};
pub use tracked::{TrackedPoll, VoteTracker};
pub use view::{ChoiceView, PollView};
pub use vote::{Vote, VoterId};
