//! Chat Poll Coordination Library
//!
//! Lets a live-chat audience vote on in-game outcomes. This library provides:
//! - Polls with cover, voting and results phases and badge-weighted votes
//! - A frame-driven coordinator that serialises poll requests and chat votes
//!   arriving from other threads into a single poll-at-a-time lifecycle
//! - Lifecycle events over a broadcast bus for display surfaces and logging
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use poll_coordination::{ChatMessage, Coordinator, GameSession, PollSetupBuilder,
//!     SessionGate, SharedSettings};
//!
//! let settings = SharedSettings::new(PollSettings::load("polls.toml")?);
//! let gate = SessionGate::new();
//! let mut session = GameSession::start(Coordinator::new(Arc::new(settings)), &gate);
//!
//! // From any thread
//! gate.schedule_build(
//!     PollSetupBuilder::create()
//!         .with_title("Next raid")
//!         .with_choice("Siege", || start_siege())
//!         .with_choice("Drop pods", || start_drop_pods()),
//! )?;
//! gate.schedule_vote(&ChatMessage::from_tags("alice", "#2", ["subscriber/3"]))?;
//!
//! // Once per frame on the game thread
//! session.tick();
//! ```

pub mod chat;
pub mod config;
pub mod coordinator;
pub mod events;
pub mod poll;
pub mod session;
pub mod weighting;

// Re-export chat types
pub use chat::{parse_vote_index, ChatBroadcaster, ChatMessage, NoChat};

// Re-export settings types
pub use config::{PollSettings, SettingsError, SettingsProvider, SettingsResult, SharedSettings};

// Re-export coordinator types
pub use coordinator::{
    ActivePoll, Coordinator, CoordinatorHandle, LegacyPollGuard, NoLegacyPolls, ScheduleError,
    ScheduleResult,
};

// Re-export event types
pub use events::{
    DeactivationReason, EventBus, EventBusExt, EventFilter, PollEvent, SharedEventBus,
};

// Re-export poll types
pub use poll::{
    BuildError, BuildResult, Choice, DeferredBuild, Poll, PollBuilder, PollId, PollSetupBuilder,
    PollState, PollView, Pollable, TrackedPoll, Vote, VoteTracker, VoterId,
};

// Re-export session types
pub use session::{GameSession, SessionGate};

// Re-export weighting types
pub use weighting::{Badge, BadgeSet, VoteWeights, WeightingPolicy};
