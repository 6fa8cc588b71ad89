//! Thread-safe ingestion points
//!
//! A [`CoordinatorHandle`] is what producer threads (the chat listener, game
//! event hooks) hold. Every call is synchronous and never blocks: it pushes
//! onto an unbounded channel that the driver drains on its next tick.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::guard::LegacyPollGuard;
use crate::chat::ChatMessage;
use crate::poll::{DeferredBuild, PollId, Pollable, Vote, VoterId};

/// Result type alias for scheduling calls
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Why a poll or vote could not be handed to a coordinator
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("No game session is active")]
    NoActiveSession,

    #[error("The session's coordinator has shut down")]
    SessionClosed,
}

/// The poll producers may currently vote on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePoll {
    pub id: PollId,
    pub choice_count: usize,
}

/// A vote tagged with the poll it was cast for
#[derive(Debug, Clone)]
pub(crate) struct QueuedVote {
    pub poll_id: PollId,
    pub vote: Vote,
}

/// Cloneable producer side of a [`Coordinator`](super::Coordinator)
#[derive(Clone)]
pub struct CoordinatorHandle {
    polls: mpsc::UnboundedSender<Box<dyn Pollable>>,
    builders: mpsc::UnboundedSender<Box<dyn DeferredBuild>>,
    votes: mpsc::UnboundedSender<QueuedVote>,
    active: watch::Receiver<Option<ActivePoll>>,
    guard: Arc<dyn LegacyPollGuard>,
}

impl CoordinatorHandle {
    pub(crate) fn new(
        polls: mpsc::UnboundedSender<Box<dyn Pollable>>,
        builders: mpsc::UnboundedSender<Box<dyn DeferredBuild>>,
        votes: mpsc::UnboundedSender<QueuedVote>,
        active: watch::Receiver<Option<ActivePoll>>,
        guard: Arc<dyn LegacyPollGuard>,
    ) -> Self {
        Self {
            polls,
            builders,
            votes,
            active,
            guard,
        }
    }

    /// Queue a ready-made poll
    pub fn schedule(&self, poll: impl Pollable + 'static) -> ScheduleResult<()> {
        self.schedule_boxed(Box::new(poll))
    }

    pub fn schedule_boxed(&self, poll: Box<dyn Pollable>) -> ScheduleResult<()> {
        self.polls
            .send(poll)
            .map_err(|_| ScheduleError::SessionClosed)
    }

    /// Queue a poll to be built on the driver thread
    pub fn schedule_build(&self, builder: impl DeferredBuild + 'static) -> ScheduleResult<()> {
        self.builders
            .send(Box::new(builder))
            .map_err(|_| ScheduleError::SessionClosed)
    }

    /// The poll currently accepting votes, if any
    pub fn active_poll(&self) -> Option<ActivePoll> {
        // A dropped driver leaves its last value behind
        if self.active.has_changed().is_err() {
            return None;
        }
        *self.active.borrow()
    }

    pub fn is_poll_active(&self) -> bool {
        self.active_poll().is_some()
    }

    /// Queue a chat message as a vote.
    ///
    /// Returns `false` when the message was dropped: not a vote, no poll is
    /// active, a competing poll owns the screen, or the index is out of range.
    pub fn schedule_vote(&self, message: &ChatMessage) -> bool {
        let Some(choice) = message.vote_index() else {
            return false;
        };

        if self.guard.has_other_active_poll() {
            debug!(voter = %message.username, "Dropping vote while a legacy poll is active");
            return false;
        }

        let Some(active) = self.active_poll() else {
            debug!(voter = %message.username, "Dropping vote, no active poll");
            return false;
        };

        if choice > active.choice_count {
            debug!(
                poll_id = %active.id,
                choice,
                choices = active.choice_count,
                voter = %message.username,
                "Dropping out-of-range vote"
            );
            return false;
        }

        let vote = Vote::new(choice, VoterId::new(&message.username), message.badges);
        self.votes
            .send(QueuedVote {
                poll_id: active.id,
                vote,
            })
            .is_ok()
    }
}

impl std::fmt::Debug for CoordinatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorHandle")
            .field("active", &self.active_poll())
            .finish_non_exhaustive()
    }
}
