//! Poll lifecycle coordinator
//!
//! Producers on any thread hand polls, deferred builders and chat votes to a
//! [`CoordinatorHandle`]. Exactly one driver owns the [`Coordinator`] and calls
//! [`Coordinator::tick`] once per frame; every mutation of the pending queue,
//! the current poll and its vote ledger happens inside that call.
//!
//! ```text
//!  chat thread ──schedule_vote──┐
//!  game hooks ──schedule_build──┼──▶ mpsc ──▶ tick() ──▶ current poll ──▶ EventBus
//!  anyone     ──schedule────────┘                │
//!                                   watch ◀──────┘ (active poll id, choice count)
//! ```

mod guard;
mod handle;

pub use guard::{LegacyPollGuard, NoLegacyPolls};
pub use handle::{ActivePoll, CoordinatorHandle, ScheduleError, ScheduleResult};

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use self::handle::QueuedVote;
use crate::chat::{ChatBroadcaster, NoChat};
use crate::config::{PollSettings, SettingsProvider};
use crate::events::{DeactivationReason, EventBus, PollEvent, SharedEventBus};
use crate::poll::standard::panic_message;
use crate::poll::{BuildError, DeferredBuild, PollState, PollView, Pollable};
use crate::weighting::VoteWeights;

/// Single-threaded owner of the poll lifecycle
pub struct Coordinator {
    settings: Arc<dyn SettingsProvider>,
    guard: Arc<dyn LegacyPollGuard>,
    chat: Arc<dyn ChatBroadcaster>,
    events: SharedEventBus,
    rng: StdRng,

    polls_tx: mpsc::UnboundedSender<Box<dyn Pollable>>,
    polls_rx: mpsc::UnboundedReceiver<Box<dyn Pollable>>,
    builders_tx: mpsc::UnboundedSender<Box<dyn DeferredBuild>>,
    builders_rx: mpsc::UnboundedReceiver<Box<dyn DeferredBuild>>,
    votes_tx: mpsc::UnboundedSender<QueuedVote>,
    votes_rx: mpsc::UnboundedReceiver<QueuedVote>,
    active_tx: watch::Sender<Option<ActivePoll>>,

    pending: VecDeque<Box<dyn Pollable>>,
    current: Option<Box<dyn Pollable>>,
    /// Time of the previous tick
    marker: Option<Instant>,
}

impl Coordinator {
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        let (polls_tx, polls_rx) = mpsc::unbounded_channel();
        let (builders_tx, builders_rx) = mpsc::unbounded_channel();
        let (votes_tx, votes_rx) = mpsc::unbounded_channel();
        let (active_tx, _) = watch::channel(None);

        Self {
            settings,
            guard: Arc::new(NoLegacyPolls),
            chat: Arc::new(NoChat),
            events: EventBus::new().shared(),
            rng: StdRng::from_entropy(),
            polls_tx,
            polls_rx,
            builders_tx,
            builders_rx,
            votes_tx,
            votes_rx,
            active_tx,
            pending: VecDeque::new(),
            current: None,
            marker: None,
        }
    }

    /// Yield to another poll system while it reports an active poll.
    ///
    /// Handles created before this call keep the previous guard.
    pub fn with_legacy_guard(mut self, guard: Arc<dyn LegacyPollGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_chat_broadcaster(mut self, chat: Arc<dyn ChatBroadcaster>) -> Self {
        self.chat = chat;
        self
    }

    pub fn with_event_bus(mut self, events: SharedEventBus) -> Self {
        self.events = events;
        self
    }

    /// Make tie-breaks reproducible
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// A new producer handle
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle::new(
            self.polls_tx.clone(),
            self.builders_tx.clone(),
            self.votes_tx.clone(),
            self.active_tx.subscribe(),
            self.guard.clone(),
        )
    }

    pub fn event_bus(&self) -> &SharedEventBus {
        &self.events
    }

    pub fn current_poll(&self) -> Option<&dyn Pollable> {
        self.current.as_deref()
    }

    /// Display snapshot of the current poll
    pub fn current_view(&self) -> Option<PollView> {
        let settings = self.settings.snapshot();
        self.current
            .as_ref()
            .map(|current| PollView::of(current.poll(), &settings))
    }

    /// Polls waiting to be shown, not counting unbuilt or undrained ones
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// No poll is current and nothing is waiting in the pending queue
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    /// End voting on the current poll early.
    ///
    /// During the cover phase voting will open with no time left. Returns
    /// `false` when there is no poll or it is already showing results.
    pub fn close_current_poll(&mut self) -> bool {
        let Some(current) = self.current.as_mut() else {
            return false;
        };
        let poll = current.poll_mut();
        match poll.state() {
            PollState::Cover => poll.request_close(),
            PollState::Voting => {
                poll.request_close();
                poll.timers_mut().set(PollState::Voting, 0.0);
            }
            PollState::Results => return false,
        }
        info!(poll_id = %poll.id(), state = %poll.state(), "Poll closed early");
        true
    }

    /// Advance one frame using the wall clock
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Advance one frame as if the clock read `now`
    pub fn tick_at(&mut self, now: Instant) {
        let mut elapsed = self
            .marker
            .map(|marker| now.saturating_duration_since(marker).as_secs_f64())
            .unwrap_or(0.0);
        self.marker = Some(now);

        let settings = self.settings.snapshot();
        self.drain_scheduled();

        if self.guard.has_other_active_poll() {
            self.yield_to_legacy();
            return;
        }

        if self.current.is_none() && self.promote_next(&settings) {
            // The clock starts at promotion
            elapsed = 0.0;
        }

        if self.current.is_some() {
            self.advance(elapsed, &settings);
        }
    }

    fn drain_scheduled(&mut self) {
        while let Ok(poll) = self.polls_rx.try_recv() {
            debug!(poll_id = %poll.poll().id(), "Poll scheduled");
            self.pending.push_back(poll);
        }

        while let Ok(builder) = self.builders_rx.try_recv() {
            let built = catch_unwind(AssertUnwindSafe(move || builder.build_poll()))
                .unwrap_or_else(|panic| Err(BuildError::Panicked(panic_message(panic.as_ref()))));

            match built {
                Ok(poll) => {
                    debug!(poll_id = %poll.poll().id(), "Deferred poll built");
                    self.pending.push_back(poll);
                }
                Err(e) => {
                    error!("Could not build a poll from the provided builder: {}", e);
                    self.events.publish(PollEvent::BuildFailed {
                        error: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }
    }

    /// Hide the current poll and put it back at the head of the queue.
    ///
    /// The poll keeps its phase, predicted winner and votes; only the timer
    /// of that phase restarts when it is shown again.
    fn yield_to_legacy(&mut self) {
        let Some(mut current) = self.current.take() else {
            return;
        };

        let poll_id = current.poll().id();
        warn!(poll_id = %poll_id, "Another poll is active, re-queueing current poll");

        self.pending.push_front(current);
        self.active_tx.send_replace(None);
        self.discard_votes();
        self.events.publish(PollEvent::PollDeactivated {
            poll_id,
            reason: DeactivationReason::Preempted,
            timestamp: Utc::now(),
        });
    }

    /// Make the next pending poll current. Returns whether one was promoted.
    fn promote_next(&mut self, settings: &PollSettings) -> bool {
        let Some(mut next) = self.pending.pop_front() else {
            return false;
        };

        // A re-queued poll resumes in the phase it left, with that phase's
        // timer restarted
        match next.poll().state() {
            PollState::Cover => next
                .poll_mut()
                .timers_mut()
                .set(PollState::Cover, f64::from(settings.cover_duration)),
            PollState::Voting => Self::enter_voting(next.as_mut(), settings),
            PollState::Results => next
                .poll_mut()
                .timers_mut()
                .set(PollState::Results, f64::from(settings.results_duration)),
        }

        let poll = next.poll();
        info!(
            poll_id = %poll.id(),
            title = %poll.title(),
            choices = poll.choices().len(),
            state = %poll.state(),
            "Poll activated"
        );

        self.active_tx.send_replace(Some(ActivePoll {
            id: poll.id(),
            choice_count: poll.choices().len(),
        }));
        self.events.publish(PollEvent::PollActivated {
            poll_id: poll.id(),
            title: poll.title().to_string(),
            choices: poll.choices().iter().map(|c| c.label().to_string()).collect(),
            state: poll.state(),
            timestamp: Utc::now(),
        });

        if settings.choices_in_chat && next.poll().state().accepts_votes() {
            self.announce_choices(next.as_ref());
        }

        self.current = Some(next);
        true
    }

    fn announce_choices(&self, current: &dyn Pollable) {
        if !self.chat.is_connected() {
            debug!("Chat is not connected, skipping choice announcement");
            return;
        }

        let poll = current.poll();
        self.chat.send_message(poll.title());
        for (index, choice) in poll.choices().iter().enumerate() {
            self.chat
                .send_message(&format!("[{}] {}", index + 1, choice.label()));
        }
    }

    fn enter_voting(current: &mut dyn Pollable, settings: &PollSettings) {
        let poll = current.poll_mut();
        let seconds = if poll.close_requested() {
            0.0
        } else {
            f64::from(settings.poll_duration)
        };
        poll.set_state(PollState::Voting);
        poll.timers_mut().set(PollState::Voting, seconds);
        current.on_voting_started();
    }

    /// Run the current poll's state machine for one frame
    fn advance(&mut self, elapsed: f64, settings: &PollSettings) {
        let weights = settings.vote_weights();
        let Some(current) = self.current.as_mut() else {
            return;
        };

        let state = current.poll().state();
        current.poll_mut().timers_mut().decay(state, elapsed);

        match state {
            PollState::Cover => {
                self.drain_votes(&weights);
                if self.current_expired(state) {
                    self.transition_to_voting(settings);
                }
            }
            PollState::Voting => {
                self.drain_votes(&weights);
                if self.current_expired(state) {
                    self.transition_to_results(&weights, settings);
                }
            }
            PollState::Results => {
                if self.current_expired(state) {
                    self.finish_current(&weights);
                }
            }
        }
    }

    fn current_expired(&self, state: PollState) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| current.poll().timers().is_expired(state))
    }

    fn drain_votes(&mut self, weights: &VoteWeights) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        let poll_id = current.poll().id();

        while let Ok(queued) = self.votes_rx.try_recv() {
            if queued.poll_id != poll_id {
                debug!(
                    poll_id = %queued.poll_id,
                    voter = %queued.vote.voter,
                    "Dropping vote for a poll that is no longer current"
                );
                continue;
            }
            current.process_vote(&queued.vote, weights);
        }
    }

    fn discard_votes(&mut self) {
        let mut dropped = 0usize;
        while self.votes_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "Discarded queued votes");
        }
    }

    fn transition_to_voting(&mut self, settings: &PollSettings) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        Self::enter_voting(current.as_mut(), settings);

        let poll_id = current.poll().id();
        info!(poll_id = %poll_id, "Voting opened");
        self.events.publish(PollEvent::PhaseChanged {
            poll_id,
            from: PollState::Cover,
            to: PollState::Voting,
            timestamp: Utc::now(),
        });
    }

    fn transition_to_results(&mut self, weights: &VoteWeights, settings: &PollSettings) {
        let Some(current) = self.current.as_mut() else {
            return;
        };

        let winner = current.predict_winner(weights, &mut self.rng);
        let poll = current.poll_mut();
        poll.set_state(PollState::Results);
        poll.timers_mut()
            .set(PollState::Results, f64::from(settings.results_duration));

        let poll = current.poll();
        let label = winner.map(|index| poll.choices()[index].label().to_string());
        info!(
            poll_id = %poll.id(),
            winner = ?label,
            total_weight = poll.total_weight(),
            "Voting closed"
        );

        self.events.publish(PollEvent::PhaseChanged {
            poll_id: poll.id(),
            from: PollState::Voting,
            to: PollState::Results,
            timestamp: Utc::now(),
        });
        self.events.publish(PollEvent::WinnerPredicted {
            poll_id: poll.id(),
            choice: winner,
            label,
            tally: poll.tally(),
            timestamp: Utc::now(),
        });
    }

    fn finish_current(&mut self, weights: &VoteWeights) {
        let Some(mut current) = self.current.take() else {
            return;
        };
        self.active_tx.send_replace(None);

        let outcome = current.conclude(weights, &mut self.rng);
        let poll = current.poll();
        let label = outcome
            .winner
            .map(|index| poll.choices()[index].label().to_string());
        info!(
            poll_id = %poll.id(),
            winner = ?label,
            fired = outcome.fired,
            "Poll concluded"
        );

        self.discard_votes();
        self.events.publish(PollEvent::PollConcluded {
            poll_id: poll.id(),
            choice: outcome.winner,
            label,
            fired: outcome.fired,
            timestamp: Utc::now(),
        });
        self.events.publish(PollEvent::PollDeactivated {
            poll_id: poll.id(),
            reason: DeactivationReason::Concluded,
            timestamp: Utc::now(),
        });
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("current", &self.current.as_ref().map(|c| c.poll().id()))
            .field("pending", &self.pending.len())
            .field("marker", &self.marker)
            .finish_non_exhaustive()
    }
}
