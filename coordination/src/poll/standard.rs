//! The standard poll: choices, vote ledger, phase timers and winner selection

use std::panic::{catch_unwind, AssertUnwindSafe};

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use super::choice::Choice;
use super::state::{PhaseTimers, PollState};
use super::vote::Vote;
use crate::weighting::VoteWeights;

/// Unique identifier of a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollId(Uuid);

impl PollId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PollId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PollId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Area handed to a cover drawer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

/// Render callback for the cover phase
pub type CoverDrawer = Box<dyn Fn(Canvas) + Send + 'static>;

/// What happened when a poll concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conclusion {
    /// Index of the authoritative winner, if the poll had any choices
    pub winner: Option<usize>,
    /// Whether the winner's callback ran to completion
    pub fired: bool,
}

/// A poll and everything it owns
pub struct Poll {
    id: PollId,
    title: String,
    title_color: Option<String>,
    choices: Vec<Choice>,
    state: PollState,
    timers: PhaseTimers,
    cover_drawer: Option<CoverDrawer>,
    winner: Option<usize>,
    close_requested: bool,
}

impl Poll {
    /// A poll without a cover; it opens straight into voting
    pub fn new(title: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            id: PollId::new(),
            title: title.into(),
            title_color: None,
            choices,
            state: PollState::Voting,
            timers: PhaseTimers::default(),
            cover_drawer: None,
            winner: None,
            close_requested: false,
        }
    }

    pub fn with_title_color(mut self, color: impl Into<String>) -> Self {
        self.title_color = Some(color.into());
        self
    }

    /// Show a cover before voting opens
    pub fn with_cover_drawer(mut self, drawer: CoverDrawer) -> Self {
        self.cover_drawer = Some(drawer);
        self.state = PollState::Cover;
        self
    }

    pub fn id(&self) -> PollId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn title_color(&self) -> Option<&str> {
        self.title_color.as_deref()
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn timers(&self) -> &PhaseTimers {
        &self.timers
    }

    /// Index of the predicted winner, set when voting ends
    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    pub fn has_cover(&self) -> bool {
        self.cover_drawer.is_some()
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    /// Invoke the cover drawer, if any
    pub fn draw_cover(&self, canvas: Canvas) {
        if let Some(drawer) = &self.cover_drawer {
            drawer(canvas);
        }
    }

    /// Cached weight per choice, in choice order
    pub fn tally(&self) -> Vec<u64> {
        self.choices.iter().map(Choice::total_weight).collect()
    }

    /// Sum of the cached weights of every choice
    pub fn total_weight(&self) -> u64 {
        self.choices.iter().map(Choice::total_weight).sum()
    }

    /// Apply a vote, moving the voter off any other choice first.
    ///
    /// Returns `false` when the vote was ignored: index out of range or the
    /// poll is already showing results.
    pub fn process_vote(&mut self, vote: &Vote, weights: &VoteWeights) -> bool {
        if vote.choice == 0 || vote.choice > self.choices.len() || !self.state.accepts_votes() {
            debug!(
                poll_id = %self.id,
                choice = vote.choice,
                voter = %vote.voter,
                state = %self.state,
                "Ignoring vote"
            );
            return false;
        }

        for choice in self
            .choices
            .iter_mut()
            .filter(|c| c.has_vote_from(&vote.voter))
        {
            choice.unregister_vote(&vote.voter, weights);
        }

        self.choices[vote.choice - 1].register_vote(vote.clone(), weights);
        debug!(poll_id = %self.id, choice = vote.choice, voter = %vote.voter, "Vote recorded");
        true
    }

    /// Pick the predicted winner among choices that have a callback.
    ///
    /// Ties at the maximum weight are broken uniformly at random. Choices
    /// without a callback are never predicted.
    pub fn predict_winner(
        &mut self,
        weights: &VoteWeights,
        rng: &mut dyn RngCore,
    ) -> Option<usize> {
        let tied = max_weight_ties(&self.choices, weights, Choice::has_callback);
        self.winner = tied.choose(rng).copied();
        self.winner
    }

    /// Resolve the authoritative winner over all choices, fire its callback
    /// and clear every vote.
    pub fn conclude(&mut self, weights: &VoteWeights, rng: &mut dyn RngCore) -> Conclusion {
        let tied = max_weight_ties(&self.choices, weights, |_| true);
        let winner = tied.choose(rng).copied();

        let mut fired = false;
        if let Some(callback) = winner.and_then(|index| self.choices[index].take_callback()) {
            match catch_unwind(AssertUnwindSafe(callback)) {
                Ok(()) => fired = true,
                Err(panic) => {
                    error!(
                        poll_id = %self.id,
                        "Winning choice callback panicked: {}",
                        panic_message(panic.as_ref())
                    );
                }
            }
        }

        for choice in &mut self.choices {
            choice.clear_votes();
        }

        Conclusion { winner, fired }
    }

    pub(crate) fn set_state(&mut self, state: PollState) {
        self.state = state;
    }

    pub(crate) fn timers_mut(&mut self) -> &mut PhaseTimers {
        &mut self.timers
    }

    pub(crate) fn request_close(&mut self) {
        self.close_requested = true;
    }
}

impl std::fmt::Debug for Poll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poll")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("title_color", &self.title_color)
            .field("choices", &self.choices)
            .field("state", &self.state)
            .field("timers", &self.timers)
            .field("has_cover", &self.has_cover())
            .field("winner", &self.winner)
            .finish()
    }
}

/// Indices of eligible choices tied at the maximum weight
fn max_weight_ties(
    choices: &[Choice],
    weights: &VoteWeights,
    eligible: impl Fn(&Choice) -> bool,
) -> Vec<usize> {
    let scored: Vec<(usize, u64)> = choices
        .iter()
        .enumerate()
        .filter(|(_, choice)| eligible(*choice))
        .map(|(index, choice)| (index, choice.weight_under(weights)))
        .collect();

    let Some(max) = scored.iter().map(|(_, weight)| *weight).max() else {
        return Vec::new();
    };

    scored
        .into_iter()
        .filter(|(_, weight)| *weight == max)
        .map(|(index, _)| index)
        .collect()
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::vote::VoterId;
    use crate::weighting::{Badge, BadgeSet, WeightingPolicy};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter_choice(label: &str, hits: &Arc<AtomicUsize>) -> Choice {
        let hits = hits.clone();
        Choice::new(
            label,
            Some(Box::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            })),
        )
    }

    fn two_choice_poll() -> Poll {
        Poll::new(
            "Raid strategy",
            vec![Choice::new("A", Some(Box::new(|| {}))), Choice::new("B", Some(Box::new(|| {})))],
        )
    }

    fn plain(choice: usize, voter: &str) -> Vote {
        Vote::new(choice, voter, BadgeSet::empty())
    }

    #[test]
    fn test_last_vote_wins_across_choices() {
        let w = VoteWeights::default();
        let mut poll = two_choice_poll();

        assert!(poll.process_vote(&plain(1, "alice"), &w));
        assert!(poll.process_vote(&plain(2, "Alice"), &w));
        assert!(poll.process_vote(&plain(1, "ALICE"), &w));

        let alice = VoterId::new("alice");
        let holders = poll
            .choices()
            .iter()
            .filter(|c| c.has_vote_from(&alice))
            .count();
        assert_eq!(holders, 1);
        assert_eq!(poll.tally(), vec![1, 0]);
    }

    #[test]
    fn test_out_of_range_votes_ignored() {
        let w = VoteWeights::default();
        let mut poll = two_choice_poll();
        poll.process_vote(&plain(1, "bob"), &w);

        assert!(!poll.process_vote(&plain(0, "carol"), &w));
        assert!(!poll.process_vote(&plain(3, "carol"), &w));
        assert_eq!(poll.tally(), vec![1, 0]);
    }

    #[test]
    fn test_votes_rejected_during_results() {
        let w = VoteWeights::default();
        let mut poll = two_choice_poll();
        poll.set_state(PollState::Results);

        assert!(!poll.process_vote(&plain(1, "bob"), &w));
        assert_eq!(poll.total_weight(), 0);
    }

    #[test]
    fn test_prediction_skips_choices_without_callback() {
        let w = VoteWeights {
            moderator: 10,
            ..VoteWeights::default()
        };
        let mut poll = Poll::new(
            "Tie",
            vec![
                Choice::new("info", None),
                Choice::new("action", Some(Box::new(|| {}))),
            ],
        );
        let mods = BadgeSet::empty().with(Badge::Moderator);
        poll.process_vote(&Vote::new(1, "m1", mods), &w);
        poll.process_vote(&Vote::new(2, "m2", mods), &w);
        assert_eq!(poll.tally(), vec![10, 10]);

        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(poll.predict_winner(&w, &mut rng), Some(1));
        }
        assert_eq!(poll.winner(), Some(1));
    }

    #[test]
    fn test_prediction_without_callbacks_is_none() {
        let w = VoteWeights::default();
        let mut poll = Poll::new("Info", vec![Choice::new("a", None), Choice::new("b", None)]);
        poll.process_vote(&plain(1, "bob"), &w);

        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(poll.predict_winner(&w, &mut rng), None);
        assert_eq!(poll.winner(), None);
    }

    #[test]
    fn test_tie_break_reaches_every_tied_choice() {
        let w = VoteWeights::default();
        let mut poll = two_choice_poll();
        poll.process_vote(&plain(1, "a"), &w);
        poll.process_vote(&plain(2, "b"), &w);

        let mut seen = [false, false];
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            if let Some(index) = poll.predict_winner(&w, &mut rng) {
                seen[index] = true;
            }
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn test_conclude_fires_winner_once_and_clears_votes() {
        let w = VoteWeights::default();
        let a_hits = Arc::new(AtomicUsize::new(0));
        let b_hits = Arc::new(AtomicUsize::new(0));
        let mut poll = Poll::new(
            "Pick",
            vec![counter_choice("A", &a_hits), counter_choice("B", &b_hits)],
        );
        poll.process_vote(&plain(2, "alice"), &w);
        poll.process_vote(&plain(2, "bob"), &w);
        poll.process_vote(&plain(1, "carol"), &w);

        let mut rng = StdRng::seed_from_u64(1);
        let outcome = poll.conclude(&w, &mut rng);

        assert_eq!(outcome, Conclusion { winner: Some(1), fired: true });
        assert_eq!(a_hits.load(Ordering::SeqCst), 0);
        assert_eq!(b_hits.load(Ordering::SeqCst), 1);
        assert_eq!(poll.total_weight(), 0);
        assert!(poll.choices().iter().all(|c| c.vote_count() == 0));

        // B's callback is spent; a repeat conclusion can never run it again
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            if poll.conclude(&w, &mut rng).winner == Some(1) {
                assert!(!poll.choices()[1].has_callback());
            }
        }
        assert_eq!(b_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_conclude_considers_callbackless_choices() {
        let w = VoteWeights::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let mut poll = Poll::new(
            "Pick",
            vec![Choice::new("info", None), counter_choice("act", &hits)],
        );
        poll.process_vote(&plain(1, "a"), &w);
        poll.process_vote(&plain(1, "b"), &w);

        let mut rng = StdRng::seed_from_u64(3);
        let outcome = poll.conclude(&w, &mut rng);
        assert_eq!(outcome.winner, Some(0));
        assert!(!outcome.fired);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_conclude_survives_panicking_callback() {
        let w = VoteWeights::default();
        let mut poll = Poll::new("Boom", vec![Choice::new("x", Some(Box::new(|| panic!("boom"))))]);

        let mut rng = StdRng::seed_from_u64(0);
        let outcome = poll.conclude(&w, &mut rng);
        assert_eq!(outcome.winner, Some(0));
        assert!(!outcome.fired);
    }

    #[test]
    fn test_empty_poll_has_no_winner() {
        let w = VoteWeights {
            policy: WeightingPolicy::Additive,
            ..VoteWeights::default()
        };
        let mut poll = Poll::new("Empty", Vec::new());
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(poll.predict_winner(&w, &mut rng), None);
        assert_eq!(poll.conclude(&w, &mut rng), Conclusion { winner: None, fired: false });
    }

    #[test]
    fn test_cover_drawer_presence() {
        let drawn = Arc::new(AtomicUsize::new(0));
        let counter = drawn.clone();
        let poll = two_choice_poll().with_cover_drawer(Box::new(move |canvas| {
            assert_eq!(canvas.width, 320.0);
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(poll.has_cover());
        poll.draw_cover(Canvas {
            width: 320.0,
            height: 200.0,
        });
        assert_eq!(drawn.load(Ordering::SeqCst), 1);
        assert!(!two_choice_poll().has_cover());
    }
}
