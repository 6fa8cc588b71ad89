//! A single selectable option within a poll

use std::collections::HashMap;

use super::vote::{Vote, VoterId};
use crate::weighting::VoteWeights;

/// Action fired when a choice wins
pub type OnChosen = Box<dyn FnOnce() + Send + 'static>;

/// A pollable option and its vote ledger
pub struct Choice {
    label: String,
    tooltip: Option<String>,
    on_chosen: Option<OnChosen>,
    votes: HashMap<VoterId, Vote>,
    total_weight: u64,
    total_label: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, on_chosen: Option<OnChosen>) -> Self {
        Self {
            label: label.into(),
            tooltip: None,
            on_chosen,
            votes: HashMap::new(),
            total_weight: 0,
            total_label: "0".to_string(),
        }
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    /// Whether winning this choice does anything
    pub fn has_callback(&self) -> bool {
        self.on_chosen.is_some()
    }

    pub fn votes(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    pub fn has_vote_from(&self, voter: &VoterId) -> bool {
        self.votes.contains_key(voter)
    }

    /// Total weight cached at the last ledger change
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Thousands-separated display string of the cached total
    pub fn total_label(&self) -> &str {
        &self.total_label
    }

    /// Total weight recomputed against the given weights
    pub fn weight_under(&self, weights: &VoteWeights) -> u64 {
        self.votes
            .values()
            .map(|vote| u64::from(vote.weight(weights)))
            .sum()
    }

    /// Record a vote, replacing any earlier vote by the same voter
    pub fn register_vote(&mut self, vote: Vote, weights: &VoteWeights) {
        self.votes.insert(vote.voter.clone(), vote);
        self.refresh_totals(weights);
    }

    /// Drop any vote by `voter`; unknown voters are ignored
    pub fn unregister_vote(&mut self, voter: &VoterId, weights: &VoteWeights) {
        if self.votes.remove(voter).is_some() {
            self.refresh_totals(weights);
        }
    }

    /// Empty the ledger
    pub fn clear_votes(&mut self) {
        self.votes.clear();
        self.total_weight = 0;
        self.total_label = "0".to_string();
    }

    /// Take the callback so it can only ever fire once
    pub(crate) fn take_callback(&mut self) -> Option<OnChosen> {
        self.on_chosen.take()
    }

    fn refresh_totals(&mut self, weights: &VoteWeights) {
        self.total_weight = self.weight_under(weights);
        self.total_label = format_thousands(self.total_weight);
    }
}

impl std::fmt::Debug for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Choice")
            .field("label", &self.label)
            .field("tooltip", &self.tooltip)
            .field("has_callback", &self.has_callback())
            .field("votes", &self.votes.len())
            .field("total_weight", &self.total_weight)
            .finish()
    }
}

/// Format an integer with `,` thousands separators
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weighting::{Badge, BadgeSet, WeightingPolicy};

    fn weights() -> VoteWeights {
        VoteWeights {
            subscriber: 2,
            vip: 3,
            founder: 4,
            moderator: 5,
            policy: WeightingPolicy::Additive,
        }
    }

    #[test]
    fn test_second_vote_replaces_first() {
        let w = weights();
        let mut choice = Choice::new("A", None);

        choice.register_vote(Vote::new(1, "Alice", BadgeSet::empty()), &w);
        choice.register_vote(
            Vote::new(1, "alice", BadgeSet::empty().with(Badge::Vip)),
            &w,
        );

        assert_eq!(choice.vote_count(), 1);
        assert_eq!(choice.total_weight(), 3);
    }

    #[test]
    fn test_register_then_unregister_restores_total() {
        let w = weights();
        let mut choice = Choice::new("A", None);
        choice.register_vote(Vote::new(1, "bob", BadgeSet::empty()), &w);
        let before = choice.total_weight();

        choice.register_vote(
            Vote::new(1, "carol", BadgeSet::empty().with(Badge::Moderator)),
            &w,
        );
        assert_eq!(choice.total_weight(), before + 5);

        choice.unregister_vote(&VoterId::new("CAROL"), &w);
        assert_eq!(choice.total_weight(), before);
        assert_eq!(choice.total_label(), "1");
    }

    #[test]
    fn test_unregister_unknown_voter_is_noop() {
        let w = weights();
        let mut choice = Choice::new("A", None);
        choice.register_vote(Vote::new(1, "bob", BadgeSet::empty()), &w);

        choice.unregister_vote(&VoterId::new("nobody"), &w);
        assert_eq!(choice.vote_count(), 1);
        assert_eq!(choice.total_weight(), 1);
    }

    #[test]
    fn test_callback_taken_once() {
        let mut choice = Choice::new("A", Some(Box::new(|| {})));
        assert!(choice.has_callback());
        assert!(choice.take_callback().is_some());
        assert!(choice.take_callback().is_none());
        assert!(!choice.has_callback());
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
    }
}
