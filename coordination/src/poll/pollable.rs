//! Capability interface shared by every poll variant
//!
//! The coordinator only talks to `dyn Pollable`. A variant wraps a [`Poll`]
//! and overrides the hooks it cares about; the defaults delegate to the
//! wrapped poll.

use rand::RngCore;

use super::standard::{Conclusion, Poll};
use super::vote::Vote;
use crate::weighting::VoteWeights;

pub trait Pollable: Send {
    /// The underlying poll
    fn poll(&self) -> &Poll;

    fn poll_mut(&mut self) -> &mut Poll;

    /// Apply a chat vote; see [`Poll::process_vote`]
    fn process_vote(&mut self, vote: &Vote, weights: &VoteWeights) -> bool {
        self.poll_mut().process_vote(vote, weights)
    }

    /// Called each time the poll enters the voting phase
    fn on_voting_started(&mut self) {}

    /// Called when voting ends; see [`Poll::predict_winner`]
    fn predict_winner(&mut self, weights: &VoteWeights, rng: &mut dyn RngCore) -> Option<usize> {
        self.poll_mut().predict_winner(weights, rng)
    }

    /// Called when the results phase ends; see [`Poll::conclude`]
    fn conclude(&mut self, weights: &VoteWeights, rng: &mut dyn RngCore) -> Conclusion {
        self.poll_mut().conclude(weights, rng)
    }
}

impl Pollable for Poll {
    fn poll(&self) -> &Poll {
        self
    }

    fn poll_mut(&mut self) -> &mut Poll {
        self
    }
}
