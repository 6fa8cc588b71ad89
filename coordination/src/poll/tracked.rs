//! Poll variant wired to an external vote-tracking subsystem
//!
//! Some hosts run their own vote bookkeeping (storyteller vote trackers and
//! the like). A [`TrackedPoll`] tells that subsystem when its voting starts
//! and when it has concluded, so the host never runs two competing votes.

use std::sync::Arc;

use rand::RngCore;
use tracing::debug;

use super::pollable::Pollable;
use super::standard::{Conclusion, Poll, PollId};
use crate::weighting::VoteWeights;

/// External vote bookkeeping notified by [`TrackedPoll`]
pub trait VoteTracker: Send + Sync {
    /// Voting opened for the poll
    fn vote_started(&self, poll_id: PollId, title: &str);

    /// The poll concluded and its outcome has been applied
    fn vote_ended(&self, poll_id: PollId);
}

/// A [`Poll`] that reports its lifecycle to a [`VoteTracker`]
pub struct TrackedPoll {
    inner: Poll,
    tracker: Arc<dyn VoteTracker>,
    signaled: bool,
}

impl TrackedPoll {
    pub fn new(inner: Poll, tracker: Arc<dyn VoteTracker>) -> Self {
        Self {
            inner,
            tracker,
            signaled: false,
        }
    }
}

impl Pollable for TrackedPoll {
    fn poll(&self) -> &Poll {
        &self.inner
    }

    fn poll_mut(&mut self) -> &mut Poll {
        &mut self.inner
    }

    fn on_voting_started(&mut self) {
        if self.signaled {
            return;
        }
        debug!(poll_id = %self.inner.id(), "Signalling vote tracker");
        self.tracker
            .vote_started(self.inner.id(), self.inner.title());
        self.signaled = true;
    }

    fn conclude(&mut self, weights: &VoteWeights, rng: &mut dyn RngCore) -> Conclusion {
        let outcome = self.inner.conclude(weights, rng);
        self.tracker.vote_ended(self.inner.id());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::choice::Choice;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTracker {
        calls: Mutex<Vec<String>>,
    }

    impl VoteTracker for RecordingTracker {
        fn vote_started(&self, _poll_id: PollId, title: &str) {
            self.calls.lock().unwrap().push(format!("start:{title}"));
        }

        fn vote_ended(&self, _poll_id: PollId) {
            self.calls.lock().unwrap().push("end".to_string());
        }
    }

    #[test]
    fn test_tracker_signalled_once_then_released() {
        let tracker = Arc::new(RecordingTracker::default());
        let poll = Poll::new("Storyteller", vec![Choice::new("a", Some(Box::new(|| {})))]);
        let mut tracked = TrackedPoll::new(poll, tracker.clone());

        tracked.on_voting_started();
        tracked.on_voting_started();

        let mut rng = StdRng::seed_from_u64(0);
        let outcome = tracked.conclude(&VoteWeights::default(), &mut rng);

        assert!(outcome.fired);
        assert_eq!(
            *tracker.calls.lock().unwrap(),
            vec!["start:Storyteller".to_string(), "end".to_string()]
        );
    }
}
