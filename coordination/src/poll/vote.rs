//! Votes and voter identities

use serde::{Deserialize, Serialize};

use crate::weighting::{BadgeSet, VoteWeights};

/// Canonical (lower-cased) chat handle of a voter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoterId(String);

impl VoterId {
    pub fn new(handle: impl AsRef<str>) -> Self {
        Self(handle.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VoterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VoterId {
    fn from(handle: &str) -> Self {
        Self::new(handle)
    }
}

/// A single chat vote for a 1-based choice index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    /// 1-based choice index
    pub choice: usize,
    pub voter: VoterId,
    pub badges: BadgeSet,
}

impl Vote {
    pub fn new(choice: usize, voter: impl Into<VoterId>, badges: BadgeSet) -> Self {
        Self {
            choice,
            voter: voter.into(),
            badges,
        }
    }

    /// Weight of this vote under the given configuration
    pub fn weight(&self, weights: &VoteWeights) -> u32 {
        weights.weight(self.badges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weighting::Badge;

    #[test]
    fn test_voter_id_is_case_insensitive() {
        assert_eq!(VoterId::new("Alice"), VoterId::new("alice"));
        assert_eq!(VoterId::new(" BOB "), VoterId::from("bob"));
        assert_eq!(VoterId::new("Alice").as_str(), "alice");
    }

    #[test]
    fn test_vote_weight_uses_badges() {
        let weights = VoteWeights {
            vip: 4,
            ..VoteWeights::default()
        };
        let vote = Vote::new(1, "carol", BadgeSet::empty().with(Badge::Vip));
        assert_eq!(vote.weight(&weights), 4);
        assert_eq!(Vote::new(1, "dave", BadgeSet::empty()).weight(&weights), 1);
    }
}
