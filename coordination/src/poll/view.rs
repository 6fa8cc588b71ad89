//! Render-agnostic snapshot of a poll for a presentation layer

use serde::{Deserialize, Serialize};

use super::standard::{Poll, PollId};
use super::state::PollState;
use crate::config::PollSettings;

/// One row of the poll display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceView {
    /// 1-based number viewers type in chat
    pub number: usize,
    pub label: String,
    pub tooltip: Option<String>,
    pub total_weight: u64,
    /// Thousands-separated total, e.g. `1,204`
    pub total_label: String,
    /// Fraction of all weighted votes, 0.0 when nobody voted
    pub share: f64,
    /// Whether this row is the predicted winner
    pub is_winner: bool,
}

/// Everything a display surface needs to draw the current poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollView {
    pub poll_id: PollId,
    pub title: String,
    pub title_color: Option<String>,
    pub state: PollState,
    /// Seconds left in the current phase, never negative
    pub remaining: f64,
    /// `remaining` over the configured phase length, in `[0, 1]`
    pub progress: f64,
    pub choices: Vec<ChoiceView>,
}

impl PollView {
    pub fn of(poll: &Poll, settings: &PollSettings) -> Self {
        let state = poll.state();
        let remaining = poll.timers().remaining(state);
        let duration = f64::from(state.configured_duration(settings));
        let progress = if duration > 0.0 {
            (remaining / duration).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let all_votes = poll.total_weight();
        let winner = match state {
            PollState::Results => poll.winner(),
            _ => None,
        };

        let choices = poll
            .choices()
            .iter()
            .enumerate()
            .map(|(index, choice)| ChoiceView {
                number: index + 1,
                label: choice.label().to_string(),
                tooltip: choice.tooltip().map(str::to_string),
                total_weight: choice.total_weight(),
                total_label: choice.total_label().to_string(),
                share: if all_votes == 0 {
                    0.0
                } else {
                    choice.total_weight() as f64 / all_votes as f64
                },
                is_winner: winner == Some(index),
            })
            .collect();

        Self {
            poll_id: poll.id(),
            title: poll.title().to_string(),
            title_color: poll.title_color().map(str::to_string),
            state,
            remaining,
            progress,
            choices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::builder::PollBuilder;
    use crate::poll::vote::Vote;
    use crate::weighting::{BadgeSet, VoteWeights};

    #[test]
    fn test_view_shares_and_progress() {
        let settings = PollSettings {
            poll_duration: 10,
            ..PollSettings::default()
        };
        let w = VoteWeights::default();
        let mut poll = PollBuilder::new()
            .with_title("Pick")
            .with_choice("A", || {})
            .with_choice("B", || {})
            .build();
        poll.set_state(PollState::Voting);
        poll.timers_mut().set(PollState::Voting, 2.5);
        poll.process_vote(&Vote::new(1, "a", BadgeSet::empty()), &w);
        poll.process_vote(&Vote::new(1, "b", BadgeSet::empty()), &w);
        poll.process_vote(&Vote::new(2, "c", BadgeSet::empty()), &w);
        poll.process_vote(&Vote::new(1, "d", BadgeSet::empty()), &w);

        let view = PollView::of(&poll, &settings);
        assert_eq!(view.state, PollState::Voting);
        assert!((view.progress - 0.25).abs() < 1e-9);
        assert_eq!(view.choices[0].number, 1);
        assert_eq!(view.choices[0].total_weight, 3);
        assert!((view.choices[0].share - 0.75).abs() < 1e-9);
        assert!((view.choices[1].share - 0.25).abs() < 1e-9);
        assert!(view.choices.iter().all(|c| !c.is_winner));
    }

    #[test]
    fn test_view_of_fresh_poll_has_zero_shares() {
        let poll = PollBuilder::new().with_choice("A", || {}).build();
        let view = PollView::of(&poll, &PollSettings::default());
        assert_eq!(view.choices[0].share, 0.0);
        assert_eq!(view.choices[0].total_label, "0");
    }
}
