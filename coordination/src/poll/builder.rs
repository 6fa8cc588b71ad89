//! Poll construction
//!
//! [`PollBuilder`] assembles a [`Poll`] immediately. [`PollSetupBuilder`]
//! only records what the poll should look like; the coordinator evaluates it
//! later on the driver thread through [`DeferredBuild`], inside a failure
//! boundary, so a malformed request just never materialises.

use std::sync::Arc;

use thiserror::Error;

use super::choice::{Choice, OnChosen};
use super::pollable::Pollable;
use super::standard::{Canvas, CoverDrawer, Poll};
use super::tracked::{TrackedPoll, VoteTracker};

/// Result type alias for poll construction
pub type BuildResult<T> = Result<T, BuildError>;

/// Reasons a deferred poll could not be built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Invalid title color {color:?}: expected #RRGGBB or #RRGGBBAA")]
    InvalidTitleColor { color: String },

    #[error("Poll construction panicked: {0}")]
    Panicked(String),

    #[error("Poll construction failed: {0}")]
    Failed(String),
}

/// A poll request evaluated on the driver thread
pub trait DeferredBuild: Send {
    fn build_poll(self: Box<Self>) -> BuildResult<Box<dyn Pollable>>;
}

impl<F> DeferredBuild for F
where
    F: FnOnce() -> BuildResult<Box<dyn Pollable>> + Send,
{
    fn build_poll(self: Box<Self>) -> BuildResult<Box<dyn Pollable>> {
        (*self)()
    }
}

/// Prefix a colour with `#` unless it already has one
fn normalize_color(color: &str) -> String {
    let color = color.trim();
    if color.starts_with('#') {
        color.to_string()
    } else {
        format!("#{color}")
    }
}

fn is_hex_color(color: &str) -> bool {
    let digits = color.strip_prefix('#').unwrap_or(color);
    matches!(digits.len(), 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Fluent builder producing a [`Poll`] right away
#[derive(Default)]
pub struct PollBuilder {
    title: String,
    title_color: Option<String>,
    cover_drawer: Option<CoverDrawer>,
    choices: Vec<Choice>,
}

impl PollBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_colored_title(mut self, title: impl Into<String>, color: &str) -> Self {
        self.title = title.into();
        self.title_color = Some(normalize_color(color));
        self
    }

    pub fn with_cover_drawer(mut self, drawer: impl Fn(Canvas) + Send + 'static) -> Self {
        self.cover_drawer = Some(Box::new(drawer));
        self
    }

    pub fn with_choice(
        mut self,
        label: impl Into<String>,
        on_chosen: impl FnOnce() + Send + 'static,
    ) -> Self {
        self.choices
            .push(Choice::new(label, Some(Box::new(on_chosen))));
        self
    }

    pub fn with_choice_and_tooltip(
        mut self,
        label: impl Into<String>,
        on_chosen: impl FnOnce() + Send + 'static,
        tooltip: impl Into<String>,
    ) -> Self {
        self.choices
            .push(Choice::new(label, Some(Box::new(on_chosen))).with_tooltip(tooltip));
        self
    }

    /// A choice that can collect votes but never fires anything
    pub fn with_info_choice(mut self, label: impl Into<String>) -> Self {
        self.choices.push(Choice::new(label, None));
        self
    }

    pub fn build(self) -> Poll {
        let mut poll = Poll::new(self.title, self.choices);
        if let Some(color) = self.title_color {
            poll = poll.with_title_color(color);
        }
        if let Some(drawer) = self.cover_drawer {
            poll = poll.with_cover_drawer(drawer);
        }
        poll
    }
}

struct ChoiceSpec {
    label: String,
    tooltip: Option<String>,
    on_chosen: Option<OnChosen>,
}

impl ChoiceSpec {
    fn build(self) -> Choice {
        let choice = Choice::new(self.label, self.on_chosen);
        match self.tooltip {
            Some(tooltip) => choice.with_tooltip(tooltip),
            None => choice,
        }
    }
}

/// Declarative poll description evaluated lazily by the coordinator
#[derive(Default)]
pub struct PollSetupBuilder {
    title: String,
    title_color: Option<String>,
    cover_drawer: Option<CoverDrawer>,
    choices: Vec<ChoiceSpec>,
    tracker: Option<Arc<dyn VoteTracker>>,
}

impl PollSetupBuilder {
    pub fn create() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Colour is checked when the poll is built, not here
    pub fn with_colored_title(mut self, title: impl Into<String>, color: impl Into<String>) -> Self {
        self.title = title.into();
        self.title_color = Some(color.into());
        self
    }

    pub fn with_cover_drawer(mut self, drawer: impl Fn(Canvas) + Send + 'static) -> Self {
        self.cover_drawer = Some(Box::new(drawer));
        self
    }

    pub fn with_choice(
        mut self,
        label: impl Into<String>,
        on_chosen: impl FnOnce() + Send + 'static,
    ) -> Self {
        self.choices.push(ChoiceSpec {
            label: label.into(),
            tooltip: None,
            on_chosen: Some(Box::new(on_chosen)),
        });
        self
    }

    pub fn with_choice_and_tooltip(
        mut self,
        label: impl Into<String>,
        on_chosen: impl FnOnce() + Send + 'static,
        tooltip: impl Into<String>,
    ) -> Self {
        self.choices.push(ChoiceSpec {
            label: label.into(),
            tooltip: Some(tooltip.into()),
            on_chosen: Some(Box::new(on_chosen)),
        });
        self
    }

    pub fn with_info_choice(mut self, label: impl Into<String>) -> Self {
        self.choices.push(ChoiceSpec {
            label: label.into(),
            tooltip: None,
            on_chosen: None,
        });
        self
    }

    /// Report the poll's lifecycle to an external vote tracker
    pub fn with_tracker(mut self, tracker: Arc<dyn VoteTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Assemble the poll, validating the title colour
    pub fn build(self) -> BuildResult<Box<dyn Pollable>> {
        let title_color = match self.title_color {
            Some(color) if !is_hex_color(&color) => {
                return Err(BuildError::InvalidTitleColor { color });
            }
            Some(color) => Some(normalize_color(&color)),
            None => None,
        };

        let choices = self.choices.into_iter().map(ChoiceSpec::build).collect();
        let mut poll = Poll::new(self.title, choices);
        if let Some(color) = title_color {
            poll = poll.with_title_color(color);
        }
        if let Some(drawer) = self.cover_drawer {
            poll = poll.with_cover_drawer(drawer);
        }

        let built: Box<dyn Pollable> = match self.tracker {
            Some(tracker) => Box::new(TrackedPoll::new(poll, tracker)),
            None => Box::new(poll),
        };
        Ok(built)
    }
}

impl DeferredBuild for PollSetupBuilder {
    fn build_poll(self: Box<Self>) -> BuildResult<Box<dyn Pollable>> {
        (*self).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::state::PollState;

    #[test]
    fn test_poll_builder_assembles_choices() {
        let poll = PollBuilder::new()
            .with_colored_title("Next raid", "ff0000")
            .with_choice("Siege", || {})
            .with_choice_and_tooltip("Drop pods", || {}, "From the sky")
            .with_info_choice("Just watching")
            .build();

        assert_eq!(poll.title(), "Next raid");
        assert_eq!(poll.title_color(), Some("#ff0000"));
        assert_eq!(poll.choices().len(), 3);
        assert_eq!(poll.choices()[1].tooltip(), Some("From the sky"));
        assert!(poll.choices()[1].has_callback());
        assert!(!poll.choices()[2].has_callback());
        assert!(!poll.has_cover());
        assert_eq!(poll.state(), PollState::Voting);
    }

    #[test]
    fn test_empty_builder_is_legal() {
        let poll = PollBuilder::new().build();
        assert!(poll.choices().is_empty());
        assert_eq!(poll.title(), "");
    }

    #[test]
    fn test_setup_builder_deferred() {
        let builder = PollSetupBuilder::create()
            .with_colored_title("Weather", "#00FF00")
            .with_cover_drawer(|_| {})
            .with_choice("Rain", || {})
            .with_choice("Sun", || {});

        let deferred: Box<dyn DeferredBuild> = Box::new(builder);
        let poll = deferred.build_poll().unwrap();

        assert_eq!(poll.poll().title_color(), Some("#00FF00"));
        assert!(poll.poll().has_cover());
        assert_eq!(poll.poll().state(), PollState::Cover);
        assert_eq!(poll.poll().choices().len(), 2);
    }

    #[test]
    fn test_setup_builder_rejects_bad_color() {
        let result = PollSetupBuilder::create()
            .with_colored_title("Oops", "not-a-color")
            .with_choice("x", || {})
            .build();

        assert_eq!(
            result.err(),
            Some(BuildError::InvalidTitleColor {
                color: "not-a-color".to_string()
            })
        );
    }

    #[test]
    fn test_closure_is_deferred_build() {
        let deferred: Box<dyn DeferredBuild> = Box::new(|| -> BuildResult<Box<dyn Pollable>> {
            Err(BuildError::Failed("no map loaded".to_string()))
        });
        assert!(matches!(deferred.build_poll(), Err(BuildError::Failed(_))));
    }

    #[test]
    fn test_hex_color_check() {
        assert!(is_hex_color("#a1b2c3"));
        assert!(is_hex_color("A1B2C3FF"));
        assert!(!is_hex_color("#abc"));
        assert!(!is_hex_color("#gggggg"));
    }
}
