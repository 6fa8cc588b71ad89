//! Integration tests for headless scenario playback

use std::sync::Arc;

use poll_coordination::{PollEvent, PollSettings};
use poll_sim::{run_headless, Script};

fn settings() -> Arc<PollSettings> {
    Arc::new(PollSettings {
        cover_duration: 0,
        poll_duration: 4,
        results_duration: 1,
        choices_in_chat: true,
        ..PollSettings::default()
    })
}

/// Test: a single poll resolves to the weighted majority
#[test]
fn test_weighted_majority_wins() {
    let script = Script::parse(
        r#"
        @0   poll "Next raid" Siege "Drop pods"
        @0.5 chat alice - #1
        @0.5 chat bob - #1
        @1   chat mod moderator/1 #2
        @1   chat sub subscriber/3 #2
        @1.5 chat bob - #2
        "#,
    )
    .unwrap();

    let report = run_headless(script, settings(), 20, Some(1));

    assert!(report.completed);
    assert_eq!(report.outcomes, vec!["Next raid: Drop pods"]);
    assert_eq!(report.chat, vec!["Next raid", "[1] Siege", "[2] Drop pods"]);

    let predicted = report.events.iter().find_map(|event| match event {
        PollEvent::WinnerPredicted { tally, .. } => Some(tally.clone()),
        _ => None,
    });
    assert_eq!(predicted, Some(vec![1, 3]));
}

/// Test: closing early ends voting and later votes are discarded
#[test]
fn test_close_then_queue_next_poll() {
    let script = Script::parse(
        "@0 poll First a b\n\
         @0.2 chat x - 2\n\
         @0.5 close\n\
         @0.6 chat y - 1\n\
         @0.7 chat z - 1\n\
         @0.8 poll Second c\n",
    )
    .unwrap();

    let report = run_headless(script, settings(), 10, Some(3));

    assert!(report.completed);
    assert_eq!(report.outcomes, vec!["First: b", "Second: c"]);

    let activations = report
        .events
        .iter()
        .filter(|event| matches!(event, PollEvent::PollActivated { .. }))
        .count();
    assert_eq!(activations, 2);
}

/// Test: a chat message before any poll exists goes nowhere
#[test]
fn test_votes_without_poll_are_dropped() {
    let script = Script::parse("@0 chat early - #1\n@1 poll Late only\n").unwrap();
    let report = run_headless(script, settings(), 10, None);

    assert!(report.completed);
    assert_eq!(report.outcomes, vec!["Late: only"]);
    let tally = report.events.iter().find_map(|event| match event {
        PollEvent::WinnerPredicted { tally, .. } => Some(tally.clone()),
        _ => None,
    });
    assert_eq!(tally, Some(vec![0]));
}
