//! Scripted chat/poll simulator
//!
//! Plays a scenario script against a [`poll_coordination::Coordinator`]: poll
//! requests and chat messages come from a producer thread while the frame loop
//! drives the coordinator, the same split a game host has.

pub mod console;
pub mod script;
pub mod sim;

pub use console::{describe, log_events, ConsoleChat};
pub use script::{Script, ScriptAction, ScriptError, ScriptResult, ScriptStep};
pub use sim::{dispatch, run_headless, scripted_poll, spawn_producer, Outcomes, SimReport};
