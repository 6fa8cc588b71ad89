//! Terminal-facing pieces: the chat echo and the event log

use std::sync::{Arc, Mutex};

use poll_coordination::events::{EventBusError, FilteredReceiver};
use poll_coordination::{ChatBroadcaster, PollEvent};
use tracing::{info, warn};

/// Chat broadcaster that prints to stdout and keeps what it sent
#[derive(Debug, Clone, Default)]
pub struct ConsoleChat {
    sent: Arc<Mutex<Vec<String>>>,
    quiet: bool,
}

impl ConsoleChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record messages without printing them
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ChatBroadcaster for ConsoleChat {
    fn send_message(&self, message: &str) {
        if !self.quiet {
            println!("[chat] {message}");
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }
}

/// One human-readable line per event
pub fn describe(event: &PollEvent) -> String {
    match event {
        PollEvent::PollActivated {
            title,
            choices,
            state,
            ..
        } => format!("poll {title:?} shown in {state} with {} choices", choices.len()),
        PollEvent::PhaseChanged { from, to, .. } => format!("{from} -> {to}"),
        PollEvent::WinnerPredicted { label, tally, .. } => match label {
            Some(label) => format!("voting closed, {label:?} leads with tally {tally:?}"),
            None => format!("voting closed, nothing can fire (tally {tally:?})"),
        },
        PollEvent::PollConcluded { label, fired, .. } => match label {
            Some(label) if *fired => format!("{label:?} won and fired"),
            Some(label) => format!("{label:?} won, nothing to fire"),
            None => "concluded without choices".to_string(),
        },
        PollEvent::PollDeactivated { reason, .. } => format!("poll hidden ({reason})"),
        PollEvent::BuildFailed { error, .. } => format!("build failed: {error}"),
    }
}

/// Log events until the bus goes away
pub async fn log_events(mut events: FilteredReceiver, json: bool) {
    loop {
        match events.recv().await {
            Ok(event) if json => match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("Could not serialise event: {}", e),
            },
            Ok(event) => {
                info!(event_type = event.event_type(), poll_id = ?event.poll_id(), "{}", describe(&event));
            }
            Err(EventBusError::Lagged(skipped)) => {
                warn!(skipped, "Event log fell behind");
            }
            Err(EventBusError::ChannelClosed) => break,
        }
    }
}
