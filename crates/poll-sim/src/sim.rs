//! Running a script against a coordinator
//!
//! [`spawn_producer`] plays producer steps on a chat thread in real time.
//! [`run_headless`] plays a whole script on a virtual clock in the calling
//! thread, which is what tests and `--headless` use.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use poll_coordination::events::{EventBusExt, EventFilter};
use poll_coordination::{
    ChatMessage, Coordinator, EventBus, GameSession, PollEvent, PollSettings, PollSetupBuilder,
    SessionGate, SettingsProvider,
};
use tracing::{debug, warn};

use crate::console::ConsoleChat;
use crate::script::{Script, ScriptAction, ScriptStep};

/// Winning choices, in the order their callbacks fired
#[derive(Debug, Clone, Default)]
pub struct Outcomes(Arc<Mutex<Vec<String>>>);

impl Outcomes {
    pub fn record(&self, outcome: String) {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(outcome);
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// A deferred poll whose choices record `"<title>: <label>"` when they win
pub fn scripted_poll(title: &str, choices: &[String], outcomes: &Outcomes) -> PollSetupBuilder {
    choices.iter().fold(
        PollSetupBuilder::create().with_title(title),
        |builder, label| {
            let outcomes = outcomes.clone();
            let outcome = format!("{title}: {label}");
            builder.with_choice(label.clone(), move || outcomes.record(outcome))
        },
    )
}

/// Hand a producer step to the session. Driver steps are ignored here.
pub fn dispatch(action: &ScriptAction, gate: &SessionGate, outcomes: &Outcomes) {
    match action {
        ScriptAction::Poll { title, choices } => {
            if let Err(e) = gate.schedule_build(scripted_poll(title, choices, outcomes)) {
                warn!(title = %title, "Could not schedule poll: {}", e);
            }
        }
        ScriptAction::Chat { user, badges, text } => {
            let message = ChatMessage::from_tags(user.as_str(), text.as_str(), badges);
            match gate.schedule_vote(&message) {
                Ok(queued) => debug!(user = %user, queued, "Chat message delivered"),
                Err(e) => warn!(user = %user, "Chat message dropped: {}", e),
            }
        }
        ScriptAction::Close => {}
    }
}

/// Play producer steps on their own thread, in real time from `start`
pub fn spawn_producer(
    steps: Vec<ScriptStep>,
    gate: SessionGate,
    outcomes: Outcomes,
    start: Instant,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for step in steps {
            let due = start + step.at;
            let now = Instant::now();
            if due > now {
                thread::sleep(due - now);
            }
            dispatch(&step.action, &gate, &outcomes);
        }
    })
}

/// What a headless run produced
#[derive(Debug, Clone, Default)]
pub struct SimReport {
    pub outcomes: Vec<String>,
    pub chat: Vec<String>,
    pub events: Vec<PollEvent>,
    pub frames: u64,
    /// Every step ran and the coordinator drained before the frame limit
    pub completed: bool,
}

/// Frames needed to play the whole script with room for every poll to finish
fn frame_budget(script: &Script, settings: &PollSettings, fps: u32) -> u64 {
    let per_poll = u64::from(settings.cover_duration)
        + u64::from(settings.poll_duration)
        + u64::from(settings.results_duration)
        + 1;
    let seconds = script.duration().as_secs() + 1 + per_poll * script.poll_count() as u64;
    seconds * u64::from(fps.max(1))
}

/// Virtual time at the start of frame `n`
fn frame_offset(n: u64, fps: u32) -> Duration {
    Duration::from_secs_f64(n as f64 / f64::from(fps.max(1)))
}

/// Play a script on a virtual clock
pub fn run_headless(
    script: Script,
    settings: Arc<dyn SettingsProvider>,
    fps: u32,
    seed: Option<u64>,
) -> SimReport {
    let fps = fps.max(1);
    let budget = frame_budget(&script, &settings.snapshot(), fps);

    let chat = Arc::new(ConsoleChat::quiet());
    let bus = EventBus::new().shared();
    let mut events = bus.subscribe_filtered(EventFilter::new());
    let outcomes = Outcomes::default();

    let mut coordinator = Coordinator::new(settings)
        .with_chat_broadcaster(chat.clone())
        .with_event_bus(bus);
    if let Some(seed) = seed {
        coordinator = coordinator.with_rng_seed(seed);
    }

    let gate = SessionGate::new();
    let mut session = GameSession::start(coordinator, &gate);
    let mut report = SimReport::default();

    let mut steps = script.steps().iter().peekable();
    let t0 = Instant::now();
    for n in 0..budget {
        let elapsed = frame_offset(n, fps);
        while let Some(step) = steps.next_if(|step| step.at <= elapsed) {
            match step.action {
                ScriptAction::Close => {
                    session.coordinator_mut().close_current_poll();
                }
                ref action => dispatch(action, &gate, &outcomes),
            }
        }

        session.coordinator_mut().tick_at(t0 + elapsed);
        report.frames = n + 1;
        while let Some(event) = events.try_recv() {
            report.events.push(event);
        }

        if steps.peek().is_none() && session.coordinator().is_idle() {
            report.completed = true;
            break;
        }
    }

    session.end(&gate);
    report.outcomes = outcomes.snapshot();
    report.chat = chat.sent();
    report
}
