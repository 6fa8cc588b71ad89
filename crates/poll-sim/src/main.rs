//! poll-sim: play a chat/poll scenario against the poll coordinator
//!
//! # Usage
//!
//! ```bash
//! # Real time, 30 frames per second
//! poll-sim --script scenarios/raid.poll
//!
//! # Custom settings, reproducible tie-breaks, events as JSON lines
//! POLLS_POLL_DURATION=10 poll-sim --config polls.toml --script raid.poll --seed 7 --json
//!
//! # Virtual clock, as fast as possible
//! poll-sim --script raid.poll --headless
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use poll_coordination::events::{EventBusExt, EventFilter};
use poll_coordination::{
    Coordinator, EventBus, GameSession, PollSettings, SessionGate, SharedSettings,
};
use poll_sim::{
    describe, log_events, run_headless, spawn_producer, ConsoleChat, Outcomes, Script,
};
use tracing::{info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario script to play
    #[arg(long)]
    script: PathBuf,

    /// Settings TOML (POLLS_* environment variables still override it)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames per second of the driver loop
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Seed for tie-breaks
    #[arg(long)]
    seed: Option<u64>,

    /// Run on a virtual clock instead of waiting in real time
    #[arg(long, default_value_t = false)]
    headless: bool,

    /// Print events as JSON lines on stdout
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn load_settings(args: &Args) -> Result<PollSettings> {
    match &args.config {
        Some(path) => PollSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display())),
        None => PollSettings::from_env().context("reading POLLS_* environment"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = load_settings(&args)?;
    let script = Script::load(&args.script)
        .with_context(|| format!("loading script {}", args.script.display()))?;
    info!(
        steps = script.steps().len(),
        polls = script.poll_count(),
        poll_duration = settings.poll_duration,
        "Scenario loaded"
    );

    let outcomes = if args.headless {
        let report = run_headless(script, Arc::new(settings), args.fps, args.seed);
        for event in &report.events {
            if args.json {
                println!("{}", serde_json::to_string(event)?);
            } else {
                info!(event_type = event.event_type(), "{}", describe(event));
            }
        }
        for line in &report.chat {
            println!("[chat] {line}");
        }
        if !report.completed {
            warn!(frames = report.frames, "Scenario did not finish within its frame budget");
        }
        report.outcomes
    } else {
        run_realtime(script, settings, &args).await?
    };

    for outcome in &outcomes {
        println!("[outcome] {outcome}");
    }
    info!(outcomes = outcomes.len(), "Scenario finished");
    Ok(())
}

async fn run_realtime(script: Script, settings: PollSettings, args: &Args) -> Result<Vec<String>> {
    let bus = EventBus::new().shared();
    let logger = tokio::spawn(log_events(
        bus.subscribe_filtered(EventFilter::new()),
        args.json,
    ));

    let mut coordinator = Coordinator::new(Arc::new(SharedSettings::new(settings)))
        .with_chat_broadcaster(Arc::new(ConsoleChat::new()))
        .with_event_bus(bus);
    if let Some(seed) = args.seed {
        coordinator = coordinator.with_rng_seed(seed);
    }

    let gate = SessionGate::new();
    let mut session = GameSession::start(coordinator, &gate);
    let outcomes = Outcomes::default();

    let (producer_steps, driver_steps) = script.split();
    let start = Instant::now();
    let producer = spawn_producer(producer_steps, gate.clone(), outcomes.clone(), start);
    let mut closes = driver_steps.into_iter().peekable();

    let frame = Duration::from_secs_f64(1.0 / f64::from(args.fps.max(1)));
    let mut frames = tokio::time::interval(frame);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = frames.tick() => {}
            _ = &mut ctrl_c => {
                warn!("Interrupted, ending session");
                break;
            }
        }

        let now = Instant::now();
        // Sampled before the tick so anything it sent is drained below
        let producer_done = producer.is_finished();

        while closes.next_if(|step| start + step.at <= now).is_some() {
            session.coordinator_mut().close_current_poll();
        }
        session.coordinator_mut().tick_at(now);

        if producer_done && closes.peek().is_none() && session.coordinator().is_idle() {
            break;
        }
    }

    // Dropping the coordinator closes the bus, which ends the logger
    session.end(&gate);
    logger.await.context("event logger task")?;

    if !producer.is_finished() {
        warn!("Chat producer still has steps left, abandoning it");
    } else if producer.join().is_err() {
        warn!("Chat producer thread panicked");
    }
    Ok(outcomes.snapshot())
}
