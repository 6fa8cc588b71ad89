//! Session-scoped ownership of the coordinator
//!
//! A [`GameSession`] owns the [`Coordinator`] for the lifetime of one loaded
//! game. Producers that outlive sessions (the chat listener, mod hooks) hold
//! a [`SessionGate`] instead of a handle, so scheduling between sessions is an
//! explicit [`ScheduleError::NoActiveSession`] rather than a silent no-op.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::chat::ChatMessage;
use crate::coordinator::{Coordinator, CoordinatorHandle, ScheduleError, ScheduleResult};
use crate::poll::{DeferredBuild, Pollable};

/// One loaded game and its coordinator
#[derive(Debug)]
pub struct GameSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    coordinator: Coordinator,
}

impl GameSession {
    /// Start a session and open the gate to its coordinator
    pub fn start(coordinator: Coordinator, gate: &SessionGate) -> Self {
        let id = Uuid::new_v4();
        gate.attach(coordinator.handle());
        info!(session_id = %id, "Game session started");
        Self {
            id,
            started_at: Utc::now(),
            coordinator,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut Coordinator {
        &mut self.coordinator
    }

    /// Drive the coordinator for one frame
    pub fn tick(&mut self) {
        self.coordinator.tick();
    }

    /// Close the gate and tear the session down. Pending polls are dropped.
    pub fn end(self, gate: &SessionGate) {
        gate.detach();
        info!(
            session_id = %self.id,
            pending = self.coordinator.pending_count(),
            "Game session ended"
        );
    }
}

/// Long-lived entry point for producers across sessions
#[derive(Debug, Clone, Default)]
pub struct SessionGate {
    inner: Arc<RwLock<Option<CoordinatorHandle>>>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, handle: CoordinatorHandle) {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(handle);
    }

    pub fn detach(&self) {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    pub fn is_attached(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Handle to the active session's coordinator
    pub fn handle(&self) -> ScheduleResult<CoordinatorHandle> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(ScheduleError::NoActiveSession)
    }

    pub fn schedule(&self, poll: impl Pollable + 'static) -> ScheduleResult<()> {
        self.handle()?.schedule(poll)
    }

    pub fn schedule_boxed(&self, poll: Box<dyn Pollable>) -> ScheduleResult<()> {
        self.handle()?.schedule_boxed(poll)
    }

    pub fn schedule_build(&self, builder: impl DeferredBuild + 'static) -> ScheduleResult<()> {
        self.handle()?.schedule_build(builder)
    }

    /// Queue a chat vote; `Ok(false)` when the message was not a usable vote
    pub fn schedule_vote(&self, message: &ChatMessage) -> ScheduleResult<bool> {
        let handle = self.handle()?;
        let queued = handle.schedule_vote(message);
        if !queued {
            debug!(voter = %message.username, "Chat message not queued as a vote");
        }
        Ok(queued)
    }
}
