//! Yielding to polls run by another subsystem

use std::sync::atomic::{AtomicBool, Ordering};

/// Reports whether a competing poll system currently owns the screen
pub trait LegacyPollGuard: Send + Sync {
    fn has_other_active_poll(&self) -> bool;
}

/// Guard for hosts with no competing poll system
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLegacyPolls;

impl LegacyPollGuard for NoLegacyPolls {
    fn has_other_active_poll(&self) -> bool {
        false
    }
}

impl LegacyPollGuard for AtomicBool {
    fn has_other_active_poll(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}
