// Periodic save gate driven by the host's event loop

use crate::store::TaskStore;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default interval between safety-net saves
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Tracks when the store was last saved on a timer
///
/// The host calls [`Autosave::tick`] whenever it regains control; a save
/// happens once at least `interval` has passed since the previous one.
/// Saves are full overwrites, so a tick landing right after a mutation's own
/// save only repeats the same write.
#[derive(Debug, Clone)]
pub struct Autosave {
    interval: Duration,
    last_save: Instant,
}

impl Autosave {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    pub fn starting_at(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last_save: start,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_save) >= self.interval
    }

    /// Save `store` if the interval has elapsed; returns whether a save was attempted
    pub fn tick(&mut self, store: &mut TaskStore) -> bool {
        self.tick_at(store, Instant::now())
    }

    pub fn tick_at(&mut self, store: &mut TaskStore, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }

        match store.save() {
            Ok(()) => debug!("Autosaved tasks"),
            Err(e) => warn!(error = %e, "Autosave failed"),
        }
        self.last_save = now;
        true
    }
}

impl Default for Autosave {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_INTERVAL)
    }
}
