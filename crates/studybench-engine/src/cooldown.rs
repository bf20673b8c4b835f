//! Countdown gating repeated submissions after a rate-limit rejection.

use std::sync::{Arc, Mutex};
use std::time::Duration;

struct CooldownInner {
    remaining_seconds: u64,
    generation: u64,
}

/// 1 Hz countdown armed from a server-reported cooldown.
///
/// Only one countdown is active per timer: re-arming bumps a generation
/// counter and the superseded tick task exits on its next wakeup without
/// touching the new countdown. Reaching zero self-clears; no manual stop is
/// required.
#[derive(Clone)]
pub struct CooldownTimer {
    inner: Arc<Mutex<CooldownInner>>,
}

impl CooldownTimer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CooldownInner {
                remaining_seconds: 0,
                generation: 0,
            })),
        }
    }

    /// Start (or restart) the countdown at `seconds`.
    pub fn arm(&self, seconds: u64) {
        let generation = {
            let mut inner = self.inner.lock().unwrap();
            inner.generation += 1;
            inner.remaining_seconds = seconds;
            inner.generation
        };
        if seconds == 0 {
            return;
        }
        tracing::debug!(seconds, "Cooldown armed");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                let mut guard = inner.lock().unwrap();
                if guard.generation != generation {
                    // Replaced by a newer arm(); the new task owns the count.
                    return;
                }
                guard.remaining_seconds = guard.remaining_seconds.saturating_sub(1);
                if guard.remaining_seconds == 0 {
                    tracing::debug!("Cooldown elapsed");
                    return;
                }
            }
        });
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.inner.lock().unwrap().remaining_seconds
    }

    /// True while submissions must be refused client-side.
    pub fn is_blocking(&self) -> bool {
        self.remaining_seconds() > 0
    }
}

impl Default for CooldownTimer {
    fn default() -> Self {
        Self::new()
    }
}
