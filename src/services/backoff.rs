//! Per-installation continuation delay.
//!
//! Every continuation job waits at least the floor. Consecutive rate-limit
//! signals for one installation escalate the wait exponentially up to the cap;
//! the first successful page resets it.

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

use crate::domain::models::SyncConfig;

pub struct InstallationBackoff {
    floor: Duration,
    cap: Duration,
    escalations: Mutex<HashMap<i64, ExponentialBackoff>>,
}

impl InstallationBackoff {
    /// The cap is raised to the first escalation step when configured lower,
    /// so a rate-limited delay is always longer than a normal one.
    pub fn new(floor: Duration, cap: Duration) -> Self {
        Self {
            floor,
            cap: cap.max(first_step(floor)),
            escalations: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    pub fn floor(&self) -> Duration {
        self.floor
    }

    pub fn cap(&self) -> Duration {
        self.cap
    }

    /// Delay after a processed page. Clears any escalation.
    pub fn on_success(&self, installation_id: i64) -> Duration {
        let mut escalations = self.escalations.lock().unwrap_or_else(PoisonError::into_inner);
        if escalations.remove(&installation_id).is_some() {
            debug!(installation_id, "rate-limit escalation reset");
        }
        self.floor
    }

    /// Delay after a rate-limit signal: the next escalation step, raised to
    /// the source's retry hint when that is longer, bounded by the cap.
    pub fn on_rate_limit(&self, installation_id: i64, retry_hint: Option<Duration>) -> Duration {
        let mut escalations = self.escalations.lock().unwrap_or_else(PoisonError::into_inner);
        let escalated = escalations
            .entry(installation_id)
            .or_insert_with(|| self.policy())
            .next_backoff()
            .map_or(self.cap, whole_millis);

        let delay = retry_hint
            .map_or(escalated, |hint| escalated.max(hint))
            .min(self.cap)
            .max(self.floor);
        debug!(installation_id, delay_ms = millis(delay), "rate-limit delay");
        delay
    }

    /// Whether the installation is currently escalated.
    pub fn is_escalated(&self, installation_id: i64) -> bool {
        self.escalations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&installation_id)
    }

    fn policy(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(first_step(self.floor))
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(self.cap)
            .with_max_elapsed_time(None)
            .build()
    }
}

fn first_step(floor: Duration) -> Duration {
    (floor * 2).max(Duration::from_millis(1))
}

/// Whole milliseconds of `d`, saturating at `u64::MAX`.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// The backoff crate works in float nanoseconds; delays are scheduled in ms.
fn whole_millis(d: Duration) -> Duration {
    Duration::from_millis(millis(d))
}
