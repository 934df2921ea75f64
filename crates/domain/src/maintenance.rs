//! Maintenance guard — a short window, opened by a sentinel MQTT message,
//! during which bus-originated state mutations are suppressed.
//!
//! wbrules and similar rule engines republish retained state on their own
//! startup; without this guard those republished messages would be taken
//! as fresh commands and re-executed against real devices moments after a
//! restart.

use crate::time::Timestamp;

/// Default sentinel topic that arms the guard.
pub const DEFAULT_SENTINEL_TOPIC: &str = "/devices/wbrules/meta/online";

/// Default window, in seconds, bus mutations are suppressed for once armed.
pub const DEFAULT_WINDOW_SECS: i64 = 10;

/// Tracks whether the guard is currently armed.
#[derive(Debug, Clone)]
pub struct MaintenanceGuard {
    sentinel_topic: String,
    window_secs: i64,
    armed_until: Option<Timestamp>,
}

impl MaintenanceGuard {
    #[must_use]
    pub fn new(sentinel_topic: impl Into<String>, window_secs: i64) -> Self {
        Self {
            sentinel_topic: sentinel_topic.into(),
            window_secs,
            armed_until: None,
        }
    }

    /// The topic this guard watches for to arm itself.
    #[must_use]
    pub fn sentinel_topic(&self) -> &str {
        &self.sentinel_topic
    }

    /// Topics the guard needs subscribed on its behalf.
    #[must_use]
    pub fn subscription_topics(&self) -> Vec<&str> {
        vec![&self.sentinel_topic]
    }

    /// Notify the guard that a message arrived on `topic` at `now`. Returns
    /// `true` if this armed (or re-armed) the guard.
    pub fn maintenance_started(&mut self, topic: &str, now: Timestamp) -> bool {
        if topic != self.sentinel_topic {
            return false;
        }
        self.armed_until = Some(now + chrono::Duration::seconds(self.window_secs));
        true
    }

    /// Whether the guard is currently suppressing bus-origin mutations.
    #[must_use]
    pub fn is_armed(&self, now: Timestamp) -> bool {
        self.armed_until.is_some_and(|until| now < until)
    }
}

impl Default for MaintenanceGuard {
    fn default() -> Self {
        Self::new(DEFAULT_SENTINEL_TOPIC, DEFAULT_WINDOW_SECS)
    }
}
