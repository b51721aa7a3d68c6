//! Age windows over endpoint records.
//!
//! An endpoint is online while its monitor keeps reporting it within the
//! monitor's online tolerance. Once reports stop it is offline, and after
//! [`DEAD_AFTER_SECS`] without a report it is dead.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::monitor::MonitorRecord;
use crate::record::TimeRange;

/// Seconds without a report after which an endpoint counts as dead
pub const DEAD_AFTER_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayLiveness {
    #[default]
    Online,
    Offline,
    Dead,
    All,
}

impl RelayLiveness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Dead => "dead",
            Self::All => "all",
        }
    }

    /// Record age window for `monitor`, evaluated now
    pub fn window(self, monitor: &MonitorRecord) -> TimeRange {
        self.window_at(monitor, chrono::Utc::now().timestamp())
    }

    /// Record age window for `monitor` at `now`.
    ///
    /// With a frequency the online, offline and dead windows do not overlap.
    /// Without one there is no online cutoff: the online window is unbounded
    /// and the offline window covers everything that is not dead.
    pub fn window_at(self, monitor: &MonitorRecord, now: i64) -> TimeRange {
        let online_since = monitor.online_tolerance_at(now);
        let dead_before = online_since.map_or(now - DEAD_AFTER_SECS, |since| since.min(now - DEAD_AFTER_SECS));

        match self {
            Self::Online => TimeRange { since: online_since, until: None },
            Self::Offline => TimeRange { since: Some(dead_before), until: online_since.map(|since| since - 1) },
            Self::Dead => TimeRange { since: None, until: Some(dead_before - 1) },
            Self::All => TimeRange::default(),
        }
    }
}

impl fmt::Display for RelayLiveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
