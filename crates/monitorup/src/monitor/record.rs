use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

use crate::geo::Coords;
use crate::profile::Profile;
use crate::record::{Event, MONITOR_ANNOUNCEMENT};

/// Default multiplier applied to a monitor's publishing frequency
pub const DEFAULT_TOLERANCE: f64 = 1.2;

/// Whether a monitor has published recent-enough evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Liveness {
    #[default]
    Unknown,
    Active,
    Inactive,
}

impl Liveness {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Liveness::Unknown => None,
            Liveness::Active => Some(true),
            Liveness::Inactive => Some(false),
        }
    }
}

impl From<bool> for Liveness {
    fn from(active: bool) -> Self {
        if active { Liveness::Active } else { Liveness::Inactive }
    }
}

#[derive(Debug, Clone)]
struct MonitorState {
    tolerance: f64,
    active: Liveness,
    initialized: bool,
    profile: Option<Profile>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self { tolerance: DEFAULT_TOLERANCE, active: Liveness::Unknown, initialized: false, profile: None }
    }
}

/// A monitor's announcement record plus the runtime state tracked for it.
///
/// Every attribute is a view over the underlying tags. Runtime state sits
/// behind a lock so cached `Arc<MonitorRecord>` copies can be probed and
/// initialised in place.
#[derive(Debug)]
pub struct MonitorRecord {
    event: Event,
    coordinates: Option<Coords>,
    state: RwLock<MonitorState>,
}

impl Clone for MonitorRecord {
    fn clone(&self) -> Self {
        Self {
            event: self.event.clone(),
            coordinates: self.coordinates,
            state: RwLock::new(self.read_state().clone()),
        }
    }
}

impl MonitorRecord {
    /// Fresh announcement for `identity`, ready to be filled through setters
    pub fn new(identity: impl Into<String>) -> Self {
        Self::from_event(Event::new(identity, MONITOR_ANNOUNCEMENT))
    }

    pub fn from_event(event: Event) -> Self {
        Self { event, coordinates: None, state: RwLock::new(MonitorState::default()) }
    }

    pub fn with_coordinates(mut self, coordinates: Option<Coords>) -> Self {
        self.coordinates = coordinates;
        self
    }

    pub fn with_tolerance(self, tolerance: f64) -> Self {
        self.set_tolerance(tolerance);
        self
    }

    fn read_state(&self) -> RwLockReadGuard<'_, MonitorState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, MonitorState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn identity(&self) -> &str {
        &self.event.pubkey
    }

    pub fn kind(&self) -> u32 {
        self.event.kind
    }

    pub fn tags(&self) -> &[Vec<String>] {
        &self.event.tags
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn into_event(self) -> Event {
        self.event
    }

    /// Publishing interval in seconds; non-positive or garbled values read as absent
    pub fn frequency(&self) -> Option<u64> {
        self.event
            .tag_value("frequency")
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|seconds| *seconds > 0)
            .map(|seconds| seconds as u64)
    }

    pub fn operator(&self) -> Option<&str> {
        self.event.tag_value("o")
    }

    pub fn supported_kinds(&self) -> Vec<u32> {
        self.event.tag_values("k").into_iter().filter_map(|kind| kind.trim().parse().ok()).collect()
    }

    pub fn checks(&self) -> Vec<String> {
        self.event.tag_values("c").into_iter().map(str::to_owned).collect()
    }

    /// Check category to timeout in seconds
    pub fn timeouts(&self) -> HashMap<String, u64> {
        self.event
            .tags_named("timeout")
            .filter_map(|tag| {
                let category = tag.get(1)?;
                let seconds = tag.get(2)?.trim().parse().ok()?;
                Some((category.clone(), seconds))
            })
            .collect()
    }

    /// Most precise geohash the monitor announced
    pub fn geohash(&self) -> Option<&str> {
        self.event.tag_values("g").into_iter().fold(None, |best: Option<&str>, hash| match best {
            Some(current) if current.len() >= hash.len() => Some(current),
            _ => Some(hash),
        })
    }

    pub fn coordinates(&self) -> Option<Coords> {
        self.coordinates
    }

    pub fn tolerance(&self) -> f64 {
        self.read_state().tolerance
    }

    pub fn set_tolerance(&self, tolerance: f64) {
        self.write_state().tolerance = tolerance;
    }

    pub fn liveness(&self) -> Liveness {
        self.read_state().active
    }

    /// `None` until probed
    pub fn active(&self) -> Option<bool> {
        self.liveness().as_bool()
    }

    /// Record a probe outcome. Returns the liveness now in effect; a value
    /// that is already concrete wins over `active`.
    pub fn set_active(&self, active: bool) -> Liveness {
        let mut state = self.write_state();
        if state.active == Liveness::Unknown {
            state.active = active.into();
        }
        state.active
    }

    /// Forget the probe outcome so the next probe queries again
    pub fn clear_active(&self) {
        self.write_state().active = Liveness::Unknown;
    }

    pub fn is_initialized(&self) -> bool {
        self.read_state().initialized
    }

    pub fn profile(&self) -> Option<Profile> {
        self.read_state().profile.clone()
    }

    /// Attach the operator profile and mark the record initialised
    pub fn set_profile(&self, profile: Profile) {
        let mut state = self.write_state();
        state.profile = Some(profile);
        state.initialized = true;
    }

    /// Enough information to be probed and matched
    pub fn is_valid(&self) -> bool {
        self.frequency().is_some() && !self.checks().is_empty() && !self.supported_kinds().is_empty()
    }

    /// Log a warning when the announcement is incomplete; never rejects
    pub fn warn_if_invalid(&self) {
        if !self.is_valid() {
            warn!(
                monitor = %self.identity(),
                frequency = ?self.frequency(),
                checks = self.checks().len(),
                kinds = self.supported_kinds().len(),
                "Monitor announcement is incomplete"
            );
        }
    }

    /// Oldest timestamp that still counts as recent for this monitor
    pub fn online_tolerance(&self) -> Option<i64> {
        self.online_tolerance_at(chrono::Utc::now().timestamp())
    }

    pub fn online_tolerance_at(&self, now: i64) -> Option<i64> {
        let frequency = self.frequency()?;
        Some(now - (frequency as f64 * self.tolerance()).round() as i64)
    }

    pub fn set_frequency(&mut self, seconds: u64) {
        self.replace_tags("frequency", [seconds.to_string()]);
    }

    pub fn set_operator(&mut self, operator: impl Into<String>) {
        self.replace_tags("o", [operator.into()]);
    }

    pub fn set_kinds(&mut self, kinds: impl IntoIterator<Item = u32>) {
        self.replace_tags("k", kinds.into_iter().map(|kind| kind.to_string()));
    }

    pub fn set_checks<S: Into<String>>(&mut self, checks: impl IntoIterator<Item = S>) {
        self.replace_tags("c", checks.into_iter().map(Into::into));
    }

    pub fn set_timeouts(&mut self, timeouts: impl IntoIterator<Item = (String, u64)>) {
        self.event.remove_tag("timeout");
        for (category, seconds) in timeouts {
            self.event.push_tag(vec!["timeout".into(), category, seconds.to_string()]);
        }
    }

    /// One `[name, value]` tag per value, replacing existing ones
    fn replace_tags(&mut self, name: &str, values: impl IntoIterator<Item = String>) {
        self.event.remove_tag(name);
        for value in values {
            self.event.push_tag(vec![name.to_owned(), value]);
        }
    }
}
