//! Configuration types for MonitorUP.
//!
//! This module defines the configuration data structures for the monitor
//! manager and the process embedding it.

use logger::LogSettings;
use serde::{Deserialize, Serialize};

use crate::geo::NearbyOptions;
use crate::monitor::{DEFAULT_TOLERANCE, RelayMonitorCriteria};
use crate::record::Filter;

/// Options of a [`MonitorManager`](crate::MonitorManager)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Keep only monitors that pass the liveness probe when populating
    pub active_only: bool,

    /// Multiplier applied to each monitor's publishing frequency
    pub tolerance: f64,

    /// Criteria used when a call does not supply its own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<RelayMonitorCriteria>,

    /// Extra constraints merged into every per-monitor query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_filter: Option<Filter>,

    /// Defaults for nearby searches
    pub nearby: NearbyOptions,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            active_only: true,
            tolerance: DEFAULT_TOLERANCE,
            criteria: None,
            custom_filter: None,
            nearby: NearbyOptions::default(),
        }
    }
}

impl ManagerConfig {
    /// Create a new configuration builder
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::default()
    }
}

/// Builder for ManagerConfig
#[derive(Default)]
pub struct ManagerConfigBuilder {
    pub(crate) config: ManagerConfig,
}

/// File-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub manager: ManagerConfig,
    pub logging: LogSettings,
}
