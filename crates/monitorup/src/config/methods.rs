//! Configuration methods for MonitorUP.

use super::types::{ManagerConfig, ManagerConfigBuilder};
use crate::error::{MonitorError, Result};
use crate::geo::NearbyOptions;
use crate::monitor::RelayMonitorCriteria;
use crate::record::Filter;

impl ManagerConfig {
    /// Keep only active monitors when populating
    pub fn with_active_only(mut self, active_only: bool) -> Self {
        self.active_only = active_only;
        self
    }

    /// Set the frequency tolerance multiplier
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set default criteria
    pub fn with_criteria(mut self, criteria: RelayMonitorCriteria) -> Self {
        self.criteria = Some(criteria);
        self
    }

    /// Set the filter merged into per-monitor queries
    pub fn with_custom_filter(mut self, filter: Filter) -> Self {
        self.custom_filter = Some(filter);
        self
    }

    /// Set nearby search defaults
    pub fn with_nearby(mut self, nearby: NearbyOptions) -> Self {
        self.nearby = nearby;
        self
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(MonitorError::Config(format!(
                "tolerance must be a positive number, got {}",
                self.tolerance
            )));
        }
        if self.nearby.min_precision == 0 || self.nearby.max_precision == 0 {
            return Err(MonitorError::Config("nearby precision must be at least 1".into()));
        }
        Ok(())
    }
}

impl ManagerConfigBuilder {
    /// Build and validate the configuration
    pub fn build(self) -> Result<ManagerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    pub fn active_only(mut self, active_only: bool) -> Self {
        self.config.active_only = active_only;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    pub fn criteria(mut self, criteria: RelayMonitorCriteria) -> Self {
        self.config.criteria = Some(criteria);
        self
    }

    pub fn custom_filter(mut self, filter: Filter) -> Self {
        self.config.custom_filter = Some(filter);
        self
    }

    /// Longest geohash prefix tried by nearby searches
    pub fn max_precision(mut self, precision: usize) -> Self {
        self.config.nearby.max_precision = precision;
        self
    }

    /// Shortest geohash prefix nearby searches fall back to
    pub fn min_precision(mut self, precision: usize) -> Self {
        self.config.nearby.min_precision = precision;
        self
    }

    pub fn min_results(mut self, min_results: usize) -> Self {
        self.config.nearby.min_results = min_results;
        self
    }

    pub fn recurse(mut self, recurse: bool) -> Self {
        self.config.nearby.recurse = recurse;
        self
    }
}
