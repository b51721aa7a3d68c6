use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::record::Filter;

use super::record::MonitorRecord;
use super::traits::CriteriaMatchable;

/// Structural predicate over monitors; absent fields impose no constraint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayMonitorCriteria {
    /// Record kinds the monitor must publish
    pub kinds: Option<Vec<u32>>,

    /// Accepted operator identities
    pub operator: Option<Vec<String>>,

    /// Checks the monitor must perform
    pub checks: Option<Vec<String>>,
}

impl RelayMonitorCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = u32>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn operator<S: Into<String>>(mut self, operator: impl IntoIterator<Item = S>) -> Self {
        self.operator = Some(operator.into_iter().map(Into::into).collect());
        self
    }

    pub fn checks<S: Into<String>>(mut self, checks: impl IntoIterator<Item = S>) -> Self {
        self.checks = Some(checks.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_none() && self.operator.is_none() && self.checks.is_none()
    }

    /// Indexed tag filter selecting announcements that advertise these criteria
    pub fn discovery_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(kinds) = &self.kinds {
            filter = filter.tag("k", kinds.iter().map(u32::to_string));
        }
        if let Some(operator) = &self.operator {
            filter = filter.tag("o", operator.iter().cloned());
        }
        if let Some(checks) = &self.checks {
            filter = filter.tag("c", checks.iter().cloned());
        }
        filter
    }
}

/// Whether `record` satisfies every constraint present in `criteria`.
///
/// Kinds and checks are subset tests. Every listed operator must equal the
/// record's operator, so more than one distinct operator never matches.
pub fn meets<R: CriteriaMatchable + ?Sized>(record: &R, criteria: &RelayMonitorCriteria) -> bool {
    if let Some(kinds) = &criteria.kinds {
        let supported = record.supported_kinds();
        if !kinds.iter().all(|kind| supported.contains(kind)) {
            return false;
        }
    }

    if let Some(checks) = &criteria.checks {
        let performed = record.checks();
        if !checks.iter().all(|check| performed.contains(check)) {
            return false;
        }
    }

    if let Some(operators) = &criteria.operator {
        let operator = record.operator();
        if !operators.iter().all(|wanted| operator == Some(wanted.as_str())) {
            return false;
        }
    }

    true
}

pub fn filter_by_criteria(
    records: &[Arc<MonitorRecord>],
    criteria: &RelayMonitorCriteria,
) -> Vec<Arc<MonitorRecord>> {
    records.iter().filter(|record| meets::<MonitorRecord>(record, criteria)).cloned().collect()
}
