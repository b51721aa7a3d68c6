//! Liveness probing of monitors.
//!
//! A monitor is active when it published at least one endpoint record
//! within its online tolerance window. The outcome is remembered on the
//! record and never recomputed until cleared.

use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use crate::error::Result;
use crate::monitor::{MonitorRecord, Probeable};
use crate::record::{Filter, RELAY_DISCOVERY, RELAY_META};
use crate::transport::Transport;

/// Endpoint record kinds that count as evidence of liveness, in query order
const EVIDENCE_KINDS: [u32; 2] = [RELAY_DISCOVERY, RELAY_META];

#[derive(Clone)]
pub struct ActiveProbe {
    transport: Arc<dyn Transport>,
}

impl ActiveProbe {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Query issued to decide whether `record` is active
    pub fn probe_filter<P: Probeable + ?Sized>(record: &P) -> Filter {
        let supported = record.supported_kinds();
        let kinds = EVIDENCE_KINDS.into_iter().filter(|kind| supported.contains(kind));

        let mut filter = Filter::new().kinds(kinds).authors([record.identity()]).limit(1);
        filter.since = record.online_tolerance();
        filter
    }

    /// Liveness of `record`, querying the transport only when still unknown.
    ///
    /// A transport failure is returned and leaves the liveness unknown.
    pub async fn is_active<P: Probeable + Sync + ?Sized>(&self, record: &P) -> Result<bool> {
        if let Some(active) = record.liveness().as_bool() {
            return Ok(active);
        }

        let filter = Self::probe_filter(record);
        let events = self.transport.fetch_events(&filter).await?;
        let active = record.set_active(!events.is_empty());

        debug!(monitor = %record.identity(), ?active, "Probed monitor liveness");
        Ok(active.as_bool().unwrap_or(false))
    }

    /// Probe every record concurrently and keep the active ones, in input
    /// order. A failed probe counts as inactive.
    pub async fn filter_active(&self, records: Vec<Arc<MonitorRecord>>) -> Vec<Arc<MonitorRecord>> {
        let probes = records.iter().map(|record| self.is_active(&**record));
        let outcomes = join_all(probes).await;

        records
            .into_iter()
            .zip(outcomes)
            .filter_map(|(record, outcome)| match outcome {
                Ok(true) => Some(record),
                Ok(false) => None,
                Err(error) => {
                    debug!(monitor = %record.identity(), %error, "Liveness probe failed");
                    None
                }
            })
            .collect()
    }
}
