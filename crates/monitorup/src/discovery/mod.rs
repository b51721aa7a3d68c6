//! Monitor discovery.
//!
//! Queries the transport for monitor announcements, turns them into
//! [`MonitorRecord`]s and optionally keeps only the active ones.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::join_all;
use tracing::{debug, info};

use crate::error::Result;
use crate::geo::{self, CandidateFilter, Geospatial, NearbyOptions};
use crate::monitor::{DEFAULT_TOLERANCE, MonitorRecord, RelayMonitorCriteria};
use crate::probe::ActiveProbe;
use crate::record::{Event, Filter, MONITOR_ANNOUNCEMENT};
use crate::transport::Transport;

type ProbedRecords = Arc<Mutex<HashMap<String, Arc<MonitorRecord>>>>;

/// Finds monitors through an injected transport
#[derive(Clone)]
pub struct DiscoveryFetcher {
    transport: Arc<dyn Transport>,
    geo: Arc<dyn Geospatial>,
    probe: ActiveProbe,
    tolerance: f64,
}

impl DiscoveryFetcher {
    pub fn new(transport: Arc<dyn Transport>, geo: Arc<dyn Geospatial>) -> Self {
        Self {
            probe: ActiveProbe::new(transport.clone()),
            transport,
            geo,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Tolerance given to every record this fetcher builds
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn probe(&self) -> &ActiveProbe {
        &self.probe
    }

    fn announcement_filter(filter: Filter) -> Filter {
        filter.merge(Filter::new().kinds([MONITOR_ANNOUNCEMENT]))
    }

    /// Announcements matching `filter`, as records.
    ///
    /// `None` when nothing was found, or nothing active remained with
    /// `active_only`.
    pub async fn fetch_candidates(
        &self,
        filter: Filter,
        active_only: bool,
    ) -> Result<Option<Vec<Arc<MonitorRecord>>>> {
        let events = self.transport.fetch_events(&Self::announcement_filter(filter)).await?;
        if events.is_empty() {
            debug!("No monitor announcements found");
            return Ok(None);
        }

        let mut records = build_records(self.geo.as_ref(), self.tolerance, events).await;
        if active_only {
            records = self.probe.filter_active(records).await;
        }

        info!(count = records.len(), active_only, "Discovered monitors");
        Ok((!records.is_empty()).then_some(records))
    }

    /// Active monitors advertising `criteria` through their indexed tags
    pub async fn fetch_candidates_by(
        &self,
        criteria: &RelayMonitorCriteria,
        filter: Filter,
    ) -> Result<Option<Vec<Arc<MonitorRecord>>>> {
        self.fetch_candidates(filter.merge(criteria.discovery_filter()), true).await
    }

    pub async fn fetch_active_candidates(&self, filter: Filter) -> Result<Option<Vec<Arc<MonitorRecord>>>> {
        self.fetch_candidates(filter, true).await
    }

    /// Monitors announced around `geohash`.
    ///
    /// With `active_only` every candidate batch is probed during the search,
    /// so the sufficiency check only counts active monitors and the returned
    /// records keep their probed liveness.
    pub async fn fetch_nearby_candidates(
        &self,
        geohash: &str,
        options: NearbyOptions,
        active_only: bool,
        filter: Filter,
    ) -> Result<Option<Vec<Arc<MonitorRecord>>>> {
        let probed: ProbedRecords = Arc::default();
        let candidate_filter = active_only.then(|| self.active_candidate_filter(probed.clone()));

        let filter = Self::announcement_filter(filter);
        let Some(events) =
            geo::nearby_search(self.geo.as_ref(), geohash, filter, options, candidate_filter).await?
        else {
            return Ok(None);
        };

        let remembered = std::mem::take(&mut *probed.lock().unwrap_or_else(PoisonError::into_inner));
        let mut records = Vec::with_capacity(events.len());
        let mut fresh = Vec::new();
        for event in events {
            match remembered.get(&event.pubkey) {
                Some(record) => records.push(record.clone()),
                None => fresh.push(event),
            }
        }
        records.extend(build_records(self.geo.as_ref(), self.tolerance, fresh).await);

        if active_only {
            records.retain(|record| record.active() == Some(true));
        }

        info!(geohash, count = records.len(), active_only, "Discovered nearby monitors");
        Ok((!records.is_empty()).then_some(records))
    }

    /// Batch filter that probes each candidate and remembers the probed records
    fn active_candidate_filter(&self, probed: ProbedRecords) -> CandidateFilter {
        let geo = self.geo.clone();
        let probe = self.probe.clone();
        let tolerance = self.tolerance;

        Arc::new(move |events: Vec<Event>| {
            let geo = geo.clone();
            let probe = probe.clone();
            let probed = probed.clone();
            async move {
                let records = build_records(geo.as_ref(), tolerance, events.clone()).await;
                let active = probe.filter_active(records).await;

                let identities: HashSet<String> =
                    active.iter().map(|record| record.identity().to_owned()).collect();
                probed
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend(active.into_iter().map(|record| (record.identity().to_owned(), record)));

                let kept: Vec<Event> =
                    events.into_iter().filter(|event| identities.contains(&event.pubkey)).collect();
                kept
            }
            .boxed()
        })
    }
}

/// Turn announcements into records, decoding announced geohashes.
///
/// A geohash that fails to decode leaves the record without coordinates.
pub(crate) async fn build_records(
    geo: &dyn Geospatial,
    tolerance: f64,
    events: Vec<Event>,
) -> Vec<Arc<MonitorRecord>> {
    let builds = events.into_iter().map(|event| async move {
        let record = MonitorRecord::from_event(event).with_tolerance(tolerance);
        record.warn_if_invalid();

        let coordinates = match record.geohash() {
            Some(geohash) => match geo.decode(geohash).await {
                Ok(coords) => Some(coords),
                Err(error) => {
                    debug!(monitor = %record.identity(), geohash, %error, "Could not decode monitor geohash");
                    None
                }
            },
            None => None,
        };

        Arc::new(record.with_coordinates(coordinates))
    });

    join_all(builds).await
}
