//! Fan-out of one endpoint query to many monitors.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MonitorError, Result};
use crate::geo::{Geospatial, NearbyOptions};
use crate::monitor::{MonitorRecord, RelayMonitorCriteria};
use crate::record::{Event, Filter};
use crate::relay::{RelayFetcher, RelayListSet};
use crate::transport::Transport;

/// Which endpoint query each monitor answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregateStrategy {
    OnlineList,
    OnlineMeta,
    OnlineListNearby,
}

impl AggregateStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateStrategy::OnlineList => "onlineList",
            AggregateStrategy::OnlineMeta => "onlineMeta",
            AggregateStrategy::OnlineListNearby => "onlineListNearby",
        }
    }
}

impl fmt::Display for AggregateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateStrategy {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "onlineList" => Ok(AggregateStrategy::OnlineList),
            "onlineMeta" => Ok(AggregateStrategy::OnlineMeta),
            "onlineListNearby" => Ok(AggregateStrategy::OnlineListNearby),
            other => Err(MonitorError::UnknownStrategy(other.to_owned())),
        }
    }
}

/// Location for [`AggregateStrategy::OnlineListNearby`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearbyQuery {
    pub geohash: String,
    pub options: NearbyOptions,
}

impl NearbyQuery {
    pub fn new(geohash: impl Into<String>) -> Self {
        Self { geohash: geohash.into(), options: NearbyOptions::default() }
    }

    pub fn with_options(mut self, options: NearbyOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    /// Overrides the manager's configured criteria when selecting monitors
    pub criteria: Option<RelayMonitorCriteria>,

    /// Passed through to every per-monitor query
    pub custom_filter: Option<Filter>,

    pub nearby: Option<NearbyQuery>,
}

impl AggregateOptions {
    pub fn criteria(mut self, criteria: RelayMonitorCriteria) -> Self {
        self.criteria = Some(criteria);
        self
    }

    pub fn custom_filter(mut self, filter: Filter) -> Self {
        self.custom_filter = Some(filter);
        self
    }

    pub fn nearby(mut self, nearby: NearbyQuery) -> Self {
        self.nearby = Some(nearby);
        self
    }
}

/// One monitor's answer
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateData {
    Relays(RelayListSet),
    Meta(Vec<Event>),
}

impl AggregateData {
    pub fn len(&self) -> usize {
        match self {
            AggregateData::Relays(relays) => relays.len(),
            AggregateData::Meta(events) => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_relays(&self) -> Option<&RelayListSet> {
        match self {
            AggregateData::Relays(relays) => Some(relays),
            AggregateData::Meta(_) => None,
        }
    }

    pub fn as_meta(&self) -> Option<&[Event]> {
        match self {
            AggregateData::Meta(events) => Some(events),
            AggregateData::Relays(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AggregateEntry {
    pub monitor: Arc<MonitorRecord>,
    pub data: AggregateData,
}

/// Runs one endpoint query per monitor and collects what succeeded
#[derive(Clone)]
pub struct AggregationEngine {
    transport: Arc<dyn Transport>,
    geo: Arc<dyn Geospatial>,
}

impl AggregationEngine {
    pub fn new(transport: Arc<dyn Transport>, geo: Arc<dyn Geospatial>) -> Self {
        Self { transport, geo }
    }

    async fn query(
        fetcher: RelayFetcher,
        strategy: AggregateStrategy,
        filter: Filter,
        nearby: Option<NearbyQuery>,
    ) -> Result<Option<AggregateData>> {
        let data = match strategy {
            AggregateStrategy::OnlineList => fetcher.fetch_online_relays(filter).await?.map(AggregateData::Relays),
            AggregateStrategy::OnlineMeta => fetcher.fetch_online_relays_meta(filter).await?.map(AggregateData::Meta),
            AggregateStrategy::OnlineListNearby => match nearby {
                Some(nearby) => fetcher
                    .fetch_nearby_relays_list(&nearby.geohash, nearby.options, filter)
                    .await?
                    .map(AggregateData::Relays),
                None => None,
            },
        };
        Ok(data)
    }

    /// Ask every monitor in `monitors` concurrently.
    ///
    /// Failed, absent and empty answers are dropped; `None` when nothing
    /// remains.
    pub async fn aggregate(
        &self,
        strategy: AggregateStrategy,
        monitors: Vec<Arc<MonitorRecord>>,
        options: &AggregateOptions,
    ) -> Option<Vec<AggregateEntry>> {
        if monitors.is_empty() {
            return None;
        }
        if strategy == AggregateStrategy::OnlineListNearby && options.nearby.is_none() {
            warn!(%strategy, "No nearby location given, every monitor is skipped");
        }

        let filter = options.custom_filter.clone().unwrap_or_default();
        let queries = monitors.iter().map(|monitor| {
            let fetcher = RelayFetcher::new(monitor.clone(), self.transport.clone(), self.geo.clone());
            Self::query(fetcher, strategy, filter.clone(), options.nearby.clone())
        });
        let outcomes = join_all(queries).await;

        let entries: Vec<AggregateEntry> = monitors
            .into_iter()
            .zip(outcomes)
            .filter_map(|(monitor, outcome)| match outcome {
                Ok(Some(data)) if !data.is_empty() => Some(AggregateEntry { monitor, data }),
                Ok(_) => None,
                Err(error) => {
                    debug!(monitor = %monitor.identity(), %strategy, %error, "Monitor query failed");
                    None
                }
            })
            .collect();

        info!(%strategy, entries = entries.len(), "Aggregation finished");
        (!entries.is_empty()).then_some(entries)
    }
}
