//! Monitor manager.
//!
//! Owns the monitor cache and ties discovery, criteria matching, proximity
//! ordering and aggregation together behind one surface.

mod state;

pub use state::ManagerState;

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument};

use crate::aggregate::{AggregateEntry, AggregateOptions, AggregateStrategy, AggregationEngine};
use crate::cache::{MemoryMonitorCache, MonitorCache};
use crate::config::ManagerConfig;
use crate::discovery::DiscoveryFetcher;
use crate::error::Result;
use crate::geo::{self, Coords, Geospatial, NearbyOptions};
use crate::monitor::{MonitorRecord, RelayMonitorCriteria, filter_by_criteria};
use crate::profile::ProfileSource;
use crate::record::Filter;
use crate::relay::RelayFetcher;
use crate::transport::Transport;

type Candidates = Result<Option<Vec<Arc<MonitorRecord>>>>;

pub struct MonitorManager {
    config: ManagerConfig,
    transport: Arc<dyn Transport>,
    geo: Arc<dyn Geospatial>,
    profiles: Arc<dyn ProfileSource>,
    cache: Arc<dyn MonitorCache>,
    fetcher: DiscoveryFetcher,
    engine: AggregationEngine,
    state: watch::Sender<ManagerState>,
    populate_lock: Mutex<()>,
}

impl MonitorManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        geo: Arc<dyn Geospatial>,
        profiles: Arc<dyn ProfileSource>,
    ) -> Self {
        let config = ManagerConfig::default();
        Self {
            fetcher: DiscoveryFetcher::new(transport.clone(), geo.clone()).with_tolerance(config.tolerance),
            engine: AggregationEngine::new(transport.clone(), geo.clone()),
            config,
            transport,
            geo,
            profiles,
            cache: Arc::new(MemoryMonitorCache::new()),
            state: watch::channel(ManagerState::Empty).0,
            populate_lock: Mutex::new(()),
        }
    }

    pub fn with_config(mut self, config: ManagerConfig) -> Self {
        self.fetcher = self.fetcher.with_tolerance(config.tolerance);
        self.config = config;
        self
    }

    /// Replace the cache backend; the manager assumes it starts empty
    pub fn with_cache(mut self, cache: Arc<dyn MonitorCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &DiscoveryFetcher {
        &self.fetcher
    }

    pub fn cache(&self) -> &Arc<dyn MonitorCache> {
        &self.cache
    }

    pub fn state(&self) -> ManagerState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change
    pub fn subscribe_state(&self) -> watch::Receiver<ManagerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: ManagerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(%previous, %state, "Manager state changed");
        }
    }

    /// Reset the cache and fill it with the monitors matching `filter`.
    ///
    /// Returns how many monitors were loaded; zero leaves the cache empty.
    #[instrument(skip(self, filter))]
    pub async fn populate(&self, filter: Filter, active_only: bool) -> Result<usize> {
        let _permit = self.populate_lock.lock().await;
        self.begin_populate().await?;
        let candidates = self.fetcher.fetch_candidates(filter, active_only).await;
        self.finish_populate(candidates).await
    }

    /// Populate with the discovery filter of `criteria`, or of the
    /// configured criteria when none are given
    pub async fn populate_by_criteria(
        &self,
        criteria: Option<&RelayMonitorCriteria>,
        active_only: bool,
    ) -> Result<usize> {
        self.populate(self.criteria_filter(criteria), active_only).await
    }

    /// Populate with monitors announced around `geohash`.
    ///
    /// The configured criteria filter is merged with `append_filter`; nearby
    /// bounds default to the configured ones.
    #[instrument(skip(self, options, append_filter))]
    pub async fn populate_nearby(
        &self,
        geohash: &str,
        options: Option<NearbyOptions>,
        append_filter: Filter,
        active_only: bool,
    ) -> Result<usize> {
        let _permit = self.populate_lock.lock().await;
        self.begin_populate().await?;

        let filter = self.criteria_filter(None).merge(append_filter);
        let options = options.unwrap_or(self.config.nearby);
        let candidates = self.fetcher.fetch_nearby_candidates(geohash, options, active_only, filter).await;
        self.finish_populate(candidates).await
    }

    fn criteria_filter(&self, criteria: Option<&RelayMonitorCriteria>) -> Filter {
        criteria
            .or(self.config.criteria.as_ref())
            .map(RelayMonitorCriteria::discovery_filter)
            .unwrap_or_default()
    }

    async fn begin_populate(&self) -> Result<()> {
        self.set_state(ManagerState::Populating);
        if let Err(error) = self.cache.reset().await {
            self.set_state(ManagerState::Empty);
            return Err(error);
        }
        Ok(())
    }

    async fn finish_populate(&self, candidates: Candidates) -> Result<usize> {
        let records = match candidates {
            Ok(Some(records)) => records,
            Ok(None) => {
                info!("No monitors found, cache stays empty");
                self.set_state(ManagerState::Empty);
                return Ok(0);
            }
            Err(error) => {
                self.set_state(ManagerState::Empty);
                return Err(error);
            }
        };

        let count = records.len();
        if let Err(error) = self.cache.load(records).await {
            self.set_state(ManagerState::Empty);
            return Err(error);
        }
        self.set_state(ManagerState::Populated);

        let initialized = self.init_monitors().await?;
        info!(count, initialized, "Populated monitors");
        Ok(count)
    }

    /// Fetch the profile of every cached monitor not yet initialised.
    ///
    /// Failures are logged and leave the monitor uninitialised.
    async fn init_monitors(&self) -> Result<usize> {
        let pending: Vec<Arc<MonitorRecord>> =
            self.cache.dump().await?.into_iter().filter(|monitor| !monitor.is_initialized()).collect();

        let fetches = pending.iter().map(|monitor| self.profiles.fetch_profile(monitor.identity()));
        let outcomes = join_all(fetches).await;

        let mut initialized = 0;
        for (monitor, outcome) in pending.iter().zip(outcomes) {
            match outcome {
                Ok(profile) => {
                    monitor.set_profile(profile);
                    initialized += 1;
                }
                Err(error) => debug!(monitor = %monitor.identity(), %error, "Monitor profile unavailable"),
            }
        }
        Ok(initialized)
    }

    /// Cached monitors matching `criteria`; `None` when the cache is empty
    pub async fn meets_criteria(&self, criteria: &RelayMonitorCriteria) -> Result<Option<Vec<Arc<MonitorRecord>>>> {
        let monitors = self.cache.dump().await?;
        if monitors.is_empty() {
            return Ok(None);
        }
        Ok(Some(filter_by_criteria(&monitors, criteria)))
    }

    /// Closest cached monitor to `coords` among those matching `criteria`.
    ///
    /// Populates first when the cache is empty or `force_populate` is set.
    pub async fn get_closest_monitor(
        &self,
        coords: Coords,
        criteria: Option<RelayMonitorCriteria>,
        force_populate: bool,
    ) -> Result<Option<Arc<MonitorRecord>>> {
        let criteria = criteria.or_else(|| self.config.criteria.clone()).unwrap_or_default();

        if force_populate || self.cache.is_empty().await? {
            self.populate_by_criteria(Some(&criteria), self.config.active_only).await?;
        }

        let Some(monitors) = self.meets_criteria(&criteria).await? else {
            return Ok(None);
        };
        let closest = geo::sort_by_proximity(self.geo.as_ref(), coords, &monitors)
            .and_then(|sorted| sorted.into_iter().next());
        Ok(closest)
    }

    /// Ask every selected monitor for `strategy` and collect the answers.
    ///
    /// Monitors are selected by the criteria in `options`, else the
    /// configured criteria, else the whole cache.
    #[instrument(skip(self, options))]
    pub async fn aggregate(
        &self,
        strategy: AggregateStrategy,
        options: &AggregateOptions,
    ) -> Result<Option<Vec<AggregateEntry>>> {
        let monitors = match options.criteria.as_ref().or(self.config.criteria.as_ref()) {
            Some(criteria) => self.meets_criteria(criteria).await?.unwrap_or_default(),
            None => self.cache.dump().await?,
        };
        if monitors.is_empty() {
            return Ok(None);
        }

        let mut options = options.clone();
        if options.custom_filter.is_none() {
            options.custom_filter = self.config.custom_filter.clone();
        }
        Ok(self.engine.aggregate(strategy, monitors, &options).await)
    }

    /// [`aggregate`](Self::aggregate) with the strategy given by name
    pub async fn aggregate_by_name(
        &self,
        strategy: &str,
        options: &AggregateOptions,
    ) -> Result<Option<Vec<AggregateEntry>>> {
        self.aggregate(strategy.parse()?, options).await
    }

    /// Endpoint fetcher for a cached monitor
    pub async fn relay_fetcher(&self, identity: &str) -> Result<Option<RelayFetcher>> {
        let monitor = self.cache.get(identity).await?;
        Ok(monitor.map(|monitor| RelayFetcher::new(monitor, self.transport.clone(), self.geo.clone())))
    }

    pub async fn get_monitor(&self, identity: &str) -> Result<Option<Arc<MonitorRecord>>> {
        self.cache.get(identity).await
    }

    pub async fn set_monitor(&self, monitor: Arc<MonitorRecord>) -> Result<()> {
        self.cache.set(monitor).await?;
        self.set_state(ManagerState::Populated);
        Ok(())
    }

    pub async fn monitors(&self) -> Result<Vec<Arc<MonitorRecord>>> {
        self.cache.dump().await
    }

    pub async fn monitor_keys(&self) -> Result<std::collections::HashSet<String>> {
        self.cache.keys().await
    }

    /// Add monitors to the cache; an empty batch is ignored
    pub async fn load_monitors(&self, monitors: Vec<Arc<MonitorRecord>>) -> Result<()> {
        if monitors.is_empty() {
            return Ok(());
        }
        self.cache.load(monitors).await?;
        self.set_state(ManagerState::Populated);
        Ok(())
    }

    /// Replace the cache content; an empty batch is ignored
    pub async fn replace_monitors(&self, monitors: Vec<Arc<MonitorRecord>>) -> Result<()> {
        if monitors.is_empty() {
            return Ok(());
        }
        self.cache.reset().await?;
        self.cache.load(monitors).await?;
        self.set_state(ManagerState::Populated);
        Ok(())
    }

    pub async fn reset_monitors(&self) -> Result<()> {
        self.cache.reset().await?;
        self.set_state(ManagerState::Empty);
        Ok(())
    }
}
