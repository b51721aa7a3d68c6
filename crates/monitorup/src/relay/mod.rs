//! Per-monitor endpoint queries.
//!
//! A [`RelayFetcher`] wraps one monitor and asks the transport for the
//! endpoint records that monitor published, narrowed to a
//! [`RelayLiveness`] window.

pub mod liveness;

pub use liveness::{DEAD_AFTER_SECS, RelayLiveness};

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cache::{MemoryRelayCache, RelayCache};
use crate::error::{MonitorError, Result};
use crate::geo::{self, Geospatial, NearbyOptions};
use crate::monitor::MonitorRecord;
use crate::record::{Event, Filter, RELAY_DISCOVERY, RELAY_META};
use crate::transport::Transport;

/// Endpoint identifiers reported by one monitor
pub type RelayListSet = HashSet<String>;

/// Resets the in-flight flag when a streaming fetch ends, however it ends
struct FetchGuard<'a>(&'a AtomicBool);

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct RelayFetcher {
    monitor: Arc<MonitorRecord>,
    transport: Arc<dyn Transport>,
    geo: Arc<dyn Geospatial>,
    cache: Arc<dyn RelayCache>,
    cancel: CancellationToken,
    fetching: AtomicBool,
    allow_concurrent_fetches: bool,
}

impl RelayFetcher {
    pub fn new(monitor: Arc<MonitorRecord>, transport: Arc<dyn Transport>, geo: Arc<dyn Geospatial>) -> Self {
        Self {
            monitor,
            transport,
            geo,
            cache: Arc::new(MemoryRelayCache::new()),
            cancel: CancellationToken::new(),
            fetching: AtomicBool::new(false),
            allow_concurrent_fetches: false,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn RelayCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Let discovery streams overlap instead of rejecting the second one
    pub fn allow_concurrent_fetches(mut self, allow: bool) -> Self {
        self.allow_concurrent_fetches = allow;
        self
    }

    pub fn monitor(&self) -> &Arc<MonitorRecord> {
        &self.monitor
    }

    pub fn cache(&self) -> &Arc<dyn RelayCache> {
        &self.cache
    }

    /// Stop in-flight streaming fetches of this fetcher.
    ///
    /// The token stays cancelled, so later streaming fetches end immediately.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn publishes(&self, kind: u32) -> bool {
        self.monitor.supported_kinds().contains(&kind)
    }

    /// `prepend ⊕ {kinds, authors: [monitor], since: online tolerance} ⊕ append`
    pub fn monitor_filter(&self, kinds: &[u32], prepend: Filter, append: Filter) -> Filter {
        self.liveness_filter(kinds, RelayLiveness::Online, prepend, append)
    }

    /// `prepend ⊕ {kinds, authors: [monitor], liveness window} ⊕ append`
    pub fn liveness_filter(&self, kinds: &[u32], liveness: RelayLiveness, prepend: Filter, append: Filter) -> Filter {
        let window = liveness.window(&self.monitor);
        let mut own = Filter::new().kinds(kinds.iter().copied()).authors([self.monitor.identity()]);
        own.since = window.since;
        own.until = window.until;
        prepend.merge(own).merge(append)
    }

    fn unsupported<T>(&self, operation: &str, reason: &str) -> Result<Option<T>> {
        error!(monitor = %self.monitor.identity(), operation, "{reason}");
        Ok(None)
    }

    /// First `d` tag of every record; records without one are skipped
    pub fn reduce_to_relays(events: &[Event]) -> RelayListSet {
        events.iter().filter_map(Event::d_tag).map(str::to_owned).collect()
    }

    /// Endpoints the monitor reported online within its tolerance window
    pub async fn fetch_online_relays(&self, filter: Filter) -> Result<Option<RelayListSet>> {
        self.fetch_relays_by(RelayLiveness::Online, Filter::new(), filter).await
    }

    /// Like [`fetch_online_relays`](Self::fetch_online_relays), constrained
    /// by indexed tags such as `#n` or `#R`.
    pub async fn fetch_online_relays_by(&self, indexed_tags: Filter, filter: Filter) -> Result<Option<RelayListSet>> {
        self.fetch_relays_by(RelayLiveness::Online, indexed_tags, filter).await
    }

    /// Every endpoint the monitor ever reported
    pub async fn fetch_all_relays(&self, filter: Filter) -> Result<Option<RelayListSet>> {
        self.fetch_relays(RelayLiveness::All, filter).await
    }

    pub async fn fetch_offline_relays(&self, filter: Filter) -> Result<Option<RelayListSet>> {
        self.fetch_relays(RelayLiveness::Offline, filter).await
    }

    pub async fn fetch_dead_relays(&self, filter: Filter) -> Result<Option<RelayListSet>> {
        self.fetch_relays(RelayLiveness::Dead, filter).await
    }

    pub async fn fetch_relays(&self, liveness: RelayLiveness, filter: Filter) -> Result<Option<RelayListSet>> {
        self.fetch_relays_by(liveness, Filter::new(), filter).await
    }

    /// Endpoints inside the `liveness` window, listed from discovery records
    /// when the monitor publishes them and from metadata records otherwise.
    pub async fn fetch_relays_by(
        &self,
        liveness: RelayLiveness,
        indexed_tags: Filter,
        filter: Filter,
    ) -> Result<Option<RelayListSet>> {
        self.monitor.warn_if_invalid();
        let kind = if self.publishes(RELAY_DISCOVERY) {
            RELAY_DISCOVERY
        } else if self.publishes(RELAY_META) {
            RELAY_META
        } else {
            return self.unsupported("fetch_relays", "Monitor publishes no endpoint records");
        };

        let query = self.liveness_filter(&[kind], liveness, filter, indexed_tags);
        let events = self.transport.fetch_events(&query).await?;
        let relays = Self::reduce_to_relays(&events);

        debug!(monitor = %self.monitor.identity(), %liveness, relays = relays.len(), "Fetched relays");
        Ok(Some(relays))
    }

    /// Metadata records for specific endpoints
    pub async fn fetch_relay_meta(&self, relays: &[String]) -> Result<Option<Vec<Event>>> {
        self.monitor.warn_if_invalid();
        if !self.publishes(RELAY_META) {
            return self.unsupported("fetch_relay_meta", "Monitor does not publish endpoint metadata");
        }

        let query = self.monitor_filter(&[RELAY_META], Filter::new().tag("d", relays.iter().cloned()), Filter::new());
        self.transport.fetch_events(&query).await.map(Some)
    }

    /// Metadata records of every endpoint the monitor reported online
    pub async fn fetch_online_relays_meta(&self, filter: Filter) -> Result<Option<Vec<Event>>> {
        self.fetch_relays_meta_by(RelayLiveness::Online, Filter::new(), filter).await
    }

    /// Online metadata records constrained by indexed tags
    pub async fn fetch_online_relays_meta_by(&self, indexed_tags: Filter, filter: Filter) -> Result<Option<Vec<Event>>> {
        self.fetch_relays_meta_by(RelayLiveness::Online, indexed_tags, filter).await
    }

    pub async fn fetch_all_relays_meta(&self, filter: Filter) -> Result<Option<Vec<Event>>> {
        self.fetch_relays_meta(RelayLiveness::All, filter).await
    }

    pub async fn fetch_offline_relays_meta(&self, filter: Filter) -> Result<Option<Vec<Event>>> {
        self.fetch_relays_meta(RelayLiveness::Offline, filter).await
    }

    pub async fn fetch_dead_relays_meta(&self, filter: Filter) -> Result<Option<Vec<Event>>> {
        self.fetch_relays_meta(RelayLiveness::Dead, filter).await
    }

    pub async fn fetch_relays_meta(&self, liveness: RelayLiveness, filter: Filter) -> Result<Option<Vec<Event>>> {
        self.fetch_relays_meta_by(liveness, Filter::new(), filter).await
    }

    /// Stream the metadata records inside the `liveness` window
    pub async fn fetch_relays_meta_by(
        &self,
        liveness: RelayLiveness,
        indexed_tags: Filter,
        filter: Filter,
    ) -> Result<Option<Vec<Event>>> {
        self.monitor.warn_if_invalid();
        if !self.publishes(RELAY_META) {
            return self.unsupported("fetch_relays_meta", "Monitor does not publish endpoint metadata");
        }

        let query = self.liveness_filter(&[RELAY_META], liveness, filter, indexed_tags);
        self.stream_events(query).await.map(Some)
    }

    /// Discovery records of every endpoint the monitor reported online.
    ///
    /// Only one such stream runs per fetcher unless concurrent fetches are
    /// allowed.
    pub async fn fetch_online_relays_discovery(&self, filter: Filter) -> Result<Option<Vec<Event>>> {
        self.monitor.warn_if_invalid();
        if !self.publishes(RELAY_DISCOVERY) {
            return self.unsupported("fetch_online_relays_discovery", "Monitor does not publish endpoint discovery");
        }

        let already_fetching = self.fetching.swap(true, Ordering::AcqRel);
        if already_fetching && !self.allow_concurrent_fetches {
            return self.unsupported(
                "fetch_online_relays_discovery",
                "A discovery fetch is already running; allow concurrent fetches to override",
            );
        }
        let _guard = FetchGuard(&self.fetching);

        let query = self.monitor_filter(&[RELAY_DISCOVERY], filter, Filter::new());
        self.stream_events(query).await.map(Some)
    }

    /// Endpoints the monitor discovered around `geohash`.
    ///
    /// A geohash shorter than the search's minimum precision yields `None`.
    pub async fn fetch_nearby_relays_list(
        &self,
        geohash: &str,
        options: NearbyOptions,
        filter: Filter,
    ) -> Result<Option<RelayListSet>> {
        self.monitor.warn_if_invalid();
        if !self.publishes(RELAY_DISCOVERY) {
            return self.unsupported("fetch_nearby_relays_list", "Monitor does not publish endpoint discovery");
        }

        let query = self.monitor_filter(&[RELAY_DISCOVERY], filter, Filter::new());
        let events = geo::nearby_search(self.geo.as_ref(), geohash, query, options, None).await?;
        Ok(events.map(|events| Self::reduce_to_relays(&events)))
    }

    /// Replace the relay cache content with the metadata records inside
    /// any of `livenesses`. An empty slice loads the online records.
    pub async fn load(&self, livenesses: &[RelayLiveness], filter: Filter) -> Result<usize> {
        let livenesses = if livenesses.is_empty() { &[RelayLiveness::Online][..] } else { livenesses };

        self.cache.reset().await?;
        let mut seen = HashSet::new();
        let mut events = Vec::new();
        for liveness in livenesses {
            let fetched = self.fetch_relays_meta(*liveness, filter.clone()).await?.unwrap_or_default();
            events.extend(fetched.into_iter().filter(|event| seen.insert(event.id.clone())));
        }
        let count = events.len();
        self.cache.load(events).await?;

        info!(monitor = %self.monitor.identity(), ?livenesses, count, "Loaded relays into cache");
        Ok(count)
    }

    pub async fn load_online(&self, filter: Filter) -> Result<usize> {
        self.load(&[RelayLiveness::Online], filter).await
    }

    pub async fn load_all(&self, filter: Filter) -> Result<usize> {
        self.load(&[RelayLiveness::All], filter).await
    }

    pub async fn load_offline(&self, filter: Filter) -> Result<usize> {
        self.load(&[RelayLiveness::Offline], filter).await
    }

    pub async fn load_dead(&self, filter: Filter) -> Result<usize> {
        self.load(&[RelayLiveness::Dead], filter).await
    }

    /// Drain the paginated stream for `filter`, stopping on cancellation
    async fn stream_events(&self, mut filter: Filter) -> Result<Vec<Event>> {
        let range = filter.take_time_range();
        let mut stream = self.transport.all_events_iterator(filter, range, self.cancel.clone());

        let mut events = Vec::new();
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(MonitorError::Cancelled),
                next = stream.next() => match next {
                    Some(event) => events.push(event?),
                    None => break,
                },
            }
        }
        Ok(events)
    }
}
