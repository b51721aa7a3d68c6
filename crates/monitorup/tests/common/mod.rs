//! Shared in-memory collaborators for the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use monitorup::record::{MONITOR_ANNOUNCEMENT, RELAY_DISCOVERY, RELAY_META};
use monitorup::{
    CandidateFilter, Coords, Event, Filter, Geospatial, MonitorError, MonitorRecord, NearbyOptions, Profile,
    ProfileSource, Result, TimeRange, Transport,
};
use tokio_util::sync::CancellationToken;

pub fn init_logging() {
    let _ = logger::try_init(&logger::LogSettings { level: "debug".into(), ..Default::default() });
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Announcement publishing every `frequency` seconds
pub fn announcement(identity: &str, frequency: u64, kinds: &[u32], checks: &[&str]) -> Event {
    let mut record = MonitorRecord::from_event(Event::new(identity, MONITOR_ANNOUNCEMENT));
    record.set_frequency(frequency);
    record.set_kinds(kinds.iter().copied());
    record.set_checks(checks.iter().copied());
    let mut event = record.into_event();
    event.id = format!("{identity}-announcement");
    event
}

pub fn with_geohash(mut event: Event, geohash: &str) -> Event {
    event.push_tag(vec!["g".into(), geohash.into()]);
    event
}

/// Endpoint record published by `author` at `created_at`
pub fn relay_event(author: &str, kind: u32, relay: &str, created_at: i64) -> Event {
    let mut event = Event::new(author, kind).with_tag(["d", relay]);
    event.created_at = created_at;
    event.id = format!("{author}-{kind}-{relay}");
    event
}

pub fn discovery_event(author: &str, relay: &str, geohash: &str) -> Event {
    with_geohash(relay_event(author, RELAY_DISCOVERY, relay, now()), geohash)
}

pub fn meta_event(author: &str, relay: &str) -> Event {
    relay_event(author, RELAY_META, relay, now())
}

fn matches(filter: &Filter, event: &Event) -> bool {
    if filter.kinds.as_ref().is_some_and(|kinds| !kinds.contains(&event.kind)) {
        return false;
    }
    if filter.authors.as_ref().is_some_and(|authors| !authors.contains(&event.pubkey)) {
        return false;
    }
    if filter.since.is_some_and(|since| event.created_at < since) {
        return false;
    }
    if filter.until.is_some_and(|until| event.created_at > until) {
        return false;
    }
    filter.tags.iter().all(|(key, values)| {
        let name = key.trim_start_matches('#');
        event.tag_values(name).iter().any(|value| values.iter().any(|wanted| wanted == value))
    })
}

/// Transport over a fixed set of records that remembers every query
#[derive(Default)]
pub struct MockTransport {
    events: Mutex<Vec<Event>>,
    queries: Mutex<Vec<Filter>>,
    failing_authors: Mutex<HashSet<String>>,
    stall_streams: AtomicBool,
}

impl MockTransport {
    pub fn new(events: Vec<Event>) -> Arc<Self> {
        Arc::new(Self { events: Mutex::new(events), ..Default::default() })
    }

    pub fn publish(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    /// Every query naming `author` fails
    pub fn fail_author(&self, author: &str) {
        self.failing_authors.lock().unwrap().insert(author.to_owned());
    }

    /// Streams never finish on their own after yielding their records
    pub fn stall_streams(&self) {
        self.stall_streams.store(true, Ordering::SeqCst);
    }

    pub fn queries(&self) -> Vec<Filter> {
        self.queries.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries_for(&self, author: &str) -> Vec<Filter> {
        self.queries()
            .into_iter()
            .filter(|filter| filter.authors.as_ref().is_some_and(|authors| authors.iter().any(|a| a == author)))
            .collect()
    }

    fn run(&self, filter: &Filter) -> Result<Vec<Event>> {
        self.queries.lock().unwrap().push(filter.clone());

        let failing = self.failing_authors.lock().unwrap();
        if let Some(authors) = &filter.authors {
            if let Some(author) = authors.iter().find(|author| failing.contains(*author)) {
                return Err(MonitorError::transport(format!("relay refused query for {author}")));
            }
        }

        let mut found: Vec<Event> =
            self.events.lock().unwrap().iter().filter(|event| matches(filter, event)).cloned().collect();
        if let Some(limit) = filter.limit {
            found.truncate(limit);
        }
        Ok(found)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch_events(&self, filter: &Filter) -> Result<Vec<Event>> {
        self.run(filter)
    }

    fn all_events_iterator(
        &self,
        mut filter: Filter,
        range: TimeRange,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<Event>> {
        filter.since = range.since;
        filter.until = range.until;

        let events = match self.run(&filter) {
            Ok(events) => events,
            Err(error) => return stream::once(async move { Err(error) }).boxed(),
        };
        if cancel.is_cancelled() {
            return stream::once(async { Err(MonitorError::Cancelled) }).boxed();
        }

        let head = stream::iter(events.into_iter().map(Ok));
        if self.stall_streams.load(Ordering::SeqCst) {
            head.chain(stream::pending()).boxed()
        } else {
            head.boxed()
        }
    }
}

/// Planar geospatial stand-in; geohash cells match by prefix
pub struct FakeGeo {
    transport: Arc<MockTransport>,
    cells: HashMap<String, Coords>,
    nearby_calls: AtomicUsize,
}

impl FakeGeo {
    pub fn new(transport: Arc<MockTransport>) -> Self {
        Self { transport, cells: HashMap::new(), nearby_calls: AtomicUsize::new(0) }
    }

    pub fn with_cell(mut self, geohash: &str, coords: Coords) -> Self {
        self.cells.insert(geohash.to_owned(), coords);
        self
    }

    pub fn nearby_calls(&self) -> usize {
        self.nearby_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geospatial for FakeGeo {
    async fn decode(&self, geohash: &str) -> Result<Coords> {
        self.cells
            .get(geohash)
            .copied()
            .ok_or_else(|| MonitorError::geospatial(format!("unknown cell {geohash}")))
    }

    fn sort_by_distance(&self, origin: Coords, points: &[Option<Coords>]) -> Vec<usize> {
        let distance = |point: &Option<Coords>| {
            point.map(|p| (p.lat - origin.lat).powi(2) + (p.lon - origin.lon).powi(2)).unwrap_or(f64::INFINITY)
        };
        let mut order: Vec<usize> = (0..points.len()).collect();
        order.sort_by(|a, b| distance(&points[*a]).total_cmp(&distance(&points[*b])));
        order
    }

    async fn nearby_search(
        &self,
        geohash: &str,
        filter: Filter,
        options: NearbyOptions,
        candidate_filter: Option<CandidateFilter>,
    ) -> Result<Vec<Event>> {
        self.nearby_calls.fetch_add(1, Ordering::SeqCst);
        let candidates = self.transport.fetch_events(&filter).await?;

        let precisions: Vec<usize> = if options.recurse {
            (options.min_precision..=options.max_precision).rev().collect()
        } else {
            vec![options.min_precision]
        };

        let mut found = Vec::new();
        for precision in precisions {
            let prefix = &geohash[..precision.min(geohash.len())];
            let cell: Vec<Event> = candidates
                .iter()
                .filter(|event| event.tag_values("g").iter().any(|g| g.starts_with(prefix)))
                .cloned()
                .collect();
            found = match &candidate_filter {
                Some(keep) => keep(cell).await,
                None => cell,
            };
            if found.len() >= options.min_results {
                break;
            }
        }
        Ok(found)
    }
}

/// Profile lookup that fails for selected identities
#[derive(Default)]
pub struct FakeProfiles {
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeProfiles {
    pub fn failing(identities: &[&str]) -> Self {
        Self { failing: identities.iter().map(|id| id.to_string()).collect(), ..Default::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileSource for FakeProfiles {
    async fn fetch_profile(&self, identity: &str) -> Result<Profile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(identity) {
            return Err(MonitorError::profile(identity, "no profile published"));
        }
        Ok(Profile { name: Some(format!("{identity}-name")), ..Default::default() })
    }
}
