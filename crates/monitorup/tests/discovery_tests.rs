//! Monitor discovery through the transport and geospatial collaborators

mod common;

use std::sync::Arc;

use common::{FakeGeo, MockTransport, announcement, init_logging, now, relay_event, with_geohash};
use monitorup::record::{MONITOR_ANNOUNCEMENT, RELAY_DISCOVERY, RELAY_META};
use monitorup::{Coords, DiscoveryFetcher, Filter, Liveness, NearbyOptions, RelayMonitorCriteria};
use tokio_test::assert_ok;

fn fetcher(transport: &Arc<MockTransport>, geo: FakeGeo) -> DiscoveryFetcher {
    DiscoveryFetcher::new(transport.clone(), Arc::new(geo))
}

#[tokio::test]
async fn test_no_announcements_is_absent() {
    init_logging();
    let transport = MockTransport::new(vec![]);
    let discovery = fetcher(&transport, FakeGeo::new(transport.clone()));

    assert!(assert_ok!(discovery.fetch_candidates(Filter::new(), false).await).is_none());
    assert_eq!(transport.queries()[0].kinds, Some(vec![MONITOR_ANNOUNCEMENT]));
}

#[tokio::test]
async fn test_candidates_carry_tolerance_and_coordinates() {
    init_logging();
    let transport = MockTransport::new(vec![
        with_geohash(announcement("a", 600, &[RELAY_META], &["ssl"]), "u33d"),
        with_geohash(announcement("b", 600, &[RELAY_META], &["ssl"]), "zzzz"),
    ]);
    let geo = FakeGeo::new(transport.clone()).with_cell("u33d", Coords::new(52.5, 13.4));
    let discovery = fetcher(&transport, geo).with_tolerance(2.0);

    let mut records = assert_ok!(discovery.fetch_candidates(Filter::new(), false).await).unwrap();
    records.sort_by(|x, y| x.identity().cmp(y.identity()));

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].tolerance(), 2.0);
    assert_eq!(records[0].coordinates(), Some(Coords::new(52.5, 13.4)));
    assert_eq!(records[1].coordinates(), None);
    assert_eq!(records[1].liveness(), Liveness::Unknown);
}

#[tokio::test]
async fn test_active_only_drops_silent_monitors() {
    init_logging();
    let transport = MockTransport::new(vec![
        announcement("alive", 600, &[RELAY_DISCOVERY], &["ssl"]),
        announcement("silent", 600, &[RELAY_DISCOVERY], &["ssl"]),
        relay_event("alive", RELAY_DISCOVERY, "wss://r", now()),
    ]);
    let discovery = fetcher(&transport, FakeGeo::new(transport.clone()));

    let records = assert_ok!(discovery.fetch_active_candidates(Filter::new()).await).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identity(), "alive");
    assert_eq!(records[0].liveness(), Liveness::Active);
}

#[tokio::test]
async fn test_nothing_active_is_absent() {
    init_logging();
    let transport = MockTransport::new(vec![announcement("silent", 600, &[RELAY_DISCOVERY], &["ssl"])]);
    let discovery = fetcher(&transport, FakeGeo::new(transport.clone()));

    assert!(assert_ok!(discovery.fetch_candidates(Filter::new(), true).await).is_none());
}

#[tokio::test]
async fn test_candidates_by_criteria_use_indexed_tags() {
    init_logging();
    let transport = MockTransport::new(vec![
        announcement("dns", 600, &[RELAY_META], &["dns"]),
        announcement("ssl", 600, &[RELAY_META], &["ssl"]),
        relay_event("dns", RELAY_META, "wss://r", now()),
        relay_event("ssl", RELAY_META, "wss://r", now()),
    ]);
    let discovery = fetcher(&transport, FakeGeo::new(transport.clone()));

    let criteria = RelayMonitorCriteria::new().checks(["dns"]);
    let records = assert_ok!(discovery.fetch_candidates_by(&criteria, Filter::new().limit(10)).await).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identity(), "dns");
    let query = &transport.queries()[0];
    assert_eq!(query.tag_values("c"), Some(&["dns".to_string()][..]));
    assert_eq!(query.limit, Some(10));
}

#[tokio::test]
async fn test_nearby_active_candidates_keep_probed_liveness() {
    init_logging();
    let transport = MockTransport::new(vec![
        with_geohash(announcement("near", 600, &[RELAY_DISCOVERY], &["ssl"]), "u33dc0"),
        with_geohash(announcement("near-silent", 600, &[RELAY_DISCOVERY], &["ssl"]), "u33dc1"),
        with_geohash(announcement("far", 600, &[RELAY_DISCOVERY], &["ssl"]), "9q8yy"),
        relay_event("near", RELAY_DISCOVERY, "wss://r", now()),
        relay_event("far", RELAY_DISCOVERY, "wss://r", now()),
    ]);
    let geo = FakeGeo::new(transport.clone());
    let discovery = fetcher(&transport, geo);

    let options = NearbyOptions { max_precision: 5, min_precision: 3, min_results: 1, recurse: true };
    let records =
        assert_ok!(discovery.fetch_nearby_candidates("u33dc", options, true, Filter::new()).await).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identity(), "near");
    assert_eq!(records[0].liveness(), Liveness::Active);

    let probes_for_near = transport.queries_for("near").len();
    assert_eq!(probes_for_near, 1, "probed record is reused instead of probed again");
}

#[tokio::test]
async fn test_nearby_without_active_filter_returns_all_in_cell() {
    init_logging();
    let transport = MockTransport::new(vec![
        with_geohash(announcement("one", 600, &[RELAY_DISCOVERY], &["ssl"]), "u33dc0"),
        with_geohash(announcement("two", 600, &[RELAY_DISCOVERY], &["ssl"]), "u33d"),
    ]);
    let discovery = fetcher(&transport, FakeGeo::new(transport.clone()));

    let options = NearbyOptions { min_precision: 4, ..Default::default() };
    let records =
        assert_ok!(discovery.fetch_nearby_candidates("u33dc", options, false, Filter::new()).await).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record.liveness() == Liveness::Unknown));
}

#[tokio::test]
async fn test_nearby_rejects_short_geohash() {
    init_logging();
    let transport = MockTransport::new(vec![announcement("m", 600, &[RELAY_DISCOVERY], &["ssl"])]);
    let geo = Arc::new(FakeGeo::new(transport.clone()));
    let discovery = DiscoveryFetcher::new(transport.clone(), geo.clone());

    let outcome = discovery.fetch_nearby_candidates("u3", NearbyOptions::default(), false, Filter::new()).await;
    assert!(assert_ok!(outcome).is_none());
    assert_eq!(geo.nearby_calls(), 0);
}
