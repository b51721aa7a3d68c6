use std::sync::Arc;

use tracing::{debug, error};

use super::{CandidateFilter, Coords, Geospatial, NearbyOptions};
use crate::error::Result;
use crate::monitor::Geocodable;
use crate::record::{Event, Filter};

/// Order `records` by ascending distance from `origin`.
///
/// Returns `None` for an empty input. Records without coordinates end up
/// last; ties keep their input order.
pub fn sort_by_proximity<R: Geocodable>(
    geo: &dyn Geospatial,
    origin: Coords,
    records: &[Arc<R>],
) -> Option<Vec<Arc<R>>> {
    if records.is_empty() {
        return None;
    }

    let points: Vec<Option<Coords>> = records.iter().map(|record| record.coordinates()).collect();
    let order = geo.sort_by_distance(origin, &points);

    Some(order.into_iter().filter_map(|index| records.get(index).cloned()).collect())
}

impl NearbyOptions {
    /// Bounds with `min_precision <= max_precision`
    pub fn normalized(self) -> Self {
        if self.min_precision > self.max_precision {
            Self { min_precision: self.max_precision, max_precision: self.min_precision, ..self }
        } else {
            self
        }
    }
}

/// Search records around `geohash` through the geospatial collaborator.
///
/// A geohash shorter than the minimum precision cannot be searched and
/// yields `None`.
pub async fn nearby_search(
    geo: &dyn Geospatial,
    geohash: &str,
    filter: Filter,
    options: NearbyOptions,
    candidate_filter: Option<CandidateFilter>,
) -> Result<Option<Vec<Event>>> {
    let options = options.normalized();
    if geohash.len() < options.min_precision {
        error!(
            geohash,
            min_precision = options.min_precision,
            "Geohash is shorter than the minimum search precision"
        );
        return Ok(None);
    }

    let events = geo.nearby_search(geohash, filter, options, candidate_filter).await?;
    debug!(geohash, found = events.len(), "Nearby search finished");
    Ok(Some(events))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_swaps_inverted_bounds() {
        let options = NearbyOptions { max_precision: 2, min_precision: 6, ..Default::default() };
        let normalized = options.normalized();
        assert_eq!(normalized.min_precision, 2);
        assert_eq!(normalized.max_precision, 6);
        assert_eq!(normalized.min_results, 5);

        let default = NearbyOptions::default();
        assert_eq!(default.normalized(), default);
    }
}
