//! Geospatial collaborator interface.
//!
//! Geohash decoding, distance math and the precision-escalating search are
//! provided by the embedding application through [`Geospatial`].

pub mod proximity;

pub use proximity::{nearby_search, sort_by_proximity};

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::{Event, Filter};

/// Decoded latitude / longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub lat: f64,
    pub lon: f64,
}

impl Coords {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Bounds of a nearby search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NearbyOptions {
    /// Longest geohash prefix tried first
    pub max_precision: usize,

    /// Shortest geohash prefix the search may fall back to
    pub min_precision: usize,

    /// Result count considered sufficient
    pub min_results: usize,

    /// Escalate through precisions; a single pass at `min_precision` otherwise
    pub recurse: bool,
}

impl Default for NearbyOptions {
    fn default() -> Self {
        Self { max_precision: 5, min_precision: 5, min_results: 5, recurse: false }
    }
}

/// Post-filter applied to each candidate batch of a nearby search
pub type CandidateFilter = Arc<dyn Fn(Vec<Event>) -> BoxFuture<'static, Vec<Event>> + Send + Sync>;

#[async_trait]
pub trait Geospatial: Send + Sync {
    /// Decode a geohash cell into its centre point
    async fn decode(&self, geohash: &str) -> Result<Coords>;

    /// Permutation of `points` ordered by ascending distance from `origin`.
    ///
    /// Ties keep input order; points without coordinates sort last.
    fn sort_by_distance(&self, origin: Coords, points: &[Option<Coords>]) -> Vec<usize>;

    /// Query `filter` around `geohash`, widening the cell until
    /// `options.min_results` records survive `candidate_filter`.
    async fn nearby_search(
        &self,
        geohash: &str,
        filter: Filter,
        options: NearbyOptions,
        candidate_filter: Option<CandidateFilter>,
    ) -> Result<Vec<Event>>;
}
