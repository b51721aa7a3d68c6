//! MonitorUP - Monitor discovery and aggregation engine
//!
//! This library discovers monitor agents from their announcement records,
//! decides which of them are alive, selects them by criteria or proximity,
//! and fans endpoint queries out to the selected monitors.
//!
//! The network transport, the geospatial primitives and the profile lookup
//! are injected through the [`Transport`], [`Geospatial`] and
//! [`ProfileSource`] traits.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod geo;
pub mod manager;
pub mod monitor;
pub mod probe;
pub mod profile;
pub mod record;
pub mod relay;
pub mod transport;

// Re-export main types
pub use aggregate::{AggregateData, AggregateEntry, AggregateOptions, AggregateStrategy, AggregationEngine, NearbyQuery};
pub use cache::{MemoryMonitorCache, MemoryRelayCache, MonitorCache, RelayCache};
pub use config::{Config, ManagerConfig};
pub use discovery::DiscoveryFetcher;
pub use error::{MonitorError, Result};
pub use geo::{CandidateFilter, Coords, Geospatial, NearbyOptions};
pub use manager::{ManagerState, MonitorManager};
pub use monitor::{Liveness, MonitorRecord, RelayMonitorCriteria};
pub use probe::ActiveProbe;
pub use profile::{Profile, ProfileSource, TransportProfiles};
pub use record::{Event, Filter, TimeRange};
pub use relay::{RelayFetcher, RelayListSet, RelayLiveness};
pub use transport::Transport;

/// Re-export common error types
pub use anyhow;
