//! Monitor announcement records and the predicates evaluated over them.

pub mod criteria;
pub mod record;
pub mod traits;

pub use criteria::{RelayMonitorCriteria, filter_by_criteria, meets};
pub use record::{DEFAULT_TOLERANCE, Liveness, MonitorRecord};
pub use traits::{CriteriaMatchable, Geocodable, Probeable};
