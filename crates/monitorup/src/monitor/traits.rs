//! Capabilities a monitor record exposes to the engine components.

use crate::geo::Coords;

use super::record::{Liveness, MonitorRecord};

/// Something that can be placed on a map
pub trait Geocodable {
    fn geohash(&self) -> Option<&str>;
    fn coordinates(&self) -> Option<Coords>;
}

/// Something the criteria matcher can inspect
pub trait CriteriaMatchable {
    fn supported_kinds(&self) -> Vec<u32>;
    fn checks(&self) -> Vec<String>;
    fn operator(&self) -> Option<&str>;
}

/// Something whose liveness the active probe can determine and remember
pub trait Probeable {
    fn identity(&self) -> &str;
    fn supported_kinds(&self) -> Vec<u32>;
    fn online_tolerance(&self) -> Option<i64>;
    fn liveness(&self) -> Liveness;
    fn set_active(&self, active: bool) -> Liveness;
}

impl Geocodable for MonitorRecord {
    fn geohash(&self) -> Option<&str> {
        MonitorRecord::geohash(self)
    }

    fn coordinates(&self) -> Option<Coords> {
        MonitorRecord::coordinates(self)
    }
}

impl CriteriaMatchable for MonitorRecord {
    fn supported_kinds(&self) -> Vec<u32> {
        MonitorRecord::supported_kinds(self)
    }

    fn checks(&self) -> Vec<String> {
        MonitorRecord::checks(self)
    }

    fn operator(&self) -> Option<&str> {
        MonitorRecord::operator(self)
    }
}

impl Probeable for MonitorRecord {
    fn identity(&self) -> &str {
        MonitorRecord::identity(self)
    }

    fn supported_kinds(&self) -> Vec<u32> {
        MonitorRecord::supported_kinds(self)
    }

    fn online_tolerance(&self) -> Option<i64> {
        MonitorRecord::online_tolerance(self)
    }

    fn liveness(&self) -> Liveness {
        MonitorRecord::liveness(self)
    }

    fn set_active(&self, active: bool) -> Liveness {
        MonitorRecord::set_active(self, active)
    }
}
