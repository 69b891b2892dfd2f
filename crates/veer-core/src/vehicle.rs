//! Vehicle classes used by the speed-limit overlay.

use serde::{Deserialize, Serialize};

/// The vehicle classes the speed-limit feed enumerates.
///
/// Numeric ids follow the feed; anything else is treated as "no class" and
/// leaves the speed-limit overlay inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Auto,
    Minibus,
    Bus,
    Van,
    Truck,
    Tractor,
}

impl VehicleClass {
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::Auto),
            2 => Some(Self::Minibus),
            3 => Some(Self::Bus),
            4 => Some(Self::Van),
            5 => Some(Self::Truck),
            6 => Some(Self::Tractor),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Self::Auto => 1,
            Self::Minibus => 2,
            Self::Bus => 3,
            Self::Van => 4,
            Self::Truck => 5,
            Self::Tractor => 6,
        }
    }

    /// Urban fallback speed when the graph carries no baseline for an edge.
    pub fn default_urban_speed_kmh(self) -> f64 {
        match self {
            Self::Auto | Self::Minibus | Self::Bus => 50.0,
            Self::Van => 45.0,
            Self::Truck | Self::Tractor => 40.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Minibus => "minibus",
            Self::Bus => "bus",
            Self::Van => "van",
            Self::Truck => "truck",
            Self::Tractor => "tractor",
        }
    }

    pub fn all() -> [VehicleClass; 6] {
        [
            Self::Auto,
            Self::Minibus,
            Self::Bus,
            Self::Van,
            Self::Truck,
            Self::Tractor,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for class in VehicleClass::all() {
            assert_eq!(VehicleClass::from_id(class.id() as i64), Some(class));
        }
    }

    #[test]
    fn unknown_ids_are_none() {
        assert_eq!(VehicleClass::from_id(0), None);
        assert_eq!(VehicleClass::from_id(7), None);
        assert_eq!(VehicleClass::from_id(-1), None);
    }

    #[test]
    fn heavier_classes_have_lower_urban_defaults() {
        assert_eq!(VehicleClass::Auto.default_urban_speed_kmh(), 50.0);
        assert_eq!(VehicleClass::Van.default_urban_speed_kmh(), 45.0);
        assert_eq!(VehicleClass::Truck.default_urban_speed_kmh(), 40.0);
    }
}
