use serde::Serialize;
use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

/// Family of convertible units sharing one canonical unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumIter, EnumCount, Display)]
#[strum(serialize_all = "lowercase")]
pub enum UnitClass {
    /// Plain number; any suffix is rejected.
    None,
    /// Canonical unit: metre.
    Distance,
    /// Canonical unit: metre per second.
    Speed,
    /// Canonical unit: kilogram.
    Mass,
    /// Canonical unit: newton.
    Force,
    /// Canonical unit: watt.
    Power,
}

/// A concrete unit that may follow a numeric literal in a block file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumIter, EnumCount)]
pub enum Unit {
    Meters,
    Centimeters,
    Millimeters,
    Kilometers,
    Feet,
    Inches,
    Miles,
    MetersPerSecond,
    KilometersPerHour,
    MilesPerHour,
    Kilograms,
    Tonnes,
    Pounds,
    Newtons,
    Kilonewtons,
    PoundsForce,
    Watts,
    Kilowatts,
    Horsepower,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unit suffix `{suffix}` is not a {class} unit")]
pub struct UnitMismatch {
    pub suffix: String,
    pub class: UnitClass,
}

impl Unit {
    pub fn class(self) -> UnitClass {
        match self {
            Self::Meters
            | Self::Centimeters
            | Self::Millimeters
            | Self::Kilometers
            | Self::Feet
            | Self::Inches
            | Self::Miles => UnitClass::Distance,
            Self::MetersPerSecond | Self::KilometersPerHour | Self::MilesPerHour => {
                UnitClass::Speed
            }
            Self::Kilograms | Self::Tonnes | Self::Pounds => UnitClass::Mass,
            Self::Newtons | Self::Kilonewtons | Self::PoundsForce => UnitClass::Force,
            Self::Watts | Self::Kilowatts | Self::Horsepower => UnitClass::Power,
        }
    }

    /// Suffixes accepted for this unit, lowercase.
    pub fn suffixes(self) -> &'static [&'static str] {
        match self {
            Self::Meters => &["m"],
            Self::Centimeters => &["cm"],
            Self::Millimeters => &["mm"],
            Self::Kilometers => &["km"],
            Self::Feet => &["ft"],
            Self::Inches => &["in"],
            Self::Miles => &["mi"],
            Self::MetersPerSecond => &["m/s", "mps"],
            Self::KilometersPerHour => &["km/h", "kph", "kmh"],
            Self::MilesPerHour => &["mph"],
            Self::Kilograms => &["kg"],
            Self::Tonnes => &["t"],
            Self::Pounds => &["lb"],
            Self::Newtons => &["n"],
            Self::Kilonewtons => &["kn"],
            Self::PoundsForce => &["lbf"],
            Self::Watts => &["w"],
            Self::Kilowatts => &["kw"],
            Self::Horsepower => &["hp"],
        }
    }

    /// Multiplier taking a value in this unit to its class's canonical unit.
    pub fn to_canonical(self) -> f64 {
        match self {
            Self::Meters => 1.0,
            Self::Centimeters => 0.01,
            Self::Millimeters => 0.001,
            Self::Kilometers => 1000.0,
            Self::Feet => 0.3048,
            Self::Inches => 0.0254,
            Self::Miles => 1609.344,
            Self::MetersPerSecond => 1.0,
            Self::KilometersPerHour => 1000.0 / 3600.0,
            Self::MilesPerHour => 1609.344 / 3600.0,
            Self::Kilograms => 1.0,
            Self::Tonnes => 1000.0,
            Self::Pounds => 0.453_592_37,
            Self::Newtons => 1.0,
            Self::Kilonewtons => 1000.0,
            Self::PoundsForce => 4.448_221_615_260_5,
            Self::Watts => 1.0,
            Self::Kilowatts => 1000.0,
            Self::Horsepower => 745.699_871_582_270_2,
        }
    }

    pub fn convert(self, value: f64) -> f64 {
        value * self.to_canonical()
    }

    /// Resolve `suffix` within `class`. Case-insensitive.
    ///
    /// A suffix that names a unit of a different class is rejected the same
    /// way as an unknown one.
    pub fn from_suffix(class: UnitClass, suffix: &str) -> Result<Unit, UnitMismatch> {
        Unit::iter()
            .filter(|u| u.class() == class)
            .find(|u| u.suffixes().iter().any(|s| s.eq_ignore_ascii_case(suffix)))
            .ok_or_else(|| UnitMismatch {
                suffix: suffix.to_string(),
                class,
            })
    }
}
