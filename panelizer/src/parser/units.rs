//! Length units used by board documents.
//!
//! All geometry is computed in millimeters. Values read from a document are
//! scaled with [`Unit::to_millimeters`]; values written back are scaled with
//! [`Unit::from_millimeters`] so the document keeps its own unit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::PanelizerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    #[serde(rename = "mm")]
    Millimeter,
    #[serde(rename = "mic")]
    Micron,
    Mil,
    Inch,
}

impl Unit {
    pub const ALL: [Unit; 4] = [Unit::Millimeter, Unit::Micron, Unit::Mil, Unit::Inch];

    /// Millimeters per one unit.
    pub fn factor(self) -> f64 {
        match self {
            Unit::Millimeter => 1.0,
            Unit::Micron => 0.001,
            Unit::Mil => 0.0254,
            Unit::Inch => 25.4,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Unit::Millimeter => "mm",
            Unit::Micron => "mic",
            Unit::Mil => "mil",
            Unit::Inch => "inch",
        }
    }

    pub fn to_millimeters(self, raw: f64) -> f64 {
        raw * self.factor()
    }

    pub fn from_millimeters(self, mm: f64) -> f64 {
        mm / self.factor()
    }
}

impl FromStr for Unit {
    type Err = PanelizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mm" => Ok(Unit::Millimeter),
            "mic" => Ok(Unit::Micron),
            "mil" => Ok(Unit::Mil),
            "inch" => Ok(Unit::Inch),
            other => Err(PanelizerError::UnsupportedUnit(other.to_string())),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Convert a raw value expressed in the unit named by `unit` to millimeters.
pub fn convert(raw: f64, unit: &str) -> Result<f64, PanelizerError> {
    Ok(unit.parse::<Unit>()?.to_millimeters(raw))
}
