//! # Constants and type definitions for cometfit
//!
//! Physical constants, unit conversion factors and the scalar type aliases shared by every
//! module. Aliases carry the unit in their name so signatures read as `fn f(t: MJD, r: Au)`
//! rather than a row of bare `f64`.
//!
//! ## Overview
//!
//! - Astronomical constants (Gaussian gravitational constant, J2000 epoch and obliquity)
//! - Unit conversions (arcseconds, hours)
//! - Scalar aliases for angles, distances, velocities and dates
//! - [`CometId`], the key used when several comets are recomputed together
//! - [`Observations`], the inline container for one comet's observation set

use crate::observations::Observation;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of days in a Julian century
pub const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// Conversion factor between Julian Date and Modified Julian Date
pub const JDTOMJD: f64 = 2400000.5;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Hours → degrees
pub const DEG_PER_HOUR: f64 = 15.0;

/// Mean obliquity of the ecliptic at J2000.0 (IAU 1976), 84381.448″
pub const OBLIQUITY_J2000: Radian = 84_381.448 * RADSEC;

/// Gaussian gravitational constant k (AU^3/2 · day^-1)
pub const GAUSS_GRAV: f64 = 0.01720209895;

/// k², the heliocentric gravitational parameter μ☉ in AU³/day²
pub const GAUSS_GRAV_SQUARED: f64 = GAUSS_GRAV * GAUSS_GRAV;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in astronomical units
pub type Au = f64;
/// Velocity in astronomical units per day
pub type AuPerDay = f64;
/// Duration in days
pub type Days = f64;

/// Modified Julian Date (days, TDB scale)
pub type MJD = f64;

// -------------------------------------------------------------------------------------------------
// Identifiers and data containers
// -------------------------------------------------------------------------------------------------

/// Identifier of a comet.
///
/// - Numbered periodic comets are written `"<n>P"` (e.g. `"1P"` for Halley).
/// - Anything else (`"C/2020 F3"`, `"P/2019 LD2"`, a local tracking label…) is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CometId {
    /// Numbered periodic comet, `n` in `"nP"`.
    Periodic(u32),
    /// Provisional or free-form designation.
    Designation(String),
}

impl std::fmt::Display for CometId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CometId::Periodic(n) => write!(f, "{n}P"),
            CometId::Designation(s) => write!(f, "{s}"),
        }
    }
}

impl From<u32> for CometId {
    fn from(n: u32) -> Self {
        CometId::Periodic(n)
    }
}

impl From<&str> for CometId {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| CometId::Designation(s.to_string()))
    }
}

impl std::str::FromStr for CometId {
    type Err = std::convert::Infallible;

    /// `"12P"` and `"12p"` become `Periodic(12)`; every other string is a `Designation`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let numbered = trimmed
            .strip_suffix(['P', 'p'])
            .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u32>().ok());

        Ok(match numbered {
            Some(n) => CometId::Periodic(n),
            None => CometId::Designation(trimmed.to_string()),
        })
    }
}

/// A small, inline-optimized container for the observations of a single comet.
pub type Observations = SmallVec<[Observation; 6]>;

#[cfg(test)]
mod constants_test {
    use super::*;

    #[test]
    fn test_comet_id_parsing() {
        assert_eq!("1P".parse::<CometId>().unwrap(), CometId::Periodic(1));
        assert_eq!(CometId::from("67p"), CometId::Periodic(67));
        assert_eq!(
            CometId::from("C/2020 F3"),
            CometId::Designation("C/2020 F3".into())
        );
        assert_eq!(CometId::from("P"), CometId::Designation("P".into()));
        assert_eq!(CometId::Periodic(2).to_string(), "2P");
    }

    #[test]
    fn test_obliquity_value() {
        assert!((OBLIQUITY_J2000.to_degrees() - 23.439_291_111).abs() < 1e-9);
    }
}
