//! # Astrometric observations
//!
//! An [`Observation`] is one angle-only measurement of a comet: the instant it was taken, the
//! unit line-of-sight vector from the observer to the comet, and the heliocentric position of
//! the observer at that instant. Everything is expressed in the equatorial J2000 frame, with
//! distances in AU and times in MJD (TDB).
//!
//! ## Construction
//!
//! - [`Observation::new`] – from a direction vector (normalized on the way in).
//! - [`Observation::from_radec`] – from right ascension / declination in degrees.
//! - [`Observation::from_sexagesimal`] – from `"HH MM SS.ss"` / `"±DD MM SS.s"` strings.
//!
//! When the observer position is not known by the caller,
//! [`CometFit::observation_from_radec`](crate::cometfit::CometFit::observation_from_radec)
//! looks it up in the configured ephemeris.
//!
//! ## See also
//!
//! - [`residuals`] – RMS of the angular residuals of a fitted orbit.
//! - [`sort_by_time`] – in-place chronological ordering.
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    cometfit_errors::CometFitError,
    constants::{Degree, Radian, MJD},
    conversion::{parse_dec_to_deg, parse_ra_to_deg},
    ref_system::{angular_separation, cartesian_to_radec, line_of_sight},
};

pub mod residuals;

/// One angle-only astrometric observation.
///
/// Fields
/// -----------------
/// * `time` – epoch of the measurement, MJD (TDB).
/// * `line_of_sight` – unit vector from the observer toward the comet (equatorial J2000).
/// * `observer_position` – heliocentric observer position (AU, equatorial J2000).
///
/// Observations are immutable once captured; build a new one rather than editing a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    time: MJD,
    line_of_sight: Vector3<f64>,
    observer_position: Vector3<f64>,
}

impl Observation {
    /// Build an observation from a direction vector.
    ///
    /// Arguments
    /// -----------------
    /// * `time`: epoch, MJD (TDB).
    /// * `direction`: observer → comet direction, any non-zero length.
    /// * `observer_position`: heliocentric observer position (AU).
    ///
    /// Return
    /// ----------
    /// * The observation with a normalized line of sight, or
    ///   [`CometFitError::InvalidAngle`] for a null or non-finite direction and
    ///   [`CometFitError::InvalidParameter`] for a non-finite time or observer position.
    pub fn new(
        time: MJD,
        direction: Vector3<f64>,
        observer_position: Vector3<f64>,
    ) -> Result<Self, CometFitError> {
        if !time.is_finite() {
            return Err(CometFitError::InvalidParameter(format!(
                "observation time must be finite, got {time}"
            )));
        }
        if !observer_position.iter().all(|c| c.is_finite()) {
            return Err(CometFitError::InvalidParameter(
                "observer position must be finite".into(),
            ));
        }

        let norm = direction.norm();
        if !(norm.is_finite() && norm > 0.0) {
            return Err(CometFitError::InvalidAngle(
                "line of sight must be a finite non-zero vector".into(),
            ));
        }

        Ok(Observation {
            time,
            line_of_sight: direction / norm,
            observer_position,
        })
    }

    /// Build an observation from right ascension and declination in degrees.
    pub fn from_radec(
        time: MJD,
        ra: Degree,
        dec: Degree,
        observer_position: Vector3<f64>,
    ) -> Result<Self, CometFitError> {
        let los = line_of_sight(ra, dec)?;
        Observation::new(time, los.into_inner(), observer_position)
    }

    /// Build an observation from sexagesimal right ascension (`HH MM SS.ss`, hours) and
    /// declination (`±DD MM SS.s`). Colons are accepted as separators.
    pub fn from_sexagesimal(
        time: MJD,
        ra: &str,
        dec: &str,
        observer_position: Vector3<f64>,
    ) -> Result<Self, CometFitError> {
        let (ra_deg, _) = parse_ra_to_deg(ra)?;
        let (dec_deg, _) = parse_dec_to_deg(dec)?;
        Observation::from_radec(time, ra_deg, dec_deg, observer_position)
    }

    pub fn time(&self) -> MJD {
        self.time
    }

    pub fn line_of_sight(&self) -> &Vector3<f64> {
        &self.line_of_sight
    }

    pub fn observer_position(&self) -> &Vector3<f64> {
        &self.observer_position
    }

    /// Right ascension and declination of the line of sight, in degrees.
    pub fn radec(&self) -> (Degree, Degree) {
        let (ra, dec, _) = cartesian_to_radec(&self.line_of_sight);
        (ra, dec)
    }

    /// Angle between the measured line of sight and the direction from the observer to a
    /// predicted heliocentric position.
    pub fn angular_residual(&self, predicted_position: &Vector3<f64>) -> Radian {
        let predicted_direction = predicted_position - self.observer_position;
        angular_separation(&self.line_of_sight, &predicted_direction)
    }
}

/// Sort observations chronologically in place.
pub fn sort_by_time(observations: &mut [Observation]) {
    observations.sort_by(|a, b| a.time.total_cmp(&b.time));
}
