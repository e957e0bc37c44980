//! Observer on a fixed two-body orbit.
//!
//! [`FixedOrbitEphemeris`] places Earth on a given Keplerian orbit around the Sun. It is exact
//! for synthetic scenarios (observations generated from the same orbit) and lets tests declare
//! a validity window to exercise lookup failures.
use nalgebra::Vector3;

use crate::{
    cometfit_errors::CometFitError,
    constants::{Au, Degree, MJD},
    ephemeris::{Body, EphemerisProvider},
    orbit_type::keplerian_element::OrbitalElements,
    ref_system::ReferencePlane,
};

/// Earth on a fixed Keplerian orbit.
#[derive(Debug, Clone)]
pub struct FixedOrbitEphemeris {
    orbit: OrbitalElements,
    mu: f64,
    validity: Option<(MJD, MJD)>,
}

impl FixedOrbitEphemeris {
    pub fn new(orbit: OrbitalElements, mu: f64) -> Self {
        FixedOrbitEphemeris {
            orbit,
            mu,
            validity: None,
        }
    }

    /// Circular orbit in the ecliptic plane.
    ///
    /// Arguments
    /// ---------
    /// * `radius`: orbital radius (AU).
    /// * `longitude`: ecliptic longitude of the body at `epoch` (degrees).
    /// * `epoch`: reference instant (MJD).
    /// * `mu`: gravitational parameter (AU³/day²).
    pub fn circular(
        radius: Au,
        longitude: Degree,
        epoch: MJD,
        mu: f64,
    ) -> Result<Self, CometFitError> {
        let mean_motion = (mu / radius.powi(3)).sqrt();
        let pericenter_time = epoch - longitude.to_radians() / mean_motion;
        let orbit = OrbitalElements::from_conic(
            epoch,
            radius,
            0.0,
            0.0,
            0.0,
            0.0,
            pericenter_time,
            ReferencePlane::Ecliptic,
        )?;
        Ok(FixedOrbitEphemeris::new(orbit, mu))
    }

    /// Restrict lookups to `[start, end]`; other instants fail with
    /// [`CometFitError::Ephemeris`].
    pub fn with_validity(mut self, start: MJD, end: MJD) -> Self {
        self.validity = Some((start, end));
        self
    }

    pub fn orbit(&self) -> &OrbitalElements {
        &self.orbit
    }
}

impl EphemerisProvider for FixedOrbitEphemeris {
    fn position_of(&self, body: Body, time: MJD) -> Result<Vector3<f64>, CometFitError> {
        if let Some((start, end)) = self.validity {
            if !(start..=end).contains(&time) {
                return Err(CometFitError::Ephemeris(format!(
                    "MJD {time} is outside the ephemeris window [{start}, {end}]"
                )));
            }
        }
        match body {
            Body::Sun => Ok(Vector3::zeros()),
            Body::Earth => Ok(self.orbit.to_state(self.mu, time)?.position),
        }
    }
}

#[cfg(test)]
mod fixed_orbit_test {
    use super::*;
    use crate::{constants::GAUSS_GRAV_SQUARED, ref_system::ecliptic_to_equatorial};
    use approx::assert_relative_eq;

    #[test]
    fn test_circular_longitude() {
        let ephem = FixedOrbitEphemeris::circular(1.0, 90.0, 60000.0, GAUSS_GRAV_SQUARED).unwrap();
        let earth = ephem.position_of(Body::Earth, 60000.0).unwrap();
        assert_relative_eq!(earth, ecliptic_to_equatorial(&Vector3::y()), epsilon = 1e-12);
    }

    #[test]
    fn test_validity_window() {
        let ephem = FixedOrbitEphemeris::circular(1.0, 0.0, 60000.0, GAUSS_GRAV_SQUARED)
            .unwrap()
            .with_validity(60000.0, 60010.0);
        assert!(ephem.position_of(Body::Earth, 60005.0).is_ok());
        assert!(matches!(
            ephem.position_of(Body::Earth, 60011.0),
            Err(CometFitError::Ephemeris(_))
        ));
    }
}
