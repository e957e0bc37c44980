//! Low-precision analytic Earth ephemeris.
//!
//! Mean orbital elements of the Earth–Moon barycenter with their linear rates, from
//! E. M. Standish, *Keplerian Elements for Approximate Positions of the Major Planets*
//! (JPL, table 1, valid 1800 AD – 2050 AD). The Moon offset of the geocenter (≈ 3·10⁻⁵ AU) is
//! not applied.
use nalgebra::Vector3;

use crate::{
    cometfit_errors::CometFitError,
    constants::MJD,
    ephemeris::{Body, EphemerisProvider},
    kepler::{solve_kepler_elliptic, KEPLER_EPS},
    ref_system::{ecliptic_to_equatorial, perifocal_rotation},
    time::julian_centuries_since_j2000,
};

/// First instant covered by the element table (1800-01-01, MJD).
pub const STANDISH_START: MJD = -21_504.0;

/// Last instant covered by the element table (2050-12-31, MJD).
pub const STANDISH_END: MJD = 70_171.0;

/// `(value at J2000, rate per Julian century)` for a, e, I, L, ϖ, Ω.
const EM_BARYCENTER: [(f64, f64); 6] = [
    (1.000_002_61, 0.000_005_62),
    (0.016_711_23, -0.000_043_92),
    (-0.000_015_31, -0.012_946_68),
    (100.464_571_66, 35_999.372_449_81),
    (102.937_681_93, 0.323_273_64),
    (0.0, 0.0),
];

/// Analytic Earth position from the Standish mean elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandishEarth;

impl StandishEarth {
    /// Heliocentric position in the ecliptic J2000 frame (AU).
    pub fn ecliptic_position(&self, time: MJD) -> Result<Vector3<f64>, CometFitError> {
        if !(STANDISH_START..=STANDISH_END).contains(&time) {
            return Err(CometFitError::Ephemeris(format!(
                "MJD {time} is outside the validity range [{STANDISH_START}, {STANDISH_END}] of the analytic Earth ephemeris"
            )));
        }

        let t = julian_centuries_since_j2000(time);
        let [a, e, incl, mean_lon, peri_lon, node] = EM_BARYCENTER.map(|(v0, rate)| v0 + rate * t);

        let mean_anomaly = (mean_lon - peri_lon).to_radians();
        let e_anom = solve_kepler_elliptic(mean_anomaly, e, KEPLER_EPS)?;
        let (sin_e, cos_e) = e_anom.sin_cos();

        let in_plane = Vector3::new(
            a * (cos_e - e),
            a * (1.0 - e * e).sqrt() * sin_e,
            0.0,
        );
        let rotation = perifocal_rotation(
            node.to_radians(),
            incl.to_radians(),
            (peri_lon - node).to_radians(),
        );
        Ok(rotation * in_plane)
    }
}

impl EphemerisProvider for StandishEarth {
    fn position_of(&self, body: Body, time: MJD) -> Result<Vector3<f64>, CometFitError> {
        match body {
            Body::Sun => Ok(Vector3::zeros()),
            Body::Earth => Ok(ecliptic_to_equatorial(&self.ecliptic_position(time)?)),
        }
    }
}

#[cfg(test)]
mod standish_test {
    use super::*;
    use crate::constants::T2000;
    use approx::assert_relative_eq;

    #[test]
    fn test_earth_at_j2000() {
        // Geocenter at 2000-01-01 12:00 TDB from DE405: (-0.1771, 0.8872, 0.3847) AU.
        let earth = StandishEarth.position_of(Body::Earth, T2000).unwrap();
        assert_relative_eq!(earth, Vector3::new(-0.1771, 0.8872, 0.3847), epsilon = 2e-3);
    }

    #[test]
    fn test_earth_distance_and_plane() {
        for k in 0..40 {
            let t = T2000 + 9.3 * k as f64;
            let ecl = StandishEarth.ecliptic_position(t).unwrap();
            assert!((0.98..1.02).contains(&ecl.norm()));
            assert!(ecl.z.abs() < 1e-4);
        }
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            StandishEarth.position_of(Body::Earth, 80_000.0),
            Err(CometFitError::Ephemeris(_))
        ));
        assert_eq!(
            StandishEarth.position_of(Body::Sun, 80_000.0).unwrap(),
            Vector3::zeros()
        );
    }
}
