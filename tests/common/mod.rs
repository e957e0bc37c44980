#![allow(dead_code)]

use approx::assert_relative_eq;
use cometfit::cometfit::CometFit;
use cometfit::constants::{Degree, GAUSS_GRAV_SQUARED, MJD};
use cometfit::ephemeris::fixed_orbit::FixedOrbitEphemeris;
use cometfit::ephemeris::{Body, EphemerisProvider};
use cometfit::kepler::angle_diff;
use cometfit::observations::Observation;
use cometfit::orbit_type::OrbitalElements;
use cometfit::ref_system::ReferencePlane;

pub const MU: f64 = GAUSS_GRAV_SQUARED;

/// A comet on a fixed two-body orbit observed from Earth on a circular 1 AU orbit.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub comet: OrbitalElements,
    pub earth: FixedOrbitEphemeris,
}

impl Scenario {
    /// Circular 1.5 AU orbit inclined by 20°, at opposition and at its highest latitude at
    /// MJD 60000.
    pub fn opposition() -> Self {
        let node = 0.3f64.to_degrees();
        let n = (MU / 1.5f64.powi(3)).sqrt();
        let comet = OrbitalElements::from_conic(
            60000.0,
            1.5,
            0.0,
            20.0,
            node,
            0.0,
            60000.0 - std::f64::consts::FRAC_PI_2 / n,
            ReferencePlane::Ecliptic,
        )
        .unwrap();
        let earth = FixedOrbitEphemeris::circular(1.0, node + 90.0, 60000.0, MU).unwrap();
        Scenario { comet, earth }
    }

    /// a = 2.2 AU, e = 0.35, i = 25°, Ω = 80°, ω = 40°, M = 10° at MJD 0; Earth leads the
    /// comet by 0.2 rad of ecliptic longitude at MJD 0.
    pub fn eccentric() -> Self {
        let a: f64 = 2.2;
        let e = 0.35;
        let n = (MU / a.powi(3)).sqrt();
        let comet = OrbitalElements::from_conic(
            0.0,
            a * (1.0 - e),
            e,
            25.0,
            80.0,
            40.0,
            -10f64.to_radians() / n,
            ReferencePlane::Ecliptic,
        )
        .unwrap();

        let c0 = ReferencePlane::Ecliptic.from_equatorial(&comet.to_state(MU, 0.0).unwrap().position);
        let longitude = c0.y.atan2(c0.x).to_degrees() + 0.2f64.to_degrees();
        let earth = FixedOrbitEphemeris::circular(1.0, longitude, 0.0, MU).unwrap();
        Scenario { comet, earth }
    }

    /// Exact observations (no light time, no noise) at the given epochs.
    pub fn observations(&self, times: &[MJD]) -> Vec<Observation> {
        times
            .iter()
            .map(|&t| {
                let c = self.comet.to_state(MU, t).unwrap().position;
                let e = self.earth.position_of(Body::Earth, t).unwrap();
                Observation::new(t, c - e, e).unwrap()
            })
            .collect()
    }

    /// Engine observing from this scenario's Earth, reporting elements in the comet's plane.
    pub fn engine(&self) -> CometFit {
        CometFit::builder()
            .ephemeris(self.earth.clone())
            .reference_plane(self.comet.reference_plane)
            .build()
            .unwrap()
    }
}

/// Angles compared on the circle, in degrees.
pub fn assert_angle_close(actual: Degree, expected: Degree, epsilon: Degree) {
    let diff = angle_diff(actual.to_radians(), expected.to_radians()).to_degrees();
    assert!(
        diff.abs() <= epsilon,
        "angle {actual}° differs from {expected}° by {diff}°"
    );
}

/// Range invariants every element set must satisfy.
pub fn assert_element_invariants(elements: &OrbitalElements) {
    assert!(elements.eccentricity >= 0.0);
    assert!((0.0..=180.0).contains(&elements.inclination));
    assert!((0.0..360.0).contains(&elements.longitude_of_ascending_node));
    assert!((0.0..360.0).contains(&elements.argument_of_pericenter));
    assert!(elements.perihelion_distance.is_finite());
}

/// Shape and orientation of two orbits agree.
pub fn assert_orbit_close(actual: &OrbitalElements, expected: &OrbitalElements, angle_eps: Degree) {
    assert_relative_eq!(
        actual.perihelion_distance,
        expected.perihelion_distance,
        max_relative = 1e-9
    );
    assert_relative_eq!(actual.eccentricity, expected.eccentricity, epsilon = 1e-9);
    assert_relative_eq!(actual.inclination, expected.inclination, epsilon = angle_eps);
    assert_angle_close(
        actual.longitude_of_ascending_node,
        expected.longitude_of_ascending_node,
        angle_eps,
    );
    assert_angle_close(
        actual.argument_of_pericenter,
        expected.argument_of_pericenter,
        angle_eps,
    );
}
