mod common;

use approx::assert_relative_eq;
use cometfit::cometfit_errors::{Degeneracy, SoftCondition};
use cometfit::kepler::{solve_kepler_elliptic, solve_kepler_hyperbolic, KEPLER_EPS};
use cometfit::orbit_type::keplerian_element::CIRCULAR_ECC_EPS;
use cometfit::orbit_type::OrbitalElements;
use cometfit::propagator::{KeplerPropagator, PropagationMethod, Propagator};
use cometfit::ref_system::ReferencePlane;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::common::{assert_angle_close, assert_element_invariants, assert_orbit_close, MU};

/// Random orbit away from the degenerate cases (circular, equatorial).
fn random_orbit(rng: &mut StdRng, eccentricity: f64, plane: ReferencePlane) -> OrbitalElements {
    let q: f64 = rng.random_range(0.3..5.0);
    let epoch: f64 = 60000.0;
    let t0 = if eccentricity < 1.0 {
        let n = (MU * (1.0 - eccentricity).powi(3) / q.powi(3)).sqrt();
        let mean_anomaly: f64 = rng.random_range(-2.8..2.8);
        epoch - mean_anomaly / n
    } else {
        epoch + rng.random_range(-200.0..200.0)
    };
    OrbitalElements::from_conic(
        epoch,
        q,
        eccentricity,
        rng.random_range(5.0..175.0),
        rng.random_range(0.0..360.0),
        rng.random_range(0.0..360.0),
        t0,
        plane,
    )
    .unwrap()
}

#[test]
fn test_elliptic_round_trip() {
    let mut rng = StdRng::seed_from_u64(42);
    for plane in [ReferencePlane::Ecliptic, ReferencePlane::Equatorial] {
        for _ in 0..200 {
            let eccentricity: f64 = rng.random_range(0.01..0.99);
            let orbit = random_orbit(&mut rng, eccentricity, plane);

            let state = orbit.to_state(MU, orbit.epoch).unwrap();
            let back = OrbitalElements::from_state(&state, MU, plane).unwrap();

            assert_element_invariants(&back);
            assert_orbit_close(&back, &orbit, 1e-7);
            assert_relative_eq!(
                back.semi_major_axis,
                orbit.semi_major_axis,
                max_relative = 1e-8
            );
            assert_relative_eq!(
                back.time_of_pericenter_passage,
                orbit.time_of_pericenter_passage,
                epsilon = 1e-5
            );
            assert!(back.warnings.is_empty());
        }
    }
}

#[test]
fn test_hyperbolic_round_trip() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..100 {
        let eccentricity: f64 = rng.random_range(1.05..4.0);
        let orbit = random_orbit(&mut rng, eccentricity, ReferencePlane::Ecliptic);

        let state = orbit.to_state(MU, orbit.epoch).unwrap();
        let back = OrbitalElements::from_state(&state, MU, ReferencePlane::Ecliptic).unwrap();

        assert_element_invariants(&back);
        assert!(back.semi_major_axis < 0.0);
        assert_orbit_close(&back, &orbit, 1e-7);
        assert_relative_eq!(
            back.time_of_pericenter_passage,
            orbit.time_of_pericenter_passage,
            epsilon = 1e-5
        );
    }
}

#[test]
fn test_near_circular_pericenter_flag() {
    let flagged = |elements: &OrbitalElements| {
        elements
            .warnings
            .contains(&SoftCondition::DegenerateOrbit(Degeneracy::UndefinedPericenter))
    };

    for eccentricity in [0.0, 1e-12, 0.5 * CIRCULAR_ECC_EPS] {
        let orbit = OrbitalElements::from_conic(
            60000.0,
            1.3,
            eccentricity,
            35.0,
            120.0,
            0.0,
            59990.0,
            ReferencePlane::Equatorial,
        )
        .unwrap();
        let state = orbit.to_state(MU, orbit.epoch).unwrap();
        let back = OrbitalElements::from_state(&state, MU, ReferencePlane::Equatorial).unwrap();

        assert!(flagged(&back), "e = {eccentricity} should leave ω undefined");
        assert!(back.is_low_confidence());
        assert_eq!(back.argument_of_pericenter, 0.0);
        assert_relative_eq!(back.inclination, 35.0, epsilon = 1e-9);
        assert_angle_close(back.longitude_of_ascending_node, 120.0, 1e-9);
    }

    for eccentricity in [1e-6, 1e-3] {
        let orbit = OrbitalElements::from_conic(
            60000.0,
            1.3,
            eccentricity,
            35.0,
            120.0,
            75.0,
            59990.0,
            ReferencePlane::Equatorial,
        )
        .unwrap();
        let state = orbit.to_state(MU, orbit.epoch).unwrap();
        let back = OrbitalElements::from_state(&state, MU, ReferencePlane::Equatorial).unwrap();

        assert!(!flagged(&back), "e = {eccentricity} has a defined pericenter");
        assert_relative_eq!(back.eccentricity, eccentricity, max_relative = 1e-6);
        assert_angle_close(back.argument_of_pericenter, 75.0, 1e-6);
    }
}

#[test]
fn test_kepler_solver_sweep() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..2000 {
        let e: f64 = rng.random_range(0.0..0.99);
        let m: f64 = rng.random_range(-20.0..20.0);
        let ecc_anom = solve_kepler_elliptic(m, e, KEPLER_EPS).unwrap();
        assert_relative_eq!(ecc_anom - e * ecc_anom.sin(), m, epsilon = 1e-10);
    }
    for _ in 0..2000 {
        let e: f64 = rng.random_range(1.001..5.0);
        let m: f64 = rng.random_range(-100.0..100.0);
        let hyp_anom = solve_kepler_hyperbolic(m, e, KEPLER_EPS).unwrap();
        let residual = e * hyp_anom.sinh() - hyp_anom - m;
        // Relative to the slope, the residual is the error on the anomaly.
        assert!(residual.abs() / (e * hyp_anom.cosh() - 1.0) < 1e-9);
    }
}

#[test]
fn test_propagators_agree() {
    let mut rng = StdRng::seed_from_u64(99);
    for eccentricity in [0.1, 0.5, 0.8] {
        let orbit = random_orbit(&mut rng, eccentricity, ReferencePlane::Ecliptic);
        let kepler = KeplerPropagator::new(orbit.clone(), MU);
        let integrator = PropagationMethod::TwoBodyIntegration { step_days: 0.05 }
            .propagator(&orbit, MU)
            .unwrap();

        let times = [orbit.epoch - 30.0, orbit.epoch + 10.0, orbit.epoch + 60.0];
        for (analytic, numeric) in kepler
            .propagate_many(&times)
            .into_iter()
            .zip(integrator.propagate_many(&times))
        {
            let (analytic, numeric) = (analytic.unwrap(), numeric.unwrap());
            assert_eq!(analytic.epoch, numeric.epoch);
            assert_relative_eq!(analytic.position, numeric.position, epsilon = 1e-7);
            assert_relative_eq!(analytic.velocity, numeric.velocity, epsilon = 1e-8);
        }
    }
}
