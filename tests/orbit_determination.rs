mod common;

use approx::assert_relative_eq;
use cometfit::cometfit::CometFit;
use cometfit::cometfit_errors::CometFitError;
use cometfit::observations::Observation;
use cometfit::orbit_type::StateVector;
use nalgebra::Vector3;

use crate::common::{assert_angle_close, assert_element_invariants, Scenario, MU};

#[test]
fn test_opposition_circular_orbit() {
    let scenario = Scenario::opposition();
    let engine = scenario.engine();
    let obs = scenario.observations(&[59990.0, 60000.0, 60010.0]);

    let elements = engine.determine_orbit(&obs).unwrap();
    assert_element_invariants(&elements);

    let state = elements.to_state(MU, elements.epoch).unwrap();
    assert_relative_eq!(state.distance(), 1.5, max_relative = 1e-2);
    assert!(elements.eccentricity <= 1e-2);
    assert_relative_eq!(elements.semi_major_axis, 1.5, max_relative = 1e-2);
    assert!(elements.fit_residual.is_some());
}

#[test]
fn test_eccentric_orbit_round_trip() {
    let scenario = Scenario::eccentric();
    let engine = scenario.engine();
    let obs = scenario.observations(&[-0.5, -0.25, 0.0, 0.25, 0.5]);

    let elements = engine.determine_orbit(&obs).unwrap();
    let expected = &scenario.comet;

    assert_element_invariants(&elements);
    assert_eq!(elements.epoch, 0.0);
    assert_relative_eq!(
        elements.semi_major_axis,
        expected.semi_major_axis,
        max_relative = 1e-3
    );
    assert_relative_eq!(
        elements.eccentricity,
        expected.eccentricity,
        max_relative = 1e-3
    );
    assert_relative_eq!(elements.inclination, expected.inclination, epsilon = 1e-2);
    assert_angle_close(
        elements.longitude_of_ascending_node,
        expected.longitude_of_ascending_node,
        1e-2,
    );
    assert_angle_close(
        elements.argument_of_pericenter,
        expected.argument_of_pericenter,
        1e-2,
    );
}

#[test]
fn test_insufficient_observations() {
    let scenario = Scenario::opposition();
    let engine = scenario.engine();

    let obs = scenario.observations(&[59990.0, 60000.0]);
    assert_eq!(
        engine.determine_orbit(&obs),
        Err(CometFitError::InsufficientObservations {
            found: 2,
            required: 3
        })
    );
    assert_eq!(
        engine.recompute(&[], 60000.0),
        Err(CometFitError::InsufficientObservations {
            found: 0,
            required: 3
        })
    );
}

#[test]
fn test_collinear_lines_of_sight() {
    let engine = CometFit::default();
    let direction = Vector3::new(0.3, 0.9, 0.1);
    let obs: Vec<Observation> = [(60000.0, 0.0), (60005.0, 0.08), (60010.0, 0.17)]
        .into_iter()
        .map(|(t, lon): (f64, f64)| {
            let observer = Vector3::new(lon.cos(), lon.sin(), 0.0);
            Observation::new(t, direction, observer).unwrap()
        })
        .collect();

    assert!(matches!(
        engine.determine_orbit(&obs),
        Err(CometFitError::DegenerateGeometry(_))
    ));
}

#[test]
fn test_nearly_collinear_lines_of_sight() {
    let engine = CometFit::default();
    let direction = Vector3::new(0.3, 0.9, 0.1).normalize();
    let tilts = [
        Vector3::zeros(),
        Vector3::new(0.0, 0.0, 1.0),
        Vector3::new(1.0, -1.0, 0.0).normalize(),
    ];

    for eps in [1e-5, 1e-7, 1e-10] {
        let obs: Vec<Observation> = [(60000.0, 0.0), (60005.0, 0.08), (60010.0, 0.17)]
            .into_iter()
            .zip(tilts)
            .map(|((t, lon), tilt): ((f64, f64), Vector3<f64>)| {
                let observer = Vector3::new(lon.cos(), lon.sin(), 0.0);
                Observation::new(t, direction + eps * tilt, observer).unwrap()
            })
            .collect();

        assert!(
            matches!(
                engine.determine_orbit(&obs),
                Err(CometFitError::DegenerateGeometry(_))
            ),
            "tilt of {eps} rad between lines of sight"
        );
    }
}

#[test]
fn test_duplicate_epochs_are_degenerate() {
    let scenario = Scenario::opposition();
    let engine = scenario.engine();
    let mut obs = scenario.observations(&[60000.0, 60010.0]);
    obs.push(obs[0].clone());

    assert!(matches!(
        engine.determine_orbit(&obs),
        Err(CometFitError::DegenerateGeometry(_))
    ));
}

#[test]
fn test_recompute_returns_both_products() {
    let scenario = Scenario::opposition();
    let engine = scenario.engine();
    let obs = scenario.observations(&[59990.0, 60000.0, 60010.0]);

    let solution = engine.recompute(&obs, 60000.0).unwrap();
    let window = engine.approach_params().window_days;

    let approach = &solution.close_approach;
    assert!(!approach.partial);
    assert_eq!(approach.skipped_samples, 0);
    assert!((60000.0..=60000.0 + window).contains(&approach.approach_time));
    // Circular orbits of radii 1 and 1.5 AU never come closer than 0.5 AU; the opposition at
    // MJD 60000 is at 0.656 AU.
    assert!(approach.minimum_distance >= 0.49, "{approach}");
    assert!(approach.minimum_distance <= 0.66, "{approach}");
}

#[test]
fn test_invalid_state_vector() {
    let state = StateVector {
        position: Vector3::new(f64::NAN, 0.0, 0.0),
        velocity: Vector3::zeros(),
        epoch: 0.0,
    };
    assert!(matches!(
        state.validate(),
        Err(CometFitError::InvalidStateVector(_))
    ));
}
