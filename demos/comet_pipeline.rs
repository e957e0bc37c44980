use std::time::{Duration, Instant};

use cometfit::close_approach::SearchControl;
use cometfit::cometfit::{CometFit, CometSet};
use cometfit::cometfit_errors::CometFitError;
use cometfit::constants::{CometId, Observations};
use cometfit::observations::Observation;
use cometfit::orbit_type::OrbitalElements;
use cometfit::ref_system::{cartesian_to_radec, ReferencePlane};
use cometfit::time::parse_date_to_mjd;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

/// Synthesize RA/Dec measurements of `comet` as seen from Earth at the given epochs.
fn astrometry(
    engine: &CometFit,
    comet: &OrbitalElements,
    times: &[f64],
) -> Result<Vec<Observation>, CometFitError> {
    times
        .iter()
        .map(|&t| {
            let position = comet.to_state(engine.mu(), t)?.position;
            let earth = engine.observer_position(t)?;
            let (ra, dec, _) = cartesian_to_radec(&(position - earth));
            engine.observation_from_radec(t, ra, dec)
        })
        .collect()
}

fn main() -> Result<(), CometFitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let engine = CometFit::builder()
        .reference_plane(ReferencePlane::Ecliptic)
        .build()?;
    info!("{:#}", engine.iod_params());
    info!("{:#}", engine.approach_params());

    let epoch = parse_date_to_mjd("2025-03-01T00:00:00 TDB")?;

    // A Jupiter-family comet and a long-period one.
    let jfc = OrbitalElements::from_conic(
        epoch,
        1.35,
        0.55,
        11.0,
        75.0,
        190.0,
        epoch + 40.0,
        ReferencePlane::Ecliptic,
    )?;
    let long_period = OrbitalElements::from_conic(
        epoch,
        0.9,
        0.995,
        128.0,
        300.0,
        35.0,
        epoch + 25.0,
        ReferencePlane::Ecliptic,
    )?;

    let times: Vec<f64> = (0..6).map(|k| epoch + 2.0 * k as f64).collect();
    let observations = astrometry(&engine, &jfc, &times)?;

    let control = SearchControl::unbounded().with_deadline(Instant::now() + Duration::from_secs(30));
    let solution = engine.recompute_with_control(&observations, epoch, &control)?;
    println!("Reference orbit:\n{jfc}\n");
    println!("Fitted orbit:\n{solution}\n");

    let mut set = CometSet::default();
    set.insert(
        CometId::from("P/2025 D1"),
        observations.into_iter().collect::<Observations>(),
    );
    set.insert(
        CometId::from("C/2025 E2"),
        astrometry(&engine, &long_period, &times)?
            .into_iter()
            .collect(),
    );

    for (id, result) in engine.recompute_many(&set, epoch) {
        match result {
            Ok(solution) => println!(
                "{id}: q = {:.4} AU, e = {:.4}, {}",
                solution.elements.perihelion_distance,
                solution.elements.eccentricity,
                solution.close_approach
            ),
            Err(err) => println!("{id}: {err}"),
        }
    }

    Ok(())
}
