//! Angular residuals of observations against a propagated orbit.
use crate::{
    cometfit_errors::CometFitError, constants::ArcSec, observations::Observation,
    propagator::Propagator,
};

/// Root-mean-square of the angular residuals of `observations` against an orbit.
///
/// Arguments
/// ---------
/// * `observations`: measured lines of sight with their observer positions.
/// * `propagator`: orbit to test.
///
/// Return
/// ------
/// * RMS angular separation between measured and predicted directions, in arcseconds.
///   Light time is not corrected for.
/// * [`CometFitError::InsufficientObservations`] for an empty slice, or the first propagation
///   error.
pub fn rms_residual(
    observations: &[Observation],
    propagator: &dyn Propagator,
) -> Result<ArcSec, CometFitError> {
    if observations.is_empty() {
        return Err(CometFitError::InsufficientObservations {
            found: 0,
            required: 1,
        });
    }

    let times: Vec<f64> = observations.iter().map(Observation::time).collect();
    let states = propagator.propagate_many(&times);

    let mut sum_sq = 0.0;
    for (obs, state) in observations.iter().zip(states) {
        let residual = obs.angular_residual(&state?.position).to_degrees() * 3600.0;
        sum_sq += residual * residual;
    }

    Ok((sum_sq / observations.len() as f64).sqrt())
}
