use itertools::Itertools;
use tracing::debug;

use crate::{cometfit_errors::CometFitError, observations::Observation};

/// Pick the observation triplet used by the Gauss method.
///
/// Arguments
/// -----------------
/// * `observations`: observations sorted by time.
///
/// Return
/// ----------
/// * The indices `(first, middle, last)`, where `middle` is the interior observation nearest to
///   the temporal midpoint of the arc (earliest one on ties), or
///   [`CometFitError::InsufficientObservations`] for fewer than three observations.
pub fn select_triplet(observations: &[Observation]) -> Result<(usize, usize, usize), CometFitError> {
    let n = observations.len();
    if n < 3 {
        return Err(CometFitError::InsufficientObservations {
            found: n,
            required: 3,
        });
    }

    let first = 0;
    let last = n - 1;
    let midpoint = 0.5 * (observations[first].time() + observations[last].time());

    let middle = (1..last)
        .position_min_by(|&a, &b| {
            let da = (observations[a].time() - midpoint).abs();
            let db = (observations[b].time() - midpoint).abs();
            da.total_cmp(&db)
        })
        .map(|offset| offset + 1)
        .unwrap_or(1);

    debug!(
        first = observations[first].time(),
        middle = observations[middle].time(),
        last = observations[last].time(),
        "selected Gauss triplet"
    );

    Ok((first, middle, last))
}
