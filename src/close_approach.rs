//! # Close-approach search
//!
//! Finds the minimum comet–Earth distance over a time window starting at a given epoch.
//!
//! ## Algorithm
//!
//! 1. **Coarse scan** – the window `[start, start + window_days]` is sampled every
//!    `step_days`, shortened to `period / min_samples_per_orbit` for short-period comets.
//!    Epochs are processed in batches of `batch_size`: one `propagate_many` call on the
//!    [`Propagator`] and one `positions_of` call on the [`EphemerisProvider`] per batch.
//!    Samples whose propagation or ephemeris lookup fails are skipped and counted.
//! 2. **Local minima** – interior samples not larger than their neighbours, plus a window edge
//!    when the distance still decreases towards it.
//! 3. **Refinement** – the `refine_candidates` smallest minima are refined by golden-section
//!    search on `[t − step, t + step]` down to `refine_tolerance_days`.
//!
//! ## Cancellation
//!
//! A [`SearchControl`] carries an optional [`CancellationToken`] and an optional deadline. Both
//! are checked between batches and between refinement iterations; once triggered, the best
//! distance found so far is returned with [`CloseApproach::partial`] set.
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    cometfit_errors::CometFitError,
    constants::{Au, Days, MJD},
    ephemeris::{Body, EphemerisProvider},
    propagator::Propagator,
};

/// `1/φ`, the golden-section shrink factor.
const INV_GOLDEN_RATIO: f64 = 0.618_033_988_749_894_8;

/// Configuration of the close-approach search.
///
/// Validation rules
/// -----------------
/// * `window_days > 0`, `step_days > 0`, `step_days ≤ window_days`.
/// * `min_samples_per_orbit ≥ 1`, `batch_size ≥ 1`, `refine_candidates ≥ 1`.
/// * `refine_tolerance_days > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproachParams {
    /// Length of the searched window (days).
    pub window_days: Days,
    /// Coarse sampling step (days).
    pub step_days: Days,
    /// Minimum number of coarse samples per orbital period.
    pub min_samples_per_orbit: usize,
    /// Number of epochs per propagation and ephemeris batch.
    pub batch_size: usize,
    /// Number of coarse minima refined.
    pub refine_candidates: usize,
    /// Width of the golden-section bracket at which refinement stops (days).
    pub refine_tolerance_days: Days,
}

impl ApproachParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ApproachParamsBuilder {
        ApproachParamsBuilder::new()
    }

    /// Check the validation rules listed on [`ApproachParams`].
    pub fn validate(&self) -> Result<(), CometFitError> {
        let positive = |x: f64| x.is_finite() && x > 0.0;
        let invalid = |msg: &str| Err(CometFitError::InvalidParameter(msg.into()));

        if !positive(self.window_days) {
            return invalid("window_days must be > 0");
        }
        if !positive(self.step_days) || self.step_days > self.window_days {
            return invalid("require 0 < step_days <= window_days");
        }
        if self.min_samples_per_orbit == 0 {
            return invalid("min_samples_per_orbit must be >= 1");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be >= 1");
        }
        if self.refine_candidates == 0 {
            return invalid("refine_candidates must be >= 1");
        }
        if !positive(self.refine_tolerance_days) {
            return invalid("refine_tolerance_days must be > 0");
        }
        Ok(())
    }

    /// Coarse step for an orbit of the given period (days).
    pub fn effective_step(&self, period: Option<Days>) -> Days {
        match period {
            Some(p) if p.is_finite() && p > 0.0 => {
                self.step_days.min(p / self.min_samples_per_orbit as f64)
            }
            _ => self.step_days,
        }
    }
}

impl Default for ApproachParams {
    fn default() -> Self {
        ApproachParams {
            window_days: 1826.25,
            step_days: 1.0,
            min_samples_per_orbit: 20,
            batch_size: 64,
            refine_candidates: 3,
            refine_tolerance_days: 1e-4,
        }
    }
}

/// Fluent builder for [`ApproachParams`].
#[derive(Debug, Clone, Default)]
pub struct ApproachParamsBuilder {
    params: ApproachParams,
}

impl ApproachParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window_days(mut self, v: Days) -> Self {
        self.params.window_days = v;
        self
    }
    pub fn step_days(mut self, v: Days) -> Self {
        self.params.step_days = v;
        self
    }
    pub fn min_samples_per_orbit(mut self, v: usize) -> Self {
        self.params.min_samples_per_orbit = v;
        self
    }
    pub fn batch_size(mut self, v: usize) -> Self {
        self.params.batch_size = v;
        self
    }
    pub fn refine_candidates(mut self, v: usize) -> Self {
        self.params.refine_candidates = v;
        self
    }
    pub fn refine_tolerance_days(mut self, v: Days) -> Self {
        self.params.refine_tolerance_days = v;
        self
    }

    /// Validate and produce the [`ApproachParams`].
    ///
    /// Return
    /// ----------
    /// * `Ok(ApproachParams)`, or [`CometFitError::InvalidParameter`] naming the first
    ///   offending field.
    pub fn build(self) -> Result<ApproachParams, CometFitError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

impl fmt::Display for ApproachParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Close Approach Search Parameters")?;
            writeln!(f, "--------------------------------")?;
            writeln!(
                f,
                "  window_days           = {:.2} d       # Searched window",
                self.window_days
            )?;
            writeln!(
                f,
                "  step_days             = {:.4} d       # Coarse sampling step",
                self.step_days
            )?;
            writeln!(
                f,
                "  min_samples_per_orbit = {}            # Step cap for short periods",
                self.min_samples_per_orbit
            )?;
            writeln!(
                f,
                "  batch_size            = {}            # Epochs per batch",
                self.batch_size
            )?;
            writeln!(
                f,
                "  refine_candidates     = {}            # Refined coarse minima",
                self.refine_candidates
            )?;
            writeln!(
                f,
                "  refine_tolerance_days = {:.1e} d  # Golden-section stop",
                self.refine_tolerance_days
            )
        } else {
            write!(
                f,
                "ApproachParams(window={:.1}d, step={:.3}d, batch={}, refine={}, tol={:.1e}d)",
                self.window_days,
                self.step_days,
                self.batch_size,
                self.refine_candidates,
                self.refine_tolerance_days
            )
        }
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Stop conditions of a search.
#[derive(Debug, Clone, Default)]
pub struct SearchControl {
    pub token: Option<CancellationToken>,
    pub deadline: Option<Instant>,
}

impl SearchControl {
    /// No cancellation, no deadline.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// True once the token is cancelled or the deadline has passed.
    pub fn should_stop(&self) -> bool {
        self.token.as_ref().is_some_and(CancellationToken::is_cancelled)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Closest approach found in the searched window.
///
/// Fields
/// -----------------
/// * `approach_time` – epoch of the minimum distance (MJD).
/// * `minimum_distance` – comet–Earth distance at `approach_time` (AU).
/// * `partial` – the search stopped early (cancellation or deadline).
/// * `evaluated_samples` – coarse samples with a valid distance.
/// * `skipped_samples` – coarse samples dropped after a propagation or ephemeris failure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CloseApproach {
    pub approach_time: MJD,
    pub minimum_distance: Au,
    pub partial: bool,
    pub evaluated_samples: usize,
    pub skipped_samples: usize,
}

impl fmt::Display for CloseApproach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Close approach at MJD {:.5}: {:.6} AU ({} samples, {} skipped{})",
            self.approach_time,
            self.minimum_distance,
            self.evaluated_samples,
            self.skipped_samples,
            if self.partial { ", partial" } else { "" }
        )
    }
}

/// Comet–Earth distance evaluator for single epochs.
struct DistanceEvaluator<'a> {
    propagator: &'a dyn Propagator,
    ephemeris: &'a dyn EphemerisProvider,
}

impl DistanceEvaluator<'_> {
    fn distance(&self, time: MJD) -> Result<Au, CometFitError> {
        let comet = self.propagator.propagate(time)?.position;
        let earth = self.ephemeris.position_of(Body::Earth, time)?;
        let d = (comet - earth).norm();
        if d.is_finite() {
            Ok(d)
        } else {
            Err(CometFitError::Propagation(format!(
                "non-finite distance at MJD {time}"
            )))
        }
    }

    /// Distance, or `+∞` when the epoch cannot be evaluated.
    fn distance_or_inf(&self, time: MJD) -> Au {
        self.distance(time).unwrap_or_else(|err| {
            debug!(time, %err, "refinement sample failed");
            f64::INFINITY
        })
    }
}

/// Golden-section minimisation of the distance on `[lo, hi]`.
///
/// Return
/// ----------
/// * The best `(time, distance)` seen, starting from `best`, and whether the search was
///   stopped by `control`.
fn golden_section(
    evaluator: &DistanceEvaluator<'_>,
    (lo, hi): (MJD, MJD),
    mut best: (MJD, Au),
    tolerance: Days,
    control: &SearchControl,
) -> ((MJD, Au), bool) {
    let (mut a, mut b) = (lo, hi);
    let mut c = b - INV_GOLDEN_RATIO * (b - a);
    let mut d = a + INV_GOLDEN_RATIO * (b - a);
    let mut fc = evaluator.distance_or_inf(c);
    let mut fd = evaluator.distance_or_inf(d);

    let keep_best = |t: MJD, dist: Au, best: &mut (MJD, Au)| {
        if dist < best.1 {
            *best = (t, dist);
        }
    };
    keep_best(c, fc, &mut best);
    keep_best(d, fd, &mut best);

    while b - a > tolerance {
        if control.should_stop() {
            return (best, true);
        }
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_GOLDEN_RATIO * (b - a);
            fc = evaluator.distance_or_inf(c);
            keep_best(c, fc, &mut best);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_GOLDEN_RATIO * (b - a);
            fd = evaluator.distance_or_inf(d);
            keep_best(d, fd, &mut best);
        }
    }
    (best, false)
}

/// Indices of the coarse local minima, smallest distance first.
fn local_minima(samples: &[(MJD, Au)]) -> Vec<usize> {
    let n = samples.len();
    let mut minima: Vec<usize> = match n {
        0 => Vec::new(),
        1 => vec![0],
        _ => {
            let mut edges = Vec::new();
            if samples[0].1 < samples[1].1 {
                edges.push(0);
            }
            if samples[n - 1].1 < samples[n - 2].1 {
                edges.push(n - 1);
            }
            samples
                .iter()
                .tuple_windows()
                .enumerate()
                .filter(|(_, (prev, cur, next))| cur.1 <= prev.1 && cur.1 <= next.1)
                .map(|(i, _)| i + 1)
                .chain(edges)
                .collect()
        }
    };
    minima.sort_by(|&i, &j| samples[i].1.total_cmp(&samples[j].1));
    minima
}

/// Search the closest comet–Earth approach in `[start, start + window_days]`.
///
/// Arguments
/// -----------------
/// * `propagator`: comet trajectory (heliocentric, equatorial J2000).
/// * `ephemeris`: Earth positions (heliocentric, equatorial J2000).
/// * `start`: beginning of the window (MJD).
/// * `period`: orbital period of the comet (days), `None` for open orbits.
/// * `params`: sampling and refinement configuration.
/// * `control`: cancellation token and deadline.
///
/// Return
/// ----------
/// * The [`CloseApproach`]; `partial` is set when `control` stopped the search.
/// * [`CometFitError::NoValidSamples`] when no coarse sample could be evaluated, including a
///   search stopped before its first batch.
/// * [`CometFitError::InvalidParameter`] when `params` breaks its validation rules.
pub fn find_close_approach(
    propagator: &dyn Propagator,
    ephemeris: &dyn EphemerisProvider,
    start: MJD,
    period: Option<Days>,
    params: &ApproachParams,
    control: &SearchControl,
) -> Result<CloseApproach, CometFitError> {
    params.validate()?;
    let end = start + params.window_days;
    let step = params.effective_step(period);
    let n_steps = (params.window_days / step).ceil() as usize;
    let times: Vec<MJD> = (0..=n_steps)
        .map(|k| (start + k as f64 * step).min(end))
        .dedup()
        .collect();

    let mut samples: Vec<(MJD, Au)> = Vec::with_capacity(times.len());
    let mut skipped = 0;
    let mut partial = false;

    for batch in times.chunks(params.batch_size) {
        if control.should_stop() {
            partial = true;
            break;
        }
        let states = propagator.propagate_many(batch);
        let earths = ephemeris.positions_of(Body::Earth, batch);

        for ((&t, state), earth) in batch.iter().zip(states).zip(earths) {
            match (state, earth) {
                (Ok(state), Ok(earth)) => {
                    let d = (state.position - earth).norm();
                    if d.is_finite() {
                        samples.push((t, d));
                    } else {
                        skipped += 1;
                        warn!(time = t, "skipping close-approach sample: non-finite distance");
                    }
                }
                (Err(err), _) | (_, Err(err)) => {
                    skipped += 1;
                    warn!(time = t, %err, "skipping close-approach sample");
                }
            }
        }
    }

    if samples.is_empty() {
        return Err(CometFitError::NoValidSamples { start, end });
    }

    let minima = local_minima(&samples);
    let mut best = minima
        .first()
        .map(|&i| samples[i])
        .unwrap_or(samples[0]);

    if !partial {
        let evaluator = DistanceEvaluator {
            propagator,
            ephemeris,
        };
        for &i in minima.iter().take(params.refine_candidates) {
            let (t, d) = samples[i];
            let bracket = ((t - step).max(start), (t + step).min(end));
            let (refined, stopped) = golden_section(
                &evaluator,
                bracket,
                (t, d),
                params.refine_tolerance_days,
                control,
            );
            if refined.1 < best.1 {
                best = refined;
            }
            if stopped {
                partial = true;
                break;
            }
        }
    }

    if partial {
        info!(
            evaluated = samples.len(),
            "close-approach search stopped early, returning the best sample so far"
        );
    }
    debug!(
        approach_time = best.0,
        minimum_distance = best.1,
        skipped,
        "close approach found"
    );

    Ok(CloseApproach {
        approach_time: best.0,
        minimum_distance: best.1,
        partial,
        evaluated_samples: samples.len(),
        skipped_samples: skipped,
    })
}

#[cfg(test)]
mod close_approach_test {
    use super::*;
    use crate::{
        constants::GAUSS_GRAV_SQUARED,
        ephemeris::fixed_orbit::FixedOrbitEphemeris,
        orbit_type::{OrbitalElements, StateVector},
        propagator::KeplerPropagator,
        ref_system::ReferencePlane,
    };
    use std::sync::atomic::AtomicUsize;

    const EPOCH: MJD = 60000.0;

    /// Circular 1 AU orbit inclined by 30°, crossing Earth's orbit at the ascending node at `EPOCH`.
    fn crossing_comet() -> KeplerPropagator {
        let elements = OrbitalElements::from_conic(
            EPOCH,
            1.0,
            0.0,
            30.0,
            0.0,
            0.0,
            EPOCH,
            ReferencePlane::Ecliptic,
        )
        .unwrap();
        KeplerPropagator::new(elements, GAUSS_GRAV_SQUARED)
    }

    fn earth() -> FixedOrbitEphemeris {
        FixedOrbitEphemeris::circular(1.0, 0.0, EPOCH, GAUSS_GRAV_SQUARED).unwrap()
    }

    fn params() -> ApproachParams {
        ApproachParams::builder()
            .window_days(60.0)
            .batch_size(16)
            .build()
            .unwrap()
    }

    #[test]
    fn test_node_crossing() {
        let comet = crossing_comet();
        let result = find_close_approach(
            &comet,
            &earth(),
            EPOCH - 9.7,
            Some(365.25),
            &params(),
            &SearchControl::unbounded(),
        )
        .unwrap();

        assert!(!result.partial);
        assert_eq!(result.skipped_samples, 0);
        assert_eq!(result.evaluated_samples, 61);
        assert!(result.minimum_distance < 1e-5, "{result}");
        assert!((result.approach_time - EPOCH).abs() < 1e-3, "{result}");
    }

    #[test]
    fn test_skipped_samples() {
        let ephem = earth().with_validity(EPOCH - 5.0, EPOCH + 100.0);
        let result = find_close_approach(
            &crossing_comet(),
            &ephem,
            EPOCH - 9.7,
            None,
            &params(),
            &SearchControl::unbounded(),
        )
        .unwrap();

        assert_eq!(result.skipped_samples, 5);
        assert_eq!(result.evaluated_samples, 56);
        assert!((result.approach_time - EPOCH).abs() < 1e-3);
    }

    #[test]
    fn test_no_valid_samples() {
        let ephem = earth().with_validity(EPOCH + 500.0, EPOCH + 600.0);
        let err = find_close_approach(
            &crossing_comet(),
            &ephem,
            EPOCH,
            None,
            &params(),
            &SearchControl::unbounded(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CometFitError::NoValidSamples {
                start: EPOCH,
                end: EPOCH + 60.0
            }
        );
    }

    /// Cancels the shared token once its first batch has been propagated.
    struct CancellingPropagator {
        inner: KeplerPropagator,
        token: CancellationToken,
        batches: AtomicUsize,
    }

    impl Propagator for CancellingPropagator {
        fn propagate(&self, time: MJD) -> Result<StateVector, CometFitError> {
            self.inner.propagate(time)
        }

        fn propagate_many(&self, times: &[MJD]) -> Vec<Result<StateVector, CometFitError>> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.token.cancel();
            self.inner.propagate_many(times)
        }
    }

    #[test]
    fn test_cancellation_returns_partial() {
        let token = CancellationToken::new();
        let comet = CancellingPropagator {
            inner: crossing_comet(),
            token: token.clone(),
            batches: AtomicUsize::new(0),
        };
        let control = SearchControl::unbounded().with_token(token);

        let result = find_close_approach(
            &comet,
            &earth(),
            EPOCH - 9.7,
            None,
            &params(),
            &control,
        )
        .unwrap();

        assert!(result.partial);
        assert_eq!(result.evaluated_samples, 16);
        assert_eq!(comet.batches.load(Ordering::SeqCst), 1);
        // The first batch already covers the node crossing at the coarse resolution.
        assert!((result.approach_time - EPOCH).abs() <= 1.0);
    }

    #[test]
    fn test_expired_deadline() {
        let control = SearchControl::unbounded().with_deadline(Instant::now());
        let err = find_close_approach(
            &crossing_comet(),
            &earth(),
            EPOCH,
            None,
            &params(),
            &control,
        )
        .unwrap_err();
        assert!(matches!(err, CometFitError::NoValidSamples { .. }));
    }

    #[test]
    fn test_effective_step_and_validation() {
        let p = ApproachParams::default();
        assert_eq!(p.effective_step(None), 1.0);
        assert_eq!(p.effective_step(Some(10.0)), 0.5);
        assert_eq!(p.effective_step(Some(f64::INFINITY)), 1.0);

        assert!(matches!(
            ApproachParams::builder().batch_size(0).build(),
            Err(CometFitError::InvalidParameter(_))
        ));
        assert!(matches!(
            ApproachParams::builder().step_days(2.0).window_days(1.0).build(),
            Err(CometFitError::InvalidParameter(_))
        ));
        assert!(format!("{p:#}").contains("batch_size"));
    }

    #[test]
    fn test_unvalidated_params_are_rejected() {
        let zero_batch = ApproachParams {
            batch_size: 0,
            ..params()
        };
        let err = find_close_approach(
            &crossing_comet(),
            &earth(),
            EPOCH,
            None,
            &zero_batch,
            &SearchControl::unbounded(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CometFitError::InvalidParameter("batch_size must be >= 1".into())
        );
    }

    #[test]
    fn test_local_minima() {
        let samples = [(0.0, 3.0), (1.0, 2.0), (2.0, 2.5), (3.0, 1.0), (4.0, 1.5), (5.0, 0.5)];
        assert_eq!(local_minima(&samples), vec![5, 3, 1]);
    }
}
