//! # Gauss Method for Initial Orbit Determination
//!
//! This module implements the **Gauss method with iterated Lagrange coefficients**: from three
//! angle-only observations and the heliocentric positions of the observer, it recovers the
//! heliocentric state vector of the comet at the middle epoch.
//!
//! ## Core structure: [`GaussObs`]
//!
//! [`GaussObs`] holds the triplet: epochs (MJD), unit lines of sight and observer positions
//! (AU, equatorial J2000).
//!
//! ## Algorithm outline
//!
//! For a trial middle heliocentric distance `r`:
//!
//! 1. `τ₁ = t₁ − t₂`, `τ₃ = t₃ − t₂`; `f = 1 − μτ²/(2r³)`, `g = τ − μτ³/(6r³)`.
//! 2. `c₁ = g₃/D`, `c₃ = −g₁/D` with `D = f₁g₃ − f₃g₁`.
//! 3. Solve `[c₁L₁, −L₂, c₃L₃] ρ = −(c₁R₁ − R₂ + c₃R₃)` for the topocentric distances.
//! 4. The residual `h(r) = |R₂ + ρ₂L₂| − r` vanishes on a consistent solution.
//!
//! Plain substitution `r ← |R₂ + ρ₂L₂|` started from `|R₂|` falls into the spurious root where
//! the comet sits on top of the observer (`ρ₂ ≈ 0`). Here `h` is instead sampled on a
//! geometric grid, every sign change is refined by safeguarded false position, and the roots
//! are screened (range floor, co-moving velocity, eccentricity and perihelion limits).
//!
//! The middle velocity comes from `v₂ = (f₁r₃ − f₃r₁)/D`, or from the central difference of
//! `r₁` and `r₃` when `D` vanishes on a short arc.
//!
//! ## Example
//!
//! ```rust, no_run
//! use cometfit::constants::GAUSS_GRAV_SQUARED;
//! use cometfit::initial_orbit_determination::{gauss::GaussObs, IODParams};
//! use cometfit::observations::Observation;
//!
//! let observations: Vec<Observation> = unimplemented!("three or more observations");
//! let gauss = GaussObs::from_observations(&observations).unwrap();
//! let result = gauss
//!     .solve(GAUSS_GRAV_SQUARED, &IODParams::default(), &observations)
//!     .unwrap();
//! println!("{result}");
//! ```
use itertools::Itertools;
use nalgebra::{Matrix3, Vector3};
use tracing::{debug, warn};

use crate::{
    cometfit_errors::{CometFitError, SoftCondition, Warnings},
    constants::MJD,
    initial_orbit_determination::{
        gauss_result::{GaussResult, GaussSolution},
        triplets_selection::select_triplet,
        IODParams,
    },
    observations::{residuals::rms_residual, Observation},
    orb_elem::eccentricity_control,
    orbit_type::StateVector,
    propagator::KeplerPropagator,
};

/// `|D| < LAGRANGE_DET_EPS · (t₃ − t₁)` marks a degenerate Lagrange determinant.
const LAGRANGE_DET_EPS: f64 = 1e-10;

/// `|r₁ × r₃| ≤ COLLINEAR_EPS · |r₁||r₃|` marks collinear heliocentric positions.
const COLLINEAR_EPS: f64 = 1e-12;

/// Largest `|h(r)| / (1 + r)` accepted at a refined root; beyond it the sign change was a
/// discontinuity of the range solution, not a root.
const ROOT_RESIDUAL_MAX: f64 = 1e-3;

/// Observation triplet for the Gauss method.
///
/// Fields
/// -----------------
/// * `times` – epochs `t₁ < t₂ < t₃` (MJD).
/// * `lines_of_sight` – unit observer → comet directions (equatorial J2000).
/// * `observers` – heliocentric observer positions (AU, equatorial J2000).
#[derive(Debug, Clone, PartialEq)]
pub struct GaussObs {
    pub times: [MJD; 3],
    pub lines_of_sight: [Vector3<f64>; 3],
    pub observers: [Vector3<f64>; 3],
}

/// Lagrange coefficients of the two outer epochs for a trial middle distance.
#[derive(Debug, Clone, Copy)]
struct Lagrange {
    f1: f64,
    f3: f64,
    det: f64,
    c1: f64,
    c3: f64,
    degenerate: bool,
}

/// Range solution for one trial distance.
#[derive(Debug, Clone, Copy)]
struct RangeSample {
    r: f64,
    rho: Vector3<f64>,
    residual: f64,
    lagrange: Lagrange,
}

/// Refined root of the range residual.
#[derive(Debug, Clone, Copy)]
struct RootEstimate {
    r: f64,
    iterations: usize,
    converged: bool,
    last_change: f64,
}

/// Admissible root turned into a state vector.
#[derive(Debug, Clone)]
struct Candidate {
    root: RootEstimate,
    state: StateVector,
    ranges: [f64; 3],
    finite_difference: bool,
}

impl GaussObs {
    /// Build a triplet from three observations.
    ///
    /// Return
    /// ----------
    /// * The triplet, or [`CometFitError::DegenerateGeometry`] unless `t₁ < t₂ < t₃`.
    pub fn new(
        first: &Observation,
        middle: &Observation,
        last: &Observation,
    ) -> Result<Self, CometFitError> {
        let times = [first.time(), middle.time(), last.time()];
        if !(times[0] < times[1] && times[1] < times[2]) {
            return Err(CometFitError::DegenerateGeometry(format!(
                "observation epochs must be distinct and increasing, got {times:?}"
            )));
        }

        Ok(GaussObs {
            times,
            lines_of_sight: [
                *first.line_of_sight(),
                *middle.line_of_sight(),
                *last.line_of_sight(),
            ],
            observers: [
                *first.observer_position(),
                *middle.observer_position(),
                *last.observer_position(),
            ],
        })
    }

    /// Select the triplet (first, nearest to the midpoint, last) from time-sorted observations.
    pub fn from_observations(observations: &[Observation]) -> Result<Self, CometFitError> {
        let (i1, i2, i3) = select_triplet(observations)?;
        GaussObs::new(&observations[i1], &observations[i2], &observations[i3])
    }

    /// Time differences `(τ₁, τ₃)` relative to the middle epoch (days).
    pub fn tau(&self) -> (f64, f64) {
        (self.times[0] - self.times[1], self.times[2] - self.times[1])
    }

    /// Reciprocal condition number of the line-of-sight matrix `[L₁ L₂ L₃]`.
    pub fn line_of_sight_rcond(&self) -> f64 {
        let sv = Matrix3::from_columns(&self.lines_of_sight)
            .svd(false, false)
            .singular_values;
        let max = sv.max();
        if max > 0.0 {
            sv.min() / max
        } else {
            0.0
        }
    }

    fn lagrange(&self, r: f64, mu: f64) -> Lagrange {
        let (tau1, tau3) = self.tau();
        let r3 = r * r * r;
        let f = |tau: f64| 1.0 - mu * tau * tau / (2.0 * r3);
        let g = |tau: f64| tau - mu * tau * tau * tau / (6.0 * r3);

        let (f1, g1) = (f(tau1), g(tau1));
        let (f3, g3) = (f(tau3), g(tau3));
        let det = f1 * g3 - f3 * g1;
        let span = tau3 - tau1;

        let degenerate = !(det.abs() >= LAGRANGE_DET_EPS * span);
        let (c1, c3) = if degenerate {
            (tau3 / span, -tau1 / span)
        } else {
            (g3 / det, -g1 / det)
        };

        Lagrange {
            f1,
            f3,
            det,
            c1,
            c3,
            degenerate,
        }
    }

    /// Solve the 3×3 range system: LU when well conditioned, SVD least squares when
    /// ill-conditioned, `None` when singular.
    fn solve_ranges(&self, lag: &Lagrange, params: &IODParams) -> Option<Vector3<f64>> {
        let [l1, l2, l3] = self.lines_of_sight;
        let [o1, o2, o3] = self.observers;

        let a = Matrix3::from_columns(&[l1 * lag.c1, -l2, l3 * lag.c3]);
        let b = -(o1 * lag.c1 - o2 + o3 * lag.c3);

        let svd = a.svd(true, true);
        let s_max = svd.singular_values.max();
        if !(s_max.is_finite() && s_max > 0.0) {
            return None;
        }
        let rcond = svd.singular_values.min() / s_max;

        let rho = if rcond >= params.ill_conditioned_rcond {
            a.lu().solve(&b)
        } else if rcond >= params.singular_rcond {
            svd.solve(&b, params.singular_rcond * s_max).ok()
        } else {
            None
        }?;

        rho.iter().all(|x| x.is_finite()).then_some(rho)
    }

    fn sample(&self, r: f64, mu: f64, params: &IODParams) -> Option<RangeSample> {
        let lagrange = self.lagrange(r, mu);
        let rho = self.solve_ranges(&lagrange, params)?;
        let r2 = self.observers[1] + self.lines_of_sight[1] * rho[1];
        Some(RangeSample {
            r,
            rho,
            residual: r2.norm() - r,
            lagrange,
        })
    }

    /// Range residual `h(r) = |R₂ + ρ₂(r) L₂| − r` (AU); `None` where the range system is
    /// singular.
    pub fn range_residual(&self, r: f64, mu: f64, params: &IODParams) -> Option<f64> {
        self.sample(r, mu, params).map(|s| s.residual)
    }

    /// Refine a bracketed root of `h` by false position (Illinois variant), falling back to
    /// bisection when the step leaves the bracket or the bracket stops shrinking.
    fn refine_root(
        &self,
        lo: &RangeSample,
        hi: &RangeSample,
        mu: f64,
        params: &IODParams,
    ) -> Option<RootEstimate> {
        let exact = |r: f64| RootEstimate {
            r,
            iterations: 0,
            converged: true,
            last_change: 0.0,
        };
        if lo.residual == 0.0 {
            return Some(exact(lo.r));
        }
        if hi.residual == 0.0 {
            return Some(exact(hi.r));
        }

        let (mut a, mut fa) = (lo.r, lo.residual);
        let (mut b, mut fb) = (hi.r, hi.residual);
        let mut previous = f64::NAN;
        let mut last_change = (b - a).abs();
        let mut retained_side = 0i8;
        let mut checkpoint_width = (b - a).abs();
        let mut force_bisection = false;

        for iteration in 1..=params.max_iterations {
            let secant = b - fb * (b - a) / (fb - fa);
            let inside = secant.is_finite() && secant > a.min(b) && secant < a.max(b);
            let c = if force_bisection || !inside {
                0.5 * (a + b)
            } else {
                secant
            };

            let fc = self.sample(c, mu, params)?.residual;
            let change = (c - previous).abs();
            previous = c;
            if change.is_finite() {
                last_change = change;
            }

            if fc == 0.0 || change < params.tolerance_au || (b - a).abs() < params.tolerance_au {
                return Some(RootEstimate {
                    r: c,
                    iterations: iteration,
                    converged: true,
                    last_change,
                });
            }

            if (fc > 0.0) == (fb > 0.0) {
                b = c;
                fb = fc;
                if retained_side == -1 {
                    fa *= 0.5;
                }
                retained_side = -1;
            } else {
                a = c;
                fa = fc;
                if retained_side == 1 {
                    fb *= 0.5;
                }
                retained_side = 1;
            }

            force_bisection = false;
            if iteration % 3 == 0 {
                let width = (b - a).abs();
                force_bisection = width > 0.5 * checkpoint_width;
                checkpoint_width = width;
            }
        }

        Some(RootEstimate {
            r: previous,
            iterations: params.max_iterations,
            converged: false,
            last_change,
        })
    }

    /// Turn a refined root into a state vector, or explain why it is not admissible.
    fn build_candidate(
        &self,
        root: RootEstimate,
        mu: f64,
        params: &IODParams,
    ) -> Result<Candidate, String> {
        let sample = self
            .sample(root.r, mu, params)
            .ok_or_else(|| "range system singular at the root".to_string())?;

        if sample.residual.abs() > ROOT_RESIDUAL_MAX * (1.0 + root.r) {
            return Err(format!(
                "residual {:.3e} AU is a discontinuity, not a root",
                sample.residual
            ));
        }

        let rho = sample.rho;
        if let Some(bad) = rho.iter().find(|&&p| p < params.min_rho2_au) {
            return Err(format!(
                "topocentric distance {bad:.4} AU below {} AU",
                params.min_rho2_au
            ));
        }

        let [r1, r2, r3]: [Vector3<f64>; 3] =
            std::array::from_fn(|i| self.observers[i] + self.lines_of_sight[i] * rho[i]);

        if r1.cross(&r3).norm() <= COLLINEAR_EPS * r1.norm() * r3.norm() {
            return Err("heliocentric positions are collinear".into());
        }

        let span = self.times[2] - self.times[0];
        let (velocity, finite_difference) = middle_velocity(
            &sample.lagrange,
            &r1,
            &r3,
            span,
            r2.norm(),
            mu,
            params.finite_difference_max_arc,
        )?;

        let observer_velocity = (self.observers[2] - self.observers[0]) / span;
        if (velocity - observer_velocity).norm() < params.comoving_tolerance * observer_velocity.norm()
        {
            return Err("velocity follows the observer".into());
        }

        let check = eccentricity_control(
            &r2,
            &velocity,
            mu,
            params.max_perihelion_au,
            params.max_ecc,
        )
        .ok_or_else(|| "vanishing angular momentum".to_string())?;
        if !check.accepted {
            return Err(format!(
                "e = {:.3}, q = {:.3} AU (energy {:.3e}) outside the admissible limits",
                check.eccentricity, check.perihelion_distance, check.energy
            ));
        }

        let state = StateVector::new(r2, velocity, self.times[1]).map_err(|e| e.to_string())?;

        Ok(Candidate {
            root,
            state,
            ranges: [rho[0], rho[1], rho[2]],
            finite_difference,
        })
    }

    /// Run the Gauss method.
    ///
    /// Arguments
    /// -----------------
    /// * `mu`: gravitational parameter (AU³/day²).
    /// * `params`: search, filtering and conditioning parameters.
    /// * `observations`: every observation of the comet, used to rank competing roots by RMS
    ///   residual when there are more than three.
    ///
    /// Return
    /// ----------
    /// * A [`GaussResult`] with the state at the middle epoch, or
    ///   [`CometFitError::DegenerateGeometry`] when the lines of sight are coplanar or no
    ///   admissible root exists; [`CometFitError::InvalidParameter`] when `params` breaks the
    ///   rules listed on [`IODParams`].
    ///
    /// See also
    /// ------------
    /// * [`IODParams`] – meaning and defaults of every knob.
    pub fn solve(
        &self,
        mu: f64,
        params: &IODParams,
        observations: &[Observation],
    ) -> Result<GaussResult, CometFitError> {
        params.validate()?;
        let rcond = self.line_of_sight_rcond();
        if rcond < params.singular_rcond {
            return Err(CometFitError::DegenerateGeometry(format!(
                "lines of sight are coplanar (rcond = {rcond:.2e})"
            )));
        }

        let seed = self.observers[1].norm();
        let grid = scan_grid(seed, params);
        let samples: Vec<Option<RangeSample>> = grid
            .iter()
            .map(|&r| self.sample(r, mu, params))
            .collect();

        let mut candidates: Vec<Candidate> = Vec::new();
        let mut rejections: Vec<String> = Vec::new();

        let brackets = samples
            .iter()
            .tuple_windows()
            .filter_map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) if a.residual * b.residual <= 0.0 => Some((a, b)),
                _ => None,
            });

        for (lo, hi) in brackets {
            let Some(root) = self.refine_root(lo, hi, mu, params) else {
                rejections.push(format!(
                    "r2 ∈ [{:.4}, {:.4}] AU: range system singular inside the bracket",
                    lo.r, hi.r
                ));
                continue;
            };
            if candidates
                .iter()
                .any(|c| (c.root.r - root.r).abs() < 10.0 * params.tolerance_au)
            {
                continue;
            }

            match self.build_candidate(root, mu, params) {
                Ok(candidate) => {
                    debug!(
                        r2 = root.r,
                        iterations = root.iterations,
                        rho2 = candidate.ranges[1],
                        "admissible Gauss root"
                    );
                    candidates.push(candidate);
                }
                Err(reason) => {
                    debug!(r2 = root.r, %reason, "Gauss root rejected");
                    rejections.push(format!("r2 = {:.4} AU: {reason}", root.r));
                }
            }
        }

        if candidates.is_empty() {
            return Err(CometFitError::DegenerateGeometry(if rejections.is_empty() {
                format!(
                    "no root of the range equation in [{}, {}] AU",
                    params.r2_min_au, params.r2_max_au
                )
            } else {
                format!("no admissible root ({})", rejections.join("; "))
            }));
        }

        let seed_distance = |c: &Candidate| (c.root.r - seed).abs();
        candidates.sort_by(|a, b| seed_distance(a).total_cmp(&seed_distance(b)));
        candidates.truncate(params.max_tested_solutions);
        let admissible_roots = candidates.len();

        let rank_by_rms = observations.len() > 3;
        let best = candidates
            .into_iter()
            .map(|c| {
                let rms = KeplerPropagator::from_state(&c.state, mu)
                    .and_then(|prop| rms_residual(observations, &prop))
                    .ok();
                (c, rms)
            })
            .min_by(|(a, rms_a), (b, rms_b)| {
                let by_seed = seed_distance(a).total_cmp(&seed_distance(b));
                if rank_by_rms {
                    rms_a
                        .unwrap_or(f64::INFINITY)
                        .total_cmp(&rms_b.unwrap_or(f64::INFINITY))
                        .then(by_seed)
                } else {
                    by_seed
                }
            });

        let Some((best, rms)) = best else {
            return Err(CometFitError::DegenerateGeometry(
                "no admissible root".into(),
            ));
        };

        let mut warnings = Warnings::new();
        if !best.root.converged {
            warn!(
                iterations = best.root.iterations,
                last_change = best.root.last_change,
                "Gauss range iteration hit its cap"
            );
            warnings.push(SoftCondition::NonConvergence {
                iterations: best.root.iterations,
                last_change: best.root.last_change,
            });
        }
        if best.finite_difference {
            warn!("Gauss middle velocity taken from a finite difference");
            warnings.push(SoftCondition::FiniteDifferenceVelocity);
        }

        Ok(GaussResult::from_solution(GaussSolution {
            state: best.state,
            ranges: best.ranges,
            iterations: best.root.iterations,
            rms,
            admissible_roots,
            warnings,
        }))
    }
}

/// Geometric grid over `[r2_min_au, r2_max_au]` passing through the seed distance.
fn scan_grid(seed: f64, params: &IODParams) -> Vec<f64> {
    let ratio = params.scan_ratio;
    let seed = seed.clamp(params.r2_min_au, params.r2_max_au);

    let mut grid: Vec<f64> = std::iter::successors(Some(seed / ratio), |r| Some(r / ratio))
        .take_while(|&r| r >= params.r2_min_au)
        .collect();
    grid.reverse();
    grid.push(seed);
    grid.extend(
        std::iter::successors(Some(seed * ratio), |r| Some(r * ratio))
            .take_while(|&r| r <= params.r2_max_au),
    );
    grid
}

/// Velocity at the middle epoch.
///
/// Return
/// ------
/// * `(v₂, false)` from the Lagrange relation, `(v₂, true)` from the central difference when
///   the determinant is degenerate on an arc shorter than `max_arc` dynamical times, or the
///   rejection reason otherwise.
fn middle_velocity(
    lag: &Lagrange,
    r1: &Vector3<f64>,
    r3: &Vector3<f64>,
    span: f64,
    r: f64,
    mu: f64,
    max_arc: f64,
) -> Result<(Vector3<f64>, bool), String> {
    if !lag.degenerate {
        return Ok(((r3 * lag.f1 - r1 * lag.f3) / lag.det, false));
    }

    let arc = span / (r.powi(3) / mu).sqrt();
    if arc < max_arc {
        Ok(((r3 - r1) / span, true))
    } else {
        Err(format!(
            "Lagrange determinant vanishes on an arc of {arc:.3} dynamical times"
        ))
    }
}
