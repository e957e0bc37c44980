//! # Two-body orbit propagation
//!
//! A [`Propagator`] is bound to one orbit and returns the heliocentric state (equatorial J2000)
//! at any requested instant. Two strategies are provided:
//!
//! - [`KeplerPropagator`] – analytic: the mean anomaly is advanced linearly, Kepler's equation
//!   is solved and the state rebuilt from the elements. Exact for the two-body problem, cost
//!   independent of the time span. This is the default.
//! - [`TwoBodyIntegrator`] – fixed-step fourth-order Runge–Kutta integration of
//!   `r̈ = −μ r / |r|³`. Useful as a cross-check and as the starting point for adding
//!   perturbations.
//!
//! [`PropagationMethod`] selects one of them from configuration.
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    cometfit_errors::CometFitError,
    constants::{Days, MJD},
    orbit_type::{keplerian_element::OrbitalElements, StateVector},
    ref_system::ReferencePlane,
};

/// Default step of the numerical integrator (days).
pub const DEFAULT_INTEGRATION_STEP: Days = 0.25;

/// Heliocentric state of one orbit at arbitrary instants.
pub trait Propagator: Send + Sync {
    /// State at `time` (MJD, TDB).
    fn propagate(&self, time: MJD) -> Result<StateVector, CometFitError>;

    /// States at several instants; each entry fails independently.
    fn propagate_many(&self, times: &[MJD]) -> Vec<Result<StateVector, CometFitError>> {
        times.iter().map(|&t| self.propagate(t)).collect()
    }
}

/// Propagation strategy used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PropagationMethod {
    /// Analytic Kepler propagation.
    #[default]
    Kepler,
    /// RK4 integration with a fixed step (days).
    TwoBodyIntegration { step_days: Days },
}

impl PropagationMethod {
    /// Build the propagator for an orbit.
    ///
    /// Arguments
    /// -----------------
    /// * `elements`: orbit to propagate; the integrator starts from its state at `elements.epoch`.
    /// * `mu`: gravitational parameter (AU³/day²).
    pub fn propagator(
        &self,
        elements: &OrbitalElements,
        mu: f64,
    ) -> Result<Box<dyn Propagator>, CometFitError> {
        match *self {
            PropagationMethod::Kepler => Ok(Box::new(KeplerPropagator::new(elements.clone(), mu))),
            PropagationMethod::TwoBodyIntegration { step_days } => {
                let initial = elements.to_state(mu, elements.epoch)?;
                Ok(Box::new(TwoBodyIntegrator::new(initial, mu, step_days)?))
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), CometFitError> {
        match *self {
            PropagationMethod::Kepler => Ok(()),
            PropagationMethod::TwoBodyIntegration { step_days } => check_step(step_days),
        }
    }
}

fn check_step(step_days: Days) -> Result<(), CometFitError> {
    if step_days.is_finite() && step_days > 0.0 {
        Ok(())
    } else {
        Err(CometFitError::InvalidParameter(format!(
            "integration step must be positive, got {step_days}"
        )))
    }
}

/// Analytic two-body propagator.
#[derive(Debug, Clone)]
pub struct KeplerPropagator {
    elements: OrbitalElements,
    mu: f64,
}

impl KeplerPropagator {
    pub fn new(elements: OrbitalElements, mu: f64) -> Self {
        KeplerPropagator { elements, mu }
    }

    /// Build from a Cartesian state (elements computed in the equatorial plane).
    pub fn from_state(state: &StateVector, mu: f64) -> Result<Self, CometFitError> {
        let elements = OrbitalElements::from_state(state, mu, ReferencePlane::Equatorial)?;
        Ok(KeplerPropagator::new(elements, mu))
    }

    pub fn elements(&self) -> &OrbitalElements {
        &self.elements
    }
}

impl Propagator for KeplerPropagator {
    fn propagate(&self, time: MJD) -> Result<StateVector, CometFitError> {
        self.elements.to_state(self.mu, time)
    }
}

/// Fixed-step RK4 integrator of the heliocentric two-body problem.
///
/// The step is shortened so that an integer number of steps lands exactly on the target.
#[derive(Debug, Clone)]
pub struct TwoBodyIntegrator {
    initial: StateVector,
    mu: f64,
    step_days: Days,
}

type Phase = (Vector3<f64>, Vector3<f64>);

impl TwoBodyIntegrator {
    pub fn new(initial: StateVector, mu: f64, step_days: Days) -> Result<Self, CometFitError> {
        initial.validate()?;
        check_step(step_days)?;
        if !(mu.is_finite() && mu > 0.0) {
            return Err(CometFitError::InvalidParameter(format!(
                "gravitational parameter must be positive, got {mu}"
            )));
        }
        Ok(TwoBodyIntegrator {
            initial,
            mu,
            step_days,
        })
    }

    fn derivative(&self, (r, v): &Phase) -> Phase {
        let r_norm = r.norm();
        (*v, r * (-self.mu / (r_norm * r_norm * r_norm)))
    }

    fn rk4_step(&self, y: &Phase, h: f64) -> Phase {
        let shift = |base: &Phase, k: &Phase, factor: f64| -> Phase {
            (base.0 + k.0 * factor, base.1 + k.1 * factor)
        };

        let k1 = self.derivative(y);
        let k2 = self.derivative(&shift(y, &k1, 0.5 * h));
        let k3 = self.derivative(&shift(y, &k2, 0.5 * h));
        let k4 = self.derivative(&shift(y, &k3, h));

        (
            y.0 + (k1.0 + 2.0 * k2.0 + 2.0 * k3.0 + k4.0) * (h / 6.0),
            y.1 + (k1.1 + 2.0 * k2.1 + 2.0 * k3.1 + k4.1) * (h / 6.0),
        )
    }

    /// Integrate `y` from `from` to `to`.
    fn advance(&self, y: Phase, from: MJD, to: MJD) -> Result<Phase, CometFitError> {
        let span = to - from;
        if span == 0.0 {
            return Ok(y);
        }
        let n_steps = (span.abs() / self.step_days).ceil().max(1.0) as usize;
        let h = span / n_steps as f64;

        let mut y = y;
        for _ in 0..n_steps {
            y = self.rk4_step(&y, h);
        }

        if y.0.iter().chain(y.1.iter()).all(|c| c.is_finite()) {
            Ok(y)
        } else {
            Err(CometFitError::Propagation(format!(
                "two-body integration from MJD {from} to MJD {to} diverged"
            )))
        }
    }

    fn to_state(&self, (position, velocity): Phase, time: MJD) -> StateVector {
        StateVector {
            position,
            velocity,
            epoch: time,
        }
    }
}

impl Propagator for TwoBodyIntegrator {
    fn propagate(&self, time: MJD) -> Result<StateVector, CometFitError> {
        if !time.is_finite() {
            return Err(CometFitError::InvalidParameter(format!(
                "target time must be finite, got {time}"
            )));
        }
        let start = (self.initial.position, self.initial.velocity);
        let y = self.advance(start, self.initial.epoch, time)?;
        Ok(self.to_state(y, time))
    }

    /// Integrates once through the sorted targets on each side of the initial epoch instead of
    /// restarting from the initial state for every instant.
    fn propagate_many(&self, times: &[MJD]) -> Vec<Result<StateVector, CometFitError>> {
        let mut results: Vec<Option<Result<StateVector, CometFitError>>> =
            (0..times.len()).map(|_| None).collect();

        let epoch = self.initial.epoch;
        let mut forward: Vec<usize> = (0..times.len()).filter(|&i| times[i] >= epoch).collect();
        let mut backward: Vec<usize> = (0..times.len()).filter(|&i| times[i] < epoch).collect();
        forward.sort_by(|&a, &b| times[a].total_cmp(&times[b]));
        backward.sort_by(|&a, &b| times[b].total_cmp(&times[a]));

        for branch in [forward, backward] {
            let mut current: Result<(Phase, MJD), CometFitError> =
                Ok(((self.initial.position, self.initial.velocity), epoch));

            for idx in branch {
                current = current.and_then(|(y, t)| {
                    self.advance(y, t, times[idx]).map(|next| (next, times[idx]))
                });
                results[idx] = Some(match &current {
                    Ok((y, t)) => Ok(self.to_state(*y, *t)),
                    Err(err) => Err(CometFitError::Propagation(format!(
                        "MJD {} not reached: {err}",
                        times[idx]
                    ))),
                });
            }
        }

        results
            .into_iter()
            .zip(times)
            .map(|(res, &t)| {
                res.unwrap_or_else(|| {
                    Err(CometFitError::InvalidParameter(format!(
                        "target time must be finite, got {t}"
                    )))
                })
            })
            .collect()
    }
}
