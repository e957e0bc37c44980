//! # CometFit: the orbit-determination engine
//!
//! [`CometFit`] holds everything the pipeline needs as explicit configuration:
//!
//! 1. the gravitational parameter `μ` and the reference plane of the published elements,
//! 2. the [`EphemerisProvider`] giving Earth's position at the observation epochs,
//! 3. the [`IODParams`] of the Gauss method and the [`ApproachParams`] of the close-approach
//!    search,
//! 4. the [`PropagationMethod`] used to follow the orbit, and the minimum number of
//!    observations required before an orbit is attempted.
//!
//! The engine has no interior mutability: every method is a pure function of its inputs and of
//! this configuration, so one instance can be shared between threads.
//!
//! ## Pipeline
//!
//! ```text
//! observations ──► Gauss IOD ──► state vector ──► orbital elements ──► propagator ──► close approach
//! ```
//!
//! [`CometFit::recompute`] runs the whole chain and returns both products together in a
//! [`CometSolution`], so a caller replacing cached values replaces both or neither.
//! [`CometFit::recompute_many`] does the same for a whole [`CometSet`] in parallel.
//!
//! ## Typical usage
//!
//! ```rust, no_run
//! use cometfit::cometfit::CometFit;
//! use cometfit::observations::Observation;
//!
//! let engine = CometFit::builder().min_observations(3).build().unwrap();
//!
//! let observations: Vec<Observation> = [
//!     (60000.0, 10.20, -5.10),
//!     (60005.0, 11.05, -4.70),
//!     (60010.0, 11.92, -4.28),
//! ]
//! .into_iter()
//! .map(|(t, ra, dec)| engine.observation_from_radec(t, ra, dec))
//! .collect::<Result<_, _>>()
//! .unwrap();
//!
//! let solution = engine.recompute(&observations, 60010.0).unwrap();
//! println!("{}", solution.elements);
//! println!("{}", solution.close_approach);
//! ```
use std::{collections::HashMap, fmt, sync::Arc};

use ahash::RandomState;
use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    close_approach::{find_close_approach, ApproachParams, CloseApproach, SearchControl},
    cometfit_errors::CometFitError,
    constants::{CometId, Degree, Observations, GAUSS_GRAV_SQUARED, MJD},
    ephemeris::{standish::StandishEarth, Body, EphemerisProvider},
    initial_orbit_determination::{gauss::GaussObs, IODParams},
    observations::{residuals::rms_residual, sort_by_time, Observation},
    orbit_type::OrbitalElements,
    propagator::{KeplerPropagator, PropagationMethod, Propagator},
    ref_system::ReferencePlane,
};

/// Observation sets of several comets, keyed by comet.
///
/// Uses [`ahash`](https://docs.rs/ahash) for hashing; build it with `CometSet::default()`.
pub type CometSet = HashMap<CometId, Observations, RandomState>;

/// Per-comet outcome of [`CometFit::recompute_many`]. A failure only affects its own comet.
pub type FullSolutionResult =
    HashMap<CometId, Result<CometSolution, CometFitError>, RandomState>;

/// Borrow the solution computed for `id`.
///
/// Return
/// ----------
/// * `Ok(Some(&CometSolution))` – the pipeline succeeded for this comet.
/// * `Ok(None)` – the comet was not part of the batch.
/// * `Err(&CometFitError)` – the pipeline failed for this comet.
pub fn solution_for<'a>(
    all: &'a FullSolutionResult,
    id: &CometId,
) -> Result<Option<&'a CometSolution>, &'a CometFitError> {
    match all.get(id) {
        None => Ok(None),
        Some(Err(e)) => Err(e),
        Some(Ok(s)) => Ok(Some(s)),
    }
}

/// Orbital elements and the close approach derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CometSolution {
    pub elements: OrbitalElements,
    pub close_approach: CloseApproach,
}

impl fmt::Display for CometSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.elements)?;
        write!(f, "{}", self.close_approach)
    }
}

/// Orbit-determination engine.
///
/// See also
/// ------------
/// * [`CometFitBuilder`] – Configuration and validation.
/// * [`CometFit::recompute`] – Full pipeline for one comet.
#[derive(Clone)]
pub struct CometFit {
    mu: f64,
    reference_plane: ReferencePlane,
    propagation: PropagationMethod,
    min_observations: usize,
    iod_params: IODParams,
    approach_params: ApproachParams,
    ephemeris: Arc<dyn EphemerisProvider>,
}

impl fmt::Debug for CometFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CometFit")
            .field("mu", &self.mu)
            .field("reference_plane", &self.reference_plane)
            .field("propagation", &self.propagation)
            .field("min_observations", &self.min_observations)
            .field("iod_params", &self.iod_params)
            .field("approach_params", &self.approach_params)
            .finish_non_exhaustive()
    }
}

impl Default for CometFit {
    fn default() -> Self {
        CometFitBuilder::new().into_engine()
    }
}

impl CometFit {
    pub fn builder() -> CometFitBuilder {
        CometFitBuilder::new()
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn reference_plane(&self) -> ReferencePlane {
        self.reference_plane
    }

    pub fn propagation(&self) -> PropagationMethod {
        self.propagation
    }

    pub fn min_observations(&self) -> usize {
        self.min_observations
    }

    pub fn iod_params(&self) -> &IODParams {
        &self.iod_params
    }

    pub fn approach_params(&self) -> &ApproachParams {
        &self.approach_params
    }

    pub fn ephemeris(&self) -> &dyn EphemerisProvider {
        self.ephemeris.as_ref()
    }

    /// Heliocentric position of the observer (Earth) at `time`, equatorial J2000, AU.
    pub fn observer_position(&self, time: MJD) -> Result<Vector3<f64>, CometFitError> {
        self.ephemeris.position_of(Body::Earth, time)
    }

    /// Build an observation from equatorial J2000 angles, the observer being placed with the
    /// configured ephemeris.
    ///
    /// Arguments
    /// -----------------
    /// * `time`: epoch (MJD, TDB).
    /// * `ra`: right ascension in degrees, `[0, 360)`.
    /// * `dec`: declination in degrees, `[-90, 90]`.
    ///
    /// Return
    /// ----------
    /// * The [`Observation`], or [`CometFitError::InvalidAngle`] for out-of-range angles and
    ///   [`CometFitError::Ephemeris`] when Earth cannot be placed at `time`.
    pub fn observation_from_radec(
        &self,
        time: MJD,
        ra: Degree,
        dec: Degree,
    ) -> Result<Observation, CometFitError> {
        let observer = self.observer_position(time)?;
        Observation::from_radec(time, ra, dec, observer)
    }

    /// Same as [`CometFit::observation_from_radec`] with sexagesimal angles
    /// (`"HH MM SS.ss"`, `"±DD MM SS.s"`).
    pub fn observation_from_sexagesimal(
        &self,
        time: MJD,
        ra: &str,
        dec: &str,
    ) -> Result<Observation, CometFitError> {
        let observer = self.observer_position(time)?;
        Observation::from_sexagesimal(time, ra, dec, observer)
    }

    /// Determine the orbit of a comet from its observations.
    ///
    /// The observations are sorted by time, a triplet is solved with the Gauss method and the
    /// middle state is converted into elements in the configured reference plane. Soft
    /// conditions raised by the solver and by the conversion are merged into
    /// [`OrbitalElements::warnings`]; `fit_residual` is the RMS angular residual of every
    /// supplied observation.
    ///
    /// Return
    /// ----------
    /// * The [`OrbitalElements`], or
    ///   [`CometFitError::InsufficientObservations`] (checked before any computation),
    ///   [`CometFitError::DegenerateGeometry`] and the other solver failures.
    pub fn determine_orbit(
        &self,
        observations: &[Observation],
    ) -> Result<OrbitalElements, CometFitError> {
        if observations.len() < self.min_observations {
            return Err(CometFitError::InsufficientObservations {
                found: observations.len(),
                required: self.min_observations,
            });
        }

        let mut sorted = observations.to_vec();
        sort_by_time(&mut sorted);

        let gauss = GaussObs::from_observations(&sorted)?;
        let solution = gauss.solve(self.mu, &self.iod_params, &sorted)?.into_inner();

        let mut elements =
            OrbitalElements::from_state(&solution.state, self.mu, self.reference_plane)?;
        let mut warnings = solution.warnings;
        warnings.extend(elements.warnings.drain(..));
        elements.warnings = warnings;

        elements.fit_residual = match solution.rms {
            Some(rms) => Some(rms),
            None => {
                let propagator = KeplerPropagator::new(elements.clone(), self.mu);
                rms_residual(&sorted, &propagator)
                    .map_err(|err| warn!(%err, "fit residual could not be evaluated"))
                    .ok()
            }
        };

        for w in &elements.warnings {
            warn!(condition = %w, "soft condition on orbit solution");
        }
        info!(
            observations = sorted.len(),
            a = elements.semi_major_axis,
            e = elements.eccentricity,
            i = elements.inclination,
            rms = ?elements.fit_residual,
            "orbit determined"
        );

        Ok(elements)
    }

    /// Propagator for `elements`, following the configured [`PropagationMethod`].
    pub fn propagator(
        &self,
        elements: &OrbitalElements,
    ) -> Result<Box<dyn Propagator>, CometFitError> {
        self.propagation.propagator(elements, self.mu)
    }

    /// Closest approach to Earth in the configured window starting at `start`.
    ///
    /// Arguments
    /// -----------------
    /// * `elements`: orbit of the comet.
    /// * `start`: beginning of the searched window (MJD).
    /// * `control`: cancellation token and deadline.
    ///
    /// See also
    /// ------------
    /// * [`find_close_approach`] – Sampling and refinement details.
    pub fn predict_close_approach(
        &self,
        elements: &OrbitalElements,
        start: MJD,
        control: &SearchControl,
    ) -> Result<CloseApproach, CometFitError> {
        let propagator = self.propagator(elements)?;
        find_close_approach(
            propagator.as_ref(),
            self.ephemeris.as_ref(),
            start,
            elements.period(self.mu),
            &self.approach_params,
            control,
        )
    }

    /// Run the whole pipeline for one comet: orbit determination, then close approach.
    pub fn recompute(
        &self,
        observations: &[Observation],
        search_start: MJD,
    ) -> Result<CometSolution, CometFitError> {
        self.recompute_with_control(observations, search_start, &SearchControl::unbounded())
    }

    /// [`CometFit::recompute`] with a cancellation token and deadline for the search.
    pub fn recompute_with_control(
        &self,
        observations: &[Observation],
        search_start: MJD,
        control: &SearchControl,
    ) -> Result<CometSolution, CometFitError> {
        let elements = self.determine_orbit(observations)?;
        let close_approach = self.predict_close_approach(&elements, search_start, control)?;
        debug!(%close_approach, "pipeline complete");
        Ok(CometSolution {
            elements,
            close_approach,
        })
    }

    /// Run [`CometFit::recompute`] for every comet of the set, in parallel.
    ///
    /// Each comet appears once in the map, so no comet is processed twice concurrently by one
    /// call. Failures are isolated per comet.
    pub fn recompute_many(&self, comets: &CometSet, search_start: MJD) -> FullSolutionResult {
        let results: FullSolutionResult = comets
            .par_iter()
            .map(|(id, observations)| {
                let result = self.recompute(observations, search_start);
                if let Err(err) = &result {
                    warn!(comet = %id, %err, "recompute failed");
                }
                (id.clone(), result)
            })
            .collect();

        info!(
            comets = comets.len(),
            failed = results.values().filter(|r| r.is_err()).count(),
            "batch recompute finished"
        );
        results
    }
}

/// Fluent builder for [`CometFit`].
///
/// Defaults: Gaussian `μ = k²`, equatorial elements, Kepler propagation, three observations
/// minimum, default [`IODParams`] and [`ApproachParams`], [`StandishEarth`] ephemeris.
#[derive(Clone)]
pub struct CometFitBuilder {
    mu: f64,
    reference_plane: ReferencePlane,
    propagation: PropagationMethod,
    min_observations: usize,
    iod_params: IODParams,
    approach_params: ApproachParams,
    ephemeris: Arc<dyn EphemerisProvider>,
}

impl Default for CometFitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CometFitBuilder {
    pub fn new() -> Self {
        CometFitBuilder {
            mu: GAUSS_GRAV_SQUARED,
            reference_plane: ReferencePlane::default(),
            propagation: PropagationMethod::default(),
            min_observations: 3,
            iod_params: IODParams::default(),
            approach_params: ApproachParams::default(),
            ephemeris: Arc::new(StandishEarth),
        }
    }

    pub fn mu(mut self, mu: f64) -> Self {
        self.mu = mu;
        self
    }
    pub fn reference_plane(mut self, plane: ReferencePlane) -> Self {
        self.reference_plane = plane;
        self
    }
    pub fn propagation(mut self, method: PropagationMethod) -> Self {
        self.propagation = method;
        self
    }
    pub fn min_observations(mut self, n: usize) -> Self {
        self.min_observations = n;
        self
    }
    pub fn iod_params(mut self, params: IODParams) -> Self {
        self.iod_params = params;
        self
    }
    pub fn approach_params(mut self, params: ApproachParams) -> Self {
        self.approach_params = params;
        self
    }
    pub fn ephemeris<E: EphemerisProvider + 'static>(mut self, ephemeris: E) -> Self {
        self.ephemeris = Arc::new(ephemeris);
        self
    }
    pub fn shared_ephemeris(mut self, ephemeris: Arc<dyn EphemerisProvider>) -> Self {
        self.ephemeris = ephemeris;
        self
    }

    fn into_engine(self) -> CometFit {
        CometFit {
            mu: self.mu,
            reference_plane: self.reference_plane,
            propagation: self.propagation,
            min_observations: self.min_observations,
            iod_params: self.iod_params,
            approach_params: self.approach_params,
            ephemeris: self.ephemeris,
        }
    }

    /// Validate and produce the engine.
    ///
    /// Return
    /// ----------
    /// * The [`CometFit`], or [`CometFitError::InvalidParameter`] when `μ` is not a positive
    ///   finite number, fewer than three observations are allowed, the propagation step is
    ///   invalid, or the IOD or close-approach parameters break their validation rules.
    pub fn build(self) -> Result<CometFit, CometFitError> {
        if !(self.mu.is_finite() && self.mu > 0.0) {
            return Err(CometFitError::InvalidParameter(format!(
                "gravitational parameter must be positive, got {}",
                self.mu
            )));
        }
        if self.min_observations < 3 {
            return Err(CometFitError::InvalidParameter(format!(
                "min_observations must be >= 3, got {}",
                self.min_observations
            )));
        }
        self.propagation.validate()?;
        self.iod_params.validate()?;
        self.approach_params.validate()?;
        Ok(self.into_engine())
    }
}
