//! # Gauss orbit determination result
//!
//! [`GaussResult`] wraps the [`GaussSolution`] returned by
//! [`GaussObs::solve`](crate::initial_orbit_determination::gauss::GaussObs::solve) and tells
//! whether the range iteration met its tolerance.
//!
//! - **`Converged`** – the update of the middle distance dropped below `tolerance_au`.
//! - **`Unconverged`** – the iteration cap was hit; the last estimate is returned and a
//!   [`SoftCondition::NonConvergence`](crate::cometfit_errors::SoftCondition::NonConvergence)
//!   is present in its warnings.
use std::fmt;

use crate::{
    cometfit_errors::{SoftCondition, Warnings},
    constants::ArcSec,
    orbit_type::StateVector,
};

/// State vector at the middle epoch and the diagnostics of the root that produced it.
///
/// Fields
/// -----------------
/// * `state` – heliocentric state at the middle observation (equatorial J2000).
/// * `ranges` – topocentric distances `(ρ₁, ρ₂, ρ₃)` of the triplet (AU).
/// * `iterations` – refinement iterations spent on the selected root.
/// * `rms` – RMS angular residual over all supplied observations (arcsec), if evaluated.
/// * `admissible_roots` – number of roots that survived filtering.
/// * `warnings` – soft conditions raised while solving.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussSolution {
    pub state: StateVector,
    pub ranges: [f64; 3],
    pub iterations: usize,
    pub rms: Option<ArcSec>,
    pub admissible_roots: usize,
    pub warnings: Warnings,
}

/// Outcome of the Gauss method.
#[derive(Debug, Clone, PartialEq)]
pub enum GaussResult {
    Converged(GaussSolution),
    Unconverged(GaussSolution),
}

impl GaussResult {
    /// Wrap a solution, choosing the variant from its warnings.
    pub fn from_solution(solution: GaussSolution) -> Self {
        let unconverged = solution
            .warnings
            .iter()
            .any(|w| matches!(w, SoftCondition::NonConvergence { .. }));
        if unconverged {
            GaussResult::Unconverged(solution)
        } else {
            GaussResult::Converged(solution)
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, GaussResult::Converged(_))
    }

    /// Borrow the solution regardless of the variant.
    pub fn get_solution(&self) -> &GaussSolution {
        match self {
            GaussResult::Converged(s) | GaussResult::Unconverged(s) => s,
        }
    }

    /// Consume the result and return the solution.
    pub fn into_inner(self) -> GaussSolution {
        match self {
            GaussResult::Converged(s) | GaussResult::Unconverged(s) => s,
        }
    }
}

impl fmt::Display for GaussResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.get_solution();
        let status = if self.is_converged() {
            "converged"
        } else {
            "unconverged"
        };
        writeln!(
            f,
            "[Gauss {status}] MJD {:.6}, {} iteration(s), {} admissible root(s)",
            s.state.epoch, s.iterations, s.admissible_roots
        )?;
        writeln!(
            f,
            "  r   = [{:.9}, {:.9}, {:.9}] AU",
            s.state.position.x, s.state.position.y, s.state.position.z
        )?;
        writeln!(
            f,
            "  v   = [{:.9e}, {:.9e}, {:.9e}] AU/d",
            s.state.velocity.x, s.state.velocity.y, s.state.velocity.z
        )?;
        write!(
            f,
            "  rho = [{:.6}, {:.6}, {:.6}] AU",
            s.ranges[0], s.ranges[1], s.ranges[2]
        )?;
        if let Some(rms) = s.rms {
            write!(f, "\n  rms = {rms:.3}″")?;
        }
        for w in &s.warnings {
            write!(f, "\n  ! {w}")?;
        }
        Ok(())
    }
}
