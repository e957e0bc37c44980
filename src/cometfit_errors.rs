//! # Error and soft-condition types
//!
//! Hard failures are reported through [`CometFitError`] and abort the pipeline before anything
//! is handed back to the caller. Soft conditions ([`SoftCondition`]) never abort: they travel
//! with the result in a [`Warnings`] list so the caller can decide how far to trust it.
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CometFitError {
    #[error("Insufficient observations: {found} provided, at least {required} required")]
    InsufficientObservations { found: usize, required: usize },

    #[error("Invalid angle: {0}")]
    InvalidAngle(String),

    #[error("Degenerate observation geometry: {0}")]
    DegenerateGeometry(String),

    #[error("No valid sample in the close-approach window [{start}, {end}] (MJD)")]
    NoValidSamples { start: f64, end: f64 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid state vector: {0}")]
    InvalidStateVector(String),

    #[error("Ephemeris error: {0}")]
    Ephemeris(String),

    #[error("Propagation failed: {0}")]
    Propagation(String),
}

impl PartialEq for CometFitError {
    fn eq(&self, other: &Self) -> bool {
        use CometFitError::*;
        match (self, other) {
            (
                InsufficientObservations {
                    found: a,
                    required: b,
                },
                InsufficientObservations {
                    found: c,
                    required: d,
                },
            ) => a == c && b == d,
            (InvalidAngle(a), InvalidAngle(b)) => a == b,
            (DegenerateGeometry(a), DegenerateGeometry(b)) => a == b,
            (NoValidSamples { start: a, end: b }, NoValidSamples { start: c, end: d }) => {
                a == c && b == d
            }
            (InvalidParameter(a), InvalidParameter(b)) => a == b,
            (InvalidStateVector(a), InvalidStateVector(b)) => a == b,
            (Ephemeris(a), Ephemeris(b)) => a == b,
            (Propagation(a), Propagation(b)) => a == b,
            _ => false,
        }
    }
}

/// Which orbital angle could not be defined by the element conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Degeneracy {
    /// Angular momentum vanishes: inclination and node are meaningless.
    RectilinearOrbit,
    /// Orbit lies in the reference plane: the node line is undefined.
    UndefinedNode,
    /// Circular orbit: there is no pericenter direction.
    UndefinedPericenter,
}

/// Non-fatal condition attached to a computed result.
///
/// Variants
/// -----------------
/// * `NonConvergence` – the Gauss range iteration hit its cap; `last_change` is the last
///   update of the heliocentric distance (AU).
/// * `DegenerateOrbit` – an element was defaulted because it is geometrically undefined.
/// * `FiniteDifferenceVelocity` – the middle velocity comes from the central difference of the
///   outer positions instead of the Lagrange relation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SoftCondition {
    NonConvergence { iterations: usize, last_change: f64 },
    DegenerateOrbit(Degeneracy),
    FiniteDifferenceVelocity,
}

impl fmt::Display for SoftCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftCondition::NonConvergence {
                iterations,
                last_change,
            } => write!(
                f,
                "range iteration not converged after {iterations} iterations (last Δr = {last_change:.3e} AU)"
            ),
            SoftCondition::DegenerateOrbit(Degeneracy::RectilinearOrbit) => {
                write!(f, "rectilinear orbit: inclination and node defaulted to 0°")
            }
            SoftCondition::DegenerateOrbit(Degeneracy::UndefinedNode) => {
                write!(f, "orbit in the reference plane: node defaulted to 0°")
            }
            SoftCondition::DegenerateOrbit(Degeneracy::UndefinedPericenter) => {
                write!(f, "circular orbit: argument of pericenter defaulted to 0°")
            }
            SoftCondition::FiniteDifferenceVelocity => {
                write!(f, "velocity estimated by central finite difference")
            }
        }
    }
}

/// Soft conditions carried by a result. Two inline slots cover every realistic case.
pub type Warnings = SmallVec<[SoftCondition; 2]>;
