//! # Orbit representations
//!
//! Two views of the same heliocentric two-body orbit:
//!
//! - [`StateVector`] – Cartesian position and velocity at an epoch, in the equatorial J2000
//!   frame. This is what the initial orbit determination produces and what the propagators
//!   consume.
//! - [`OrbitalElements`](crate::orbit_type::keplerian_element::OrbitalElements) – the classical
//!   element set `(a, e, i, Ω, ω, T₀)` with the perihelion distance, expressed relative to a
//!   configurable [`ReferencePlane`](crate::ref_system::ReferencePlane).
//!
//! ## Typical workflow
//!
//! ```rust, no_run
//! use nalgebra::Vector3;
//! use cometfit::constants::GAUSS_GRAV_SQUARED;
//! use cometfit::orbit_type::{keplerian_element::OrbitalElements, StateVector};
//! use cometfit::ref_system::ReferencePlane;
//!
//! let state = StateVector::new(
//!     Vector3::new(1.0, 0.0, 0.0),
//!     Vector3::new(0.0, 0.0172, 0.0),
//!     60000.0,
//! ).unwrap();
//!
//! let elements = OrbitalElements::from_state(&state, GAUSS_GRAV_SQUARED, ReferencePlane::Ecliptic).unwrap();
//! println!("{elements}");
//! ```
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    cometfit_errors::CometFitError,
    constants::{AuPerDay, MJD},
};

/// Classical orbital elements and the Cartesian ↔ elements conversions.
pub mod keplerian_element;

pub use keplerian_element::OrbitalElements;

/// Heliocentric Cartesian state (equatorial J2000).
///
/// Units
/// -----
/// * `position`: AU.
/// * `velocity`: AU/day.
/// * `epoch`: MJD (TDB).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub epoch: MJD,
}

impl StateVector {
    /// Build a state vector, rejecting non-finite components and a position at the origin.
    pub fn new(
        position: Vector3<f64>,
        velocity: Vector3<f64>,
        epoch: MJD,
    ) -> Result<Self, CometFitError> {
        let state = StateVector {
            position,
            velocity,
            epoch,
        };
        state.validate()?;
        Ok(state)
    }

    /// Check that every component is finite and the body is not at the central mass.
    pub fn validate(&self) -> Result<(), CometFitError> {
        if !(self.position.iter().all(|c| c.is_finite())
            && self.velocity.iter().all(|c| c.is_finite())
            && self.epoch.is_finite())
        {
            return Err(CometFitError::InvalidStateVector(format!(
                "non-finite component at MJD {}",
                self.epoch
            )));
        }
        if self.position.norm() == 0.0 {
            return Err(CometFitError::InvalidStateVector(
                "position coincides with the central body".into(),
            ));
        }
        Ok(())
    }

    /// Heliocentric distance (AU).
    pub fn distance(&self) -> f64 {
        self.position.norm()
    }

    /// Speed (AU/day).
    pub fn speed(&self) -> AuPerDay {
        self.velocity.norm()
    }

    /// Specific angular momentum `r × v` (AU²/day).
    pub fn angular_momentum(&self) -> Vector3<f64> {
        self.position.cross(&self.velocity)
    }

    /// Specific orbital energy `v²/2 − μ/r` (AU²/day²).
    pub fn specific_energy(&self, mu: f64) -> f64 {
        0.5 * self.velocity.norm_squared() - mu / self.distance()
    }
}

#[cfg(test)]
mod orbit_type_test {
    use super::*;
    use crate::constants::GAUSS_GRAV_SQUARED;
    use approx::assert_relative_eq;

    #[test]
    fn test_state_vector_validation() {
        assert!(StateVector::new(Vector3::x(), Vector3::y(), 0.0).is_ok());
        assert!(matches!(
            StateVector::new(Vector3::zeros(), Vector3::y(), 0.0),
            Err(CometFitError::InvalidStateVector(_))
        ));
        assert!(matches!(
            StateVector::new(Vector3::new(f64::NAN, 0.0, 1.0), Vector3::y(), 0.0),
            Err(CometFitError::InvalidStateVector(_))
        ));
    }

    #[test]
    fn test_circular_energy() {
        let v = GAUSS_GRAV_SQUARED.sqrt();
        let state = StateVector::new(Vector3::x(), Vector3::new(0.0, v, 0.0), 0.0).unwrap();
        assert_relative_eq!(
            state.specific_energy(GAUSS_GRAV_SQUARED),
            -0.5 * GAUSS_GRAV_SQUARED,
            epsilon = 1e-18
        );
        assert_relative_eq!(state.angular_momentum(), Vector3::new(0.0, 0.0, v));
    }
}
