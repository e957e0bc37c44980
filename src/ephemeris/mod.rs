//! # Ephemeris providers
//!
//! The engine never computes planetary positions itself: it asks an [`EphemerisProvider`] for
//! the heliocentric position of a [`Body`] (equatorial J2000, AU) at the instants it needs.
//! Callers plug in whatever source they trust (JPL kernels, a web service cache…) by
//! implementing the trait.
//!
//! Two providers ship with the crate:
//!
//! - [`standish::StandishEarth`] – Earth–Moon barycenter from the JPL mean elements of
//!   E. M. Standish, valid from 1800 to 2050, accurate to a few 10⁻⁵ AU.
//! - [`fixed_orbit::FixedOrbitEphemeris`] – the observer on a fixed Keplerian orbit, for
//!   synthetic scenarios and tests.
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{cometfit_errors::CometFitError, constants::MJD};

pub mod fixed_orbit;
pub mod standish;

/// Bodies an ephemeris provider can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Body {
    Sun,
    Earth,
}

impl std::fmt::Display for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Sun => write!(f, "Sun"),
            Body::Earth => write!(f, "Earth"),
        }
    }
}

/// Source of heliocentric body positions.
///
/// Implementors must be thread-safe: the engine shares one provider between comets processed
/// in parallel.
pub trait EphemerisProvider: Send + Sync {
    /// Heliocentric position of `body` at `time` (MJD, TDB), equatorial J2000, AU.
    fn position_of(&self, body: Body, time: MJD) -> Result<Vector3<f64>, CometFitError>;

    /// Batched lookup; each instant fails independently.
    fn positions_of(&self, body: Body, times: &[MJD]) -> Vec<Result<Vector3<f64>, CometFitError>> {
        times.iter().map(|&t| self.position_of(body, t)).collect()
    }
}

#[cfg(test)]
mod ephemeris_test {
    use super::*;

    struct Origin;

    impl EphemerisProvider for Origin {
        fn position_of(&self, body: Body, time: MJD) -> Result<Vector3<f64>, CometFitError> {
            if time < 0.0 {
                return Err(CometFitError::Ephemeris(format!("no data for {body}")));
            }
            Ok(Vector3::zeros())
        }
    }

    #[test]
    fn test_default_batch_lookup() {
        let results = Origin.positions_of(Body::Earth, &[1.0, -1.0, 2.0]);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert_eq!(
            results[1],
            Err(CometFitError::Ephemeris("no data for Earth".into()))
        );
        assert!(results[2].is_ok());
    }
}
