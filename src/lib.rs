pub mod close_approach;
pub mod cometfit;
pub mod cometfit_errors;
pub mod constants;
pub mod conversion;
pub mod ephemeris;
pub mod initial_orbit_determination;
pub mod kepler;
pub mod observations;
mod orb_elem;
pub mod orbit_type;
pub mod propagator;
pub mod ref_system;
pub mod time;

pub use crate::close_approach::{ApproachParams, CancellationToken, CloseApproach, SearchControl};
pub use crate::cometfit::{CometFit, CometFitBuilder, CometSet, CometSolution};
pub use crate::cometfit_errors::{CometFitError, Degeneracy, SoftCondition, Warnings};
pub use crate::constants::CometId;
pub use crate::ephemeris::{Body, EphemerisProvider};
pub use crate::initial_orbit_determination::IODParams;
pub use crate::observations::Observation;
pub use crate::orbit_type::{OrbitalElements, StateVector};
pub use crate::propagator::{PropagationMethod, Propagator};
pub use crate::ref_system::ReferencePlane;
