//! # Initial Orbit Determination (IOD) parameters
//!
//! This module defines the [`IODParams`] configuration struct and its builder, which control
//! how the **Gauss method** searches for the heliocentric distance of the middle observation,
//! which candidate roots it accepts, and how it handles ill-conditioned geometry.
//!
//! ## Pipeline overview
//!
//! 1. **Triplet selection** ([`triplets_selection`])
//!    The first observation, the one nearest to the temporal midpoint and the last one are
//!    kept.
//!
//! 2. **Root bracketing** ([`gauss`])
//!    The residual `h(r) = |R₂ + ρ₂(r) L₂| − r` is sampled on a geometric grid of ratio
//!    `scan_ratio` over `[r2_min_au, r2_max_au]`. Every sign change brackets a root.
//!
//! 3. **Safeguarded iteration**
//!    Each bracket is refined by false-position steps (Illinois variant) with a bisection
//!    fallback, until the update of `r` drops below `tolerance_au` or `max_iterations` is
//!    reached (the latter only raises a soft `NonConvergence` warning).
//!
//! 4. **Candidate filtering**
//!    Roots with a topocentric distance below `min_rho2_au`, an eccentricity above `max_ecc`,
//!    a perihelion beyond `max_perihelion_au`, or a velocity that merely follows the observer
//!    (`comoving_tolerance`) are discarded. At most `max_tested_solutions` roots are kept.
//!
//! 5. **Selection**
//!    With more than three observations the root with the lowest RMS residual wins; otherwise
//!    the root nearest to the observer's heliocentric distance.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cometfit::initial_orbit_determination::IODParams;
//!
//! let params = IODParams::builder()
//!     .tolerance_au(1e-8)
//!     .max_iterations(20)
//!     .max_ecc(3.0)
//!     .build()
//!     .unwrap();
//!
//! println!("{params:#}");
//! ```
use std::cmp::Ordering::{Equal, Greater, Less};
use std::fmt;

use crate::cometfit_errors::CometFitError;

pub mod gauss;
pub mod gauss_result;
pub mod triplets_selection;

/// Configuration of the Gauss initial orbit determination.
///
/// Validation rules
/// -----------------
/// * `tolerance_au > 0`, `max_iterations ≥ 1`.
/// * `0 < r2_min_au < r2_max_au`, `scan_ratio > 1`.
/// * `min_rho2_au > 0`, `comoving_tolerance ≥ 0`, `max_ecc ≥ 0`, `max_perihelion_au > 0`.
/// * `0 < singular_rcond ≤ ill_conditioned_rcond < 1`.
/// * `finite_difference_max_arc ≥ 0`, `max_tested_solutions ≥ 1`.
///
/// See also
/// -----------------
/// * [`gauss::GaussObs::solve`] – consumer of these parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct IODParams {
    // --- Range iteration ---
    /// Convergence threshold on the update of the middle heliocentric distance (AU).
    pub tolerance_au: f64,
    /// Iteration cap of the root refinement.
    pub max_iterations: usize,
    /// Lower bound of the scanned heliocentric distances (AU).
    pub r2_min_au: f64,
    /// Upper bound of the scanned heliocentric distances (AU).
    pub r2_max_au: f64,
    /// Ratio between consecutive scanned distances.
    pub scan_ratio: f64,

    // --- Candidate filtering ---
    /// Minimum admissible topocentric distance of each observation (AU).
    pub min_rho2_au: f64,
    /// Relative velocity difference below which a root is taken to co-move with the observer.
    pub comoving_tolerance: f64,
    /// Maximum eccentricity accepted.
    pub max_ecc: f64,
    /// Maximum perihelion distance accepted (AU).
    pub max_perihelion_au: f64,
    /// Maximum number of admissible roots kept for the final selection.
    pub max_tested_solutions: usize,

    // --- Conditioning ---
    /// Reciprocal condition number below which the range system is solved by SVD.
    pub ill_conditioned_rcond: f64,
    /// Reciprocal condition number below which the range system is declared singular.
    pub singular_rcond: f64,
    /// Largest arc, in units of the dynamical time `sqrt(r³/μ)`, for which a finite-difference
    /// velocity is accepted.
    pub finite_difference_max_arc: f64,
}

impl IODParams {
    /// Construct a new [`IODParams`] with the default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`IODParamsBuilder`].
    pub fn builder() -> IODParamsBuilder {
        IODParamsBuilder::new()
    }

    /// Check the rules listed on [`IODParams`] for a value assembled field by field.
    pub fn validate(&self) -> Result<(), CometFitError> {
        IODParamsBuilder::check(self)
    }
}

impl Default for IODParams {
    fn default() -> Self {
        IODParams {
            tolerance_au: 1e-6,
            max_iterations: 10,
            r2_min_au: 0.05,
            r2_max_au: 200.0,
            scan_ratio: 1.02,

            min_rho2_au: 0.01,
            comoving_tolerance: 0.05,
            max_ecc: 5.0,
            max_perihelion_au: 1e3,
            max_tested_solutions: 3,

            ill_conditioned_rcond: 1e-9,
            singular_rcond: 1e-13,
            finite_difference_max_arc: 0.05,
        }
    }
}

/// Fluent builder for [`IODParams`].
#[derive(Debug, Clone)]
pub struct IODParamsBuilder {
    params: IODParams,
}

impl Default for IODParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IODParamsBuilder {
    /// Start from [`IODParams::default`].
    pub fn new() -> Self {
        Self {
            params: IODParams::default(),
        }
    }

    pub fn tolerance_au(mut self, v: f64) -> Self {
        self.params.tolerance_au = v;
        self
    }
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.params.max_iterations = v;
        self
    }
    pub fn r2_min_au(mut self, v: f64) -> Self {
        self.params.r2_min_au = v;
        self
    }
    pub fn r2_max_au(mut self, v: f64) -> Self {
        self.params.r2_max_au = v;
        self
    }
    pub fn scan_ratio(mut self, v: f64) -> Self {
        self.params.scan_ratio = v;
        self
    }

    pub fn min_rho2_au(mut self, v: f64) -> Self {
        self.params.min_rho2_au = v;
        self
    }
    pub fn comoving_tolerance(mut self, v: f64) -> Self {
        self.params.comoving_tolerance = v;
        self
    }
    pub fn max_ecc(mut self, v: f64) -> Self {
        self.params.max_ecc = v;
        self
    }
    pub fn max_perihelion_au(mut self, v: f64) -> Self {
        self.params.max_perihelion_au = v;
        self
    }
    pub fn max_tested_solutions(mut self, v: usize) -> Self {
        self.params.max_tested_solutions = v;
        self
    }

    pub fn ill_conditioned_rcond(mut self, v: f64) -> Self {
        self.params.ill_conditioned_rcond = v;
        self
    }
    pub fn singular_rcond(mut self, v: f64) -> Self {
        self.params.singular_rcond = v;
        self
    }
    pub fn finite_difference_max_arc(mut self, v: f64) -> Self {
        self.params.finite_difference_max_arc = v;
        self
    }

    // ---- Numeric helpers for PartialOrd (NaN is never valid) ----

    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    #[inline]
    fn lt(a: f64, b: f64) -> bool {
        a.partial_cmp(&b) == Some(Less)
    }

    #[inline]
    fn le(a: f64, b: f64) -> bool {
        matches!(a.partial_cmp(&b), Some(Less) | Some(Equal))
    }

    fn invalid(msg: &str) -> CometFitError {
        CometFitError::InvalidParameter(msg.into())
    }

    /// Validate and produce the [`IODParams`].
    ///
    /// Return
    /// ----------
    /// * `Ok(IODParams)` when every rule listed on [`IODParams`] holds, otherwise
    ///   [`CometFitError::InvalidParameter`] naming the first offending field.
    pub fn build(self) -> Result<IODParams, CometFitError> {
        Self::check(&self.params)?;
        Ok(self.params)
    }

    fn check(p: &IODParams) -> Result<(), CometFitError> {

        if !Self::gt0(p.tolerance_au) || !p.tolerance_au.is_finite() {
            return Err(Self::invalid("tolerance_au must be > 0"));
        }
        if p.max_iterations == 0 {
            return Err(Self::invalid("max_iterations must be >= 1"));
        }
        if !(Self::gt0(p.r2_min_au) && Self::lt(p.r2_min_au, p.r2_max_au) && p.r2_max_au.is_finite())
        {
            return Err(Self::invalid("require 0 < r2_min_au < r2_max_au"));
        }
        if !(Self::lt(1.0, p.scan_ratio) && p.scan_ratio.is_finite()) {
            return Err(Self::invalid("scan_ratio must be > 1"));
        }

        if !Self::gt0(p.min_rho2_au) {
            return Err(Self::invalid("min_rho2_au must be > 0"));
        }
        if !Self::ge0(p.comoving_tolerance) {
            return Err(Self::invalid("comoving_tolerance must be >= 0"));
        }
        if !Self::ge0(p.max_ecc) {
            return Err(Self::invalid("max_ecc must be >= 0"));
        }
        if !Self::gt0(p.max_perihelion_au) {
            return Err(Self::invalid("max_perihelion_au must be > 0"));
        }
        if p.max_tested_solutions == 0 {
            return Err(Self::invalid("max_tested_solutions must be >= 1"));
        }

        if !(Self::gt0(p.singular_rcond)
            && Self::le(p.singular_rcond, p.ill_conditioned_rcond)
            && Self::lt(p.ill_conditioned_rcond, 1.0))
        {
            return Err(Self::invalid(
                "require 0 < singular_rcond <= ill_conditioned_rcond < 1",
            ));
        }
        if !Self::ge0(p.finite_difference_max_arc) {
            return Err(Self::invalid("finite_difference_max_arc must be >= 0"));
        }

        Ok(())
    }
}

impl fmt::Display for IODParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            const PARAM_COL: usize = 44;
            writeln!(f, "Initial Orbit Determination Parameters")?;
            writeln!(f, "-------------------------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Range iteration]")?;
            line!(
                "tolerance_au          = {:.1e} AU",
                self.tolerance_au,
                "Convergence threshold on r2"
            )?;
            line!(
                "max_iterations        = {}",
                self.max_iterations,
                "Iteration cap per root"
            )?;
            line!(
                "r2_min_au             = {:.3} AU",
                self.r2_min_au,
                "Lower end of the r2 scan"
            )?;
            line!(
                "r2_max_au             = {:.3} AU",
                self.r2_max_au,
                "Upper end of the r2 scan"
            )?;
            line!(
                "scan_ratio            = {:.4}",
                self.scan_ratio,
                "Geometric step of the r2 scan"
            )?;

            writeln!(f, "\n[Candidate filtering]")?;
            line!(
                "min_rho2_au           = {:.3} AU",
                self.min_rho2_au,
                "Minimum topocentric distance"
            )?;
            line!(
                "comoving_tolerance    = {:.3}",
                self.comoving_tolerance,
                "Observer co-motion rejection"
            )?;
            line!(
                "max_ecc               = {:.3}",
                self.max_ecc,
                "Maximum eccentricity accepted"
            )?;
            line!(
                "max_perihelion_au     = {:.3} AU",
                self.max_perihelion_au,
                "Maximum perihelion distance"
            )?;
            line!(
                "max_tested_solutions  = {}",
                self.max_tested_solutions,
                "Admissible roots kept"
            )?;

            writeln!(f, "\n[Conditioning]")?;
            line!(
                "ill_conditioned_rcond = {:.1e}",
                self.ill_conditioned_rcond,
                "Switch from LU to SVD"
            )?;
            line!(
                "singular_rcond        = {:.1e}",
                self.singular_rcond,
                "Singular range system"
            )?;
            line!(
                "finite_difference_max_arc = {:.3}",
                self.finite_difference_max_arc,
                "Finite-difference velocity limit"
            )?;

            Ok(())
        } else {
            write!(
                f,
                "IODParams(tol={:.1e}AU, max_it={}, r2∈[{:.2},{:.1}]AU, ratio={:.3}, ρ≥{:.3}AU, e≤{:.2}, q≤{:.1}AU)",
                self.tolerance_au,
                self.max_iterations,
                self.r2_min_au,
                self.r2_max_au,
                self.scan_ratio,
                self.min_rho2_au,
                self.max_ecc,
                self.max_perihelion_au,
            )
        }
    }
}

#[cfg(test)]
mod iod_params_test {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let params = IODParamsBuilder::new().build().unwrap();
        assert_eq!(params, IODParams::default());
        assert_eq!(params.max_iterations, 10);
        assert_eq!(params.tolerance_au, 1e-6);
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        let cases = [
            IODParams::builder().tolerance_au(0.0),
            IODParams::builder().tolerance_au(f64::NAN),
            IODParams::builder().max_iterations(0),
            IODParams::builder().r2_min_au(3.0).r2_max_au(2.0),
            IODParams::builder().scan_ratio(1.0),
            IODParams::builder().min_rho2_au(0.0),
            IODParams::builder().comoving_tolerance(-0.1),
            IODParams::builder().max_ecc(f64::NAN),
            IODParams::builder().max_perihelion_au(0.0),
            IODParams::builder().max_tested_solutions(0),
            IODParams::builder().singular_rcond(1e-6).ill_conditioned_rcond(1e-9),
            IODParams::builder().finite_difference_max_arc(-1.0),
        ];
        for builder in cases {
            assert!(matches!(
                builder.build(),
                Err(CometFitError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_display() {
        let params = IODParams::default();
        let table = format!("{params:#}");
        assert!(table.contains("[Range iteration]"));
        assert!(table.contains("max_iterations        = 10"));
        let short = format!("{params}");
        assert!(short.starts_with("IODParams(tol=1.0e-6AU"));
    }
}
