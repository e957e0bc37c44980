//! # Classical orbital elements
//!
//! This module defines [`OrbitalElements`], the element set handed back to callers after an
//! orbit determination, and the two conversions that tie it to a Cartesian [`StateVector`]:
//!
//! - [`OrbitalElements::from_state`] – `(r, v)` → `(a, e, i, Ω, ω, T₀, q)`.
//! - [`OrbitalElements::to_state`] – elements → `(r, v)` at any instant, for every conic.
//!
//! ## Conventions
//!
//! | quantity | unit   | range / remark                                        |
//! |----------|--------|-------------------------------------------------------|
//! | `a`      | AU     | `> 0` elliptic, `< 0` hyperbolic, `+∞` parabolic       |
//! | `e`      | –      | `≥ 0`                                                 |
//! | `i`      | degree | `[0, 180]`                                            |
//! | `Ω`, `ω` | degree | `[0, 360)`                                            |
//! | `T₀`     | MJD    | pericenter passage nearest to the epoch (elliptic)    |
//! | `q`      | AU     | perihelion distance, finite for every conic           |
//!
//! Angles are measured from the [`ReferencePlane`] stored with the elements; the Cartesian
//! states on both sides of the conversion are always equatorial J2000.
//!
//! ## Degeneracies
//!
//! Undefined angles are defaulted and reported through
//! [`SoftCondition::DegenerateOrbit`]:
//!
//! - **Rectilinear** (`|h| ≈ 0`): `i = Ω = ω = 0`, `T₀ = epoch`. Such elements cannot be
//!   propagated.
//! - **Undefined node** (`i ≈ 0` or `180°`): `Ω = 0` and `ω` becomes the longitude of
//!   pericenter measured from the x axis.
//! - **Circular** (`e ≈ 0`): `ω = 0` and the anomaly is measured from the node (or from the
//!   x axis when the node is undefined too), so `T₀` is the time of the node crossing.
use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    cometfit_errors::{CometFitError, Degeneracy, SoftCondition, Warnings},
    constants::{ArcSec, Au, Days, Degree, Radian, DPI, MJD},
    kepler::{
        eccentric_from_true_anomaly, hyperbolic_from_true_anomaly, principal_angle,
        solve_barker, solve_kepler_elliptic, solve_kepler_hyperbolic,
        true_from_eccentric_anomaly, true_from_hyperbolic_anomaly, wrap_to_pi, KEPLER_EPS,
    },
    orbit_type::StateVector,
    ref_system::{perifocal_rotation, ReferencePlane},
};

/// Below this absolute specific energy (AU²/day²) the orbit is treated as parabolic.
pub const PARABOLIC_ENERGY_EPS: f64 = 1e-12;

/// Eccentricity under which the pericenter direction is considered undefined.
pub const CIRCULAR_ECC_EPS: f64 = 1e-9;

/// `|r × v| ≤ RECTILINEAR_EPS · |r| |v|` flags a rectilinear orbit.
const RECTILINEAR_EPS: f64 = 1e-10;

/// `sin i` under which the node line is considered undefined.
const NODE_EPS: f64 = 1e-10;

/// Conic section described by an element set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Conic {
    Elliptic,
    Parabolic,
    Hyperbolic,
}

/// Osculating heliocentric orbital elements of a comet.
///
/// Units
/// -----
/// * `epoch`: MJD (TDB) of the state the elements were derived from.
/// * `semi_major_axis`: AU (`+∞` for a parabola, negative for a hyperbola).
/// * `eccentricity`: unitless.
/// * `inclination`, `longitude_of_ascending_node`, `argument_of_pericenter`: degrees.
/// * `time_of_pericenter_passage`: MJD (TDB).
/// * `perihelion_distance`: AU.
/// * `fit_residual`: RMS angular residual of the observations against this orbit, arcsec.
///
/// See also
/// --------
/// * [`OrbitalElements::from_state`] – Build from a Cartesian state.
/// * [`OrbitalElements::to_state`] – Evaluate the Cartesian state at an instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    pub epoch: MJD,
    pub semi_major_axis: Au,
    pub eccentricity: f64,
    pub inclination: Degree,
    pub longitude_of_ascending_node: Degree,
    pub argument_of_pericenter: Degree,
    pub time_of_pericenter_passage: MJD,
    pub perihelion_distance: Au,
    pub reference_plane: ReferencePlane,
    pub fit_residual: Option<ArcSec>,
    pub warnings: Warnings,
}

/// Angle in radians → degrees in `[0, 360)`.
fn degrees_in_circle(angle: Radian) -> Degree {
    let deg = principal_angle(angle).to_degrees();
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

fn check_mu(mu: f64) -> Result<(), CometFitError> {
    if mu.is_finite() && mu > 0.0 {
        Ok(())
    } else {
        Err(CometFitError::InvalidParameter(format!(
            "gravitational parameter must be positive, got {mu}"
        )))
    }
}

impl OrbitalElements {
    /// Convert a heliocentric Cartesian state into classical orbital elements.
    ///
    /// Arguments
    /// -----------------
    /// * `state`: position (AU) and velocity (AU/day) in the equatorial J2000 frame.
    /// * `mu`: gravitational parameter of the Sun (AU³/day²).
    /// * `plane`: reference plane for `i`, `Ω` and `ω`.
    ///
    /// Return
    /// ----------
    /// * The element set, with any defaulted angle recorded in `warnings`, or
    ///   [`CometFitError::InvalidStateVector`] / [`CometFitError::InvalidParameter`] on invalid
    ///   input.
    ///
    /// The conic is chosen from the specific energy `ε = v²/2 − μ/r`: `|ε| < 1e-12` is parabolic
    /// (`a = +∞`), otherwise `a = −μ/(2ε)`. The time of pericenter passage goes through the
    /// eccentric, hyperbolic or parabolic (Barker) anomaly accordingly.
    pub fn from_state(
        state: &StateVector,
        mu: f64,
        plane: ReferencePlane,
    ) -> Result<Self, CometFitError> {
        state.validate()?;
        check_mu(mu)?;

        let r = plane.from_equatorial(&state.position);
        let v = plane.from_equatorial(&state.velocity);
        let r_norm = r.norm();
        let v_norm = v.norm();

        let energy = 0.5 * v_norm * v_norm - mu / r_norm;
        let h = r.cross(&v);
        let h_norm = h.norm();
        let mut warnings = Warnings::new();

        if h_norm <= RECTILINEAR_EPS * r_norm * v_norm {
            warnings.push(SoftCondition::DegenerateOrbit(Degeneracy::RectilinearOrbit));
            let semi_major_axis = if energy.abs() < PARABOLIC_ENERGY_EPS {
                f64::INFINITY
            } else {
                -mu / (2.0 * energy)
            };
            return Ok(OrbitalElements {
                epoch: state.epoch,
                semi_major_axis,
                eccentricity: 1.0,
                inclination: 0.0,
                longitude_of_ascending_node: 0.0,
                argument_of_pericenter: 0.0,
                time_of_pericenter_passage: state.epoch,
                perihelion_distance: 0.0,
                reference_plane: plane,
                fit_residual: None,
                warnings,
            });
        }

        let ecc_vec = v.cross(&h) / mu - r / r_norm;
        let eccentricity = ecc_vec.norm();

        let conic = if energy.abs() < PARABOLIC_ENERGY_EPS {
            Conic::Parabolic
        } else if energy < 0.0 {
            if eccentricity < 1.0 {
                Conic::Elliptic
            } else {
                Conic::Parabolic
            }
        } else if eccentricity > 1.0 {
            Conic::Hyperbolic
        } else {
            Conic::Parabolic
        };

        let semi_major_axis = match conic {
            Conic::Parabolic => f64::INFINITY,
            _ => -mu / (2.0 * energy),
        };
        let perihelion_distance = h_norm * h_norm / (mu * (1.0 + eccentricity));

        let h_hat = h / h_norm;
        let inclination = h_hat.z.clamp(-1.0, 1.0).acos();

        // Signed angle from `from` to `to`, counted in the direction of motion.
        let signed_angle = |from: &Vector3<f64>, to: &Vector3<f64>| -> Radian {
            h_hat.dot(&from.cross(to)).atan2(from.dot(to))
        };

        let node_vec = Vector3::new(-h.y, h.x, 0.0);
        let (reference_direction, node) = if node_vec.norm() > NODE_EPS * h_norm {
            (node_vec, node_vec.y.atan2(node_vec.x))
        } else {
            warnings.push(SoftCondition::DegenerateOrbit(Degeneracy::UndefinedNode));
            (Vector3::x(), 0.0)
        };

        let (periapsis, true_anomaly) = if eccentricity < CIRCULAR_ECC_EPS {
            warnings.push(SoftCondition::DegenerateOrbit(
                Degeneracy::UndefinedPericenter,
            ));
            (0.0, signed_angle(&reference_direction, &r))
        } else {
            (
                signed_angle(&reference_direction, &ecc_vec),
                signed_angle(&ecc_vec, &r),
            )
        };

        let time_of_pericenter_passage = time_of_pericenter(
            conic,
            state.epoch,
            true_anomaly,
            eccentricity,
            semi_major_axis,
            perihelion_distance,
            mu,
        )?;

        Ok(OrbitalElements {
            epoch: state.epoch,
            semi_major_axis,
            eccentricity,
            inclination: inclination.to_degrees(),
            longitude_of_ascending_node: degrees_in_circle(node),
            argument_of_pericenter: degrees_in_circle(periapsis),
            time_of_pericenter_passage,
            perihelion_distance,
            reference_plane: plane,
            fit_residual: None,
            warnings,
        })
    }

    /// Build an element set from its perihelion form `(q, e, i, Ω, ω, T₀)`.
    ///
    /// Arguments
    /// -----------------
    /// * `epoch`: osculating epoch (MJD).
    /// * `perihelion_distance`: `q > 0` (AU).
    /// * `eccentricity`: `e ≥ 0`; `e = 1` gives a parabola.
    /// * `inclination`: degrees in `[0, 180]`.
    /// * `node`, `periapsis`: degrees, normalized to `[0, 360)`.
    /// * `time_of_pericenter_passage`: MJD.
    /// * `reference_plane`: plane the angles refer to.
    ///
    /// Return
    /// ----------
    /// * The element set with `a = q / (1 − e)`, or [`CometFitError::InvalidParameter`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_conic(
        epoch: MJD,
        perihelion_distance: Au,
        eccentricity: f64,
        inclination: Degree,
        node: Degree,
        periapsis: Degree,
        time_of_pericenter_passage: MJD,
        reference_plane: ReferencePlane,
    ) -> Result<Self, CometFitError> {
        if !(perihelion_distance.is_finite() && perihelion_distance > 0.0) {
            return Err(CometFitError::InvalidParameter(format!(
                "perihelion distance must be positive, got {perihelion_distance}"
            )));
        }
        if !(eccentricity.is_finite() && eccentricity >= 0.0) {
            return Err(CometFitError::InvalidParameter(format!(
                "eccentricity must be non-negative, got {eccentricity}"
            )));
        }
        if !(0.0..=180.0).contains(&inclination) {
            return Err(CometFitError::InvalidParameter(format!(
                "inclination must lie in [0, 180]°, got {inclination}"
            )));
        }
        if !(node.is_finite()
            && periapsis.is_finite()
            && epoch.is_finite()
            && time_of_pericenter_passage.is_finite())
        {
            return Err(CometFitError::InvalidParameter(
                "angles and epochs must be finite".into(),
            ));
        }

        let semi_major_axis = if eccentricity == 1.0 {
            f64::INFINITY
        } else {
            perihelion_distance / (1.0 - eccentricity)
        };

        Ok(OrbitalElements {
            epoch,
            semi_major_axis,
            eccentricity,
            inclination,
            longitude_of_ascending_node: degrees_in_circle(node.to_radians()),
            argument_of_pericenter: degrees_in_circle(periapsis.to_radians()),
            time_of_pericenter_passage,
            perihelion_distance,
            reference_plane,
            fit_residual: None,
            warnings: Warnings::new(),
        })
    }

    /// Conic section of the orbit, read from the semi-major axis.
    pub fn conic(&self) -> Conic {
        if !self.semi_major_axis.is_finite() {
            Conic::Parabolic
        } else if self.semi_major_axis > 0.0 {
            Conic::Elliptic
        } else {
            Conic::Hyperbolic
        }
    }

    pub fn is_elliptic(&self) -> bool {
        self.conic() == Conic::Elliptic
    }

    /// `true` when a soft condition was raised while producing these elements.
    pub fn is_low_confidence(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Mean motion (rad/day); `None` for a parabola.
    pub fn mean_motion(&self, mu: f64) -> Option<f64> {
        match self.conic() {
            Conic::Elliptic => Some((mu / self.semi_major_axis.powi(3)).sqrt()),
            Conic::Hyperbolic => Some((mu / (-self.semi_major_axis).powi(3)).sqrt()),
            Conic::Parabolic => None,
        }
    }

    /// Orbital period (days); `None` unless the orbit is elliptic.
    pub fn period(&self, mu: f64) -> Option<Days> {
        match self.conic() {
            Conic::Elliptic => self.mean_motion(mu).map(|n| DPI / n),
            _ => None,
        }
    }

    /// Heliocentric state at `time` on the two-body orbit described by these elements.
    ///
    /// Arguments
    /// -----------------
    /// * `mu`: gravitational parameter (AU³/day²).
    /// * `time`: target instant (MJD).
    ///
    /// Return
    /// ----------
    /// * The equatorial J2000 state at `time`, or an error if the elements cannot be
    ///   propagated (rectilinear orbit, invalid perihelion distance, non-finite result).
    pub fn to_state(&self, mu: f64, time: MJD) -> Result<StateVector, CometFitError> {
        check_mu(mu)?;
        if !time.is_finite() {
            return Err(CometFitError::InvalidParameter(format!(
                "target time must be finite, got {time}"
            )));
        }
        if self
            .warnings
            .contains(&SoftCondition::DegenerateOrbit(Degeneracy::RectilinearOrbit))
        {
            return Err(CometFitError::Propagation(
                "rectilinear orbit cannot be propagated with conic elements".into(),
            ));
        }

        let e = self.eccentricity;
        let q = self.perihelion_distance;
        if !(q.is_finite() && q > 0.0) {
            return Err(CometFitError::Propagation(format!(
                "invalid perihelion distance {q}"
            )));
        }

        let dt = time - self.time_of_pericenter_passage;
        let true_anomaly = match self.conic() {
            Conic::Elliptic => {
                let n = (mu / self.semi_major_axis.powi(3)).sqrt();
                let e_anom = solve_kepler_elliptic(n * dt, e, KEPLER_EPS)?;
                true_from_eccentric_anomaly(e_anom, e)
            }
            Conic::Hyperbolic => {
                let n = (mu / (-self.semi_major_axis).powi(3)).sqrt();
                let h_anom = solve_kepler_hyperbolic(n * dt, e, KEPLER_EPS)?;
                true_from_hyperbolic_anomaly(h_anom, e)
            }
            Conic::Parabolic => {
                let barker = dt / (2.0 * q.powi(3) / mu).sqrt();
                2.0 * solve_barker(barker).atan()
            }
        };

        let p = q * (1.0 + e);
        let (sin_nu, cos_nu) = true_anomaly.sin_cos();
        let radius = p / (1.0 + e * cos_nu);

        let position_pf = Vector3::new(radius * cos_nu, radius * sin_nu, 0.0);
        let velocity_pf = (mu / p).sqrt() * Vector3::new(-sin_nu, e + cos_nu, 0.0);

        let rotation = perifocal_rotation(
            self.longitude_of_ascending_node.to_radians(),
            self.inclination.to_radians(),
            self.argument_of_pericenter.to_radians(),
        );

        let position = self.reference_plane.to_equatorial(&(rotation * position_pf));
        let velocity = self.reference_plane.to_equatorial(&(rotation * velocity_pf));

        StateVector::new(position, velocity, time).map_err(|err| {
            CometFitError::Propagation(format!("element propagation to MJD {time} failed: {err}"))
        })
    }
}

/// Time of pericenter passage from the true anomaly at `epoch`.
fn time_of_pericenter(
    conic: Conic,
    epoch: MJD,
    true_anomaly: Radian,
    eccentricity: f64,
    semi_major_axis: Au,
    perihelion_distance: Au,
    mu: f64,
) -> Result<MJD, CometFitError> {
    let t0 = match conic {
        Conic::Elliptic => {
            let e_anom = eccentric_from_true_anomaly(true_anomaly, eccentricity);
            let mean_anomaly = e_anom - eccentricity * e_anom.sin();
            let n = (mu / semi_major_axis.powi(3)).sqrt();
            epoch - mean_anomaly / n
        }
        Conic::Hyperbolic => {
            let h_anom = hyperbolic_from_true_anomaly(wrap_to_pi(true_anomaly), eccentricity);
            let mean_anomaly = eccentricity * h_anom.sinh() - h_anom;
            let n = (mu / (-semi_major_axis).powi(3)).sqrt();
            epoch - mean_anomaly / n
        }
        Conic::Parabolic => {
            let d = (0.5 * wrap_to_pi(true_anomaly)).tan();
            epoch - (2.0 * perihelion_distance.powi(3) / mu).sqrt() * (d + d.powi(3) / 3.0)
        }
    };

    if t0.is_finite() {
        Ok(t0)
    } else {
        Err(CometFitError::InvalidStateVector(format!(
            "time of pericenter passage is undefined (ν = {true_anomaly} rad, e = {eccentricity})"
        )))
    }
}

impl fmt::Display for OrbitalElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Orbital elements @ epoch (MJD): {:.6} [{}]",
            self.epoch, self.reference_plane
        )?;
        writeln!(f, "-------------------------------------------")?;
        writeln!(
            f,
            "  a   (semi-major axis)       = {:.6} AU",
            self.semi_major_axis
        )?;
        writeln!(
            f,
            "  e   (eccentricity)          = {:.6}",
            self.eccentricity
        )?;
        writeln!(
            f,
            "  q   (perihelion distance)   = {:.6} AU",
            self.perihelion_distance
        )?;
        writeln!(
            f,
            "  i   (inclination)           = {:.6}°",
            self.inclination
        )?;
        writeln!(
            f,
            "  Ω   (longitude of node)     = {:.6}°",
            self.longitude_of_ascending_node
        )?;
        writeln!(
            f,
            "  ω   (argument of perihelion)= {:.6}°",
            self.argument_of_pericenter
        )?;
        write!(
            f,
            "  T₀  (perihelion passage)    = {:.6} MJD",
            self.time_of_pericenter_passage
        )?;
        if let Some(rms) = self.fit_residual {
            write!(f, "\n  rms (fit residual)          = {rms:.3}″")?;
        }
        for warning in &self.warnings {
            write!(f, "\n  ! {warning}")?;
        }
        Ok(())
    }
}
