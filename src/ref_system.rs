//! # Reference frames and line-of-sight geometry
//!
//! All vectors exchanged with the engine live in the **equatorial J2000** frame
//! (ICRF-aligned, x toward the vernal equinox, z toward the celestial pole). Orbital elements
//! are measured from the equator by default, or relative to the **ecliptic J2000** plane
//! when asked for, the usual convention for published cometary orbits; [`ReferencePlane`]
//! selects which.
//!
//! ## Provided functionality
//!
//! - [`line_of_sight`] / [`cartesian_to_radec`]: RA/Dec ↔ unit vector.
//! - [`equatorial_to_ecliptic`] / [`ecliptic_to_equatorial`]: fixed J2000 obliquity rotation.
//! - [`rotmt`] and [`perifocal_rotation`]: elementary and 3-1-3 rotations used by the
//!   element conversions and the analytic ephemeris.
use nalgebra::{Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    cometfit_errors::CometFitError,
    constants::{Degree, Radian, DPI, OBLIQUITY_J2000},
};

/// Fundamental plane the orbital angles (i, Ω, ω) are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReferencePlane {
    /// Mean equator of J2000, the frame of every vector the engine exchanges.
    #[default]
    Equatorial,
    /// Mean ecliptic of J2000.
    Ecliptic,
}

impl ReferencePlane {
    /// Express an equatorial J2000 vector in this plane's frame.
    pub fn from_equatorial(self, v: &Vector3<f64>) -> Vector3<f64> {
        match self {
            ReferencePlane::Equatorial => *v,
            ReferencePlane::Ecliptic => equatorial_to_ecliptic(v),
        }
    }

    /// Express a vector given in this plane's frame in equatorial J2000.
    pub fn to_equatorial(self, v: &Vector3<f64>) -> Vector3<f64> {
        match self {
            ReferencePlane::Equatorial => *v,
            ReferencePlane::Ecliptic => ecliptic_to_equatorial(v),
        }
    }
}

impl std::fmt::Display for ReferencePlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferencePlane::Equatorial => write!(f, "equatorial J2000"),
            ReferencePlane::Ecliptic => write!(f, "ecliptic J2000"),
        }
    }
}

/// Principal axis of an elementary rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Active right-handed rotation of `alpha` radians about a principal axis.
///
/// The rotated vector is `x' = R · x`; a positive angle turns counter-clockwise when looking
/// down the axis toward the origin.
pub fn rotmt(alpha: Radian, axis: Axis) -> Rotation3<f64> {
    let axis = match axis {
        Axis::X => Vector3::x_axis(),
        Axis::Y => Vector3::y_axis(),
        Axis::Z => Vector3::z_axis(),
    };
    Rotation3::from_axis_angle(&axis, alpha)
}

/// Rotation from the perifocal frame (x toward pericenter, z along the angular momentum) to the
/// reference frame: `R_z(Ω) · R_x(i) · R_z(ω)`.
///
/// Arguments
/// ---------
/// * `node`: longitude of the ascending node Ω (rad)
/// * `inclination`: inclination i (rad)
/// * `periapsis`: argument of pericenter ω (rad)
pub fn perifocal_rotation(node: Radian, inclination: Radian, periapsis: Radian) -> Rotation3<f64> {
    rotmt(node, Axis::Z) * rotmt(inclination, Axis::X) * rotmt(periapsis, Axis::Z)
}

/// Rotate an equatorial J2000 vector into the ecliptic J2000 frame.
pub fn equatorial_to_ecliptic(v: &Vector3<f64>) -> Vector3<f64> {
    rotmt(-OBLIQUITY_J2000, Axis::X) * v
}

/// Rotate an ecliptic J2000 vector into the equatorial J2000 frame.
pub fn ecliptic_to_equatorial(v: &Vector3<f64>) -> Vector3<f64> {
    rotmt(OBLIQUITY_J2000, Axis::X) * v
}

/// Unit line-of-sight vector for a right ascension / declination pair.
///
/// Arguments
/// ---------
/// * `ra`: right ascension in degrees, in `[0, 360)`
/// * `dec`: declination in degrees, in `[-90, 90]`
///
/// Return
/// ------
/// * `(cos δ cos α, cos δ sin α, sin δ)` in the equatorial J2000 frame, or
///   [`CometFitError::InvalidAngle`] if either angle is outside its domain or not finite.
pub fn line_of_sight(ra: Degree, dec: Degree) -> Result<Unit<Vector3<f64>>, CometFitError> {
    if !(ra.is_finite() && (0.0..360.0).contains(&ra)) {
        return Err(CometFitError::InvalidAngle(format!(
            "right ascension {ra}° is outside [0, 360)"
        )));
    }
    if !(dec.is_finite() && (-90.0..=90.0).contains(&dec)) {
        return Err(CometFitError::InvalidAngle(format!(
            "declination {dec}° is outside [-90, 90]"
        )));
    }

    let (sin_ra, cos_ra) = ra.to_radians().sin_cos();
    let (sin_dec, cos_dec) = dec.to_radians().sin_cos();

    Ok(Unit::new_normalize(Vector3::new(
        cos_dec * cos_ra,
        cos_dec * sin_ra,
        sin_dec,
    )))
}

/// Convert a Cartesian vector to right ascension, declination and norm.
///
/// Returns
/// --------
/// * `(α, δ, ρ)` with `α` in degrees in `[0, 360)`, `δ` in degrees in `[−90, 90]` and `ρ` the
///   Euclidean norm. A null vector yields `(0, 0, 0)`.
pub fn cartesian_to_radec(cartesian_position: &Vector3<f64>) -> (Degree, Degree, f64) {
    let pos_norm = cartesian_position.norm();
    if pos_norm == 0. {
        return (0.0, 0.0, pos_norm);
    }

    let delta = (cartesian_position.z / pos_norm).clamp(-1.0, 1.0).asin();
    let alpha = cartesian_position
        .y
        .atan2(cartesian_position.x)
        .rem_euclid(DPI);

    // rem_euclid may round a tiny negative angle up to exactly 2π
    let alpha_deg = alpha.to_degrees();
    let alpha_deg = if alpha_deg >= 360.0 { 0.0 } else { alpha_deg };
    (alpha_deg, delta.to_degrees(), pos_norm)
}

/// Angle between two directions, stable for tiny and near-π separations.
pub fn angular_separation(a: &Vector3<f64>, b: &Vector3<f64>) -> Radian {
    a.cross(b).norm().atan2(a.dot(b))
}

#[cfg(test)]
mod ref_system_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_line_of_sight() {
        let l = line_of_sight(90.0, 0.0).unwrap();
        assert_relative_eq!(l.into_inner(), Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-15);

        let l = line_of_sight(0.0, 90.0).unwrap();
        assert_relative_eq!(l.into_inner(), Vector3::z(), epsilon = 1e-15);

        assert!(matches!(
            line_of_sight(360.0, 0.0),
            Err(CometFitError::InvalidAngle(_))
        ));
        assert!(line_of_sight(-1.0, 0.0).is_err());
        assert!(line_of_sight(10.0, 90.5).is_err());
        assert!(line_of_sight(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_radec_round_trip() {
        for &(ra, dec) in &[(0.0, 0.0), (123.4, -45.6), (359.9, 89.0), (200.0, -10.0)] {
            let l = line_of_sight(ra, dec).unwrap();
            let (ra2, dec2, norm) = cartesian_to_radec(&l);
            assert_relative_eq!(ra2, ra, epsilon = 1e-10);
            assert_relative_eq!(dec2, dec, epsilon = 1e-10);
            assert_relative_eq!(norm, 1.0, epsilon = 1e-15);
        }
        assert_eq!(cartesian_to_radec(&Vector3::zeros()), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_ecliptic_rotation() {
        // The ecliptic pole seen from the equatorial frame.
        let pole_eq = Vector3::new(0.0, -OBLIQUITY_J2000.sin(), OBLIQUITY_J2000.cos());
        assert_relative_eq!(equatorial_to_ecliptic(&pole_eq), Vector3::z(), epsilon = 1e-15);

        let v = Vector3::new(0.3, -1.2, 0.7);
        assert_relative_eq!(
            ecliptic_to_equatorial(&equatorial_to_ecliptic(&v)),
            v,
            epsilon = 1e-15
        );
        assert_relative_eq!(ReferencePlane::Equatorial.from_equatorial(&v), v);
    }

    #[test]
    fn test_perifocal_rotation() {
        // With ω = 0 the pericenter sits on the node line.
        let rot = perifocal_rotation(0.5, 0.3, 0.0);
        let x = rot * Vector3::x();
        assert_relative_eq!(x, Vector3::new(0.5f64.cos(), 0.5f64.sin(), 0.0), epsilon = 1e-15);

        // The orbit normal is tilted by i from the z axis.
        let z = rot * Vector3::z();
        assert_relative_eq!(z.z, 0.3f64.cos(), epsilon = 1e-15);
    }

    #[test]
    fn test_angular_separation() {
        let a = Vector3::x();
        let b = Vector3::new(1.0, 1e-8, 0.0).normalize();
        assert_relative_eq!(angular_separation(&a, &b), 1e-8, epsilon = 1e-15);
        assert_relative_eq!(
            angular_separation(&a, &-a),
            std::f64::consts::PI,
            epsilon = 1e-15
        );
    }
}
