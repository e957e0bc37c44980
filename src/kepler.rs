//! # Kepler's equation and anomaly conversions
//!
//! Solvers for the three conic forms of Kepler's equation and the conversions between true,
//! eccentric and hyperbolic anomalies.
//!
//! | conic      | equation                 | solver                         |
//! |------------|--------------------------|--------------------------------|
//! | elliptic   | `M = E − e sin E`        | [`solve_kepler_elliptic`]      |
//! | hyperbolic | `M = e sinh F − F`       | [`solve_kepler_hyperbolic`]    |
//! | parabolic  | `B = D + D³/3`           | [`solve_barker`] (closed form) |
//!
//! The elliptic and hyperbolic solvers run Newton–Raphson through [`roots`] and fall back to
//! bisection on a bracket that is guaranteed to hold the root whenever Newton fails or returns
//! a point that does not satisfy the equation.
use roots::{find_root_newton_raphson, SimpleConvergency};
use std::f64::consts::PI;

use crate::{cometfit_errors::CometFitError, constants::DPI};

/// Newton iteration cap for Kepler's equation.
pub const KEPLER_MAX_ITER: usize = 20;

/// Default convergence threshold on the anomaly (rad).
pub const KEPLER_EPS: f64 = 1e-12;

/// Return the principal value of an angle, in `[0, 2π)`.
pub fn principal_angle(a: f64) -> f64 {
    let r = a.rem_euclid(DPI);
    // rem_euclid can round up to exactly 2π for tiny negative inputs
    if r >= DPI {
        0.0
    } else {
        r
    }
}

/// Wrap an angle into `(−π, π]`.
pub fn wrap_to_pi(a: f64) -> f64 {
    let r = principal_angle(a);
    if r > PI {
        r - DPI
    } else {
        r
    }
}

/// Return the principal difference `a − b`, in `(−π, π]`.
pub fn angle_diff(a: f64, b: f64) -> f64 {
    wrap_to_pi(a - b)
}

fn ensure_finite(value: f64, what: &str) -> Result<(), CometFitError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CometFitError::Propagation(format!(
            "{what} is not finite ({value})"
        )))
    }
}

/// Bisection on a monotonically increasing function over `[lo, hi]`.
fn bisect_increasing<F: Fn(f64) -> f64>(f: F, mut lo: f64, mut hi: f64, eps: f64) -> f64 {
    // 200 halvings exhaust f64 resolution on any finite bracket
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if hi - lo <= eps {
            return mid;
        }
        if f(mid) > 0.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Solve the elliptic Kepler equation `M = E − e sin E` for the eccentric anomaly.
///
/// Arguments
/// ---------
/// * `mean_anomaly`: mean anomaly `M` (rad), any value
/// * `eccentricity`: `e ∈ [0, 1)`
/// * `eps`: convergence threshold on `E` (rad)
///
/// Return
/// ------
/// * the eccentric anomaly `E` on the same revolution as `M` (`|E − M| ≤ e`).
///
/// Newton starts from `M + e sin M` (or `π` for `e > 0.8`) with at most [`KEPLER_MAX_ITER`]
/// iterations; if it stops early or diverges, bisection on `[M − e, M + e]` finishes the job.
pub fn solve_kepler_elliptic(
    mean_anomaly: f64,
    eccentricity: f64,
    eps: f64,
) -> Result<f64, CometFitError> {
    ensure_finite(mean_anomaly, "mean anomaly")?;
    if !(0.0..1.0).contains(&eccentricity) {
        return Err(CometFitError::InvalidParameter(format!(
            "elliptic Kepler equation needs 0 <= e < 1, got {eccentricity}"
        )));
    }
    if eccentricity == 0.0 {
        return Ok(mean_anomaly);
    }

    // Solve on the reduced anomaly, then restore the revolution count.
    let reduced = wrap_to_pi(mean_anomaly);
    let revolutions = mean_anomaly - reduced;

    let f = |e_anom: f64| e_anom - eccentricity * e_anom.sin() - reduced;
    let df = |e_anom: f64| 1.0 - eccentricity * e_anom.cos();

    let x0 = if eccentricity > 0.8 {
        PI.copysign(reduced)
    } else {
        reduced + eccentricity * reduced.sin()
    };

    let mut convergency = SimpleConvergency {
        eps,
        max_iter: KEPLER_MAX_ITER,
    };

    let lo = reduced - eccentricity;
    let hi = reduced + eccentricity;
    let e_anom = match find_root_newton_raphson(x0, &f, &df, &mut convergency) {
        Ok(root) if root.is_finite() && (lo - eps..=hi + eps).contains(&root) => root,
        _ => bisect_increasing(f, lo, hi, eps),
    };

    Ok(e_anom + revolutions)
}

/// Solve the hyperbolic Kepler equation `M = e sinh F − F` for the hyperbolic anomaly.
///
/// The root is bracketed by `asinh(|M|/e) ≤ |F| ≤ asinh(|M|/(e − 1))`, which is where the
/// bisection fallback searches.
pub fn solve_kepler_hyperbolic(
    mean_anomaly: f64,
    eccentricity: f64,
    eps: f64,
) -> Result<f64, CometFitError> {
    ensure_finite(mean_anomaly, "hyperbolic mean anomaly")?;
    if !(eccentricity > 1.0 && eccentricity.is_finite()) {
        return Err(CometFitError::InvalidParameter(format!(
            "hyperbolic Kepler equation needs e > 1, got {eccentricity}"
        )));
    }
    if mean_anomaly == 0.0 {
        return Ok(0.0);
    }

    let m_abs = mean_anomaly.abs();
    let f = |h: f64| eccentricity * h.sinh() - h - m_abs;
    let df = |h: f64| eccentricity * h.cosh() - 1.0;

    let lo = (m_abs / eccentricity).asinh();
    let hi = (m_abs / (eccentricity - 1.0)).asinh();
    let x0 = (2.0 * m_abs / eccentricity + 1.8).ln().clamp(lo, hi);

    let mut convergency = SimpleConvergency {
        eps,
        max_iter: KEPLER_MAX_ITER,
    };

    let h_anom = match find_root_newton_raphson(x0, &f, &df, &mut convergency) {
        Ok(root) if root.is_finite() && (lo - eps..=hi + eps).contains(&root) => root,
        _ => bisect_increasing(f, lo, hi, eps),
    };

    Ok(h_anom.copysign(mean_anomaly))
}

/// Closed-form solution of Barker's equation `D + D³/3 = B` for `D = tan(ν/2)`.
///
/// Uses `D = Y − 1/Y` with `Y³ = 3B/2 + sqrt(9B²/4 + 1)`, evaluated on `|B|` and odd in `B`.
pub fn solve_barker(b: f64) -> f64 {
    let half = 1.5 * b.abs();
    let y = (half + (half * half + 1.0).sqrt()).cbrt();
    (y - 1.0 / y).copysign(b)
}

/// True anomaly ν from the eccentric anomaly E (elliptic orbits).
pub fn true_from_eccentric_anomaly(e_anom: f64, eccentricity: f64) -> f64 {
    let (sin_e, cos_e) = e_anom.sin_cos();
    ((1.0 - eccentricity * eccentricity).sqrt() * sin_e).atan2(cos_e - eccentricity)
}

/// Eccentric anomaly E from the true anomaly ν (elliptic orbits), in `(−π, π]`.
pub fn eccentric_from_true_anomaly(nu: f64, eccentricity: f64) -> f64 {
    let (sin_nu, cos_nu) = nu.sin_cos();
    ((1.0 - eccentricity * eccentricity).sqrt() * sin_nu).atan2(eccentricity + cos_nu)
}

/// True anomaly ν from the hyperbolic anomaly F.
pub fn true_from_hyperbolic_anomaly(h_anom: f64, eccentricity: f64) -> f64 {
    2.0 * (((eccentricity + 1.0) / (eccentricity - 1.0)).sqrt() * (0.5 * h_anom).tanh()).atan()
}

/// Hyperbolic anomaly F from the true anomaly ν; `ν` must lie inside the asymptotes.
pub fn hyperbolic_from_true_anomaly(nu: f64, eccentricity: f64) -> f64 {
    2.0 * (((eccentricity - 1.0) / (eccentricity + 1.0)).sqrt() * (0.5 * nu).tan()).atanh()
}
