use nalgebra::Vector3;

/// Shape of the conic through a Cartesian state, as used to screen IOD candidates.
///
/// Fields
/// -----------------
/// * `accepted` – `eccentricity ≤ ecc_max` and `perihelion_distance ≤ peri_max`.
/// * `eccentricity` – norm of the Laplace–Runge–Lenz vector divided by μ.
/// * `perihelion_distance` – `|h|² / (μ (1 + e))` (AU).
/// * `energy` – specific orbital energy `v²/2 − μ/r` (AU²/day²).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EccentricityCheck {
    pub accepted: bool,
    pub eccentricity: f64,
    pub perihelion_distance: f64,
    pub energy: f64,
}

/// Compute the eccentricity, perihelion distance and energy of a heliocentric state and check
/// them against the admissibility limits.
///
/// Arguments
/// ---------
/// * `position`: heliocentric position (AU).
/// * `velocity`: heliocentric velocity (AU/day).
/// * `mu`: gravitational parameter (AU³/day²).
/// * `peri_max`: largest admissible perihelion distance (AU).
/// * `ecc_max`: largest admissible eccentricity.
///
/// Return
/// ------
/// * `None` when the angular momentum vanishes or a quantity is not finite, otherwise the
///   [`EccentricityCheck`].
pub fn eccentricity_control(
    position: &Vector3<f64>,
    velocity: &Vector3<f64>,
    mu: f64,
    peri_max: f64,
    ecc_max: f64,
) -> Option<EccentricityCheck> {
    let distance = position.norm();
    let angular_momentum = position.cross(velocity);
    let angmom_sq = angular_momentum.norm_squared();
    if angmom_sq == 0. || distance == 0. {
        return None;
    }

    let lenz = velocity.cross(&angular_momentum) / mu - position / distance;
    let eccentricity = lenz.norm();
    let perihelion_distance = angmom_sq / (mu * (1. + eccentricity));
    let energy = 0.5 * velocity.norm_squared() - mu / distance;

    if !(eccentricity.is_finite() && perihelion_distance.is_finite() && energy.is_finite()) {
        return None;
    }

    Some(EccentricityCheck {
        accepted: eccentricity <= ecc_max && perihelion_distance <= peri_max,
        eccentricity,
        perihelion_distance,
        energy,
    })
}
