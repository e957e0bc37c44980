//! Time scale helpers.
//!
//! The engine works with plain [`MJD`] values in the TDB scale. [`hifitime::Epoch`] is only
//! used at the edges, where callers hand in calendar dates or ask for one back.
use hifitime::{Epoch, TimeScale};
use std::str::FromStr;

use crate::{
    cometfit_errors::CometFitError,
    constants::{DAYS_PER_JULIAN_CENTURY, JDTOMJD, MJD, T2000},
};

/// Convert an [`Epoch`] to a Modified Julian Date in the TDB scale.
pub fn epoch_to_mjd(epoch: &Epoch) -> MJD {
    jd_to_mjd(epoch.to_jde_tdb_days())
}

/// Convert a Modified Julian Date (TDB) to an [`Epoch`].
pub fn mjd_to_epoch(mjd: MJD) -> Epoch {
    Epoch::from_mjd_in_time_scale(mjd, TimeScale::TDB)
}

/// Parse a calendar date such as `"2024-03-01T12:00:00 UTC"` into MJD (TDB).
///
/// Arguments
/// ---------
/// * `date`: any representation accepted by [`Epoch::from_str`]; a missing time scale means UTC.
///
/// Return
/// ------
/// * the MJD in the TDB scale, or [`CometFitError::InvalidParameter`] if the string cannot be parsed.
pub fn parse_date_to_mjd(date: &str) -> Result<MJD, CometFitError> {
    Epoch::from_str(date.trim())
        .map(|epoch| epoch_to_mjd(&epoch))
        .map_err(|err| CometFitError::InvalidParameter(format!("invalid date '{date}': {err}")))
}

/// Transformation from Julian Date to Modified Julian Date (same time scale).
pub fn jd_to_mjd(jd: f64) -> MJD {
    jd - JDTOMJD
}

/// Transformation from Modified Julian Date to Julian Date (same time scale).
pub fn mjd_to_jd(mjd: MJD) -> f64 {
    mjd + JDTOMJD
}

/// Julian centuries elapsed since J2000.0.
pub fn julian_centuries_since_j2000(mjd: MJD) -> f64 {
    (mjd - T2000) / DAYS_PER_JULIAN_CENTURY
}
