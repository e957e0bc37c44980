use crate::{
    cometfit_errors::CometFitError,
    constants::{ArcSec, Degree, DEG_PER_HOUR},
};

/// Estimate the precision of the last sexagesimal field from its number of decimals.
///
/// Arguments
/// ---------------
/// * `field`: the seconds field as written (e.g. `"56.78"`)
/// * `unit_arcsec`: size of one unit of that field in arcseconds (15 for seconds of time,
///   1 for seconds of arc)
///
/// Return
/// ----------
/// * the precision in arcseconds: `10^-decimals · unit_arcsec`
fn field_precision(field: &str, unit_arcsec: ArcSec) -> ArcSec {
    let field = field.trim();
    let decimals = field
        .find('.')
        .map(|dot| field.len() - dot - 1)
        .unwrap_or(0);
    10f64.powi(-(decimals as i32)) * unit_arcsec
}

/// Split `"HH MM SS.ss"` or `"HH:MM:SS.ss"` into its three fields.
fn split_sexagesimal<'a>(value: &'a str, what: &str) -> Result<[&'a str; 3], CometFitError> {
    let parts: Vec<&str> = value
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();

    <[&str; 3]>::try_from(parts).map_err(|_| {
        CometFitError::InvalidAngle(format!(
            "{what} '{value}' must have three sexagesimal fields"
        ))
    })
}

/// Unsigned numeric field; the only sign allowed is the one in front of the declination.
fn parse_field(field: &str, what: &str) -> Result<f64, CometFitError> {
    Some(field)
        .filter(|f| !f.starts_with(['+', '-']))
        .and_then(|f| f.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| CometFitError::InvalidAngle(format!("{what}: invalid field '{field}'")))
}

fn check_minutes_seconds(m: f64, s: f64, what: &str) -> Result<(), CometFitError> {
    if m >= 60.0 || m.fract() != 0.0 || s >= 60.0 {
        return Err(CometFitError::InvalidAngle(format!(
            "{what}: minutes must be an integer below 60 and seconds below 60"
        )));
    }
    Ok(())
}

/// Parse a right ascension string to degrees
///
/// Arguments
/// ---------
/// * `ra`: right ascension as `HH MM SS.SS` or `HH:MM:SS.SS` (hours, minutes and seconds of time)
///
/// Returns
/// -------
/// * `(Degree, ArcSec)`: the right ascension in degrees, in `[0, 360)`, and the precision
///   implied by the number of decimals of the seconds field, in arcseconds.
/// * [`CometFitError::InvalidAngle`] when the format is wrong or a field is out of range.
pub fn parse_ra_to_deg(ra: &str) -> Result<(Degree, ArcSec), CometFitError> {
    let [h, m, s_raw] = split_sexagesimal(ra, "right ascension")?;

    let h = parse_field(h, "right ascension hours")?;
    let m = parse_field(m, "right ascension minutes")?;
    let s = parse_field(s_raw, "right ascension seconds")?;

    if h >= 24.0 || h.fract() != 0.0 {
        return Err(CometFitError::InvalidAngle(format!(
            "right ascension '{ra}': hours must be an integer in [0, 24)"
        )));
    }
    check_minutes_seconds(m, s, "right ascension")?;

    // Seconds just below 60 in the last hour can round the sum up to 360°.
    let ra_deg = ((h + m / 60.0 + s / 3600.0) * DEG_PER_HOUR).rem_euclid(360.0);
    Ok((ra_deg, field_precision(s_raw, DEG_PER_HOUR)))
}

/// Parse a declination string to degrees
///
/// Arguments
/// ---------
/// * `dec`: declination as `±DD MM SS.SS` or `±DD:MM:SS.SS`
///
/// Returns
/// -------
/// * `(Degree, ArcSec)`: the declination in degrees, in `[-90, 90]`, and the precision of the
///   seconds field in arcseconds.
/// * [`CometFitError::InvalidAngle`] when the format is wrong or the value leaves `[-90, 90]`.
pub fn parse_dec_to_deg(dec: &str) -> Result<(Degree, ArcSec), CometFitError> {
    let [d_raw, m, s_raw] = split_sexagesimal(dec, "declination")?;

    let (sign, d_unsigned) = match d_raw.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, d_raw.strip_prefix('+').unwrap_or(d_raw)),
    };
    let d = parse_field(d_unsigned, "declination degrees")?;
    let m = parse_field(m, "declination minutes")?;
    let s = parse_field(s_raw, "declination seconds")?;

    if d.fract() != 0.0 {
        return Err(CometFitError::InvalidAngle(format!(
            "declination '{dec}': degrees must be an integer"
        )));
    }
    check_minutes_seconds(m, s, "declination")?;

    let dec_deg = sign * (d + m / 60.0 + s / 3600.0);
    if dec_deg.abs() > 90.0 {
        return Err(CometFitError::InvalidAngle(format!(
            "declination '{dec}' is outside [-90, 90]"
        )));
    }
    Ok((dec_deg, field_precision(s_raw, 1.0)))
}

#[cfg(test)]
mod conversion_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ra_to_deg() {
        let (ra, acc) = parse_ra_to_deg("22 52 23.37").unwrap();
        assert_relative_eq!(ra, 343.097375, epsilon = 1e-9);
        assert_relative_eq!(acc, 0.15, epsilon = 1e-12);

        let (ra, _) = parse_ra_to_deg("04:41:04.77").unwrap();
        assert_relative_eq!(ra, 70.269875, epsilon = 1e-9);

        let (ra, acc) = parse_ra_to_deg("06 50 13.370").unwrap();
        assert_relative_eq!(ra, 102.55570833333333, epsilon = 1e-9);
        assert_relative_eq!(acc, 0.015, epsilon = 1e-12);

        assert!(parse_ra_to_deg("1 2 3.4.5").is_err());
        assert!(parse_ra_to_deg("1 2").is_err());
        assert!(parse_ra_to_deg("24 00 00").is_err());
        assert!(parse_ra_to_deg("12 60 00").is_err());
        assert!(parse_ra_to_deg("12 30 60.0").is_err());
    }

    #[test]
    fn test_ra_end_of_circle() {
        let (ra, _) = parse_ra_to_deg("23 59 59.99999999999").unwrap();
        assert!((0.0..360.0).contains(&ra), "ra = {ra}");
        assert!(crate::ref_system::line_of_sight(ra, 0.0).is_ok());
    }

    #[test]
    fn test_dec_to_deg() {
        let (dec, acc) = parse_dec_to_deg("-00 30 14.2").unwrap();
        assert_relative_eq!(dec, -0.5039444444444444, epsilon = 1e-12);
        assert_relative_eq!(acc, 0.1, epsilon = 1e-12);

        let (dec, _) = parse_dec_to_deg("+13:55:42.7").unwrap();
        assert_relative_eq!(dec, 13.928527777777777, epsilon = 1e-12);

        let (dec, acc) = parse_dec_to_deg("-14 47 05").unwrap();
        assert_relative_eq!(dec, -14.784722222222221, epsilon = 1e-12);
        assert_relative_eq!(acc, 1.0, epsilon = 1e-12);

        assert!(matches!(
            parse_dec_to_deg("91 00 00"),
            Err(CometFitError::InvalidAngle(_))
        ));
        assert!(parse_dec_to_deg("89 15").is_err());
        assert!(parse_dec_to_deg("89 15 50.2.3").is_err());
    }

    #[test]
    fn test_dec_single_sign() {
        let (dec, _) = parse_dec_to_deg("+05 00 00").unwrap();
        assert_eq!(dec, 5.0);
        let (dec, _) = parse_dec_to_deg("-05 00 00").unwrap();
        assert_eq!(dec, -5.0);

        for repeated in ["--05 00 00", "+-05 00 00", "-+05 00 00", "++05 00 00"] {
            assert!(
                matches!(parse_dec_to_deg(repeated), Err(CometFitError::InvalidAngle(_))),
                "{repeated}"
            );
        }
    }

    #[test]
    fn test_field_precision() {
        assert_relative_eq!(field_precision("23.3", 1.0), 0.1, epsilon = 1e-15);
        assert_relative_eq!(field_precision("23", 15.0), 15.0, epsilon = 1e-15);
        assert_relative_eq!(field_precision("23.370", 1.0), 0.001, epsilon = 1e-15);
    }
}
