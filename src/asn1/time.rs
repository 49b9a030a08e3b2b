// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::errors::Error;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};

const UTC_TIME_LEN: usize = 13;
const GENERALIZED_TIME_MIN_LEN: usize = 15;
const MAX_FRACTION_DIGITS: usize = 9;

const DER_TAG_UTC_TIME: u8 = 0x17;
const DER_TAG_GENERALIZED_TIME: u8 = 0x18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// `YYMMDDHHMMSSZ`, years 1950 to 2049
    UtcTime,
    /// `YYYYMMDDHHMMSS[.f]Z`
    GeneralizedTime,
}

impl TimeFormat {
    pub fn der_tag(&self) -> u8 {
        match self {
            TimeFormat::UtcTime => DER_TAG_UTC_TIME,
            TimeFormat::GeneralizedTime => DER_TAG_GENERALIZED_TIME,
        }
    }

    /// The RFC 5280 §4.1.2.5 choice for a given instant
    pub fn for_validity(t: &DateTime<Utc>) -> Self {
        if (1950..=2049).contains(&t.year()) {
            TimeFormat::UtcTime
        } else {
            TimeFormat::GeneralizedTime
        }
    }
}

/// Render an instant in the given format.  UTCTime has no sub-second part;
/// GeneralizedTime carries one only when it is non-zero, with trailing zeros
/// stripped.
pub fn encode(t: &DateTime<Utc>, format: TimeFormat) -> Result<String, Error> {
    let year = t.year();
    // a leap second shows up as nanos >= 1e9
    let nanos = t.nanosecond() % 1_000_000_000;

    match format {
        TimeFormat::UtcTime => {
            if !(1950..=2049).contains(&year) {
                return Err(Error::Unsupported(format!(
                    "year {year} cannot be expressed as UTCTime"
                )));
            }

            Ok(format!(
                "{:02}{:02}{:02}{:02}{:02}{:02}Z",
                year % 100,
                t.month(),
                t.day(),
                t.hour(),
                t.minute(),
                t.second()
            ))
        }
        TimeFormat::GeneralizedTime => {
            if !(0..=9999).contains(&year) {
                return Err(Error::Unsupported(format!(
                    "year {year} cannot be expressed as GeneralizedTime"
                )));
            }

            let mut s = format!(
                "{:04}{:02}{:02}{:02}{:02}{:02}",
                year,
                t.month(),
                t.day(),
                t.hour(),
                t.minute(),
                t.second()
            );

            if nanos != 0 {
                let fraction = format!("{nanos:09}");
                s.push('.');
                s.push_str(fraction.trim_end_matches('0'));
            }

            s.push('Z');

            Ok(s)
        }
    }
}

/// Parse a time string of the given format
pub fn decode(s: &str, format: TimeFormat) -> Result<DateTime<Utc>, Error> {
    if !s.is_ascii() {
        return Err(Error::Syntax(format!("{s:?}: non-ASCII time string")));
    }

    match format {
        TimeFormat::UtcTime => decode_utc_time(s),
        TimeFormat::GeneralizedTime => decode_generalized_time(s),
    }
}

fn decode_utc_time(s: &str) -> Result<DateTime<Utc>, Error> {
    if s.len() != UTC_TIME_LEN || !s.ends_with('Z') {
        return Err(Error::Syntax(format!(
            "{s:?}: UTCTime MUST be {UTC_TIME_LEN} characters ending in Z"
        )));
    }

    let yy = digits(s, 0, 2)?;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };

    assemble(s, year, 2, 0)
}

fn decode_generalized_time(s: &str) -> Result<DateTime<Utc>, Error> {
    let len = s.len();

    if len < GENERALIZED_TIME_MIN_LEN || !s.ends_with('Z') {
        return Err(Error::Syntax(format!(
            "{s:?}: GeneralizedTime MUST be at least {GENERALIZED_TIME_MIN_LEN} characters ending in Z"
        )));
    }

    let year = digits(s, 0, 4)?;

    let nanos = if len == GENERALIZED_TIME_MIN_LEN {
        0
    } else {
        let fraction = &s[14..len - 1];

        let f = fraction.strip_prefix('.').ok_or_else(|| {
            Error::Syntax(format!("{s:?}: expecting '.' after the seconds"))
        })?;

        if f.is_empty() || f.len() > MAX_FRACTION_DIGITS {
            return Err(Error::Syntax(format!(
                "{s:?}: fraction MUST have 1 to {MAX_FRACTION_DIGITS} digits"
            )));
        }

        let scale = 10u32.pow((MAX_FRACTION_DIGITS - f.len()) as u32);

        digits(f, 0, f.len())? * scale
    };

    assemble(s, year, 4, nanos)
}

// month, day, hour, minute and second follow the year as five 2-digit groups
fn assemble(s: &str, year: u32, offset: usize, nanos: u32) -> Result<DateTime<Utc>, Error> {
    let mut f = [0u32; 5];

    for (i, x) in f.iter_mut().enumerate() {
        *x = digits(s, offset + 2 * i, 2)?;
    }

    let [month, day, hour, minute, second] = f;

    let naive = NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|d| d.and_hms_nano_opt(hour, minute, second, nanos))
        .ok_or_else(|| Error::Syntax(format!("{s:?}: not a valid calendar time")))?;

    Ok(Utc.from_utc_datetime(&naive))
}

fn digits(s: &str, start: usize, len: usize) -> Result<u32, Error> {
    let field = &s[start..start + len];

    if !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Syntax(format!("{s:?}: expecting digits at {start}")));
    }

    field
        .parse::<u32>()
        .map_err(|e| Error::Syntax(format!("{s:?}: {e}")))
}

/// DER TLV encoding of the time value
pub fn to_der(t: &DateTime<Utc>, format: TimeFormat) -> Result<Vec<u8>, Error> {
    let s = encode(t, format)?;

    let mut der = Vec::with_capacity(s.len() + 2);
    der.push(format.der_tag());
    // the longest GeneralizedTime is 25 octets, well within short form
    der.push(s.len() as u8);
    der.extend_from_slice(s.as_bytes());

    Ok(der)
}

/// Decode a DER UTCTime or GeneralizedTime TLV
pub fn from_der(der: &[u8]) -> Result<(DateTime<Utc>, TimeFormat), Error> {
    let (format, len, body) = match der {
        [DER_TAG_UTC_TIME, len, body @ ..] => (TimeFormat::UtcTime, *len, body),
        [DER_TAG_GENERALIZED_TIME, len, body @ ..] => (TimeFormat::GeneralizedTime, *len, body),
        [tag, ..] => {
            return Err(Error::Unsupported(format!(
                "ASN.1 tag {tag:#04x} is not a time type"
            )))
        }
        [] => return Err(Error::Syntax("empty ASN.1 time".to_string())),
    };

    if len as usize != body.len() {
        return Err(Error::Syntax(format!(
            "ASN.1 time: length {len} does not match {} content octets",
            body.len()
        )));
    }

    let s = std::str::from_utf8(body)
        .map_err(|e| Error::Syntax(format!("ASN.1 time: {e}")))?;

    Ok((decode(s, format)?, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hex_literal::hex;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn utc_time_encode() {
        let t = at(2023, 1, 5, 7, 8, 9);

        assert_eq!(encode(&t, TimeFormat::UtcTime).unwrap(), "230105070809Z");
    }

    #[test]
    fn utc_time_drops_sub_seconds() {
        let t = at(2023, 1, 5, 7, 8, 9) + Duration::milliseconds(750);

        assert_eq!(encode(&t, TimeFormat::UtcTime).unwrap(), "230105070809Z");
    }

    #[test]
    fn utc_time_year_pivot() {
        let t = decode("491231235959Z", TimeFormat::UtcTime).unwrap();
        assert_eq!(t, at(2049, 12, 31, 23, 59, 59));

        let t = decode("500101000000Z", TimeFormat::UtcTime).unwrap();
        assert_eq!(t, at(1950, 1, 1, 0, 0, 0));
    }

    #[test]
    fn utc_time_out_of_range() {
        let t = at(2050, 1, 1, 0, 0, 0);

        assert!(encode(&t, TimeFormat::UtcTime).unwrap_err().is_format());
    }

    #[test]
    fn utc_time_bad_shapes() {
        for s in [
            "2301050708Z",
            "230105070809",
            "230105070809+",
            "2301050708090Z",
            "23010507080aZ",
            "231305070809Z",
        ] {
            assert!(
                decode(s, TimeFormat::UtcTime).unwrap_err().is_format(),
                "{s} should not decode"
            );
        }
    }

    #[test]
    fn generalized_time_half_second() {
        let t = at(2024, 6, 30, 12, 0, 0) + Duration::milliseconds(500);

        assert_eq!(
            encode(&t, TimeFormat::GeneralizedTime).unwrap(),
            "20240630120000.5Z"
        );
    }

    #[test]
    fn generalized_time_whole_second() {
        let t = at(2024, 6, 30, 12, 0, 0);
        let s = encode(&t, TimeFormat::GeneralizedTime).unwrap();

        assert_eq!(s, "20240630120000Z");
        assert!(!s.contains('.'));
    }

    #[test]
    fn generalized_time_round_trip() {
        let base = at(1999, 12, 31, 23, 59, 59);

        for ms in [0, 1, 10, 100, 123, 500, 999] {
            let t = base + Duration::milliseconds(ms);
            let s = encode(&t, TimeFormat::GeneralizedTime).unwrap();

            assert_eq!(decode(&s, TimeFormat::GeneralizedTime).unwrap(), t, "{s}");
        }

        let t = base + Duration::nanoseconds(1);
        let s = encode(&t, TimeFormat::GeneralizedTime).unwrap();
        assert_eq!(s, "19991231235959.000000001Z");
        assert_eq!(decode(&s, TimeFormat::GeneralizedTime).unwrap(), t);
    }

    #[test]
    fn generalized_time_bad_shapes() {
        for s in [
            "20240630120000",
            "20240630120000+0100",
            "20240630120000.Z",
            "20240630120000,5Z",
            "20240630120000.1234567890Z",
            "2024063012000Z",
            "20240631120000Z",
        ] {
            assert!(
                decode(s, TimeFormat::GeneralizedTime)
                    .unwrap_err()
                    .is_format(),
                "{s} should not decode"
            );
        }
    }

    #[test]
    fn der_round_trip() {
        let t = at(2030, 3, 4, 5, 6, 7);

        let der = to_der(&t, TimeFormat::UtcTime).unwrap();
        assert_eq!(der, hex!("170d3330303330343035303630375a"));
        assert_eq!(from_der(&der).unwrap(), (t, TimeFormat::UtcTime));

        let der = to_der(&t, TimeFormat::GeneralizedTime).unwrap();
        assert_eq!(der[0], 0x18);
        assert_eq!(from_der(&der).unwrap(), (t, TimeFormat::GeneralizedTime));
    }

    #[test]
    fn der_bad() {
        assert!(from_der(&hex!("0203010001")).is_err());
        assert!(from_der(&hex!("170c3330")).is_err());
        assert!(from_der(&[]).is_err());
    }

    #[test]
    fn validity_choice() {
        assert_eq!(
            TimeFormat::for_validity(&at(2049, 1, 1, 0, 0, 0)),
            TimeFormat::UtcTime
        );
        assert_eq!(
            TimeFormat::for_validity(&at(2050, 1, 1, 0, 0, 0)),
            TimeFormat::GeneralizedTime
        );
    }
}
