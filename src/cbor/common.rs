// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::codec::{TAG_BIGNUM, TAG_DATE_TIME, TAG_EPOCH_TIME};
use crate::errors::Error;
use chrono::{DateTime, Utc};
use super::value::BinaryValue as Value;

pub fn to_tstr(v: &Value, n: &str) -> Result<String, Error> {
    v.as_text()
        .map(|s| s.to_string())
        .ok_or_else(|| Error::TypeMismatch(format!("{n} MUST be tstr")))
}

pub fn to_bstr(v: &Value, n: &str) -> Result<Vec<u8>, Error> {
    v.as_bytes()
        .cloned()
        .ok_or_else(|| Error::TypeMismatch(format!("{n} MUST be bstr")))
}

pub fn to_int(v: &Value, n: &str) -> Result<i128, Error> {
    v.as_integer()
        .map(i128::from)
        .ok_or_else(|| Error::TypeMismatch(format!("{n} MUST be int")))
}

pub fn to_uint(v: &Value, n: &str) -> Result<u64, Error> {
    let i = to_int(v, n)?;

    u64::try_from(i).map_err(|_| Error::TypeMismatch(format!("{n} MUST be uint, got {i}")))
}

pub fn to_array<'a>(v: &'a Value, n: &str) -> Result<&'a Vec<Value>, Error> {
    v.as_array()
        .ok_or_else(|| Error::TypeMismatch(format!("{n} MUST be array")))
}

pub fn to_map<'a>(v: &'a Value, n: &str) -> Result<&'a Vec<(Value, Value)>, Error> {
    v.as_map()
        .ok_or_else(|| Error::TypeMismatch(format!("{n} MUST be map")))
}

pub fn to_tstr_array(v: &Value, n: &str) -> Result<Vec<String>, Error> {
    to_array(v, n)?
        .iter()
        .enumerate()
        .map(|(i, x)| to_tstr(x, format!("{n}[{i}]").as_str()))
        .collect()
}

/// Accepts `#6.0(tstr)`, a bare RFC 3339 `tstr` and `#6.1(int)`
pub fn to_date(v: &Value, n: &str) -> Result<DateTime<Utc>, Error> {
    match v {
        Value::Tag(TAG_EPOCH_TIME, inner) => {
            let secs = to_int(inner, n)?;
            let secs = i64::try_from(secs)
                .map_err(|_| Error::Syntax(format!("{n}: epoch {secs} out of range")))?;

            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| Error::Syntax(format!("{n}: epoch {secs} out of range")))
        }
        Value::Tag(TAG_DATE_TIME, inner) => parse_rfc3339(&to_tstr(inner, n)?, n),
        Value::Text(s) => parse_rfc3339(s, n),
        Value::Tag(t, _) => Err(Error::Unsupported(format!("{n}: date with tag {t}"))),
        _ => Err(Error::TypeMismatch(format!("{n} MUST be tdate"))),
    }
}

fn parse_rfc3339(s: &str, n: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Syntax(format!("{n}: {s:?} is not RFC 3339: {e}")))
}

/// Accepts `#6.2(bstr)` and returns the magnitude bytes without leading
/// zeros.  Some producers write serials that fit in 64 bits as a plain
/// `uint`, so that form is accepted too.
pub fn to_bignum(v: &Value, n: &str) -> Result<Vec<u8>, Error> {
    let b = match v {
        Value::Tag(TAG_BIGNUM, inner) => to_bstr(inner, n)?,
        Value::Integer(_) => to_uint(v, n)?.to_be_bytes().to_vec(),
        _ => return Err(Error::TypeMismatch(format!("{n} MUST be #6.2(bstr)"))),
    };

    let first = b.iter().position(|x| *x != 0).unwrap_or(b.len());

    Ok(b[first..].to_vec())
}

/// Find the value stored under a text key
pub fn lookup_text<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .map(|(_, v)| v)
}

/// Find the value stored under an integer label
pub fn lookup_label(map: &[(Value, Value)], label: i64) -> Option<&Value> {
    map.iter()
        .find(|(k, _)| k.as_integer().map(i128::from) == Some(label.into()))
        .map(|(_, v)| v)
}
