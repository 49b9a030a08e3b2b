// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::value::{BinaryValue as Value, Integer};
use crate::errors::Error;
use chrono::{DateTime, SecondsFormat, Utc};
use ciborium_ll::{simple, Decoder, Encoder, Header};
use std::collections::HashSet;
use std::fmt::Debug;

/// RFC 8949 §3.4.1, standard date/time string
pub const TAG_DATE_TIME: u64 = 0;
/// RFC 8949 §3.4.2, epoch-based date/time
pub const TAG_EPOCH_TIME: u64 = 1;
/// RFC 8949 §3.4.3, unsigned bignum
pub const TAG_BIGNUM: u64 = 2;
/// RFC 8949 §3.4.3, negative bignum
pub const TAG_NEGATIVE_BIGNUM: u64 = 3;
/// RFC 8949 §3.4.5.1, encoded CBOR data item
pub const TAG_ENCODED_CBOR: u64 = 24;

/// Arrays, maps and tags nested deeper than this are refused by [`decode`]
pub const MAX_NESTING: usize = 128;

const CHUNK_SIZE: usize = 4096;

/// Serialize a value tree.  Integers and lengths always use their shortest
/// form and containers are definite-length, so equal trees encode to equal
/// bytes.  Maps with duplicate keys are refused.
pub fn encode(v: &Value) -> Result<Vec<u8>, Error> {
    check_unique_keys(v)?;

    to_bytes(v)
}

fn to_bytes(v: &Value) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();

    {
        let mut enc = Encoder::from(&mut buf);
        write_item(&mut enc, v)?;
    }

    Ok(buf)
}

fn write_failed<E: Debug>(e: E) -> Error {
    Error::Syntax(format!("encoding CBOR: {e:?}"))
}

fn write_item(enc: &mut Encoder<&mut Vec<u8>>, v: &Value) -> Result<(), Error> {
    let header = match v {
        Value::Integer(i) => {
            let i = i128::from(*i);

            if i >= 0 {
                Header::Positive(u64::try_from(i).map_err(write_failed)?)
            } else {
                Header::Negative(u64::try_from(-1 - i).map_err(write_failed)?)
            }
        }
        Value::Bytes(b) => return enc.bytes(b, None).map_err(write_failed),
        Value::Text(s) => return enc.text(s, None).map_err(write_failed),
        Value::Array(items) => {
            enc.push(Header::Array(Some(items.len())))
                .map_err(write_failed)?;

            return items.iter().try_for_each(|x| write_item(enc, x));
        }
        Value::Map(entries) => {
            enc.push(Header::Map(Some(entries.len())))
                .map_err(write_failed)?;

            for (k, x) in entries.iter() {
                write_item(enc, k)?;
                write_item(enc, x)?;
            }

            return Ok(());
        }
        Value::Tag(t, inner) => {
            enc.push(Header::Tag(*t)).map_err(write_failed)?;

            return write_item(enc, inner);
        }
        Value::Bool(false) => Header::Simple(simple::FALSE),
        Value::Bool(true) => Header::Simple(simple::TRUE),
        Value::Null => Header::Simple(simple::NULL),
        Value::Undefined => Header::Simple(simple::UNDEFINED),
        Value::Simple(x) if (simple::FALSE..32).contains(x) => {
            return Err(Error::Syntax(format!(
                "simple({x}) is reserved or has a dedicated variant"
            )))
        }
        Value::Simple(x) => Header::Simple(*x),
        Value::Float(f) => Header::Float(*f),
    };

    enc.push(header).map_err(write_failed)
}

/// Decode exactly one data item spanning the whole buffer.  Indefinite-length
/// items are accepted and come back in their definite form.
pub fn decode(buf: &[u8]) -> Result<Value, Error> {
    let mut dec = Decoder::from(buf);

    let v = read_item(&mut dec, 0)?;

    let consumed = dec.offset();

    if consumed != buf.len() {
        return Err(Error::Syntax(format!(
            "{} trailing bytes after CBOR data item",
            buf.len() - consumed
        )));
    }

    check_unique_keys(&v)?;

    Ok(v)
}

fn read_failed<E>(e: ciborium_ll::Error<E>) -> Error {
    match e {
        ciborium_ll::Error::Io(_) => Error::Syntax("truncated CBOR data item".to_string()),
        ciborium_ll::Error::Syntax(off) => {
            Error::Syntax(format!("malformed CBOR at offset {off}"))
        }
    }
}

fn read_item(dec: &mut Decoder<&[u8]>, depth: usize) -> Result<Value, Error> {
    if depth > MAX_NESTING {
        return Err(Error::Syntax(format!(
            "CBOR nesting deeper than {MAX_NESTING}"
        )));
    }

    let v = match dec.pull().map_err(read_failed)? {
        Header::Positive(n) => Value::Integer(n.into()),
        Header::Negative(n) => {
            let i = Integer::try_from(-1 - i128::from(n))
                .map_err(|e| Error::Syntax(format!("negative integer: {e}")))?;

            Value::Integer(i)
        }
        Header::Float(f) => Value::Float(f),
        Header::Simple(simple::FALSE) => Value::Bool(false),
        Header::Simple(simple::TRUE) => Value::Bool(true),
        Header::Simple(simple::NULL) => Value::Null,
        Header::Simple(simple::UNDEFINED) => Value::Undefined,
        Header::Simple(x) if x < 32 && x > simple::UNDEFINED => {
            return Err(Error::Syntax(format!("reserved simple value {x}")))
        }
        Header::Simple(x) => Value::Simple(x),
        Header::Tag(t) => Value::Tag(t, Box::new(read_item(dec, depth + 1)?)),
        Header::Break => return Err(Error::Syntax("unexpected CBOR break".to_string())),
        Header::Bytes(len) => {
            let mut out = Vec::new();
            let mut chunk = [0u8; CHUNK_SIZE];
            let mut segments = dec.bytes(len);

            while let Some(mut segment) = segments.pull().map_err(read_failed)? {
                while let Some(b) = segment.pull(&mut chunk).map_err(read_failed)? {
                    out.extend_from_slice(b);
                }
            }

            Value::Bytes(out)
        }
        Header::Text(len) => {
            let mut out = String::new();
            let mut chunk = [0u8; CHUNK_SIZE];
            let mut segments = dec.text(len);

            while let Some(mut segment) = segments.pull().map_err(read_failed)? {
                while let Some(s) = segment.pull(&mut chunk).map_err(read_failed)? {
                    out.push_str(s);
                }
            }

            Value::Text(out)
        }
        Header::Array(len) => {
            let mut items = Vec::new();

            while next_entry(dec, len, items.len())? {
                items.push(read_item(dec, depth + 1)?);
            }

            Value::Array(items)
        }
        Header::Map(len) => {
            let mut entries = Vec::new();

            while next_entry(dec, len, entries.len())? {
                let k = read_item(dec, depth + 1)?;
                let x = read_item(dec, depth + 1)?;

                entries.push((k, x));
            }

            Value::Map(entries)
        }
    };

    Ok(v)
}

// whether another element follows in a container of the given length, or up
// to the break marker of an indefinite-length one
fn next_entry(dec: &mut Decoder<&[u8]>, len: Option<usize>, read: usize) -> Result<bool, Error> {
    match len {
        Some(n) => Ok(read < n),
        None => match dec.pull().map_err(read_failed)? {
            Header::Break => Ok(false),
            h => {
                dec.push(h);
                Ok(true)
            }
        },
    }
}

// keys are compared by their encoded form, which is unambiguous given the
// shortest-form encoding above
fn check_unique_keys(v: &Value) -> Result<(), Error> {
    match v {
        Value::Map(entries) => {
            let mut seen = HashSet::new();

            for (k, val) in entries.iter() {
                check_unique_keys(k)?;

                if !seen.insert(to_bytes(k)?) {
                    return Err(Error::DuplicatedField(format!("map key {k:?}")));
                }

                check_unique_keys(val)?;
            }

            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(check_unique_keys),
        Value::Tag(_, inner) => check_unique_keys(inner),
        _ => Ok(()),
    }
}

/// `#6.0(tstr)` in RFC 3339 form, UTC with a `Z` suffix.  A fractional part
/// is only emitted for instants that have one.
pub fn encode_tagged_date(t: &DateTime<Utc>) -> Value {
    Value::Tag(
        TAG_DATE_TIME,
        Box::new(Value::Text(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
    )
}

/// `#6.2(bstr)`
pub fn encode_bignum(magnitude: &[u8]) -> Value {
    Value::Tag(TAG_BIGNUM, Box::new(Value::Bytes(magnitude.to_vec())))
}

/// `#6.24(bstr .cbor X)` given the already encoded X
pub fn wrap_tag24(encoded: Vec<u8>) -> Value {
    Value::Tag(TAG_ENCODED_CBOR, Box::new(Value::Bytes(encoded)))
}

/// Return the bytes embedded in a `#6.24(bstr)`
pub fn unwrap_tag24(v: &Value, n: &str) -> Result<Vec<u8>, Error> {
    match v {
        Value::Tag(TAG_ENCODED_CBOR, inner) => match inner.as_ref() {
            Value::Bytes(b) => Ok(b.clone()),
            _ => Err(Error::TypeMismatch(format!(
                "{n} MUST be #6.24(bstr), got a different tag content"
            ))),
        },
        Value::Tag(t, _) => Err(Error::TypeMismatch(format!(
            "{n}: expecting tag {TAG_ENCODED_CBOR}, got {t}"
        ))),
        _ => Err(Error::TypeMismatch(format!("{n} MUST be tagged"))),
    }
}
