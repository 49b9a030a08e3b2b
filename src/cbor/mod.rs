// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The cbor module is the binary object codec every other component builds
//! on.  Values are [`BinaryValue`] trees built straight from the
//! `ciborium-ll` header stream, so tags and simple values are kept exactly
//! as they appear on the wire.  On top of that this module adds strict
//! framing ([`decode`] refuses trailing bytes and duplicate map keys), the
//! tagged forms used by mdoc structures (tdate, biguint, embedded CBOR) and
//! typed field accessors for the hand-written parsers.
//!
//! # Example
//!
//! ```
//! use mdoctrust::cbor::{self, Value};
//!
//! let v = Value::Map(vec![(Value::Text("version".into()), Value::Text("1.0".into()))]);
//! let buf = cbor::encode(&v).expect("encoding");
//!
//! assert_eq!(cbor::decode(&buf).expect("decoding"), v);
//! ```

pub use self::codec::*;
pub use self::common::*;
pub use self::value::{BinaryValue, BinaryValue as Value, Integer};

mod codec;
mod common;
mod value;
