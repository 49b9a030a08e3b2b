// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! COSE_Sign1 (RFC 9052 §4.2) envelopes.
//!
//! [`CoseSign1`] keeps the protected header bytes exactly as received, so
//! that verification always hashes what the signer signed.  Envelopes are
//! produced with [`sign_envelope`] and checked with [`verify_envelope`].

pub use self::sign1::*;

mod sign1;

/// Header labels used by this crate
pub mod labels {
    pub const ALG: i64 = 1;
    pub const X5CHAIN: i64 = 33;
}

/// CBOR tag of a COSE_Sign1 message
pub const TAG_COSE_SIGN1: u64 = 18;
