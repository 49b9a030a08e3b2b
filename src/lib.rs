// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Trust and provenance layer for mdoc (ISO/IEC 18013-5) verification.
//!
//! This crate provides the pieces a verifier needs to establish that a
//! presented mobile document, or a list of trusted issuers, is authentic and
//! untampered:
//! * A strict CBOR codec and COSE_Sign1 envelopes
//! * An ASN.1 UTCTime/GeneralizedTime codec
//! * An elliptic curve public key model mapped to and from COSE_Key
//! * A Trust Manager that completes certificate chains from a store of roots
//!   and validates them
//! * Signed Verified Issuer Certificate Authority Lists (VICAL)
//! * The Mobile Security Object (MSO) and its issuerAuth envelope
//!
//! Format problems and signature mismatches are reported as [`Error`].  An
//! untrusted certificate chain is an expected outcome and is reported as
//! data, see [`trust::TrustResult`].

pub use self::errors::Error;

pub mod asn1;
pub mod cbor;
pub mod cose;
pub mod crypto;
mod errors;
pub mod mso;
pub mod store;
pub mod trust;
pub mod vical;

#[cfg(test)]
mod testutil;
