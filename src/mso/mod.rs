// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The Mobile Security Object (ISO/IEC 18013-5 §9.1.2.4) and the issuerAuth
//! COSE_Sign1 that carries it.
//!
//! A decoded [`MobileSecurityObject`] is immutable.  Its validity window is
//! not enforced here; compare `valid_from`/`valid_until` with the time of
//! presentation.

pub use self::digest::DigestAlgorithm;
pub use self::issuerauth::IssuerAuth;
pub use self::mso::{DigestIds, KeyAuthorizations, MobileSecurityObject};

mod digest;
mod issuerauth;
#[allow(clippy::module_inception)]
mod mso;
