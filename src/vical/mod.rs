// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Verified Issuer Certificate Authority Lists (ISO/IEC 18013-5 Annex C).
//!
//! A VICAL is a COSE_Sign1 whose payload lists trusted issuer certificates.
//! [`SignedVical::parse`] authenticates the list against the leaf of the
//! provider's x5chain before decoding it.  Whether that chain is itself
//! trusted is up to the caller, see [`crate::trust::TrustManager`].

pub use self::signed::SignedVical;
pub use self::vical::{CertificateInfo, Vical};

mod signed;
#[allow(clippy::module_inception)]
mod vical;
