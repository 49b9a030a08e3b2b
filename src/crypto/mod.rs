// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Key material and signature primitives.  [`EcPublicKey`] is the
//! curve-parameterised public key model shared by COSE, VICAL and MSO code;
//! the actual point arithmetic, hashing and signing is delegated to openssl
//! through the functions in this module.

pub use self::algorithm::Algorithm;
pub use self::eckey::{Curve, EcPublicKey};
pub use self::provider::{digest, sign, verify};

mod algorithm;
mod eckey;
mod provider;

/// COSE_Key common and EC2/OKP parameter labels (RFC 9053 §7)
pub mod labels {
    pub const KTY: i64 = 1;
    pub const CRV: i64 = -1;
    pub const X: i64 = -2;
    pub const Y: i64 = -3;
}
