// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::errors::Error;
use openssl::hash::MessageDigest;

/// COSE signature algorithms accepted for issuer, VICAL and device signing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    ES256,
    ES384,
    ES512,
    EdDSA,
}

impl Algorithm {
    pub fn cose_id(&self) -> i64 {
        let id = match self {
            Algorithm::ES256 => cose::algs::ES256,
            Algorithm::ES384 => cose::algs::ES384,
            Algorithm::ES512 => cose::algs::ES512,
            Algorithm::EdDSA => cose::algs::EDDSA,
        };

        id.into()
    }

    pub fn from_cose_id(id: i128) -> Result<Self, Error> {
        [
            Algorithm::ES256,
            Algorithm::ES384,
            Algorithm::ES512,
            Algorithm::EdDSA,
        ]
        .into_iter()
        .find(|a| i128::from(a.cose_id()) == id)
        .ok_or_else(|| Error::Unsupported(format!("COSE algorithm {id}")))
    }

    /// Hash used in front of ECDSA; EdDSA hashes internally
    pub(crate) fn message_digest(&self) -> Option<MessageDigest> {
        match self {
            Algorithm::ES256 => Some(MessageDigest::sha256()),
            Algorithm::ES384 => Some(MessageDigest::sha384()),
            Algorithm::ES512 => Some(MessageDigest::sha512()),
            Algorithm::EdDSA => None,
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Algorithm::ES256 => "ES256",
            Algorithm::ES384 => "ES384",
            Algorithm::ES512 => "ES512",
            Algorithm::EdDSA => "EdDSA",
        };

        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iana_ids() {
        assert_eq!(Algorithm::ES256.cose_id(), -7);
        assert_eq!(Algorithm::ES384.cose_id(), -35);
        assert_eq!(Algorithm::ES512.cose_id(), -36);
        assert_eq!(Algorithm::EdDSA.cose_id(), -8);

        assert_eq!(Algorithm::from_cose_id(-35).unwrap(), Algorithm::ES384);
        assert!(Algorithm::from_cose_id(-257).unwrap_err().is_format());
    }
}
