// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::store::Certificate;

#[derive(thiserror::Error, Clone, PartialEq, Eq)]
pub enum TrustError {
    #[error("empty certificate chain")]
    EmptyChain,
    #[error("no trusted root found for {0}")]
    NoTrustedRoot(String),
    #[error("certificate path exceeds {0} certificates above the supplied chain")]
    PathTooLong(usize),
    #[error("broken link: {0}")]
    BrokenLink(String),
    #[error("key usage: {0}")]
    KeyUsage(String),
    #[error("validity: {0}")]
    Validity(String),
    #[error("signature: {0}")]
    Signature(String),
    #[error("rejected by validator: {0}")]
    Validator(String),
    #[error("certificate: {0}")]
    Certificate(String),
}

impl std::fmt::Debug for TrustError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// Outcome of a chain verification
#[derive(Debug, Clone, PartialEq)]
pub struct TrustResult {
    pub is_trusted: bool,
    /// Leaf first, root last.  Empty if no root was found.
    pub trust_chain: Vec<Certificate>,
    pub error: Option<TrustError>,
}

impl TrustResult {
    pub(crate) fn trusted(trust_chain: Vec<Certificate>) -> Self {
        Self {
            is_trusted: true,
            trust_chain,
            error: None,
        }
    }

    pub(crate) fn untrusted(trust_chain: Vec<Certificate>, error: TrustError) -> Self {
        Self {
            is_trusted: false,
            trust_chain,
            error: Some(error),
        }
    }
}
