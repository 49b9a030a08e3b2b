// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::certificate::Certificate;
use std::collections::HashMap;

/// Interface to the store where the trusted root certificates are stashed.
pub trait ITrustAnchorStore {
    /// Lookup a trust anchor from the store given its Subject Key Identifier
    fn lookup(&self, ski: &[u8]) -> Option<Certificate>;

    /// True if exactly this certificate is a trust anchor
    fn is_anchor(&self, cert: &Certificate) -> bool {
        cert.ski()
            .and_then(|ski| self.lookup(ski))
            .is_some_and(|a| a == *cert)
    }
}

/// A consistent view of the anchors, keyed by SKI
impl ITrustAnchorStore for HashMap<Vec<u8>, Certificate> {
    fn lookup(&self, ski: &[u8]) -> Option<Certificate> {
        self.get(ski).cloned()
    }
}
