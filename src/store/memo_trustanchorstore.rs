// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::certificate::Certificate;
use super::ITrustAnchorStore;
use crate::errors::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

/// Trusted root certificates indexed by their Subject Key Identifier
pub type Anchors = HashMap<Vec<u8>, Certificate>;

/// One entry of a JSON trust anchor configuration
#[serde_with::serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnchorEntry {
    /// DER encoded root certificate, hex
    #[serde_as(as = "serde_with::hex::Hex")]
    pub certificate: Vec<u8>,

    /// Free-form name, only used in logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// The store where the trusted root certificates are stashed.  Writers
/// and readers are serialised through a RwLock.
#[derive(Debug)]
pub struct MemoTrustAnchorStore {
    p: RwLock<Anchors>,
}

impl Default for MemoTrustAnchorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoTrustAnchorStore {
    /// Returns a new empty TrustAnchorStore
    pub fn new() -> Self {
        Self {
            p: Default::default(),
        }
    }

    /// Add a root certificate.  A certificate with the same SKI as one
    /// already stored replaces it.
    pub fn add(&self, cert: Certificate) -> Result<(), Error> {
        let ski = cert
            .ski()
            .ok_or_else(|| {
                Error::MissingField(format!("subjectKeyIdentifier in {}", cert.subject()))
            })?
            .to_vec();

        tracing::debug!("adding trust anchor {} ({})", cert.subject(), hex::encode(&ski));

        let mut p = self.p.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(old) = p.insert(ski, cert) {
            tracing::warn!("trust anchor {} replaced", old.subject());
        }

        Ok(())
    }

    /// Remove the root certificate stored under the SKI of `cert`.  Returns
    /// whether anything was removed.
    pub fn remove(&self, cert: &Certificate) -> bool {
        let Some(ski) = cert.ski() else {
            return false;
        };

        let removed = self
            .p
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(ski)
            .is_some();

        tracing::debug!("removing trust anchor {}: {removed}", cert.subject());

        removed
    }

    pub fn certificates(&self) -> Vec<Certificate> {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// A read-locked view of the anchors.  Writers block until it is dropped.
    pub fn read(&self) -> RwLockReadGuard<'_, Anchors> {
        self.p.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add to an existing (and possibly empty) TrustAnchorStore the trust
    /// anchors loaded from the given JSON array of [`AnchorEntry`]
    pub fn load_json(&self, j: &str) -> Result<(), Error> {
        let entries: Vec<AnchorEntry> =
            serde_json::from_str(j).map_err(|e| Error::Syntax(e.to_string()))?;

        // parse everything before touching the store
        let mut certs = Vec::with_capacity(entries.len());
        for e in entries.iter() {
            let c = Certificate::from_der(&e.certificate)?;

            if let Some(label) = &e.label {
                tracing::debug!("loaded trust anchor \"{label}\": {}", c.subject());
            }

            certs.push(c);
        }

        for c in certs {
            self.add(c)?;
        }

        Ok(())
    }

    /// Add the root certificates of a PEM bundle
    pub fn load_pem(&self, pem: &str) -> Result<(), Error> {
        for c in Certificate::from_pem_bundle(pem.as_bytes())? {
            self.add(c)?;
        }

        Ok(())
    }
}

impl ITrustAnchorStore for MemoTrustAnchorStore {
    fn lookup(&self, ski: &[u8]) -> Option<Certificate> {
        self.read().get(ski).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, Role};

    fn entry_json(der: &[u8], label: Option<&str>) -> String {
        serde_json::to_string(&vec![AnchorEntry {
            certificate: der.to_vec(),
            label: label.map(str::to_string),
        }])
        .unwrap()
    }

    #[test]
    fn load_json_and_lookup_ok() {
        let root = testutil::issue("json root", Role::Root, None).certificate();

        let s: MemoTrustAnchorStore = Default::default();
        s.load_json(&entry_json(root.der(), Some("test"))).unwrap();

        let ta = s.lookup(root.ski().unwrap());
        assert_eq!(ta, Some(root.clone()));
        assert!(s.is_anchor(&root));
    }

    #[test]
    fn load_json_bad() {
        let s = MemoTrustAnchorStore::new();

        assert!(s.load_json("{}").unwrap_err().is_format());
        assert!(s.load_json(r#"[{"certificate": "zz"}]"#).is_err());
        assert!(s.load_json(r#"[{"certificate": "3003020101"}]"#).is_err());
        assert!(s.is_empty());
    }

    #[test]
    fn load_pem_bundle() {
        let a = testutil::issue("pem a", Role::Root, None);
        let b = testutil::issue("pem b", Role::Root, None);

        let mut pem = a.cert.to_pem().unwrap();
        pem.extend(b.cert.to_pem().unwrap());

        let s = MemoTrustAnchorStore::new();
        s.load_pem(std::str::from_utf8(&pem).unwrap()).unwrap();

        assert_eq!(s.len(), 2);
    }

    #[test]
    fn add_remove() {
        let root = testutil::issue("r", Role::Root, None).certificate();
        let s = MemoTrustAnchorStore::new();

        s.add(root.clone()).unwrap();
        assert_eq!(s.certificates(), vec![root.clone()]);

        assert!(s.remove(&root));
        assert!(!s.remove(&root));
        assert!(s.lookup(root.ski().unwrap()).is_none());
    }
}
