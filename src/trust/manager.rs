// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::result::{TrustError, TrustResult};
use super::validator::ICertificateValidator;
use crate::errors::Error;
use crate::store::{Certificate, ITrustAnchorStore, MemoTrustAnchorStore};
use chrono::{DateTime, Utc};

/// Default bound on the number of certificates the root ascent may append
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Owns the trusted roots and validates certificate chains against them
#[derive(Debug)]
pub struct TrustManager {
    store: MemoTrustAnchorStore,
    max_depth: usize,
}

impl Default for TrustManager {
    fn default() -> Self {
        Self::new(MemoTrustAnchorStore::new())
    }
}

impl TrustManager {
    pub fn new(store: MemoTrustAnchorStore) -> Self {
        Self {
            store,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn store(&self) -> &MemoTrustAnchorStore {
        &self.store
    }

    pub fn add_certificate(&self, cert: Certificate) -> Result<(), Error> {
        self.store.add(cert)
    }

    pub fn remove_certificate(&self, cert: &Certificate) -> bool {
        self.store.remove(cert)
    }

    pub fn get_all_certificates(&self) -> Vec<Certificate> {
        self.store.certificates()
    }

    /// Complete `chain` (leaf first) up to a trusted root and validate it at
    /// the current time
    pub fn verify(
        &self,
        chain: &[Certificate],
        validators: &[&dyn ICertificateValidator],
    ) -> TrustResult {
        self.verify_at(chain, validators, &Utc::now())
    }

    /// Like [`TrustManager::verify`], checking validity periods at `at`
    pub fn verify_at(
        &self,
        chain: &[Certificate],
        validators: &[&dyn ICertificateValidator],
        at: &DateTime<Utc>,
    ) -> TrustResult {
        let trust_chain = match self.build(chain) {
            Ok(c) => c,
            Err((c, e)) => {
                tracing::debug!("chain building failed: {e}");
                return TrustResult::untrusted(c, e);
            }
        };

        match validate(&trust_chain, validators, at) {
            Ok(()) => {
                tracing::debug!("chain of {} certificates is trusted", trust_chain.len());
                TrustResult::trusted(trust_chain)
            }
            Err(e) => {
                tracing::debug!("chain validation failed: {e}");
                TrustResult::untrusted(trust_chain, e)
            }
        }
    }

    // The read lock is held for the whole ascent so that a concurrent writer
    // cannot change the anchors half way through.
    fn build(
        &self,
        chain: &[Certificate],
    ) -> Result<Vec<Certificate>, (Vec<Certificate>, TrustError)> {
        let Some(last) = chain.last() else {
            return Err((vec![], TrustError::EmptyChain));
        };

        let anchors = self.store.read();

        let mut out = chain.to_vec();

        if anchors.is_anchor(last) {
            tracing::debug!("{} is itself a trust anchor", last.subject());
            return Ok(out);
        }

        let root = last
            .aki()
            .and_then(|aki| anchors.lookup(aki))
            .ok_or_else(|| (vec![], TrustError::NoTrustedRoot(last.subject().to_string())))?;

        tracing::debug!("{} anchored by {}", last.subject(), root.subject());
        out.push(root);

        let mut appended = 1;

        loop {
            let top = &out[out.len() - 1];

            if top.is_self_issued() {
                break;
            }

            let Some(next) = top.aki().and_then(|aki| anchors.lookup(aki)) else {
                break;
            };

            if appended >= self.max_depth {
                tracing::warn!(
                    "root ascent from {} exceeds {} certificates",
                    last.subject(),
                    self.max_depth
                );
                return Err((out, TrustError::PathTooLong(self.max_depth)));
            }

            tracing::debug!("{} issued by {}", top.subject(), next.subject());
            out.push(next);
            appended += 1;
        }

        Ok(out)
    }
}

fn check_validity(cert: &Certificate, at: &DateTime<Utc>) -> Result<(), TrustError> {
    let ok = cert
        .is_valid_at(at)
        .map_err(|e| TrustError::Certificate(format!("{}: {e}", cert.subject())))?;

    if !ok {
        return Err(TrustError::Validity(format!(
            "{} not valid at {}",
            cert.subject(),
            at.to_rfc3339()
        )));
    }

    Ok(())
}

fn run_validators(
    cert: &Certificate,
    validators: &[&dyn ICertificateValidator],
) -> Result<(), TrustError> {
    for v in validators {
        v.validate(cert)
            .map_err(|e| TrustError::Validator(format!("{}: {e}", cert.subject())))?;
    }

    Ok(())
}

fn check_signed_by(cert: &Certificate, issuer: &Certificate) -> Result<(), TrustError> {
    let key = issuer
        .public_key()
        .map_err(|e| TrustError::Certificate(format!("{}: {e}", issuer.subject())))?;

    if !cert.is_signed_by(&key) {
        return Err(TrustError::Signature(format!(
            "{} not signed by {}",
            cert.subject(),
            issuer.subject()
        )));
    }

    Ok(())
}

// Leaf to root
fn validate(
    chain: &[Certificate],
    validators: &[&dyn ICertificateValidator],
    at: &DateTime<Utc>,
) -> Result<(), TrustError> {
    let Some(leaf) = chain.first() else {
        return Err(TrustError::EmptyChain);
    };

    if !leaf.allows_digital_signature() {
        return Err(TrustError::KeyUsage(format!(
            "{} does not allow digitalSignature",
            leaf.subject()
        )));
    }

    check_validity(leaf, at)?;
    run_validators(leaf, validators)?;

    for pair in chain.windows(2) {
        let (prev, ca) = (&pair[0], &pair[1]);

        if !ca.is_ca() {
            return Err(TrustError::KeyUsage(format!(
                "{} is not a CA certificate",
                ca.subject()
            )));
        }

        if !ca.allows_cert_sign() {
            return Err(TrustError::KeyUsage(format!(
                "{} does not allow keyCertSign",
                ca.subject()
            )));
        }

        if prev.raw_issuer() != ca.raw_subject() {
            return Err(TrustError::BrokenLink(format!(
                "issuer of {} is {}, not {}",
                prev.subject(),
                prev.issuer(),
                ca.subject()
            )));
        }

        if let (Some(aki), Some(ski)) = (prev.aki(), ca.ski()) {
            if aki != ski {
                return Err(TrustError::BrokenLink(format!(
                    "AKI of {} does not match SKI of {}",
                    prev.subject(),
                    ca.subject()
                )));
            }
        }

        check_validity(ca, at)?;
        check_signed_by(prev, ca)?;
        run_validators(ca, validators)?;
    }

    let terminal = &chain[chain.len() - 1];
    if terminal.is_self_issued() {
        check_signed_by(terminal, terminal)?;
    }

    Ok(())
}
