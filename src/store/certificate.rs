// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::asn1::{self, TimeFormat};
use crate::crypto::EcPublicKey;
use crate::errors::Error;
use chrono::{DateTime, SubsecRound, Utc};
use openssl::asn1::Asn1Time;
use openssl::pkey::{PKey, Public};
use openssl::x509::X509;
use std::cmp::Ordering;
use x509_parser::extensions::ParsedExtension;
use x509_parser::parse_x509_certificate;

/// An X.509 certificate together with the fields used for chain building.
/// Equality is byte-wise on the DER encoding.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    x509: X509,

    ski: Option<Vec<u8>>,
    aki: Option<Vec<u8>>,
    raw_subject: Vec<u8>,
    raw_issuer: Vec<u8>,
    subject: String,
    issuer: String,
    serial: Vec<u8>,

    // None when the KeyUsage extension is absent
    digital_signature: Option<bool>,
    key_cert_sign: Option<bool>,
    is_ca: bool,
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self, Error> {
        let (rest, c) = parse_x509_certificate(der)
            .map_err(|e| Error::Syntax(format!("X.509 certificate: {e}")))?;

        if !rest.is_empty() {
            return Err(Error::Syntax(format!(
                "{} trailing bytes after X.509 certificate",
                rest.len()
            )));
        }

        let mut ski = None;
        let mut aki = None;
        let mut digital_signature = None;
        let mut key_cert_sign = None;
        let mut is_ca = false;

        for ext in c.extensions() {
            match ext.parsed_extension() {
                ParsedExtension::SubjectKeyIdentifier(k) => ski = Some(k.0.to_vec()),
                ParsedExtension::AuthorityKeyIdentifier(a) => {
                    aki = a.key_identifier.as_ref().map(|k| k.0.to_vec())
                }
                ParsedExtension::KeyUsage(ku) => {
                    digital_signature = Some(ku.digital_signature());
                    key_cert_sign = Some(ku.key_cert_sign());
                }
                ParsedExtension::BasicConstraints(bc) => is_ca = bc.ca,
                _ => {}
            }
        }

        let x509 = X509::from_der(der)?;

        Ok(Self {
            der: der.to_vec(),
            x509,
            ski,
            aki,
            raw_subject: c.subject().as_raw().to_vec(),
            raw_issuer: c.issuer().as_raw().to_vec(),
            subject: c.subject().to_string(),
            issuer: c.issuer().to_string(),
            serial: c.tbs_certificate.raw_serial().to_vec(),
            digital_signature,
            key_cert_sign,
            is_ca,
        })
    }

    /// Parse every certificate of a PEM bundle
    pub fn from_pem_bundle(pem: &[u8]) -> Result<Vec<Self>, Error> {
        let stack =
            X509::stack_from_pem(pem).map_err(|e| Error::Syntax(format!("PEM bundle: {e}")))?;

        stack
            .iter()
            .map(|x| Self::from_der(&x.to_der()?))
            .collect()
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject Key Identifier
    pub fn ski(&self) -> Option<&[u8]> {
        self.ski.as_deref()
    }

    /// Authority Key Identifier (key id form), the SKI of the issuer
    pub fn aki(&self) -> Option<&[u8]> {
        self.aki.as_deref()
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// DER encoded subject name
    pub fn raw_subject(&self) -> &[u8] {
        &self.raw_subject
    }

    /// DER encoded issuer name
    pub fn raw_issuer(&self) -> &[u8] {
        &self.raw_issuer
    }

    /// Content octets of the serialNumber INTEGER
    pub fn serial_number(&self) -> &[u8] {
        &self.serial
    }

    pub fn is_self_issued(&self) -> bool {
        self.raw_subject == self.raw_issuer
    }

    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    /// KeyUsage permits signing documents.  The extension is required.
    pub fn allows_digital_signature(&self) -> bool {
        self.digital_signature.unwrap_or(false)
    }

    /// KeyUsage permits signing certificates.  The extension is required.
    pub fn allows_cert_sign(&self) -> bool {
        self.key_cert_sign.unwrap_or(false)
    }

    pub fn public_key(&self) -> Result<PKey<Public>, Error> {
        Ok(self.x509.public_key()?)
    }

    /// The subject public key in the COSE key model
    pub fn ec_public_key(&self) -> Result<EcPublicKey, Error> {
        let k = self.public_key()?;

        EcPublicKey::from_pkey(&*k)
    }

    /// True when this certificate's signature verifies with `issuer_key`
    pub fn is_signed_by(&self, issuer_key: &PKey<Public>) -> bool {
        self.x509.verify(issuer_key).unwrap_or(false)
    }

    /// Check `t` against notBefore and notAfter, both inclusive
    pub fn is_valid_at(&self, t: &DateTime<Utc>) -> Result<bool, Error> {
        let t = t.trunc_subsecs(0);
        let s = asn1::encode(&t, TimeFormat::GeneralizedTime)?;
        let at = Asn1Time::from_str(&s)?;

        let started = self.x509.not_before().compare(&at)? != Ordering::Greater;
        let not_expired = self.x509.not_after().compare(&at)? != Ordering::Less;

        Ok(started && not_expired)
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("ski", &self.ski.as_ref().map(hex::encode))
            .finish()
    }
}
