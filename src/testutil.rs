// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Key and X.509 chain minting for unit tests

use crate::asn1::{self, TimeFormat};
use crate::crypto::Curve;
use crate::store::Certificate;
use chrono::{DateTime, Duration, Utc};
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, KeyUsage, SubjectKeyIdentifier,
};
use openssl::x509::{X509Builder, X509NameBuilder, X509};

pub(crate) fn ec_key(curve: Curve) -> PKey<Private> {
    let nid = match curve {
        Curve::P256 => Nid::X9_62_PRIME256V1,
        Curve::P384 => Nid::SECP384R1,
        Curve::P521 => Nid::SECP521R1,
        Curve::BrainpoolP256r1 => Nid::BRAINPOOL_P256R1,
        Curve::BrainpoolP320r1 => Nid::BRAINPOOL_P320R1,
        Curve::BrainpoolP384r1 => Nid::BRAINPOOL_P384R1,
        Curve::BrainpoolP512r1 => Nid::BRAINPOOL_P512R1,
        other => panic!("{other:?} is not an EC2 curve"),
    };

    let group = EcGroup::from_curve_name(nid).unwrap();

    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Root,
    Intermediate,
    /// A CA certificate without the keyCertSign bit
    BadCa,
    /// keyCertSign set but BasicConstraints cA false
    NotCa,
    DocumentSigner,
    /// An end-entity certificate without the digitalSignature bit
    BadLeaf,
}

pub(crate) struct Issued {
    pub cert: X509,
    pub key: PKey<Private>,
}

impl Issued {
    pub fn der(&self) -> Vec<u8> {
        self.cert.to_der().unwrap()
    }

    pub fn certificate(&self) -> Certificate {
        Certificate::from_der(&self.der()).unwrap()
    }
}

fn asn1_time(t: &DateTime<Utc>) -> Asn1Time {
    let s = asn1::encode(t, TimeFormat::for_validity(t)).unwrap();

    Asn1Time::from_str(&s).unwrap()
}

pub(crate) fn issue_with_validity(
    cn: &str,
    role: Role,
    issuer: Option<&Issued>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
) -> Issued {
    build(cn, role, issuer, ec_key(Curve::P256), not_before, not_after)
}

/// Self-sign a new root over the key of an existing one, so both share a SKI
pub(crate) fn reissue_root(cn: &str, orig: &Issued) -> Issued {
    let now = Utc::now();

    build(
        cn,
        Role::Root,
        None,
        orig.key.clone(),
        now - Duration::days(1),
        now + Duration::days(365),
    )
}

/// Certify the key of an existing CA under another issuer.  The subject
/// name and SKI stay those of `orig`.
pub(crate) fn cross_certify(cn: &str, orig: &Issued, issuer: &Issued) -> Issued {
    let now = Utc::now();

    build(
        cn,
        Role::Intermediate,
        Some(issuer),
        orig.key.clone(),
        now - Duration::days(1),
        now + Duration::days(365),
    )
}

fn build(
    cn: &str,
    role: Role,
    issuer: Option<&Issued>,
    key: PKey<Private>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
) -> Issued {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, cn).unwrap();
    let name = name.build();

    let mut b = X509Builder::new().unwrap();
    b.set_version(2).unwrap();

    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();
    b.set_serial_number(&serial.to_asn1_integer().unwrap())
        .unwrap();

    b.set_subject_name(&name).unwrap();
    match issuer {
        Some(i) => b.set_issuer_name(i.cert.subject_name()).unwrap(),
        None => b.set_issuer_name(&name).unwrap(),
    }

    b.set_pubkey(&key).unwrap();
    b.set_not_before(&asn1_time(&not_before)).unwrap();
    b.set_not_after(&asn1_time(&not_after)).unwrap();

    let (bc, ku) = match role {
        Role::Root | Role::Intermediate => (
            BasicConstraints::new().critical().ca().build().unwrap(),
            KeyUsage::new()
                .critical()
                .key_cert_sign()
                .crl_sign()
                .build()
                .unwrap(),
        ),
        Role::BadCa => (
            BasicConstraints::new().critical().ca().build().unwrap(),
            KeyUsage::new().critical().crl_sign().build().unwrap(),
        ),
        Role::NotCa => (
            BasicConstraints::new().critical().build().unwrap(),
            KeyUsage::new()
                .critical()
                .key_cert_sign()
                .build()
                .unwrap(),
        ),
        Role::DocumentSigner => (
            BasicConstraints::new().build().unwrap(),
            KeyUsage::new().critical().digital_signature().build().unwrap(),
        ),
        Role::BadLeaf => (
            BasicConstraints::new().build().unwrap(),
            KeyUsage::new().critical().key_agreement().build().unwrap(),
        ),
    };
    b.append_extension(bc).unwrap();
    b.append_extension(ku).unwrap();

    let ski = SubjectKeyIdentifier::new()
        .build(&b.x509v3_context(issuer.map(|i| &*i.cert), None))
        .unwrap();
    b.append_extension(ski).unwrap();

    let aki = AuthorityKeyIdentifier::new()
        .keyid(true)
        .build(&b.x509v3_context(issuer.map(|i| &*i.cert), None))
        .unwrap();
    b.append_extension(aki).unwrap();

    let signer = issuer.map(|i| &i.key).unwrap_or(&key);
    b.sign(signer, MessageDigest::sha256()).unwrap();

    Issued {
        cert: b.build(),
        key,
    }
}

pub(crate) fn issue(cn: &str, role: Role, issuer: Option<&Issued>) -> Issued {
    let now = Utc::now();

    issue_with_validity(
        cn,
        role,
        issuer,
        now - Duration::days(1),
        now + Duration::days(365),
    )
}

/// root -> intermediate -> document signer
pub(crate) fn chain() -> (Issued, Issued, Issued) {
    let root = issue("Test IACA Root", Role::Root, None);
    let int = issue("Test Intermediate", Role::Intermediate, Some(&root));
    let ds = issue("Test Document Signer", Role::DocumentSigner, Some(&int));

    (root, int, ds)
}

/// Corrupt the last byte of the signature value
pub(crate) fn flip_signature(der: &[u8]) -> Vec<u8> {
    let mut v = der.to_vec();

    if let Some(last) = v.last_mut() {
        *last ^= 0x01;
    }

    v
}
