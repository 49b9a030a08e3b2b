// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::algorithm::Algorithm;
use super::eckey::{Curve, EcPublicKey};
use crate::errors::Error;
use openssl::bn::{BigNum, BigNumContext};
use openssl::ec::{EcGroup, EcKey};
use openssl::ecdsa::EcdsaSig;
use openssl::hash::{hash, MessageDigest};
use openssl::nid::Nid;
use openssl::pkey::{HasParams, HasPublic, Id, PKey, PKeyRef, Private, Public};
use openssl::sign::{Signer, Verifier};

impl Curve {
    fn nid(&self) -> Option<Nid> {
        match self {
            Curve::P256 => Some(Nid::X9_62_PRIME256V1),
            Curve::P384 => Some(Nid::SECP384R1),
            Curve::P521 => Some(Nid::SECP521R1),
            Curve::BrainpoolP256r1 => Some(Nid::BRAINPOOL_P256R1),
            Curve::BrainpoolP320r1 => Some(Nid::BRAINPOOL_P320R1),
            Curve::BrainpoolP384r1 => Some(Nid::BRAINPOOL_P384R1),
            Curve::BrainpoolP512r1 => Some(Nid::BRAINPOOL_P512R1),
            Curve::X25519 | Curve::X448 | Curve::Ed25519 | Curve::Ed448 => None,
        }
    }

    fn pkey_id(&self) -> Id {
        match self {
            Curve::X25519 => Id::X25519,
            Curve::X448 => Id::X448,
            Curve::Ed25519 => Id::ED25519,
            Curve::Ed448 => Id::ED448,
            Curve::P256
            | Curve::P384
            | Curve::P521
            | Curve::BrainpoolP256r1
            | Curve::BrainpoolP320r1
            | Curve::BrainpoolP384r1
            | Curve::BrainpoolP512r1 => Id::EC,
        }
    }

    fn from_nid(nid: Nid) -> Result<Self, Error> {
        [
            Curve::P256,
            Curve::P384,
            Curve::P521,
            Curve::BrainpoolP256r1,
            Curve::BrainpoolP320r1,
            Curve::BrainpoolP384r1,
            Curve::BrainpoolP512r1,
        ]
        .into_iter()
        .find(|c| c.nid() == Some(nid))
        .ok_or_else(|| Error::Unsupported(format!("EC group {}", nid.as_raw())))
    }
}

impl EcPublicKey {
    /// Build the openssl key used to verify signatures made by this key
    pub fn to_pkey(&self) -> Result<PKey<Public>, Error> {
        match self {
            EcPublicKey::DoubleCoordinate { curve, x, y } => {
                let nid = curve
                    .nid()
                    .ok_or_else(|| Error::Unsupported(format!("{curve:?} as EC2 key")))?;

                let group = EcGroup::from_curve_name(nid)?;
                let x = BigNum::from_slice(x)?;
                let y = BigNum::from_slice(y)?;

                let ec = EcKey::from_public_key_affine_coordinates(&group, &x, &y)
                    .map_err(|e| Error::Syntax(format!("{curve:?} point not on curve: {e}")))?;

                Ok(PKey::from_ec_key(ec)?)
            }
            EcPublicKey::SinglePointOkp { curve, x } => {
                PKey::public_key_from_raw_bytes(x, curve.pkey_id())
                    .map_err(|e| Error::Syntax(format!("{curve:?} public key: {e}")))
            }
        }
    }

    /// Extract the public part of an openssl key, e.g. the subject public
    /// key of a certificate
    pub fn from_pkey<T: HasPublic>(pkey: &PKeyRef<T>) -> Result<Self, Error> {
        let id = pkey.id();

        if id == Id::EC {
            let ec = pkey.ec_key()?;
            let group = ec.group();

            let nid = group
                .curve_name()
                .ok_or_else(|| Error::Unsupported("EC key on an unnamed curve".to_string()))?;
            let curve = Curve::from_nid(nid)?;

            let mut ctx = BigNumContext::new()?;
            let mut x = BigNum::new()?;
            let mut y = BigNum::new()?;
            ec.public_key()
                .affine_coordinates(group, &mut x, &mut y, &mut ctx)?;

            let size = curve.coordinate_size() as i32;

            return Self::new_double(curve, x.to_vec_padded(size)?, y.to_vec_padded(size)?);
        }

        let curve = if id == Id::ED25519 {
            Curve::Ed25519
        } else if id == Id::ED448 {
            Curve::Ed448
        } else if id == Id::X25519 {
            Curve::X25519
        } else if id == Id::X448 {
            Curve::X448
        } else {
            return Err(Error::Unsupported(format!(
                "public key type {}",
                id.as_raw()
            )));
        };

        Self::new_okp(curve, pkey.raw_public_key()?)
    }
}

// ECDSA signatures travel as fixed-width r || s, each half as wide as the
// curve's field
fn ecdsa_half_width<T: HasParams>(key: &PKeyRef<T>) -> Result<usize, Error> {
    let ec = key.ec_key()?;

    Ok(((ec.group().degree() + 7) / 8) as usize)
}

fn check_key_type<T>(key: &PKeyRef<T>, alg: Algorithm) -> Result<(), Error> {
    let ok = match alg {
        Algorithm::ES256 | Algorithm::ES384 | Algorithm::ES512 => key.id() == Id::EC,
        Algorithm::EdDSA => key.id() == Id::ED25519 || key.id() == Id::ED448,
    };

    if !ok {
        return Err(Error::Unsupported(format!(
            "{alg} with key type {}",
            key.id().as_raw()
        )));
    }

    Ok(())
}

/// Produce a COSE-shaped signature over `data`
pub fn sign(key: &PKeyRef<Private>, alg: Algorithm, data: &[u8]) -> Result<Vec<u8>, Error> {
    check_key_type(key, alg)?;

    match alg.message_digest() {
        Some(md) => {
            let mut signer = Signer::new(md, key)?;
            signer.update(data)?;
            let der = signer.sign_to_vec()?;

            let sig = EcdsaSig::from_der(&der)?;
            let n = ecdsa_half_width(key)? as i32;

            let mut raw = sig.r().to_vec_padded(n)?;
            raw.extend(sig.s().to_vec_padded(n)?);

            Ok(raw)
        }
        None => {
            let mut signer = Signer::new_without_digest(key)?;

            Ok(signer.sign_oneshot_to_vec(data)?)
        }
    }
}

/// Check a COSE-shaped signature.  A mismatch, including a signature of the
/// wrong shape, is `Ok(false)`; only an unusable key or algorithm is an
/// error.
pub fn verify(
    key: &PKeyRef<Public>,
    alg: Algorithm,
    data: &[u8],
    signature: &[u8],
) -> Result<bool, Error> {
    check_key_type(key, alg)?;

    match alg.message_digest() {
        Some(md) => {
            let n = ecdsa_half_width(key)?;

            if signature.len() != 2 * n {
                tracing::debug!(
                    "ECDSA signature is {} bytes, expecting {}",
                    signature.len(),
                    2 * n
                );
                return Ok(false);
            }

            let r = BigNum::from_slice(&signature[..n])?;
            let s = BigNum::from_slice(&signature[n..])?;
            let der = EcdsaSig::from_private_components(r, s)?.to_der()?;

            let mut verifier = Verifier::new(md, key)?;
            verifier.update(data)?;

            Ok(verifier.verify(&der).unwrap_or(false))
        }
        None => {
            let mut verifier = Verifier::new_without_digest(key)?;

            Ok(verifier.verify_oneshot(signature, data).unwrap_or(false))
        }
    }
}

/// Hash `data` with the named IANA hash
pub fn digest(md: MessageDigest, data: &[u8]) -> Result<Vec<u8>, Error> {
    Ok(hash(md, data)?.to_vec())
}
