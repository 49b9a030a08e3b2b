// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::algorithm::Algorithm;
use super::labels;
use crate::cbor::{lookup_label, to_bstr, to_int, to_map, Value};
use crate::errors::Error;

// cose::keys only knows the NIST, CFRG and secp256k1 curves
const BRAINPOOL_P256R1: i64 = 256;
const BRAINPOOL_P320R1: i64 = 257;
const BRAINPOOL_P384R1: i64 = 258;
const BRAINPOOL_P512R1: i64 = 259;

/// Curves accepted for mdoc issuer, reader and device keys (ISO/IEC 18013-5
/// §9.1.5.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    P256,
    P384,
    P521,
    BrainpoolP256r1,
    BrainpoolP320r1,
    BrainpoolP384r1,
    BrainpoolP512r1,
    X25519,
    X448,
    Ed25519,
    Ed448,
}

impl Curve {
    const ALL: [Curve; 11] = [
        Curve::P256,
        Curve::P384,
        Curve::P521,
        Curve::BrainpoolP256r1,
        Curve::BrainpoolP320r1,
        Curve::BrainpoolP384r1,
        Curve::BrainpoolP512r1,
        Curve::X25519,
        Curve::X448,
        Curve::Ed25519,
        Curve::Ed448,
    ];

    pub fn cose_id(&self) -> i64 {
        match self {
            Curve::P256 => cose::keys::P_256.into(),
            Curve::P384 => cose::keys::P_384.into(),
            Curve::P521 => cose::keys::P_521.into(),
            Curve::BrainpoolP256r1 => BRAINPOOL_P256R1,
            Curve::BrainpoolP320r1 => BRAINPOOL_P320R1,
            Curve::BrainpoolP384r1 => BRAINPOOL_P384R1,
            Curve::BrainpoolP512r1 => BRAINPOOL_P512R1,
            Curve::X25519 => cose::keys::X25519.into(),
            Curve::X448 => cose::keys::X448.into(),
            Curve::Ed25519 => cose::keys::ED25519.into(),
            Curve::Ed448 => cose::keys::ED448.into(),
        }
    }

    pub fn from_cose_id(id: i128) -> Result<Self, Error> {
        Curve::ALL
            .into_iter()
            .find(|c| i128::from(c.cose_id()) == id)
            .ok_or_else(|| Error::Unsupported(format!("COSE curve {id}")))
    }

    /// Octet length of one encoded coordinate
    pub fn coordinate_size(&self) -> usize {
        match self {
            Curve::P256 => 32,
            Curve::P384 => 48,
            Curve::P521 => 66,
            Curve::BrainpoolP256r1 => 32,
            Curve::BrainpoolP320r1 => 40,
            Curve::BrainpoolP384r1 => 48,
            Curve::BrainpoolP512r1 => 64,
            Curve::X25519 => 32,
            Curve::X448 => 56,
            Curve::Ed25519 => 32,
            Curve::Ed448 => 57,
        }
    }

    /// Montgomery and Edwards curves use the single-coordinate OKP form
    pub fn is_okp(&self) -> bool {
        match self {
            Curve::X25519 | Curve::X448 | Curve::Ed25519 | Curve::Ed448 => true,
            Curve::P256
            | Curve::P384
            | Curve::P521
            | Curve::BrainpoolP256r1
            | Curve::BrainpoolP320r1
            | Curve::BrainpoolP384r1
            | Curve::BrainpoolP512r1 => false,
        }
    }

    fn kty(&self) -> i64 {
        if self.is_okp() {
            cose::keys::OKP.into()
        } else {
            cose::keys::EC2.into()
        }
    }
}

/// An elliptic curve public key in COSE_Key terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcPublicKey {
    /// EC2: Weierstrass curves, affine x and y
    DoubleCoordinate { curve: Curve, x: Vec<u8>, y: Vec<u8> },
    /// OKP: Montgomery and Edwards curves, one encoded point
    SinglePointOkp { curve: Curve, x: Vec<u8> },
}

impl EcPublicKey {
    pub fn new_double(curve: Curve, x: Vec<u8>, y: Vec<u8>) -> Result<Self, Error> {
        if curve.is_okp() {
            return Err(Error::Unsupported(format!(
                "{curve:?} keys have a single coordinate"
            )));
        }

        check_coordinate(curve, &x, "x")?;
        check_coordinate(curve, &y, "y")?;

        Ok(EcPublicKey::DoubleCoordinate { curve, x, y })
    }

    pub fn new_okp(curve: Curve, x: Vec<u8>) -> Result<Self, Error> {
        if !curve.is_okp() {
            return Err(Error::Unsupported(format!(
                "{curve:?} keys need both coordinates"
            )));
        }

        check_coordinate(curve, &x, "x")?;

        Ok(EcPublicKey::SinglePointOkp { curve, x })
    }

    pub fn curve(&self) -> Curve {
        match self {
            EcPublicKey::DoubleCoordinate { curve, .. }
            | EcPublicKey::SinglePointOkp { curve, .. } => *curve,
        }
    }

    /// The COSE algorithm a signature made with this key is expected to use.
    /// `None` for key-agreement-only curves.
    pub fn default_algorithm(&self) -> Option<Algorithm> {
        match self.curve() {
            Curve::P256 | Curve::BrainpoolP256r1 => Some(Algorithm::ES256),
            Curve::P384 | Curve::BrainpoolP320r1 | Curve::BrainpoolP384r1 => {
                Some(Algorithm::ES384)
            }
            Curve::P521 | Curve::BrainpoolP512r1 => Some(Algorithm::ES512),
            Curve::Ed25519 | Curve::Ed448 => Some(Algorithm::EdDSA),
            Curve::X25519 | Curve::X448 => None,
        }
    }

    /// Produce the COSE_Key map.  Entries in `additional` are appended, or
    /// replace the value of a reserved label they collide with.
    pub fn to_key_map(&self, additional: &[(Value, Value)]) -> Value {
        let curve = self.curve();

        let mut map = vec![
            (label(labels::KTY), Value::Integer(curve.kty().into())),
            (label(labels::CRV), Value::Integer(curve.cose_id().into())),
        ];

        match self {
            EcPublicKey::DoubleCoordinate { x, y, .. } => {
                map.push((label(labels::X), Value::Bytes(x.clone())));
                map.push((label(labels::Y), Value::Bytes(y.clone())));
            }
            EcPublicKey::SinglePointOkp { x, .. } => {
                map.push((label(labels::X), Value::Bytes(x.clone())));
            }
        }

        for (k, v) in additional.iter() {
            match map.iter_mut().find(|(mk, _)| mk == k) {
                Some(entry) => entry.1 = v.clone(),
                None => map.push((k.clone(), v.clone())),
            }
        }

        Value::Map(map)
    }

    /// Decode a COSE_Key map.  Labels other than kty, crv, x and y are
    /// ignored.
    pub fn from_key_map(v: &Value) -> Result<Self, Error> {
        let map = to_map(v, "COSE_Key")?;

        let kty = lookup_label(map, labels::KTY)
            .ok_or_else(|| Error::MissingField("COSE_Key kty".to_string()))?;
        let kty = to_int(kty, "COSE_Key kty")?;

        let crv = lookup_label(map, labels::CRV)
            .ok_or_else(|| Error::MissingField("COSE_Key crv".to_string()))?;
        let curve = Curve::from_cose_id(to_int(crv, "COSE_Key crv")?)?;

        let x = lookup_label(map, labels::X)
            .ok_or_else(|| Error::MissingField("COSE_Key x".to_string()))?;
        let x = to_bstr(x, "COSE_Key x")?;

        if kty == i128::from(cose::keys::EC2) {
            let y = lookup_label(map, labels::Y)
                .ok_or_else(|| Error::MissingField("COSE_Key y".to_string()))?;

            if let Value::Bool(_) = y {
                return Err(Error::Unsupported(
                    "COSE_Key with compressed y coordinate".to_string(),
                ));
            }

            let y = to_bstr(y, "COSE_Key y")?;

            Self::new_double(curve, x, y)
        } else if kty == i128::from(cose::keys::OKP) {
            Self::new_okp(curve, x)
        } else {
            Err(Error::Unsupported(format!("COSE_Key kty {kty}")))
        }
    }
}

fn label(l: i64) -> Value {
    Value::Integer(l.into())
}

fn check_coordinate(curve: Curve, c: &[u8], n: &str) -> Result<(), Error> {
    let want = curve.coordinate_size();

    if c.len() != want {
        return Err(Error::Syntax(format!(
            "{curve:?} {n} coordinate: expecting {want} bytes, got {}",
            c.len()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const P256_X: [u8; 32] =
        hex!("96313d6c63e24e3372742bfdb1a33ba2c897dcd68ab8c753e4fbd48dca6b7f9a");
    const P256_Y: [u8; 32] =
        hex!("1fb3269edd418857de1b39a4e4a44b92fa484caa722c228288f01d0c03a2c3d6");

    #[test]
    fn ec2_key_map() {
        let k = EcPublicKey::new_double(Curve::P256, P256_X.to_vec(), P256_Y.to_vec()).unwrap();

        let m = k.to_key_map(&[]);
        let entries = m.as_map().unwrap();

        assert_eq!(entries.len(), 4);
        assert_eq!(lookup_label(entries, 1), Some(&Value::Integer(2.into())));
        assert_eq!(lookup_label(entries, -1), Some(&Value::Integer(1.into())));

        assert_eq!(EcPublicKey::from_key_map(&m).unwrap(), k);
    }

    #[test]
    fn okp_key_map() {
        let k = EcPublicKey::new_okp(Curve::Ed25519, vec![7; 32]).unwrap();

        let m = k.to_key_map(&[]);
        let entries = m.as_map().unwrap();

        assert_eq!(lookup_label(entries, 1), Some(&Value::Integer(1.into())));
        assert_eq!(lookup_label(entries, -1), Some(&Value::Integer(6.into())));
        assert!(lookup_label(entries, -3).is_none());

        assert_eq!(EcPublicKey::from_key_map(&m).unwrap(), k);
    }

    #[test]
    fn additional_labels_win() {
        let k = EcPublicKey::new_okp(Curve::X25519, vec![1; 32]).unwrap();

        let m = k.to_key_map(&[
            (Value::Integer(2.into()), Value::Bytes(b"kid-1".to_vec())),
            (Value::Integer((-1).into()), Value::Integer(99.into())),
        ]);
        let entries = m.as_map().unwrap();

        assert_eq!(entries.len(), 4);
        assert_eq!(lookup_label(entries, -1), Some(&Value::Integer(99.into())));
        assert_eq!(
            lookup_label(entries, 2),
            Some(&Value::Bytes(b"kid-1".to_vec()))
        );
    }

    #[test]
    fn wrong_coordinate_length() {
        let m = Value::Map(vec![
            (label(1), Value::Integer(2.into())),
            (label(-1), Value::Integer(2.into())),
            (label(-2), Value::Bytes(P256_X.to_vec())),
            (label(-3), Value::Bytes(P256_Y.to_vec())),
        ]);

        // P-384 needs 48-byte coordinates
        assert!(EcPublicKey::from_key_map(&m).unwrap_err().is_format());
    }

    #[test]
    fn missing_labels() {
        let m = Value::Map(vec![
            (label(1), Value::Integer(2.into())),
            (label(-1), Value::Integer(1.into())),
            (label(-2), Value::Bytes(P256_X.to_vec())),
        ]);

        assert_eq!(
            EcPublicKey::from_key_map(&m),
            Err(Error::MissingField("COSE_Key y".to_string()))
        );

        let m = Value::Map(vec![(label(-1), Value::Integer(1.into()))]);

        assert!(matches!(
            EcPublicKey::from_key_map(&m),
            Err(Error::MissingField(_))
        ));
    }

    #[test]
    fn curve_kind_mismatch() {
        assert!(EcPublicKey::new_okp(Curve::P256, vec![0; 32]).is_err());
        assert!(EcPublicKey::new_double(Curve::Ed25519, vec![0; 32], vec![0; 32]).is_err());

        // kty OKP with a Weierstrass curve
        let m = Value::Map(vec![
            (label(1), Value::Integer(1.into())),
            (label(-1), Value::Integer(1.into())),
            (label(-2), Value::Bytes(P256_X.to_vec())),
        ]);

        assert!(EcPublicKey::from_key_map(&m).unwrap_err().is_format());
    }

    #[test]
    fn unknown_kty_and_curve() {
        let m = Value::Map(vec![
            (label(1), Value::Integer(3.into())),
            (label(-1), Value::Integer(1.into())),
            (label(-2), Value::Bytes(P256_X.to_vec())),
        ]);
        assert!(matches!(
            EcPublicKey::from_key_map(&m),
            Err(Error::Unsupported(_))
        ));

        assert!(Curve::from_cose_id(42).is_err());
        assert_eq!(Curve::from_cose_id(258).unwrap(), Curve::BrainpoolP384r1);
    }
}
