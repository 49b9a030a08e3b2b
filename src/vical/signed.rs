// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::vical::Vical;
use crate::cbor::{self, Value};
use crate::cose::{self, labels, CoseSign1};
use crate::crypto::Algorithm;
use crate::errors::Error;
use crate::store::Certificate;
use openssl::pkey::{PKeyRef, Private};

/// A VICAL together with the certificate chain of its provider, leaf first
#[derive(Debug, Clone, PartialEq)]
pub struct SignedVical {
    pub vical: Vical,
    pub provider_chain: Vec<Certificate>,
}

impl SignedVical {
    pub fn new(vical: Vical, provider_chain: Vec<Certificate>) -> Self {
        Self {
            vical,
            provider_chain,
        }
    }

    /// The certificate whose key signs the VICAL
    pub fn provider_leaf(&self) -> Option<&Certificate> {
        self.provider_chain.first()
    }

    /// Serialise and sign.  `key` is expected to match the public key of
    /// the provider chain's leaf.
    pub fn generate(&self, key: &PKeyRef<Private>, alg: Algorithm) -> Result<Vec<u8>, Error> {
        if self.provider_chain.is_empty() {
            return Err(Error::MissingField(
                "provider certificate chain".to_string(),
            ));
        }

        let payload = cbor::encode(&self.vical.to_value()?)?;

        let protected = vec![(
            Value::Integer(labels::ALG.into()),
            Value::Integer(alg.cose_id().into()),
        )];

        let ders: Vec<Vec<u8>> = self
            .provider_chain
            .iter()
            .map(|c| c.der().to_vec())
            .collect();

        let unprotected = vec![(
            Value::Integer(labels::X5CHAIN.into()),
            cose::x5chain_value(&ders),
        )];

        let env = cose::sign_envelope(key, &payload, alg, protected, unprotected, true)?;

        tracing::debug!(
            "generated VICAL from {} with {} entries",
            self.vical.provider,
            self.vical.certificate_infos.len()
        );

        env.encode(false)
    }

    /// Decode a signed VICAL and authenticate it against the leaf of its
    /// x5chain.  The payload is only decoded once the signature checks out.
    /// The chain itself is not validated here.
    pub fn parse(buf: &[u8]) -> Result<Self, Error> {
        let env = CoseSign1::decode(buf)?;

        if env.payload.is_none() {
            return Err(Error::MissingField("VICAL payload".to_string()));
        }

        let chain = env
            .x5chain()?
            .ok_or_else(|| Error::MissingField("x5chain".to_string()))?;

        let alg = env
            .algorithm()?
            .ok_or_else(|| Error::MissingField("alg".to_string()))?;

        let provider_chain = chain
            .iter()
            .map(|der| Certificate::from_der(der))
            .collect::<Result<Vec<_>, _>>()?;

        // x5chain() never returns an empty chain
        let leaf = &provider_chain[0];
        let key = leaf.ec_public_key()?;

        if !cose::verify_envelope(&key, None, &env, alg)? {
            tracing::warn!("VICAL signature from {} does not verify", leaf.subject());
            return Err(Error::Signature(format!(
                "VICAL not signed by {}",
                leaf.subject()
            )));
        }

        let payload = env.payload.as_deref().unwrap_or_default();
        let vical = Vical::from_value(&cbor::decode(payload)?)?;

        tracing::debug!(
            "parsed VICAL from {} with {} entries",
            vical.provider,
            vical.certificate_infos.len()
        );

        Ok(Self {
            vical,
            provider_chain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, Role};
    use crate::trust::TrustManager;
    use crate::vical::CertificateInfo;
    use chrono::{TimeZone, Utc};

    fn sample() -> (SignedVical, testutil::Issued, testutil::Issued) {
        let (root, int, signer) = testutil::chain();

        let date = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut v = Vical::new("Test VICAL Provider", date);
        v.issue_id = Some(42);
        v.next_update = Some(Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap());

        for cn in ["IACA Utopia", "IACA Arcadia"] {
            let iaca = testutil::issue(cn, Role::Root, None);
            v.certificate_infos
                .push(CertificateInfo::new(iaca.der(), ["org.iso.18013.5.1.mDL"]));
        }

        let sv = SignedVical::new(v, vec![signer.certificate(), int.certificate()]);

        (sv, root, signer)
    }

    #[test]
    fn generate_parse_round_trip() {
        let (sv, root, signer) = sample();

        let buf = sv.generate(&signer.key, Algorithm::ES256).unwrap();
        let got = SignedVical::parse(&buf).unwrap();

        assert_eq!(got.vical, sv.vical);
        assert_eq!(got.provider_chain, sv.provider_chain);
        assert_eq!(got.provider_leaf(), sv.provider_leaf());

        // the provider chain is left to the trust manager
        let tm = TrustManager::default();
        tm.add_certificate(root.certificate()).unwrap();
        assert!(tm.verify(&got.provider_chain, &[]).is_trusted);
    }

    #[test]
    fn flipped_signature_byte() {
        let (sv, _, signer) = sample();

        let buf = sv.generate(&signer.key, Algorithm::ES256).unwrap();
        let mut env = CoseSign1::decode(&buf).unwrap();
        env.signature[0] ^= 0x01;

        let err = SignedVical::parse(&env.encode(false).unwrap()).unwrap_err();

        assert!(err.is_signature(), "{err:?}");
    }

    #[test]
    fn signed_by_someone_else() {
        let (sv, _, _) = sample();
        let other = testutil::ec_key(crate::crypto::Curve::P256);

        let buf = sv.generate(&other, Algorithm::ES256).unwrap();

        assert!(SignedVical::parse(&buf).unwrap_err().is_signature());
    }

    fn envelope(
        signer: &testutil::Issued,
        with_alg: bool,
        with_chain: bool,
        embed: bool,
    ) -> Vec<u8> {
        let protected = if with_alg {
            vec![(
                Value::Integer(labels::ALG.into()),
                Value::Integer(Algorithm::ES256.cose_id().into()),
            )]
        } else {
            vec![]
        };

        let unprotected = if with_chain {
            vec![(Value::Integer(labels::X5CHAIN.into()), Value::Bytes(signer.der()))]
        } else {
            vec![]
        };

        let payload = cbor::encode(&Value::Map(vec![])).unwrap();

        cose::sign_envelope(&signer.key, &payload, Algorithm::ES256, protected, unprotected, embed)
            .unwrap()
            .encode(false)
            .unwrap()
    }

    #[test]
    fn missing_pieces_are_distinct() {
        let (_, _, signer) = testutil::chain();

        assert_eq!(
            SignedVical::parse(&envelope(&signer, true, true, false)),
            Err(Error::MissingField("VICAL payload".to_string()))
        );
        assert_eq!(
            SignedVical::parse(&envelope(&signer, true, false, true)),
            Err(Error::MissingField("x5chain".to_string()))
        );
        assert_eq!(
            SignedVical::parse(&envelope(&signer, false, true, true)),
            Err(Error::MissingField("alg".to_string()))
        );
    }

    #[test]
    fn payload_checked_after_signature() {
        let (_, _, signer) = testutil::chain();

        // an authentic envelope over an empty map lacks every VICAL field
        let err = SignedVical::parse(&envelope(&signer, true, true, true)).unwrap_err();

        assert_eq!(err, Error::MissingField("version".to_string()));
    }

    #[test]
    fn empty_chain_cannot_be_generated() {
        let (sv, _, signer) = sample();
        let sv = SignedVical::new(sv.vical, vec![]);

        assert!(sv.generate(&signer.key, Algorithm::ES256).is_err());
    }
}
