// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::mso::MobileSecurityObject;
use crate::cbor::Value;
use crate::cose::{self, CoseSign1};
use crate::crypto::Algorithm;
use crate::errors::Error;
use crate::store::Certificate;

/// The issuerAuth COSE_Sign1 of an IssuerSigned structure: a document
/// signer's signature over the tag 24 wrapped MSO.
///
/// Decoding does not authenticate anything.  Call
/// [`IssuerAuth::verify_signature`] and then validate
/// [`IssuerAuth::certificate_chain`] with a [`crate::trust::TrustManager`]
/// before relying on the MSO.
#[derive(Debug, Clone)]
pub struct IssuerAuth {
    envelope: CoseSign1,
    alg: Algorithm,
    chain: Vec<Certificate>,
    mso: MobileSecurityObject,
}

impl IssuerAuth {
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        Self::from_envelope(CoseSign1::decode(buf)?)
    }

    pub fn from_value(v: &Value) -> Result<Self, Error> {
        Self::from_envelope(CoseSign1::from_value(v)?)
    }

    fn from_envelope(envelope: CoseSign1) -> Result<Self, Error> {
        let alg = envelope
            .algorithm()?
            .ok_or_else(|| Error::MissingField("alg".to_string()))?;

        let chain = envelope
            .x5chain()?
            .ok_or_else(|| Error::MissingField("x5chain".to_string()))?
            .iter()
            .map(|der| Certificate::from_der(der))
            .collect::<Result<Vec<_>, _>>()?;

        let payload = envelope
            .payload
            .as_deref()
            .ok_or_else(|| Error::MissingField("MobileSecurityObjectBytes".to_string()))?;

        let mso = MobileSecurityObject::decode(payload)?;

        Ok(Self {
            envelope,
            alg,
            chain,
            mso,
        })
    }

    /// Check the signature with the key of the x5chain leaf, the document
    /// signer certificate
    pub fn verify_signature(&self) -> Result<(), Error> {
        let leaf = self
            .chain
            .first()
            .ok_or_else(|| Error::MissingField("document signer certificate".to_string()))?;

        let key = leaf.ec_public_key()?;

        if !cose::verify_envelope(&key, None, &self.envelope, self.alg)? {
            tracing::warn!("issuerAuth signature from {} does not verify", leaf.subject());
            return Err(Error::Signature(format!(
                "MSO not signed by {}",
                leaf.subject()
            )));
        }

        tracing::debug!(
            "issuerAuth for {} signed by {}",
            self.mso.doc_type,
            leaf.subject()
        );

        Ok(())
    }

    pub fn algorithm(&self) -> Algorithm {
        self.alg
    }

    /// Document signer first
    pub fn certificate_chain(&self) -> &[Certificate] {
        &self.chain
    }

    pub fn mobile_security_object(&self) -> &MobileSecurityObject {
        &self.mso
    }

    pub fn envelope(&self) -> &CoseSign1 {
        &self.envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbor;
    use crate::cose::labels;
    use crate::mso::mso::tests::annex_d_mso;
    use crate::testutil;
    use crate::trust::TrustManager;

    fn issuer_auth(signer: &testutil::Issued, chain: &[Vec<u8>], wrap: bool) -> Vec<u8> {
        let mut payload = cbor::encode(&annex_d_mso()).unwrap();
        if wrap {
            payload = cbor::encode(&cbor::wrap_tag24(payload)).unwrap();
        }

        cose::sign_envelope(
            &signer.key,
            &payload,
            Algorithm::ES256,
            vec![(
                Value::Integer(labels::ALG.into()),
                Value::Integer(Algorithm::ES256.cose_id().into()),
            )],
            vec![(
                Value::Integer(labels::X5CHAIN.into()),
                cose::x5chain_value(chain),
            )],
            true,
        )
        .unwrap()
        .encode(false)
        .unwrap()
    }

    #[test]
    fn decode_verify_and_trust() {
        let (root, int, ds) = testutil::chain();

        let buf = issuer_auth(&ds, &[ds.der(), int.der()], true);
        let ia = IssuerAuth::decode(&buf).unwrap();

        ia.verify_signature().unwrap();
        assert_eq!(ia.algorithm(), Algorithm::ES256);
        assert_eq!(ia.mobile_security_object().doc_type, "org.iso.18013.5.1.mDL");
        assert_eq!(ia.certificate_chain().len(), 2);

        let tm = TrustManager::default();
        tm.add_certificate(root.certificate()).unwrap();

        let r = tm.verify(ia.certificate_chain(), &[]);
        assert!(r.is_trusted, "{:?}", r.error);
        assert_eq!(r.trust_chain.len(), 3);
    }

    #[test]
    fn unwrapped_payload_accepted() {
        let (_, _, ds) = testutil::chain();

        let ia = IssuerAuth::decode(&issuer_auth(&ds, &[ds.der()], false)).unwrap();

        ia.verify_signature().unwrap();
    }

    #[test]
    fn wrong_signer() {
        let (_, int, ds) = testutil::chain();

        // signed by the document signer but presenting the intermediate
        let ia = IssuerAuth::decode(&issuer_auth(&ds, &[int.der()], true)).unwrap();

        assert!(ia.verify_signature().unwrap_err().is_signature());
    }

    #[test]
    fn missing_chain() {
        let (_, _, ds) = testutil::chain();
        let payload = cbor::encode(&annex_d_mso()).unwrap();

        let buf = cose::sign_envelope(
            &ds.key,
            &payload,
            Algorithm::ES256,
            vec![(
                Value::Integer(labels::ALG.into()),
                Value::Integer(Algorithm::ES256.cose_id().into()),
            )],
            vec![],
            true,
        )
        .unwrap()
        .encode(true)
        .unwrap();

        assert_eq!(
            IssuerAuth::decode(&buf).unwrap_err(),
            Error::MissingField("x5chain".to_string())
        );
    }
}
