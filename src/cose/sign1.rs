// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::{labels, TAG_COSE_SIGN1};
use crate::cbor::{self, Value};
use crate::crypto::{self, Algorithm, EcPublicKey};
use crate::errors::Error;
use openssl::pkey::{PKeyRef, Private};

const SIG_STRUCTURE_CONTEXT: &str = "Signature1";

/// A decoded COSE_Sign1 message
#[derive(Debug, Clone, PartialEq)]
pub struct CoseSign1 {
    pub protected: Vec<(Value, Value)>,
    pub unprotected: Vec<(Value, Value)>,
    pub payload: Option<Vec<u8>>,
    pub signature: Vec<u8>,

    raw_protected: Vec<u8>,
}

impl CoseSign1 {
    /// Decode a COSE_Sign1, with or without its #6.18 tag
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let v = cbor::decode(buf)?;

        Self::from_value(&v)
    }

    pub fn from_value(v: &Value) -> Result<Self, Error> {
        let v = match v {
            Value::Tag(TAG_COSE_SIGN1, inner) => inner.as_ref(),
            Value::Tag(t, _) => {
                return Err(Error::Unsupported(format!(
                    "tag {t} in place of COSE_Sign1"
                )))
            }
            other => other,
        };

        let a = cbor::to_array(v, "COSE_Sign1")?;

        if a.len() != 4 {
            return Err(Error::Syntax(format!(
                "COSE_Sign1 has {} elements, expecting 4",
                a.len()
            )));
        }

        let raw_protected = cbor::to_bstr(&a[0], "protected")?;

        let protected = if raw_protected.is_empty() {
            vec![]
        } else {
            let m = cbor::decode(&raw_protected)?;
            cbor::to_map(&m, "protected")?.clone()
        };

        let unprotected = cbor::to_map(&a[1], "unprotected")?.clone();

        let payload = match &a[2] {
            Value::Null => None,
            Value::Bytes(b) => Some(b.clone()),
            _ => return Err(Error::TypeMismatch("payload MUST be bstr or nil".to_string())),
        };

        let signature = cbor::to_bstr(&a[3], "signature")?;

        Ok(Self {
            protected,
            unprotected,
            payload,
            signature,
            raw_protected,
        })
    }

    pub fn to_value(&self, tagged: bool) -> Value {
        let a = Value::Array(vec![
            Value::Bytes(self.raw_protected.clone()),
            Value::Map(self.unprotected.clone()),
            match &self.payload {
                Some(p) => Value::Bytes(p.clone()),
                None => Value::Null,
            },
            Value::Bytes(self.signature.clone()),
        ]);

        if tagged {
            Value::Tag(TAG_COSE_SIGN1, Box::new(a))
        } else {
            a
        }
    }

    pub fn encode(&self, tagged: bool) -> Result<Vec<u8>, Error> {
        cbor::encode(&self.to_value(tagged))
    }

    /// The protected header bytes as they appear on the wire
    pub fn raw_protected(&self) -> &[u8] {
        &self.raw_protected
    }

    fn header(&self, label: i64) -> Option<&Value> {
        cbor::lookup_label(&self.protected, label)
            .or_else(|| cbor::lookup_label(&self.unprotected, label))
    }

    /// The signing algorithm (label 1).  Absent is `Ok(None)`; present but
    /// unknown is an error.
    pub fn algorithm(&self) -> Result<Option<Algorithm>, Error> {
        match self.header(labels::ALG) {
            None => Ok(None),
            Some(v) => Ok(Some(Algorithm::from_cose_id(cbor::to_int(v, "alg")?)?)),
        }
    }

    /// The x5chain (label 33), leaf first.  A single certificate may be
    /// carried as a plain bstr.
    pub fn x5chain(&self) -> Result<Option<Vec<Vec<u8>>>, Error> {
        let v = cbor::lookup_label(&self.unprotected, labels::X5CHAIN)
            .or_else(|| cbor::lookup_label(&self.protected, labels::X5CHAIN));

        match v {
            None => Ok(None),
            Some(Value::Bytes(b)) => Ok(Some(vec![b.clone()])),
            Some(Value::Array(a)) => {
                if a.is_empty() {
                    return Err(Error::Syntax("empty x5chain".to_string()));
                }

                let mut chain = Vec::with_capacity(a.len());
                for (i, c) in a.iter().enumerate() {
                    chain.push(cbor::to_bstr(c, &format!("x5chain[{i}]"))?);
                }

                Ok(Some(chain))
            }
            Some(_) => Err(Error::TypeMismatch(
                "x5chain MUST be bstr or array of bstr".to_string(),
            )),
        }
    }
}

/// Encode an x5chain header value: a bare bstr for a single certificate,
/// an array otherwise
pub fn x5chain_value(chain: &[Vec<u8>]) -> Value {
    match chain {
        [single] => Value::Bytes(single.clone()),
        _ => Value::Array(chain.iter().cloned().map(Value::Bytes).collect()),
    }
}

fn encode_protected(protected: &[(Value, Value)]) -> Result<Vec<u8>, Error> {
    if protected.is_empty() {
        return Ok(vec![]);
    }

    cbor::encode(&Value::Map(protected.to_vec()))
}

fn sig_structure(raw_protected: &[u8], payload: &[u8]) -> Result<Vec<u8>, Error> {
    cbor::encode(&Value::Array(vec![
        Value::Text(SIG_STRUCTURE_CONTEXT.to_string()),
        Value::Bytes(raw_protected.to_vec()),
        Value::Bytes(vec![]),
        Value::Bytes(payload.to_vec()),
    ]))
}

/// Sign `payload` into a COSE_Sign1.  The payload is carried in the envelope
/// only when `embed_payload` is set; otherwise the verifier has to supply it.
pub fn sign_envelope(
    key: &PKeyRef<Private>,
    payload: &[u8],
    alg: Algorithm,
    protected: Vec<(Value, Value)>,
    unprotected: Vec<(Value, Value)>,
    embed_payload: bool,
) -> Result<CoseSign1, Error> {
    let raw_protected = encode_protected(&protected)?;
    let tbs = sig_structure(&raw_protected, payload)?;

    let signature = crypto::sign(key, alg, &tbs)?;

    tracing::debug!(
        "signed COSE_Sign1 with {alg}, {} byte payload (embedded: {embed_payload})",
        payload.len()
    );

    Ok(CoseSign1 {
        protected,
        unprotected,
        payload: embed_payload.then(|| payload.to_vec()),
        signature,
        raw_protected,
    })
}

/// Verify a COSE_Sign1 against `key`.  Exactly one of the embedded payload
/// and `detached_payload` must be present.  A signature mismatch yields
/// `Ok(false)`.
pub fn verify_envelope(
    key: &EcPublicKey,
    detached_payload: Option<&[u8]>,
    envelope: &CoseSign1,
    alg: Algorithm,
) -> Result<bool, Error> {
    let payload = match (&envelope.payload, detached_payload) {
        (Some(p), None) => p.as_slice(),
        (None, Some(p)) => p,
        (Some(_), Some(_)) => {
            return Err(Error::Syntax(
                "both embedded and detached payload supplied".to_string(),
            ))
        }
        (None, None) => return Err(Error::MissingField("payload".to_string())),
    };

    let tbs = sig_structure(&envelope.raw_protected, payload)?;
    let pkey = key.to_pkey()?;

    let ok = crypto::verify(&pkey, alg, &tbs, &envelope.signature)?;

    tracing::debug!("COSE_Sign1 {alg} signature match: {ok}");

    Ok(ok)
}
