// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::digest::DigestAlgorithm;
use crate::cbor::{self, Value};
use crate::crypto::EcPublicKey;
use crate::errors::Error;
use bitmask::*;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

const VERSION: &str = "version";
const DIGEST_ALGORITHM: &str = "digestAlgorithm";
const VALUE_DIGESTS: &str = "valueDigests";
const DEVICE_KEY_INFO: &str = "deviceKeyInfo";
const DOC_TYPE: &str = "docType";
const VALIDITY_INFO: &str = "validityInfo";

const DEVICE_KEY: &str = "deviceKey";
const KEY_AUTHORIZATIONS: &str = "keyAuthorizations";
const KEY_INFO: &str = "keyInfo";
const NAME_SPACES: &str = "nameSpaces";
const DATA_ELEMENTS: &str = "dataElements";

const SIGNED: &str = "signed";
const VALID_FROM: &str = "validFrom";
const VALID_UNTIL: &str = "validUntil";
const EXPECTED_UPDATE: &str = "expectedUpdate";

bitmask! {
    #[derive(Debug)]
    mask MsoFieldsSet: u8 where flags MsoFields {
        Version         = 0x01,
        DigestAlgorithm = 0x02,
        ValueDigests    = 0x04,
        DeviceKeyInfo   = 0x08,
        DocType         = 0x10,
        ValidityInfo    = 0x20,
    }
}

bitmask! {
    #[derive(Debug)]
    mask ValidityFieldsSet: u8 where flags ValidityFields {
        Signed     = 0x01,
        ValidFrom  = 0x02,
        ValidUntil = 0x04,
    }
}

/// Namespaces and data elements the device key may sign for
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyAuthorizations {
    pub name_spaces: Option<Vec<String>>,
    pub data_elements: Option<BTreeMap<String, Vec<String>>>,
}

impl KeyAuthorizations {
    fn from_value(v: &Value) -> Result<Self, Error> {
        let mut ka = KeyAuthorizations::default();

        for (k, v) in cbor::to_map(v, KEY_AUTHORIZATIONS)? {
            match k.as_text() {
                Some(NAME_SPACES) => ka.name_spaces = Some(cbor::to_tstr_array(v, NAME_SPACES)?),
                Some(DATA_ELEMENTS) => {
                    let mut m = BTreeMap::new();
                    for (ns, elems) in cbor::to_map(v, DATA_ELEMENTS)? {
                        let ns = cbor::to_tstr(ns, "dataElements namespace")?;
                        let elems = cbor::to_tstr_array(elems, &ns)?;
                        m.insert(ns, elems);
                    }
                    ka.data_elements = Some(m);
                }
                _ => {}
            }
        }

        Ok(ka)
    }
}

/// Digests of a namespace's data elements, by digest ID
pub type DigestIds = BTreeMap<u64, Vec<u8>>;

/// The issuer-signed digest manifest of an mdoc
#[derive(Debug, Clone, PartialEq)]
pub struct MobileSecurityObject {
    pub version: String,
    pub digest_algorithm: DigestAlgorithm,
    pub doc_type: String,
    pub value_digests: BTreeMap<String, DigestIds>,
    pub device_key: EcPublicKey,
    pub key_authorizations: Option<KeyAuthorizations>,
    /// Kept as received
    pub key_info: Option<Vec<(Value, Value)>>,
    pub signed: DateTime<Utc>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub expected_update: Option<DateTime<Utc>>,
}

struct DeviceKeyInfo {
    device_key: EcPublicKey,
    key_authorizations: Option<KeyAuthorizations>,
    key_info: Option<Vec<(Value, Value)>>,
}

struct ValidityInfo {
    signed: DateTime<Utc>,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    expected_update: Option<DateTime<Utc>>,
}

fn parse_value_digests(v: &Value) -> Result<BTreeMap<String, DigestIds>, Error> {
    let mut out = BTreeMap::new();

    for (ns, ids) in cbor::to_map(v, VALUE_DIGESTS)? {
        let ns = cbor::to_tstr(ns, "valueDigests namespace")?;

        let mut digests = DigestIds::new();
        for (id, d) in cbor::to_map(ids, &ns)? {
            let id = cbor::to_uint(id, &format!("digestID in {ns}"))?;
            let d = cbor::to_bstr(d, &format!("digest {id} in {ns}"))?;
            digests.insert(id, d);
        }

        out.insert(ns, digests);
    }

    Ok(out)
}

fn parse_device_key_info(v: &Value) -> Result<DeviceKeyInfo, Error> {
    let mut device_key = None;
    let mut key_authorizations = None;
    let mut key_info = None;

    for (k, v) in cbor::to_map(v, DEVICE_KEY_INFO)? {
        match k.as_text() {
            Some(DEVICE_KEY) => device_key = Some(EcPublicKey::from_key_map(v)?),
            Some(KEY_AUTHORIZATIONS) => {
                key_authorizations = Some(KeyAuthorizations::from_value(v)?)
            }
            Some(KEY_INFO) => key_info = Some(cbor::to_map(v, KEY_INFO)?.clone()),
            _ => {}
        }
    }

    let device_key = device_key.ok_or_else(|| Error::MissingField(DEVICE_KEY.to_string()))?;

    Ok(DeviceKeyInfo {
        device_key,
        key_authorizations,
        key_info,
    })
}

fn parse_validity_info(v: &Value) -> Result<ValidityInfo, Error> {
    let mut seen = ValidityFieldsSet::none();
    let mut vi = ValidityInfo {
        signed: DateTime::<Utc>::UNIX_EPOCH,
        valid_from: DateTime::<Utc>::UNIX_EPOCH,
        valid_until: DateTime::<Utc>::UNIX_EPOCH,
        expected_update: None,
    };

    for (k, v) in cbor::to_map(v, VALIDITY_INFO)? {
        match k.as_text() {
            Some(SIGNED) => {
                vi.signed = cbor::to_date(v, SIGNED)?;
                seen.set(ValidityFields::Signed);
            }
            Some(VALID_FROM) => {
                vi.valid_from = cbor::to_date(v, VALID_FROM)?;
                seen.set(ValidityFields::ValidFrom);
            }
            Some(VALID_UNTIL) => {
                vi.valid_until = cbor::to_date(v, VALID_UNTIL)?;
                seen.set(ValidityFields::ValidUntil);
            }
            Some(EXPECTED_UPDATE) => vi.expected_update = Some(cbor::to_date(v, EXPECTED_UPDATE)?),
            _ => {}
        }
    }

    let mandatory = [
        (ValidityFields::Signed, SIGNED),
        (ValidityFields::ValidFrom, VALID_FROM),
        (ValidityFields::ValidUntil, VALID_UNTIL),
    ];

    for (f, n) in mandatory.iter() {
        if !seen.contains(*f) {
            return Err(Error::MissingField(n.to_string()));
        }
    }

    Ok(vi)
}

impl MobileSecurityObject {
    /// Decode an MSO given either its encoded map or the
    /// `#6.24(bstr .cbor MobileSecurityObject)` wrapping found in issuerAuth
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let v = cbor::decode(buf)?;

        match v {
            Value::Tag(cbor::TAG_ENCODED_CBOR, _) => {
                let inner = cbor::unwrap_tag24(&v, "MobileSecurityObjectBytes")?;
                Self::from_value(&cbor::decode(&inner)?)
            }
            _ => Self::from_value(&v),
        }
    }

    pub fn from_value(v: &Value) -> Result<Self, Error> {
        let mut seen = MsoFieldsSet::none();

        let mut version = String::new();
        let mut digest_name = String::new();
        let mut doc_type = String::new();
        let mut value_digests = BTreeMap::new();
        let mut device_key_info = None;
        let mut validity_info = None;

        for (k, v) in cbor::to_map(v, "MobileSecurityObject")? {
            match k.as_text() {
                Some(VERSION) => {
                    version = cbor::to_tstr(v, VERSION)?;
                    seen.set(MsoFields::Version);
                }
                Some(DIGEST_ALGORITHM) => {
                    digest_name = cbor::to_tstr(v, DIGEST_ALGORITHM)?;
                    seen.set(MsoFields::DigestAlgorithm);
                }
                Some(VALUE_DIGESTS) => {
                    value_digests = parse_value_digests(v)?;
                    seen.set(MsoFields::ValueDigests);
                }
                Some(DEVICE_KEY_INFO) => {
                    device_key_info = Some(parse_device_key_info(v)?);
                    seen.set(MsoFields::DeviceKeyInfo);
                }
                Some(DOC_TYPE) => {
                    doc_type = cbor::to_tstr(v, DOC_TYPE)?;
                    seen.set(MsoFields::DocType);
                }
                Some(VALIDITY_INFO) => {
                    validity_info = Some(parse_validity_info(v)?);
                    seen.set(MsoFields::ValidityInfo);
                }
                _ => {}
            }
        }

        let mandatory = [
            (MsoFields::Version, VERSION),
            (MsoFields::DigestAlgorithm, DIGEST_ALGORITHM),
            (MsoFields::ValueDigests, VALUE_DIGESTS),
            (MsoFields::DeviceKeyInfo, DEVICE_KEY_INFO),
            (MsoFields::DocType, DOC_TYPE),
            (MsoFields::ValidityInfo, VALIDITY_INFO),
        ];

        for (f, n) in mandatory.iter() {
            if !seen.contains(*f) {
                return Err(Error::MissingField(n.to_string()));
            }
        }

        let (Some(dki), Some(vi)) = (device_key_info, validity_info) else {
            return Err(Error::MissingField(DEVICE_KEY_INFO.to_string()));
        };

        let digest_algorithm = DigestAlgorithm::from_name(&digest_name)?;

        for (ns, ids) in value_digests.iter() {
            for (id, d) in ids.iter() {
                if d.len() != digest_algorithm.output_size() {
                    return Err(Error::Syntax(format!(
                        "digest {id} in {ns} is {} bytes, {} needs {}",
                        d.len(),
                        digest_algorithm.name(),
                        digest_algorithm.output_size()
                    )));
                }
            }
        }

        Ok(Self {
            version,
            digest_algorithm,
            doc_type,
            value_digests,
            device_key: dki.device_key,
            key_authorizations: dki.key_authorizations,
            key_info: dki.key_info,
            signed: vi.signed,
            valid_from: vi.valid_from,
            valid_until: vi.valid_until,
            expected_update: vi.expected_update,
        })
    }

    /// The digests of `namespace`.  `None` means the namespace is not in the
    /// MSO at all, which is not the same as an empty set of digests.
    pub fn get_digest_ids(&self, namespace: &str) -> Option<&DigestIds> {
        self.value_digests.get(namespace)
    }

    /// Recompute the digest of an encoded IssuerSignedItemBytes and compare
    /// it with the one stored under `digest_id`.  Unknown namespaces and ids
    /// compare false.
    pub fn check_digest(
        &self,
        namespace: &str,
        digest_id: u64,
        issuer_signed_item_bytes: &[u8],
    ) -> Result<bool, Error> {
        let Some(want) = self
            .get_digest_ids(namespace)
            .and_then(|ids| ids.get(&digest_id))
        else {
            return Ok(false);
        };

        let got = self.digest_algorithm.digest(issuer_signed_item_bytes)?;

        Ok(got == *want)
    }
}
