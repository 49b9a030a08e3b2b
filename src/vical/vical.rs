// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::cbor::{self, Value};
use crate::errors::Error;
use crate::store::Certificate;
use bitmask::*;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

const VERSION: &str = "version";
const PROVIDER: &str = "vicalProvider";
const DATE: &str = "date";
const NEXT_UPDATE: &str = "nextUpdate";
const ISSUE_ID: &str = "vicalIssueID";
const CERTIFICATE_INFOS: &str = "certificateInfos";

const CERTIFICATE: &str = "certificate";
const SERIAL_NUMBER: &str = "serialNumber";
const SKI: &str = "ski";
const DOC_TYPE: &str = "docType";
const CERTIFICATE_PROFILE: &str = "certificateProfile";

bitmask! {
    #[derive(Debug)]
    mask VicalFieldsSet: u8 where flags VicalFields {
        Version          = 0x01,
        Provider         = 0x02,
        Date             = 0x04,
        CertificateInfos = 0x08,
    }
}

bitmask! {
    #[derive(Debug)]
    mask InfoFieldsSet: u8 where flags InfoFields {
        Certificate = 0x01,
        DocType     = 0x02,
    }
}

/// One trusted issuer certificate and the document types it may sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// DER encoded certificate
    pub certificate: Vec<u8>,
    pub doc_types: BTreeSet<String>,
    pub certificate_profiles: Option<Vec<String>>,
}

impl CertificateInfo {
    pub fn new<I, S>(certificate: Vec<u8>, doc_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            certificate,
            doc_types: doc_types.into_iter().map(Into::into).collect(),
            certificate_profiles: None,
        }
    }

    // serialNumber and ski are derived from the certificate itself
    fn to_value(&self) -> Result<Value, Error> {
        let c = Certificate::from_der(&self.certificate)?;

        let ski = c.ski().ok_or_else(|| {
            Error::MissingField(format!("subjectKeyIdentifier in {}", c.subject()))
        })?;

        let serial = c.serial_number();
        let first = serial.iter().position(|b| *b != 0).unwrap_or(serial.len());

        let mut m = vec![
            (
                Value::Text(CERTIFICATE.to_string()),
                Value::Bytes(self.certificate.clone()),
            ),
            (
                Value::Text(SERIAL_NUMBER.to_string()),
                cbor::encode_bignum(&serial[first..]),
            ),
            (Value::Text(SKI.to_string()), Value::Bytes(ski.to_vec())),
            (
                Value::Text(DOC_TYPE.to_string()),
                Value::Array(self.doc_types.iter().cloned().map(Value::Text).collect()),
            ),
        ];

        if let Some(profiles) = &self.certificate_profiles {
            m.push((
                Value::Text(CERTIFICATE_PROFILE.to_string()),
                Value::Array(profiles.iter().cloned().map(Value::Text).collect()),
            ));
        }

        Ok(Value::Map(m))
    }

    fn from_value(v: &Value, n: &str) -> Result<Self, Error> {
        let mut seen = InfoFieldsSet::none();

        let mut certificate = vec![];
        let mut doc_types = BTreeSet::new();
        let mut certificate_profiles = None;

        for (k, v) in cbor::to_map(v, n)? {
            let Some(k) = k.as_text() else {
                continue;
            };

            match k {
                CERTIFICATE => {
                    certificate = cbor::to_bstr(v, CERTIFICATE)?;
                    seen.set(InfoFields::Certificate);
                }
                SERIAL_NUMBER => {
                    cbor::to_bignum(v, SERIAL_NUMBER)?;
                }
                SKI => {
                    cbor::to_bstr(v, SKI)?;
                }
                DOC_TYPE => {
                    doc_types = cbor::to_tstr_array(v, DOC_TYPE)?.into_iter().collect();
                    seen.set(InfoFields::DocType);
                }
                CERTIFICATE_PROFILE => {
                    certificate_profiles = Some(cbor::to_tstr_array(v, CERTIFICATE_PROFILE)?)
                }
                _ => {}
            }
        }

        let mandatory = [
            (InfoFields::Certificate, CERTIFICATE),
            (InfoFields::DocType, DOC_TYPE),
        ];

        for (f, name) in mandatory.iter() {
            if !seen.contains(*f) {
                return Err(Error::MissingField(format!("{name} in {n}")));
            }
        }

        Ok(Self {
            certificate,
            doc_types,
            certificate_profiles,
        })
    }
}

/// The list of trusted issuers, as carried in the VICAL payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vical {
    pub version: String,
    pub provider: String,
    pub date: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
    pub issue_id: Option<u64>,
    pub certificate_infos: Vec<CertificateInfo>,
}

impl Vical {
    pub fn new(provider: &str, date: DateTime<Utc>) -> Self {
        Self {
            version: "1.0".to_string(),
            provider: provider.to_string(),
            date,
            next_update: None,
            issue_id: None,
            certificate_infos: vec![],
        }
    }

    pub fn to_value(&self) -> Result<Value, Error> {
        let mut m = vec![
            (
                Value::Text(VERSION.to_string()),
                Value::Text(self.version.clone()),
            ),
            (
                Value::Text(PROVIDER.to_string()),
                Value::Text(self.provider.clone()),
            ),
            (
                Value::Text(DATE.to_string()),
                cbor::encode_tagged_date(&self.date),
            ),
        ];

        if let Some(t) = &self.next_update {
            m.push((
                Value::Text(NEXT_UPDATE.to_string()),
                cbor::encode_tagged_date(t),
            ));
        }

        if let Some(id) = self.issue_id {
            m.push((Value::Text(ISSUE_ID.to_string()), Value::Integer(id.into())));
        }

        let infos = self
            .certificate_infos
            .iter()
            .map(CertificateInfo::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        m.push((
            Value::Text(CERTIFICATE_INFOS.to_string()),
            Value::Array(infos),
        ));

        Ok(Value::Map(m))
    }

    pub fn from_value(v: &Value) -> Result<Self, Error> {
        let mut seen = VicalFieldsSet::none();

        let mut version = String::new();
        let mut provider = String::new();
        let mut date = DateTime::<Utc>::UNIX_EPOCH;
        let mut next_update = None;
        let mut issue_id = None;
        let mut certificate_infos = vec![];

        for (k, v) in cbor::to_map(v, "VICAL")? {
            let Some(k) = k.as_text() else {
                continue;
            };

            match k {
                VERSION => {
                    version = cbor::to_tstr(v, VERSION)?;
                    seen.set(VicalFields::Version);
                }
                PROVIDER => {
                    provider = cbor::to_tstr(v, PROVIDER)?;
                    seen.set(VicalFields::Provider);
                }
                DATE => {
                    date = cbor::to_date(v, DATE)?;
                    seen.set(VicalFields::Date);
                }
                NEXT_UPDATE => next_update = Some(cbor::to_date(v, NEXT_UPDATE)?),
                ISSUE_ID => issue_id = Some(cbor::to_uint(v, ISSUE_ID)?),
                CERTIFICATE_INFOS => {
                    for (i, x) in cbor::to_array(v, CERTIFICATE_INFOS)?.iter().enumerate() {
                        certificate_infos.push(CertificateInfo::from_value(
                            x,
                            &format!("{CERTIFICATE_INFOS}[{i}]"),
                        )?);
                    }
                    seen.set(VicalFields::CertificateInfos);
                }
                _ => {}
            }
        }

        let mandatory = [
            (VicalFields::Version, VERSION),
            (VicalFields::Provider, PROVIDER),
            (VicalFields::Date, DATE),
            (VicalFields::CertificateInfos, CERTIFICATE_INFOS),
        ];

        for (f, name) in mandatory.iter() {
            if !seen.contains(*f) {
                return Err(Error::MissingField(name.to_string()));
            }
        }

        Ok(Self {
            version,
            provider,
            date,
            next_update,
            issue_id,
            certificate_infos,
        })
    }
}
