// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::certificate::Certificate;
use super::common::*;
use super::errors::Error;
use crate::policy::{self, ValidateOptions};
use bitmask::*;
use chrono::{DateTime, TimeZone, Utc};
use ciborium::Value;
use openssl::pkey::{Id, PKey, Public};
use std::collections::BTreeMap;

const MODULE_ID_LABEL: &str = "module_id";
const TIMESTAMP_LABEL: &str = "timestamp";
const DIGEST_LABEL: &str = "digest";
const PCRS_LABEL: &str = "pcrs";
const CERTIFICATE_LABEL: &str = "certificate";
const CABUNDLE_LABEL: &str = "cabundle";
const PUBLIC_KEY_LABEL: &str = "public_key";
const USER_DATA_LABEL: &str = "user_data";
const NONCE_LABEL: &str = "nonce";

bitmask! {
    #[derive(Debug)]
    mask ClaimsSet: u16 where flags Claims {
        ModuleID    = 0x01,
        Timestamp   = 0x02,
        Digest      = 0x04,
        Pcrs        = 0x08,
        Certificate = 0x10,
        CABundle    = 0x20,
        PublicKey   = 0x40,
        UserData    = 0x80,
        Nonce       = 0x100,
    }
}

/// The claims-set as it appears on the wire, before any DER is parsed.
struct RawClaims {
    module_id: String,
    timestamp: u64,
    digest: String,
    pcrs: BTreeMap<u32, Vec<u8>>,
    certificate: Vec<u8>,
    // each entry is a complete CBOR item, unwrapped by decode_cabundle_entry
    cabundle: Vec<Vec<u8>>,
    public_key: Vec<u8>,
    user_data: Option<Vec<u8>>,
    nonce: Option<Vec<u8>>,

    claims_set: ClaimsSet,
}

impl RawClaims {
    fn new() -> Self {
        Self {
            module_id: String::new(),
            timestamp: 0,
            digest: String::new(),
            pcrs: BTreeMap::new(),
            certificate: Vec::new(),
            cabundle: Vec::new(),
            public_key: Vec::new(),
            user_data: None,
            nonce: None,
            claims_set: ClaimsSet::none(),
        }
    }

    fn decode(buf: &[u8]) -> Result<RawClaims, Error> {
        let v = decode_value(buf, "attestation document")?;

        let mut rc = RawClaims::new();

        if let Value::Map(contents) = v {
            rc.parse(contents)?;
        } else {
            return Err(Error::Decode("expecting map type".to_string()));
        }

        rc.validate()?;

        Ok(rc)
    }

    fn parse(&mut self, contents: Vec<(Value, Value)>) -> Result<(), Error> {
        for (k, v) in contents.iter() {
            if let Value::Text(t) = k {
                match t.as_str() {
                    MODULE_ID_LABEL => self.set_module_id(v)?,
                    TIMESTAMP_LABEL => self.set_timestamp(v)?,
                    DIGEST_LABEL => self.set_digest(v)?,
                    PCRS_LABEL => self.set_pcrs(v)?,
                    CERTIFICATE_LABEL => self.set_certificate(v)?,
                    CABUNDLE_LABEL => self.set_cabundle(v)?,
                    PUBLIC_KEY_LABEL => self.set_public_key(v)?,
                    USER_DATA_LABEL => self.set_user_data(v)?,
                    NONCE_LABEL => self.set_nonce(v)?,
                    unknown => {
                        tracing::debug!(claim = unknown, "ignoring unknown claim");
                        continue;
                    }
                }
            } else {
                // Nitro does not define any non-text key
                continue;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), Error> {
        // user_data and nonce are optional
        let mandatory_claims = [
            (Claims::ModuleID, MODULE_ID_LABEL),
            (Claims::Timestamp, TIMESTAMP_LABEL),
            (Claims::Digest, DIGEST_LABEL),
            (Claims::Pcrs, PCRS_LABEL),
            (Claims::Certificate, CERTIFICATE_LABEL),
            (Claims::CABundle, CABUNDLE_LABEL),
            (Claims::PublicKey, PUBLIC_KEY_LABEL),
        ];

        for (c, n) in mandatory_claims.iter() {
            if !self.claims_set.contains(*c) {
                return Err(Error::Decode(format!("missing claim: {n}")));
            }
        }

        Ok(())
    }

    fn mark(&mut self, c: Claims, n: &str) -> Result<(), Error> {
        if self.claims_set.contains(c) {
            return Err(Error::Decode(format!("duplicated claim: {n}")));
        }

        self.claims_set.set(c);

        Ok(())
    }

    fn set_module_id(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Claims::ModuleID, MODULE_ID_LABEL)?;

        self.module_id = to_tstr(v, MODULE_ID_LABEL)?;

        Ok(())
    }

    fn set_timestamp(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Claims::Timestamp, TIMESTAMP_LABEL)?;

        self.timestamp = to_uint(v, TIMESTAMP_LABEL)?;

        Ok(())
    }

    fn set_digest(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Claims::Digest, DIGEST_LABEL)?;

        // informational: the NSM always reports SHA384
        self.digest = to_tstr(v, DIGEST_LABEL)?;

        Ok(())
    }

    fn set_pcrs(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Claims::Pcrs, PCRS_LABEL)?;

        let entries = match v {
            Value::Map(m) => m,
            _ => return Err(Error::Decode("pcrs MUST be map".to_string())),
        };

        for (k, pcr) in entries.iter() {
            let index = match k {
                Value::Integer(i) => u32::try_from(*i).map_err(|_| {
                    Error::Decode("pcrs: index MUST be a non-negative integer".to_string())
                })?,
                _ => return Err(Error::Decode("pcrs: index MUST be integer".to_string())),
            };

            let value = to_bstr(pcr, &format!("PCR{index}"))?;

            if self.pcrs.insert(index, value).is_some() {
                return Err(Error::Decode(format!("pcrs: duplicated index {index}")));
            }
        }

        Ok(())
    }

    fn set_certificate(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Claims::Certificate, CERTIFICATE_LABEL)?;

        self.certificate = to_bstr(v, CERTIFICATE_LABEL)?;

        Ok(())
    }

    // first stage of the cabundle decode: keep each entry as an opaque,
    // re-encoded CBOR item
    fn set_cabundle(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Claims::CABundle, CABUNDLE_LABEL)?;

        let entries = match v.as_array() {
            Some(a) => a,
            None => return Err(Error::Decode("cabundle MUST be array".to_string())),
        };

        if entries.is_empty() {
            return Err(Error::Decode(
                "cabundle: expecting at least one certificate".to_string(),
            ));
        }

        for (i, e) in entries.iter().enumerate() {
            self.cabundle.push(encode_value(e, &format!("cabundle[{i}]"))?);
        }

        Ok(())
    }

    fn set_public_key(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Claims::PublicKey, PUBLIC_KEY_LABEL)?;

        self.public_key = to_bstr(v, PUBLIC_KEY_LABEL)?;

        Ok(())
    }

    fn set_user_data(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Claims::UserData, USER_DATA_LABEL)?;

        self.user_data = to_opt_bstr(v, USER_DATA_LABEL)?;

        Ok(())
    }

    fn set_nonce(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Claims::Nonce, NONCE_LABEL)?;

        self.nonce = to_opt_bstr(v, NONCE_LABEL)?;

        Ok(())
    }
}

/// Second stage of the cabundle decode: an entry is a CBOR byte string whose
/// content is the DER certificate.
fn decode_cabundle_entry(raw: &[u8], i: usize) -> Result<Vec<u8>, Error> {
    let n = format!("cabundle[{i}]");
    let v = decode_value(raw, &n)?;

    to_bstr(&v, &n)
}

fn in_claim(n: &str) -> impl Fn(Error) -> Error + '_ {
    move |e| match e {
        Error::Certificate(m) => Error::Certificate(format!("{n}: {m}")),
        other => other,
    }
}

fn to_datetime(ms: u64) -> Result<DateTime<Utc>, Error> {
    let ms = i64::try_from(ms)
        .map_err(|_| Error::Decode(format!("timestamp {ms} out of range")))?;

    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| Error::Decode(format!("timestamp {ms} out of range")))
}

/// Decoded Nitro attestation document.  For syntax and semantics of the
/// claims, see "Attestation document specification" in the AWS Nitro
/// Enclaves NSM API.
#[derive(Debug, Clone)]
pub struct Attestation {
    pub module_id: String,
    /// Issuing time, millisecond precision
    pub timestamp: DateTime<Utc>,
    pub digest: String,
    /// Lowercase hex PCR values, by index
    pub pcrs: BTreeMap<u32, String>,
    /// Leaf certificate, signs the envelope
    pub certificate: Certificate,
    /// Issuing chain, root first
    pub cabundle: Vec<Certificate>,
    /// Auxiliary RSA key supplied by the enclave application.  This is never
    /// used to verify the document.
    pub public_key: PKey<Public>,
    pub user_data: Option<Vec<u8>>,
    pub nonce: Option<Vec<u8>>,
}

impl Attestation {
    /// Decode a CBOR-encoded attestation document (the COSE_Sign1 payload).
    pub fn decode(buf: &[u8]) -> Result<Attestation, Error> {
        let rc = RawClaims::decode(buf)?;

        let certificate =
            Certificate::from_der(&rc.certificate).map_err(in_claim(CERTIFICATE_LABEL))?;

        let mut cabundle = Vec::with_capacity(rc.cabundle.len());

        for (i, raw) in rc.cabundle.iter().enumerate() {
            let der = decode_cabundle_entry(raw, i)?;

            let c = Certificate::from_der(&der).map_err(in_claim(&format!("cabundle[{i}]")))?;

            cabundle.push(c);
        }

        let public_key = PKey::public_key_from_der(&rc.public_key)
            .map_err(|e| Error::Certificate(format!("public_key: {e}")))?;

        if public_key.id() != Id::RSA {
            return Err(Error::Certificate(format!(
                "invalid public key type: {:?}",
                public_key.id()
            )));
        }

        let pcrs = rc
            .pcrs
            .iter()
            .map(|(k, v)| (*k, hex::encode(v)))
            .collect();

        let a = Attestation {
            module_id: rc.module_id,
            timestamp: to_datetime(rc.timestamp)?,
            digest: rc.digest,
            pcrs,
            certificate,
            cabundle,
            public_key,
            user_data: rc.user_data,
            nonce: rc.nonce,
        };

        tracing::debug!(
            module_id = %a.module_id,
            timestamp = %a.timestamp,
            pcrs = a.pcrs.len(),
            cabundle = a.cabundle.len(),
            "decoded attestation document"
        );

        Ok(a)
    }

    /// The trust anchor, i.e., the first element of the cabundle, whether or
    /// not it is self-signed
    pub fn root_cert(&self) -> &Certificate {
        // decode guarantees a non-empty cabundle
        &self.cabundle[0]
    }

    /// Lowercase hex SHA-256 of the trust anchor's DER encoding
    pub fn root_cert_fingerprint(&self) -> &str {
        self.root_cert().fingerprint()
    }

    /// Intermediates, from the one issued by the root down to the issuer of the
    /// leaf
    pub fn intermediates(&self) -> &[Certificate] {
        &self.cabundle[1..]
    }

    pub fn pcr(&self, index: u32) -> Option<&str> {
        self.pcrs.get(&index).map(String::as_str)
    }

    /// Check the certificate chain against the pinned root, then PCRs and
    /// nonce against the expected values.  Checks run in that order and stop
    /// at the first failure.
    pub fn validate(&self, opts: &ValidateOptions) -> Result<(), Error> {
        policy::verify_chain(self, opts)?;
        policy::check_pcrs(self, &opts.expected_pcrs)?;

        if let Some(n) = &opts.expected_nonce {
            policy::check_nonce(self, n)?;
        }

        Ok(())
    }
}
