// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::common::*;
use super::errors::Error;
use ciborium::Value;
use openssl::bn::BigNum;
use openssl::ecdsa::EcdsaSig;
use openssl::hash::{hash, MessageDigest};
use openssl::pkey::{Id, PKeyRef, Public};

const COSE_SIGN1_TAG: u64 = 18;
const SIGNATURE1_CONTEXT: &str = "Signature1";

/// A decoded COSE_Sign1 envelope (RFC 9052, §4.2).  Nitro attestation
/// documents never carry unprotected header parameters, so the unprotected
/// map is checked to be empty and not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoseSign1 {
    /// Serialized protected header map
    pub protected: Vec<u8>,
    /// Serialized attestation claims
    pub payload: Vec<u8>,
    /// Raw ECDSA signature, R || S
    pub signature: Vec<u8>,
}

impl CoseSign1 {
    /// Decode a CBOR-encoded COSE_Sign1 message, optionally wrapped in tag 18.
    pub fn decode(buf: &[u8]) -> Result<CoseSign1, Error> {
        let v = decode_value(buf, "COSE_Sign1")?;

        let v = match v {
            Value::Tag(t, inner) => {
                if t != COSE_SIGN1_TAG {
                    return Err(Error::Decode(format!(
                        "expecting tag {COSE_SIGN1_TAG}, got {t}"
                    )));
                }
                *inner
            }
            other => other,
        };

        let items = match v {
            Value::Array(items) => items,
            _ => return Err(Error::Decode("COSE_Sign1 MUST be array".to_string())),
        };

        let [protected, unprotected, payload, signature]: [Value; 4] =
            items.try_into().map_err(|items: Vec<Value>| {
                Error::Decode(format!(
                    "COSE_Sign1: expecting 4 elements, got {}",
                    items.len()
                ))
            })?;

        match unprotected {
            Value::Map(m) if m.is_empty() => {}
            Value::Map(_) => {
                return Err(Error::Decode(
                    "unprotected header MUST be empty".to_string(),
                ))
            }
            _ => return Err(Error::Decode("unprotected header MUST be map".to_string())),
        }

        let sign1 = CoseSign1 {
            protected: to_bstr(&protected, "protected header")?,
            payload: to_bstr(&payload, "payload")?,
            signature: to_bstr(&signature, "signature")?,
        };

        tracing::debug!(
            protected_len = sign1.protected.len(),
            payload_len = sign1.payload.len(),
            signature_len = sign1.signature.len(),
            "decoded COSE_Sign1 envelope"
        );

        Ok(sign1)
    }

    /// The exact bytes covered by the signature: the CBOR encoding of
    /// `["Signature1", protected, h'', payload]`.
    pub fn sig_structure(&self) -> Result<Vec<u8>, Error> {
        let s = Value::Array(vec![
            Value::Text(SIGNATURE1_CONTEXT.to_string()),
            Value::Bytes(self.protected.clone()),
            Value::Bytes(Vec::new()),
            Value::Bytes(self.payload.clone()),
        ]);

        encode_value(&s, "Sig_structure").map_err(|e| Error::Signature(e.to_string()))
    }

    /// Verify the ES384 signature over the Sig_structure with `key`, which
    /// must be an EC public key.
    pub fn verify(&self, key: &PKeyRef<Public>) -> Result<(), Error> {
        if key.id() != Id::EC {
            return Err(Error::KeyType(format!("{:?}", key.id())));
        }

        let ec_key = key
            .ec_key()
            .map_err(|e| Error::KeyType(format!("extracting EC key: {e}")))?;

        let size = self.signature.len();

        if size == 0 || size % 2 != 0 {
            return Err(Error::Signature(format!(
                "expecting an even, non-zero signature length, got {size}"
            )));
        }

        let (r, s) = self.signature.split_at(size / 2);

        let r = BigNum::from_slice(r).map_err(|e| Error::Signature(format!("R: {e}")))?;
        let s = BigNum::from_slice(s).map_err(|e| Error::Signature(format!("S: {e}")))?;

        let sig = EcdsaSig::from_private_components(r, s)
            .map_err(|e| Error::Signature(format!("composing ECDSA signature: {e}")))?;

        let tbs = self.sig_structure()?;

        let digest = hash(MessageDigest::sha384(), &tbs)
            .map_err(|e| Error::Signature(format!("SHA-384: {e}")))?;

        let ok = sig
            .verify(&digest, &ec_key)
            .map_err(|e| Error::Signature(format!("ECDSA verification: {e}")))?;

        if !ok {
            return Err(Error::Signature("invalid signature".to_string()));
        }

        tracing::debug!("COSE_Sign1 signature verified");

        Ok(())
    }
}
