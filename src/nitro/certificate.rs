// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use openssl::hash::{hash, MessageDigest};
use openssl::x509::{X509NameRef, X509};

/// An X.509 certificate together with the exact DER bytes it was decoded
/// from.  Fingerprints are always computed over the received bytes, never
/// over a re-encoding.
#[derive(Clone)]
pub struct Certificate {
    raw: Vec<u8>,
    x509: X509,
    fingerprint: String,
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Certificate, Error> {
        let x509 = X509::from_der(der).map_err(|e| Error::Certificate(e.to_string()))?;

        // from_der stops after the first certificate
        let reencoded = x509.to_der().map_err(|e| Error::Certificate(e.to_string()))?;
        if reencoded != der {
            return Err(Error::Certificate(
                "trailing data after certificate".to_string(),
            ));
        }

        let fingerprint = fingerprint(der)?;

        Ok(Certificate {
            raw: der.to_vec(),
            x509,
            fingerprint,
        })
    }

    pub fn as_der(&self) -> &[u8] {
        &self.raw
    }

    pub fn x509(&self) -> &X509 {
        &self.x509
    }

    /// Lowercase hex SHA-256 of the DER encoding
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Subject distinguished name in RFC 4514 order, e.g.
    /// `CN=aws.nitro-enclaves,C=US,O=Amazon,OU=AWS`
    pub fn subject(&self) -> String {
        format_name(self.x509.subject_name())
    }

    pub fn issuer(&self) -> String {
        format_name(self.x509.issuer_name())
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject())
            .field("issuer", &self.issuer())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

pub fn fingerprint(der: &[u8]) -> Result<String, Error> {
    let d = hash(MessageDigest::sha256(), der)
        .map_err(|e| Error::Certificate(format!("SHA-256: {e}")))?;

    Ok(hex::encode(&*d))
}

fn format_name(name: &X509NameRef) -> String {
    let rdns: Vec<String> = name
        .entries()
        .map(|e| {
            let key = e.object().nid().short_name().unwrap_or("?");
            let value = e
                .data()
                .as_utf8()
                .map(|s| s.to_string())
                .unwrap_or_else(|_| hex::encode(e.data().as_slice()));
            format!("{key}={value}")
        })
        .collect();

    rdns.into_iter().rev().collect::<Vec<_>>().join(",")
}
