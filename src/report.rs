// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Human and machine readable summaries of a verification run.

use crate::nitro::SignedAttestation;
use crate::policy::{check_user_data, ResponseDigest, ValidateOptions};
use crate::transport::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::io::{self, Write};

/// The HTTP exchange a document was fetched with
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: String,
    pub digest: ResponseDigest,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub module_id: String,
    pub timestamp: DateTime<Utc>,
    pub pcr0: String,
    pub nonce: String,
    pub user_data: String,

    pub root_cert_subject: String,
    pub root_cert_fingerprint: String,

    pub attestation_valid: bool,
    pub signature_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data_valid: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_digest: Option<Bytes>,
}

fn lossy(v: &Option<Vec<u8>>) -> String {
    v.as_deref()
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default()
}

impl Report {
    /// Run both the chain/policy validation and the signature verification
    /// and collect the outcome.  Failures are logged, not returned.
    pub fn from_attestation(
        att: &SignedAttestation,
        response: Option<&Response>,
        opts: &ValidateOptions,
    ) -> Report {
        let attestation_valid = match att.validate(opts) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("attestation validation failed: {e}");
                false
            }
        };

        let signature_valid = match att.verify() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("signature verification failed: {e}");
                false
            }
        };

        let user_data_valid =
            response.and_then(|r| check_user_data(att.user_data.as_deref(), &r.digest));

        if user_data_valid == Some(false) {
            tracing::warn!("user data does not match the response digest");
        }

        Report {
            module_id: att.module_id.clone(),
            timestamp: att.timestamp,
            pcr0: att.pcr(0).unwrap_or_default().to_string(),
            nonce: lossy(&att.nonce),
            user_data: lossy(&att.user_data),
            root_cert_subject: att.root_cert().subject(),
            root_cert_fingerprint: att.root_cert_fingerprint().to_string(),
            attestation_valid,
            signature_valid,
            user_data_valid,
            response_status: response.map(|r| r.status),
            response_body: response.map(|r| r.body.clone()),
            response_digest: response.map(|r| Bytes::from(r.digest.as_bytes())),
        }
    }

    /// False if any of the checks that were run failed
    pub fn is_valid(&self) -> bool {
        self.attestation_valid && self.signature_valid && self.user_data_valid != Some(false)
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Module ID", self.module_id.clone()),
            (
                "Timestamp",
                self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            ("PCR0", self.pcr0.clone()),
            ("Nonce", self.nonce.clone()),
            ("UserData", self.user_data.clone()),
            ("Root Cert Subject", self.root_cert_subject.clone()),
            ("Root Cert Fingerprint", self.root_cert_fingerprint.clone()),
            ("Attestation Valid", self.attestation_valid.to_string()),
            ("Signature Valid", self.signature_valid.to_string()),
        ];

        if let Some(v) = self.user_data_valid {
            rows.push(("UserData Valid", v.to_string()));
        }
        if let Some(s) = self.response_status {
            rows.push(("Response Status", s.to_string()));
        }
        if let Some(b) = self.response_body.as_ref().filter(|b| !b.is_empty()) {
            rows.push(("Response Body", b.clone()));
        }

        rows
    }

    /// Two aligned columns, label and value
    pub fn write_table<W: Write>(&self, mut w: W) -> io::Result<()> {
        let rows = self.rows();
        let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0) + 2;

        for (k, v) in rows {
            writeln!(w, "{k:<width$}{v}")?;
        }

        w.flush()
    }

    pub fn write_json<W: Write>(&self, mut w: W) -> io::Result<()> {
        serde_json::to_writer(&mut w, self)?;
        writeln!(w)
    }
}
