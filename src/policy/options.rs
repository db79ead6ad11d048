// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// SHA-256 fingerprint of the AWS Nitro Enclaves root certificate (G1), see
/// <https://docs.aws.amazon.com/enclaves/latest/user/verify-root.html>
pub const AWS_NITRO_ROOT_FINGERPRINT: &str =
    "641a0321a3e244efe456463195d606317ed7cdcc3c1756e09893f3c68f79bb5b";

/// Caller expectations for [`Attestation::validate`](crate::nitro::Attestation::validate)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Point in time at which certificate validity windows are checked
    pub time: DateTime<Utc>,
    /// Expected lowercase hex SHA-256 of the cabundle's first certificate
    pub root_fingerprint: String,
    /// Expected lowercase hex PCR values; absent indexes are not checked
    pub expected_pcrs: BTreeMap<u32, String>,
    /// Exact nonce the document must carry, if any
    pub expected_nonce: Option<Vec<u8>>,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidateOptions {
    /// Current time, pinned AWS root, no PCR or nonce expectations
    pub fn new() -> Self {
        Self {
            time: Utc::now(),
            root_fingerprint: AWS_NITRO_ROOT_FINGERPRINT.to_string(),
            expected_pcrs: BTreeMap::new(),
            expected_nonce: None,
        }
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    pub fn with_root_fingerprint(mut self, fingerprint: &str) -> Self {
        self.root_fingerprint = fingerprint.to_ascii_lowercase();
        self
    }

    /// Replace the PCR expectations.  Values are hex strings, in any case.
    pub fn with_expected_pcrs<I, S>(mut self, pcrs: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: AsRef<str>,
    {
        self.expected_pcrs = pcrs
            .into_iter()
            .map(|(k, v)| (k, v.as_ref().to_ascii_lowercase()))
            .collect();
        self
    }

    pub fn with_expected_nonce(mut self, nonce: &[u8]) -> Self {
        self.expected_nonce = Some(nonce.to_vec());
        self
    }
}
