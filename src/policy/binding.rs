// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::nitro::Error;
use base64::{engine::general_purpose, Engine as _};
use openssl::sha::Sha256;

/// Prefix of user data that binds the document to an HTTP exchange
pub const USER_DATA_PREFIX: &str = "Sequence/1:";

/// SHA-256 digest of an HTTP exchange, as an enclave application binds it
/// into the document's user data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDigest(pub [u8; 32]);

impl ResponseDigest {
    /// Digest of `"{method} {path}\n" || data || "\n" || body`
    pub fn compute(method: &str, path: &str, data: Option<&[u8]>, body: &[u8]) -> Self {
        let mut h = Sha256::new();

        h.update(format!("{method} {path}\n").as_bytes());
        if let Some(d) = data {
            h.update(d);
        }
        h.update(b"\n");
        h.update(body);

        Self(h.finish())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Decode the digest carried by `Sequence/1:` user data.  Returns `None` if
/// the user data is not of that form.
pub fn bound_digest(user_data: &[u8]) -> Option<Result<Vec<u8>, Error>> {
    let rest = user_data.strip_prefix(USER_DATA_PREFIX.as_bytes())?;

    Some(
        general_purpose::STANDARD
            .decode(rest)
            .map_err(|e| Error::Decode(format!("user data digest: {e}"))),
    )
}

/// Check the document's user data against the digest of the HTTP exchange
/// it was returned with.  `None` means there was nothing to check.
pub fn check_user_data(user_data: Option<&[u8]>, digest: &ResponseDigest) -> Option<bool> {
    let bound = bound_digest(user_data?)?;

    let ok = match bound {
        Ok(d) => d == digest.as_bytes(),
        Err(e) => {
            tracing::warn!("{e}");
            false
        }
    };

    Some(ok)
}
