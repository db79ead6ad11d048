// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

/// Broad classification of an [`Error`], one per verification stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed envelope or claims encoding
    Decode,
    /// Invalid DER or unsupported key algorithm in the claims
    Certificate,
    /// Root pinning or certificate chain failure
    Chain,
    /// Measurement register or nonce mismatch
    PolicyMismatch,
    /// Wrong key type, malformed signature or failed verification
    Signature,
}

#[derive(thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Certificate error: {0}")]
    Certificate(String),
    #[error("invalid root certificate: fingerprint {actual}, expecting {expected}")]
    UntrustedRoot { expected: String, actual: String },
    #[error("invalid certificate: {0}")]
    Chain(String),
    #[error("invalid PCR{index}: {}", .actual.as_deref().unwrap_or("<absent>"))]
    PcrMismatch { index: u32, actual: Option<String> },
    #[error("invalid nonce: {}", display_nonce(.actual))]
    NonceMismatch { actual: Option<Vec<u8>> },
    #[error("invalid key type: {0}")]
    KeyType(String),
    #[error("Signature error: {0}")]
    Signature(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Decode(_) => ErrorKind::Decode,
            Error::Certificate(_) => ErrorKind::Certificate,
            Error::UntrustedRoot { .. } | Error::Chain(_) => ErrorKind::Chain,
            Error::PcrMismatch { .. } | Error::NonceMismatch { .. } => ErrorKind::PolicyMismatch,
            Error::KeyType(_) | Error::Signature(_) => ErrorKind::Signature,
        }
    }
}

fn display_nonce(nonce: &Option<Vec<u8>>) -> String {
    match nonce {
        Some(n) => String::from_utf8_lossy(n).into_owned(),
        None => "<absent>".to_string(),
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}
