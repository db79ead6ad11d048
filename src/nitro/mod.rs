// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The nitro module provides a [`SignedAttestation`] object wrapping a
//! decoded AWS Nitro Enclaves attestation document and the COSE_Sign1
//! envelope that carries it.
//!
//! # Example
//!
//! ```no_run
//! use tee_verifier::nitro::SignedAttestation;
//! use tee_verifier::policy::ValidateOptions;
//!
//! let doc: Vec<u8> = std::fs::read("attestation.cbor").expect("reading document");
//!
//! let att = SignedAttestation::parse(&doc).expect("decoding attestation document");
//!
//! // verify the COSE_Sign1 signature using the leaf certificate's key
//! att.verify().expect("verifying signature");
//!
//! // check the certificate chain against the pinned AWS root, then PCR0
//! let opts = ValidateOptions::new().with_expected_pcrs([(0, "8a1b...")]);
//! att.validate(&opts).expect("validating attestation document");
//!
//! println!("{} @ {}", att.module_id, att.timestamp);
//! ```

pub use self::attestation::Attestation;
pub use self::certificate::Certificate;
pub use self::errors::{Error, ErrorKind};
pub use self::sign1::CoseSign1;
pub use self::signed::SignedAttestation;

mod attestation;
mod certificate;
mod common;
mod errors;
mod sign1;
mod signed;

#[cfg(test)]
pub(crate) mod testutil;
