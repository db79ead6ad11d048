// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! AWS Nitro Enclaves attestation document verification.
//!
//! This crate provides an API to decode and verify attestation documents
//! produced by the Nitro Security Module.  For detailed information about the
//! format, see the [NSM API] attestation process documentation.
//!
//! The API allows:
//! * Decoding a CBOR-encoded, COSE_Sign1-wrapped attestation document
//! * Cryptographically verifying the document's signature against its leaf
//!   certificate
//! * Validating the certificate chain against a pinned root fingerprint, and
//!   the PCRs and nonce against user-supplied expectations
//!
//! [NSM API]: https://github.com/aws/aws-nitro-enclaves-nsm-api/blob/main/docs/attestation_process.md

pub mod nitro;
pub mod policy;
pub mod report;
pub mod transport;
