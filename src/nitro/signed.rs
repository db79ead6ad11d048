// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::attestation::Attestation;
use super::errors::Error;
use super::sign1::CoseSign1;
use crate::policy::ValidateOptions;
use std::ops::Deref;

/// A decoded attestation document together with the COSE_Sign1 envelope it
/// came in, which is kept only to re-verify the signature.
#[derive(Debug, Clone)]
pub struct SignedAttestation {
    pub attestation: Attestation,
    sign1: CoseSign1,
}

impl SignedAttestation {
    /// Decode a CBOR-encoded, COSE_Sign1-wrapped attestation document.  No
    /// verification is done at this stage.
    pub fn parse(buf: &[u8]) -> Result<SignedAttestation, Error> {
        let sign1 = CoseSign1::decode(buf)?;

        let attestation = Attestation::decode(&sign1.payload)?;

        Ok(SignedAttestation { attestation, sign1 })
    }

    /// Verify the envelope's signature with the leaf certificate's public key.
    /// This says nothing about whether the leaf certificate can be trusted:
    /// that is [`SignedAttestation::validate`]'s job.
    pub fn verify(&self) -> Result<(), Error> {
        let key = self
            .attestation
            .certificate
            .x509()
            .public_key()
            .map_err(|e| Error::KeyType(format!("leaf certificate public key: {e}")))?;

        self.sign1.verify(&key)
    }

    /// See [`Attestation::validate`]
    pub fn validate(&self, opts: &ValidateOptions) -> Result<(), Error> {
        self.attestation.validate(opts)
    }
}

impl Deref for SignedAttestation {
    type Target = Attestation;

    fn deref(&self) -> &Attestation {
        &self.attestation
    }
}
