// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::nitro::{Attestation, Error};
use std::collections::BTreeMap;

/// Compare the document's PCRs against `expected`, in index order.  Only the
/// indexes present in `expected` are looked at.
pub fn check_pcrs(a: &Attestation, expected: &BTreeMap<u32, String>) -> Result<(), Error> {
    for (index, want) in expected.iter() {
        let got = a.pcr(*index);

        if got != Some(want.as_str()) {
            return Err(Error::PcrMismatch {
                index: *index,
                actual: got.map(str::to_string),
            });
        }
    }

    Ok(())
}

/// Exact byte comparison; a document without a nonce never matches.
pub fn check_nonce(a: &Attestation, expected: &[u8]) -> Result<(), Error> {
    match &a.nonce {
        Some(n) if n.as_slice() == expected => Ok(()),
        actual => Err(Error::NonceMismatch {
            actual: actual.clone(),
        }),
    }
}
