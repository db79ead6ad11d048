// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::options::ValidateOptions;
use crate::nitro::{Attestation, Error};
use openssl::error::ErrorStack;
use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::verify::{X509VerifyFlags, X509VerifyParam};
use openssl::x509::{X509StoreContext, X509};

/// Check that the document's cabundle is rooted at the expected trust anchor
/// and that the leaf certificate chains up to it at `opts.time`.
///
/// The pinned fingerprint is checked first: if the anchor is not the expected
/// one, there is no point in building the chain.
pub fn verify_chain(a: &Attestation, opts: &ValidateOptions) -> Result<(), Error> {
    let actual = a.root_cert_fingerprint();

    if actual != opts.root_fingerprint {
        return Err(Error::UntrustedRoot {
            expected: opts.root_fingerprint.clone(),
            actual: actual.to_string(),
        });
    }

    let store = trust_store(a.root_cert().x509(), opts)
        .map_err(|e| Error::Chain(format!("building trust store: {e}")))?;

    let mut intermediates = Stack::<X509>::new()
        .map_err(|e| Error::Chain(format!("building intermediates: {e}")))?;

    for c in a.intermediates() {
        intermediates
            .push(c.x509().clone())
            .map_err(|e| Error::Chain(format!("building intermediates: {e}")))?;
    }

    let mut ctx =
        X509StoreContext::new().map_err(|e| Error::Chain(format!("store context: {e}")))?;

    let outcome = ctx
        .init(&store, a.certificate.x509(), &intermediates, |c| {
            if c.verify_cert()? {
                Ok(None)
            } else {
                Ok(Some((c.error(), c.error_depth())))
            }
        })
        .map_err(|e| Error::Chain(e.to_string()))?;

    if let Some((err, depth)) = outcome {
        return Err(Error::Chain(format!(
            "{} (depth {depth})",
            err.error_string()
        )));
    }

    tracing::debug!(
        root = %actual,
        depth = a.cabundle.len(),
        time = %opts.time,
        "certificate chain verified"
    );

    Ok(())
}

// The anchor is trusted as-is, whether or not it is self-signed, hence
// PARTIAL_CHAIN.
fn trust_store(root: &X509, opts: &ValidateOptions) -> Result<X509Store, ErrorStack> {
    let mut param = X509VerifyParam::new()?;
    param.set_time(opts.time.timestamp() as _);
    param.set_flags(X509VerifyFlags::PARTIAL_CHAIN)?;

    let mut builder = X509StoreBuilder::new()?;
    builder.add_cert(root.clone())?;
    builder.set_param(&param)?;

    Ok(builder.build())
}
