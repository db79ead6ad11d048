// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Appraisal of a decoded attestation document against caller expectations:
//! the pinned trust anchor and certificate chain, PCR values, nonce, and
//! (for documents fetched over HTTP) the user-data binding to the response.

pub use self::binding::{bound_digest, check_user_data, ResponseDigest, USER_DATA_PREFIX};
pub use self::chain::verify_chain;
pub use self::expectations::{check_nonce, check_pcrs};
pub use self::options::{ValidateOptions, AWS_NITRO_ROOT_FINGERPRINT};

mod binding;
mod chain;
mod expectations;
mod options;
