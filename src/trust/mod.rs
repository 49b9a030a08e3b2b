// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Certificate chain building and path validation against a store of
//! trusted roots.
//!
//! An untrusted chain is not an error: [`TrustManager::verify`] always
//! returns a [`TrustResult`] and the cause, if any, is in its `error` field.
//! A missing root is reported with an empty `trust_chain`, while a chain
//! that was built but failed validation is returned along with the cause.

pub use self::manager::{TrustManager, DEFAULT_MAX_DEPTH};
pub use self::result::{TrustError, TrustResult};
pub use self::validator::ICertificateValidator;

mod manager;
mod result;
mod validator;
