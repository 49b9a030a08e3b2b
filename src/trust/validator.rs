// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::store::Certificate;

/// Caller policy applied to every certificate of a built chain.  Any closure
/// `Fn(&Certificate) -> Result<(), String>` is a validator.
pub trait ICertificateValidator {
    /// Return the reason for rejecting `cert`, if any
    fn validate(&self, cert: &Certificate) -> Result<(), String>;
}

impl<F> ICertificateValidator for F
where
    F: Fn(&Certificate) -> Result<(), String>,
{
    fn validate(&self, cert: &Certificate) -> Result<(), String> {
        self(cert)
    }
}
