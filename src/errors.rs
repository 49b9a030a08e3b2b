// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

#[derive(thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Syntax error: {0}")]
    Syntax(String),
    #[error("Missing field: {0}")]
    MissingField(String),
    #[error("Duplicated field: {0}")]
    DuplicatedField(String),
    #[error("Field type mismatch: {0}")]
    TypeMismatch(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("Signature verification failed: {0}")]
    Signature(String),
    #[error("Crypto provider error: {0}")]
    Crypto(String),
}

impl Error {
    /// True for every variant that denotes malformed, truncated or
    /// structurally incomplete input.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            Error::Syntax(_)
                | Error::MissingField(_)
                | Error::DuplicatedField(_)
                | Error::TypeMismatch(_)
                | Error::Unsupported(_)
        )
    }

    pub fn is_signature(&self) -> bool {
        matches!(self, Error::Signature(_))
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Syntax(e)
            | Error::MissingField(e)
            | Error::DuplicatedField(e)
            | Error::TypeMismatch(e)
            | Error::Unsupported(e)
            | Error::Signature(e)
            | Error::Crypto(e) => {
                write!(f, "{}", e)
            }
        }
    }
}

impl From<openssl::error::ErrorStack> for Error {
    fn from(e: openssl::error::ErrorStack) -> Self {
        Error::Crypto(e.to_string())
    }
}
