// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! X.509 certificates and the store of trusted roots

pub use self::certificate::Certificate;
pub use self::itrustanchorstore::ITrustAnchorStore;
pub use self::memo_trustanchorstore::{AnchorEntry, Anchors, MemoTrustAnchorStore};

mod certificate;
mod itrustanchorstore;
mod memo_trustanchorstore;
