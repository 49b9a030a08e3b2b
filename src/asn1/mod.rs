// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! X.690 time types.  Certificates carry their validity window as either
//! UTCTime (`YYMMDDHHMMSSZ`) or GeneralizedTime (`YYYYMMDDHHMMSS[.f]Z`);
//! this module converts between those strings and UTC instants.
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use mdoctrust::asn1::{self, TimeFormat};
//!
//! let t = Utc.with_ymd_and_hms(2049, 12, 31, 23, 59, 59).unwrap();
//!
//! assert_eq!(asn1::encode(&t, TimeFormat::UtcTime).unwrap(), "491231235959Z");
//! ```

pub use self::time::*;

mod time;
