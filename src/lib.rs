// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # san-policy
//!
//! A name-constraint policy engine for certificate issuance.
//!
//! Given permitted and excluded constraints for DNS domains, IP ranges,
//! email addresses, and URI domains, [`NamePolicyEngine`] decides whether
//! the subject alternative names of a candidate certificate or signing
//! request may be issued. A certificate authority consults it immediately
//! before signing; the checking algorithm mirrors RFC 5280 Section 4.2.1.10
//! name-constraint processing, applied at issuance time instead of
//! verification time.
//!
//! ## Semantics
//!
//! - **Exclusions win.** A name matching any excluded constraint is refused,
//!   even if a permitted constraint also matches.
//! - **Empty permitted lists place no restriction.** If no permitted
//!   constraints of a name's type are configured, the name only has to
//!   avoid the exclusions.
//! - **First violation ends the check.** The engine reports exactly one
//!   violation per refused decision, unless built to collect all of them.
//!
//! ## Quick Start
//!
//! ```
//! use san_policy::NamePolicyEngine;
//!
//! # fn main() -> san_policy::Result<()> {
//! let engine = NamePolicyEngine::builder()
//!     .add_permitted_dns_domain("example.com")
//!     .add_excluded_dns_domain("internal.example.com")
//!     .add_permitted_ip_range("10.0.0.0/8")
//!     .add_permitted_email_address(".example.com")
//!     .build()?;
//!
//! // Typed checks, or raw SAN strings classified automatically.
//! assert!(engine.is_dns_allowed("www.example.com").is_ok());
//! assert!(engine.are_sans_allowed(&["10.1.2.3", "bob@mail.example.com"]).is_ok());
//!
//! let refusal = engine.is_dns_allowed("db.internal.example.com").unwrap_err();
//! println!("refused: {refusal}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Policy documents
//!
//! With the `config-file` feature (default), the same constraints can come
//! from a TOML document via [`PolicyConfig`]:
//!
//! ```toml
//! [dns]
//! permitted = ["example.com"]
//! excluded = ["internal.example.com"]
//!
//! [ip]
//! permitted = ["10.0.0.0/8"]
//! ```
//!
//! ## Scope
//!
//! The engine performs no I/O, no logging beyond `tracing` diagnostics, and
//! no certificate parsing; with the `x509` feature (default) it accepts
//! already-parsed [`x509_cert::Certificate`] and
//! [`x509_cert::request::CertReq`] values and reads only their subject
//! alternative names. It is immutable after construction and safe to share
//! across concurrent issuance decisions without locking.
//!
//! ## Cargo Features
//!
//! - `x509` (default): accept `x509_cert` certificate and CSR values.
//! - `config-file` (default): TOML policy documents via serde.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod names;

#[cfg(feature = "x509")]
pub mod extract;

// Re-export main types at crate root for convenience
pub use config::NamePolicyBuilder;
#[cfg(feature = "config-file")]
pub use config::{ConstraintSet, PolicyConfig, PolicyOptions};
pub use engine::NamePolicyEngine;
pub use error::{PolicyError, Result};
pub use names::ip::IpNetwork;
pub use names::{San, SubjectAltNames};

// Re-export the URL type carried by URI subject alternative names
pub use url::Url;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
