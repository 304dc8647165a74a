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

//! Policy construction: the builder and the TOML configuration document.
//!
//! An engine is built from an ordered sequence of configuration steps, each
//! adding one entry to one of the permitted/excluded lists. Validation is
//! eager and atomic: [`NamePolicyBuilder::build`] checks every entry against
//! its grammar, and a single malformed entry aborts construction, so a
//! partially built engine never exists.
//!
//! With the `config-file` feature the same steps can come from a TOML
//! document:
//!
//! ```toml
//! [dns]
//! permitted = ["example.com"]
//! excluded = ["internal.example.com"]
//!
//! [ip]
//! permitted = ["10.0.0.0/8"]
//!
//! [email]
//! permitted = [".example.com"]
//!
//! [uri]
//! permitted = ["example.com"]
//! ```
//!
//! # Example
//!
//! ```
//! use san_policy::NamePolicyEngine;
//!
//! # fn main() -> san_policy::Result<()> {
//! let engine = NamePolicyEngine::builder()
//!     .add_permitted_dns_domain("example.com")
//!     .add_permitted_ip_range("10.0.0.0/8")
//!     .build()?;
//! assert!(!engine.is_unconstrained());
//! # Ok(())
//! # }
//! ```

use tracing::debug;

use crate::engine::NamePolicyEngine;
use crate::error::{PolicyError, Result};
use crate::names::domain::reverse_labels;
use crate::names::ip::IpNetwork;
use crate::names::mailbox::parse_mailbox;

#[cfg(feature = "config-file")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "config-file")]
use std::path::Path;

/// Builder for [`NamePolicyEngine`].
///
/// Steps are recorded in order and validated together by [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct NamePolicyBuilder {
    permitted_dns_domains: Vec<String>,
    excluded_dns_domains: Vec<String>,
    permitted_ip_ranges: Vec<String>,
    excluded_ip_ranges: Vec<String>,
    permitted_email_addresses: Vec<String>,
    excluded_email_addresses: Vec<String>,
    permitted_uri_domains: Vec<String>,
    excluded_uri_domains: Vec<String>,
    collect_all_violations: bool,
    max_comparisons: Option<usize>,
}

impl NamePolicyBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a permitted DNS domain constraint, e.g. `example.com` or
    /// `.example.com`.
    pub fn add_permitted_dns_domain(mut self, domain: impl Into<String>) -> Self {
        self.permitted_dns_domains.push(domain.into());
        self
    }

    /// Add an excluded DNS domain constraint.
    pub fn add_excluded_dns_domain(mut self, domain: impl Into<String>) -> Self {
        self.excluded_dns_domains.push(domain.into());
        self
    }

    /// Add a permitted IP range in CIDR notation, e.g. `10.0.0.0/8`; a bare
    /// address denotes a single-host range.
    pub fn add_permitted_ip_range(mut self, range: impl Into<String>) -> Self {
        self.permitted_ip_ranges.push(range.into());
        self
    }

    /// Add an excluded IP range in CIDR notation.
    pub fn add_excluded_ip_range(mut self, range: impl Into<String>) -> Self {
        self.excluded_ip_ranges.push(range.into());
        self
    }

    /// Add a permitted IP range from an already-parsed network.
    pub fn add_permitted_ip_network(self, network: IpNetwork) -> Self {
        self.add_permitted_ip_range(network.to_string())
    }

    /// Add an excluded IP range from an already-parsed network.
    pub fn add_excluded_ip_network(self, network: IpNetwork) -> Self {
        self.add_excluded_ip_range(network.to_string())
    }

    /// Add a permitted email constraint: an exact mailbox (`bob@example.com`)
    /// or a domain constraint (`example.com`, `.example.com`).
    pub fn add_permitted_email_address(mut self, address: impl Into<String>) -> Self {
        self.permitted_email_addresses.push(address.into());
        self
    }

    /// Add an excluded email constraint.
    pub fn add_excluded_email_address(mut self, address: impl Into<String>) -> Self {
        self.excluded_email_addresses.push(address.into());
        self
    }

    /// Add a permitted URI domain constraint.
    pub fn add_permitted_uri_domain(mut self, domain: impl Into<String>) -> Self {
        self.permitted_uri_domains.push(domain.into());
        self
    }

    /// Add an excluded URI domain constraint.
    pub fn add_excluded_uri_domain(mut self, domain: impl Into<String>) -> Self {
        self.excluded_uri_domains.push(domain.into());
        self
    }

    /// Add several permitted DNS domain constraints.
    pub fn permitted_dns_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permitted_dns_domains
            .extend(domains.into_iter().map(Into::into));
        self
    }

    /// Add several excluded DNS domain constraints.
    pub fn excluded_dns_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_dns_domains
            .extend(domains.into_iter().map(Into::into));
        self
    }

    /// Add several permitted IP ranges.
    pub fn permitted_ip_ranges<I, S>(mut self, ranges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permitted_ip_ranges
            .extend(ranges.into_iter().map(Into::into));
        self
    }

    /// Add several excluded IP ranges.
    pub fn excluded_ip_ranges<I, S>(mut self, ranges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_ip_ranges
            .extend(ranges.into_iter().map(Into::into));
        self
    }

    /// Add several permitted email constraints.
    pub fn permitted_email_addresses<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permitted_email_addresses
            .extend(addresses.into_iter().map(Into::into));
        self
    }

    /// Add several excluded email constraints.
    pub fn excluded_email_addresses<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_email_addresses
            .extend(addresses.into_iter().map(Into::into));
        self
    }

    /// Add several permitted URI domain constraints.
    pub fn permitted_uri_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permitted_uri_domains
            .extend(domains.into_iter().map(Into::into));
        self
    }

    /// Add several excluded URI domain constraints.
    pub fn excluded_uri_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_uri_domains
            .extend(domains.into_iter().map(Into::into));
        self
    }

    /// Collect every violation in a validation call instead of stopping at
    /// the first one. Off by default.
    pub fn collect_all_violations(mut self) -> Self {
        self.collect_all_violations = true;
        self
    }

    /// Cap the total number of constraint comparisons per validation call,
    /// guarding against adversarially large SAN or constraint lists.
    /// Unlimited by default.
    pub fn max_comparisons(mut self, limit: usize) -> Self {
        self.max_comparisons = Some(limit);
        self
    }

    /// Validate every recorded step and build the engine.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidConstraint`] for the first entry that
    /// fails its grammar; no engine is produced in that case.
    pub fn build(self) -> Result<NamePolicyEngine> {
        for domain in self
            .permitted_dns_domains
            .iter()
            .chain(&self.excluded_dns_domains)
        {
            validate_domain_constraint("dns", domain)?;
        }

        let permitted_ip_ranges = parse_ip_ranges(&self.permitted_ip_ranges)?;
        let excluded_ip_ranges = parse_ip_ranges(&self.excluded_ip_ranges)?;

        for address in self
            .permitted_email_addresses
            .iter()
            .chain(&self.excluded_email_addresses)
        {
            validate_email_constraint(address)?;
        }

        for domain in self
            .permitted_uri_domains
            .iter()
            .chain(&self.excluded_uri_domains)
        {
            validate_domain_constraint("uri", domain)?;
        }

        let engine = NamePolicyEngine {
            permitted_dns_domains: self.permitted_dns_domains,
            excluded_dns_domains: self.excluded_dns_domains,
            permitted_ip_ranges,
            excluded_ip_ranges,
            permitted_email_addresses: self.permitted_email_addresses,
            excluded_email_addresses: self.excluded_email_addresses,
            permitted_uri_domains: self.permitted_uri_domains,
            excluded_uri_domains: self.excluded_uri_domains,
            collect_all_violations: self.collect_all_violations,
            max_comparisons: self.max_comparisons,
        };

        debug!(
            "built name policy engine: {} dns, {} ip, {} email, {} uri constraint(s)",
            engine.permitted_dns_domains.len() + engine.excluded_dns_domains.len(),
            engine.permitted_ip_ranges.len() + engine.excluded_ip_ranges.len(),
            engine.permitted_email_addresses.len() + engine.excluded_email_addresses.len(),
            engine.permitted_uri_domains.len() + engine.excluded_uri_domains.len(),
        );

        Ok(engine)
    }
}

/// A domain constraint is the empty string (matches everything) or a label
/// sequence, optionally preceded by a period.
fn validate_domain_constraint(kind: &'static str, constraint: &str) -> Result<()> {
    let labels = constraint.strip_prefix('.').unwrap_or(constraint);
    reverse_labels(labels)
        .map(|_| ())
        .map_err(|err| PolicyError::invalid_constraint(kind, constraint, err))
}

/// An email constraint with an `@` must be a parseable mailbox; otherwise it
/// is a domain constraint.
fn validate_email_constraint(constraint: &str) -> Result<()> {
    if constraint.contains('@') {
        return parse_mailbox(constraint)
            .map(|_| ())
            .map_err(|err| PolicyError::invalid_constraint("email", constraint, err));
    }
    validate_domain_constraint("email", constraint)
}

fn parse_ip_ranges(ranges: &[String]) -> Result<Vec<IpNetwork>> {
    ranges
        .iter()
        .map(|range| {
            range
                .parse::<IpNetwork>()
                .map_err(|err| PolicyError::invalid_constraint("ip", range, err))
        })
        .collect()
}

/// Permitted and excluded entries for one name type in a policy document.
#[cfg(feature = "config-file")]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintSet {
    /// Permitted constraints. An empty list places no restriction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permitted: Vec<String>,

    /// Excluded constraints. A match always refuses the name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded: Vec<String>,
}

/// Behavior switches for a policy document.
#[cfg(feature = "config-file")]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyOptions {
    /// Collect every violation per validation call instead of stopping at
    /// the first.
    #[serde(default)]
    pub collect_all_violations: bool,

    /// Cap on constraint comparisons per validation call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_comparisons: Option<usize>,
}

/// A declarative policy document, deserializable from TOML.
///
/// Feeds the same eager, atomic construction path as [`NamePolicyBuilder`]:
/// one malformed entry anywhere in the document means no engine is built.
#[cfg(feature = "config-file")]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// DNS domain constraints.
    #[serde(default)]
    pub dns: ConstraintSet,

    /// IP range constraints, in CIDR notation.
    #[serde(default)]
    pub ip: ConstraintSet,

    /// Email constraints: exact mailboxes or domain constraints.
    #[serde(default)]
    pub email: ConstraintSet,

    /// URI domain constraints.
    #[serde(default)]
    pub uri: ConstraintSet,

    /// Behavior switches.
    #[serde(default)]
    pub options: PolicyOptions,
}

#[cfg(feature = "config-file")]
impl PolicyConfig {
    /// Parse a policy document from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or contains unknown fields.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|err| PolicyError::Config(format!("invalid TOML: {err}")))
    }

    /// Serialize this policy document to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|err| PolicyError::Config(format!("TOML serialize: {err}")))
    }

    /// Read and parse a policy document from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            PolicyError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    /// Build an engine from this document.
    pub fn build(self) -> Result<NamePolicyEngine> {
        let mut builder = NamePolicyBuilder::new()
            .permitted_dns_domains(self.dns.permitted)
            .excluded_dns_domains(self.dns.excluded)
            .permitted_ip_ranges(self.ip.permitted)
            .excluded_ip_ranges(self.ip.excluded)
            .permitted_email_addresses(self.email.permitted)
            .excluded_email_addresses(self.email.excluded)
            .permitted_uri_domains(self.uri.permitted)
            .excluded_uri_domains(self.uri.excluded);

        if self.options.collect_all_violations {
            builder = builder.collect_all_violations();
        }
        if let Some(limit) = self.options.max_comparisons {
            builder = builder.max_comparisons(limit);
        }

        builder.build()
    }
}
