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

//! The name policy engine and its decision operations.
//!
//! [`NamePolicyEngine`] holds permitted and excluded constraint lists for
//! DNS, IP, email, and URI names and decides whether a set of subject
//! alternative names may be issued. The checking algorithm mirrors RFC 5280
//! name-constraint processing as performed during path validation, applied
//! here at issuance time: exclusions are tested first and any match refuses
//! the name; a non-empty permitted list then requires at least one match; an
//! empty permitted list places no restriction.
//!
//! The engine is immutable once built and safe to share across threads
//! without locking. Rebuild it to change policy.
//!
//! # Example
//!
//! ```
//! use san_policy::NamePolicyEngine;
//!
//! # fn main() -> san_policy::Result<()> {
//! let engine = NamePolicyEngine::builder()
//!     .add_permitted_dns_domain("example.com")
//!     .add_excluded_dns_domain("internal.example.com")
//!     .add_permitted_ip_range("10.0.0.0/8")
//!     .build()?;
//!
//! assert!(engine.is_dns_allowed("www.example.com").is_ok());
//! assert!(engine.is_dns_allowed("db.internal.example.com").is_err());
//! assert!(engine.is_ip_allowed("10.1.2.3".parse().unwrap()).is_ok());
//! assert!(engine.is_ip_allowed("192.168.1.1".parse().unwrap()).is_err());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::net::IpAddr;

use tracing::{debug, trace};
use url::Url;

use crate::config::NamePolicyBuilder;
use crate::error::{PolicyError, Result};
use crate::names::domain::{match_domain_constraint, reverse_labels};
use crate::names::ip::{match_ip_constraint, IpNetwork};
use crate::names::mailbox::{match_email_constraint, parse_mailbox};
use crate::names::uri::match_uri_constraint;
use crate::names::SubjectAltNames;

#[cfg(feature = "x509")]
use x509_cert::{request::CertReq, Certificate};

/// The name type a constraint check is operating on, used in refusal details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameKind {
    Dns,
    Ip,
    Email,
    Uri,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dns => "dns",
            Self::Ip => "ip",
            Self::Email => "email",
            Self::Uri => "uri",
        })
    }
}

/// Tracks constraint comparisons across one validation call.
struct ComparisonBudget {
    used: usize,
    limit: Option<usize>,
}

impl ComparisonBudget {
    fn new(limit: Option<usize>) -> Self {
        Self { used: 0, limit }
    }

    fn charge(&mut self, comparisons: usize) -> Result<()> {
        if let Some(limit) = self.limit {
            self.used = self.used.saturating_add(comparisons);
            if self.used > limit {
                return Err(PolicyError::TooManyComparisons { limit });
            }
        }
        Ok(())
    }
}

/// Decides whether the subject alternative names of a certificate or signing
/// request are allowed under configured permitted/excluded constraints.
///
/// Built once via [`NamePolicyEngine::builder`] (or from a
/// [`PolicyConfig`](crate::PolicyConfig) document), then consulted by the
/// issuance pipeline immediately before signing. The default engine has no
/// constraints and allows every parseable name.
#[derive(Debug, Clone, Default)]
pub struct NamePolicyEngine {
    pub(crate) permitted_dns_domains: Vec<String>,
    pub(crate) excluded_dns_domains: Vec<String>,
    pub(crate) permitted_ip_ranges: Vec<IpNetwork>,
    pub(crate) excluded_ip_ranges: Vec<IpNetwork>,
    pub(crate) permitted_email_addresses: Vec<String>,
    pub(crate) excluded_email_addresses: Vec<String>,
    pub(crate) permitted_uri_domains: Vec<String>,
    pub(crate) excluded_uri_domains: Vec<String>,
    pub(crate) collect_all_violations: bool,
    pub(crate) max_comparisons: Option<usize>,
}

impl NamePolicyEngine {
    /// Create a builder for a new engine.
    pub fn builder() -> NamePolicyBuilder {
        NamePolicyBuilder::new()
    }

    /// Returns true if no constraints of any type are configured.
    ///
    /// An unconstrained engine still rejects names that fail their grammar.
    pub fn is_unconstrained(&self) -> bool {
        self.permitted_dns_domains.is_empty()
            && self.excluded_dns_domains.is_empty()
            && self.permitted_ip_ranges.is_empty()
            && self.excluded_ip_ranges.is_empty()
            && self.permitted_email_addresses.is_empty()
            && self.excluded_email_addresses.is_empty()
            && self.permitted_uri_domains.is_empty()
            && self.excluded_uri_domains.is_empty()
    }

    /// Verify that all subject alternative names in a parsed certificate are
    /// allowed.
    #[cfg(feature = "x509")]
    pub fn are_certificate_names_allowed(&self, cert: &Certificate) -> Result<()> {
        let names = crate::extract::certificate_names(cert)?;
        self.are_names_allowed(&names)
    }

    /// Verify that all subject alternative names requested by a parsed CSR
    /// are allowed.
    #[cfg(feature = "x509")]
    pub fn are_csr_names_allowed(&self, csr: &CertReq) -> Result<()> {
        let names = crate::extract::csr_names(csr)?;
        self.are_names_allowed(&names)
    }

    /// Verify that all names in a slice of raw SAN strings are allowed.
    ///
    /// Each string is first classified as a DNS name, IP address, email
    /// address, or URI (see [`San::classify`](crate::San::classify)), then
    /// checked exactly as if it had been supplied through the typed path.
    pub fn are_sans_allowed<S: AsRef<str>>(&self, sans: &[S]) -> Result<()> {
        let names = SubjectAltNames::from_sans(sans.iter().map(AsRef::as_ref));
        self.are_names_allowed(&names)
    }

    /// Verify that all names in the given buckets are allowed.
    ///
    /// This is the typed entry point the other decision operations project
    /// onto. Checking stops at the first violation unless the engine was
    /// built to collect all of them.
    pub fn are_names_allowed(&self, names: &SubjectAltNames) -> Result<()> {
        self.validate_names(names)
    }

    /// Verify that a single DNS name is allowed.
    pub fn is_dns_allowed(&self, dns: &str) -> Result<()> {
        self.validate_names(&SubjectAltNames {
            dns_names: vec![dns.to_owned()],
            ..Default::default()
        })
    }

    /// Verify that a single IP address is allowed.
    pub fn is_ip_allowed(&self, ip: IpAddr) -> Result<()> {
        self.validate_names(&SubjectAltNames {
            ip_addresses: vec![ip],
            ..Default::default()
        })
    }

    fn validate_names(&self, names: &SubjectAltNames) -> Result<()> {
        trace!(
            "checking {} dns, {} ip, {} email, {} uri name(s) against the policy",
            names.dns_names.len(),
            names.ip_addresses.len(),
            names.email_addresses.len(),
            names.uris.len()
        );

        let mut budget = ComparisonBudget::new(self.max_comparisons);
        let mut violations = Vec::new();

        for dns in &names.dns_names {
            let outcome = self.check_dns(dns, &mut budget);
            self.settle(outcome, &mut violations)?;
        }

        for ip in &names.ip_addresses {
            let outcome = check_name_constraints(
                NameKind::Ip,
                &ip.to_string(),
                ip,
                |ip, net| match_ip_constraint(*ip, net),
                &self.permitted_ip_ranges,
                &self.excluded_ip_ranges,
                &mut budget,
            );
            self.settle(outcome, &mut violations)?;
        }

        for email in &names.email_addresses {
            let outcome = self.check_email(email, &mut budget);
            self.settle(outcome, &mut violations)?;
        }

        for uri in &names.uris {
            let outcome = check_name_constraints(
                NameKind::Uri,
                uri.as_str(),
                uri,
                |uri: &Url, constraint| match_uri_constraint(uri, constraint),
                &self.permitted_uri_domains,
                &self.excluded_uri_domains,
                &mut budget,
            );
            self.settle(outcome, &mut violations)?;
        }

        if violations.is_empty() {
            return Ok(());
        }
        if violations.len() == 1 {
            return Err(violations.remove(0));
        }
        Err(PolicyError::Violations(violations))
    }

    fn check_dns(&self, dns: &str, budget: &mut ComparisonBudget) -> Result<()> {
        reverse_labels(dns).map_err(|_| PolicyError::cannot_parse("dns", dns))?;
        check_name_constraints(
            NameKind::Dns,
            dns,
            dns,
            |domain: &str, constraint| match_domain_constraint(domain, constraint),
            &self.permitted_dns_domains,
            &self.excluded_dns_domains,
            budget,
        )
    }

    fn check_email(&self, email: &str, budget: &mut ComparisonBudget) -> Result<()> {
        let mailbox = parse_mailbox(email)?;
        check_name_constraints(
            NameKind::Email,
            email,
            &mailbox,
            |mailbox, constraint: &String| match_email_constraint(mailbox, constraint),
            &self.permitted_email_addresses,
            &self.excluded_email_addresses,
            budget,
        )
    }

    /// Resolve one name's outcome against the violation-collection mode: an
    /// exhausted comparison budget always aborts, other violations either
    /// abort (default) or accumulate.
    fn settle(&self, outcome: Result<()>, violations: &mut Vec<PolicyError>) -> Result<()> {
        match outcome {
            Ok(()) => Ok(()),
            Err(err @ PolicyError::TooManyComparisons { .. }) => Err(err),
            Err(err) if self.collect_all_violations => {
                debug!("name policy violation: {err}");
                violations.push(err);
                Ok(())
            }
            Err(err) => {
                debug!("name policy violation: {err}");
                Err(err)
            }
        }
    }
}

/// Check that the policy permits a name of the given type.
///
/// Excluded constraints are tested first; any match (or a constraint that
/// fails to parse, surfaced through the matcher) refuses the name. A
/// non-empty permitted list then requires the name to match at least one
/// entry; an empty permitted list places no restriction. An excluded match
/// always wins over a permitted match.
fn check_name_constraints<N, C, M>(
    kind: NameKind,
    name: &str,
    parsed: &N,
    matches: M,
    permitted: &[C],
    excluded: &[C],
    budget: &mut ComparisonBudget,
) -> Result<()>
where
    N: ?Sized,
    C: fmt::Display,
    M: Fn(&N, &C) -> Result<bool>,
{
    budget.charge(excluded.len())?;
    for constraint in excluded {
        let matched =
            matches(parsed, constraint).map_err(|err| PolicyError::not_authorized(err.to_string()))?;
        if matched {
            return Err(PolicyError::not_authorized(format!(
                "{kind} {name:?} is excluded by constraint {:?}",
                constraint.to_string()
            )));
        }
    }

    budget.charge(permitted.len())?;
    let mut permitted_match = true;
    for constraint in permitted {
        permitted_match =
            matches(parsed, constraint).map_err(|err| PolicyError::not_authorized(err.to_string()))?;
        if permitted_match {
            break;
        }
    }

    if !permitted_match {
        return Err(PolicyError::not_authorized(format!(
            "{kind} {name:?} is not permitted by any constraint"
        )));
    }

    Ok(())
}
