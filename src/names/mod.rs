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

//! Subject alternative name types and grammars.
//!
//! This module groups the four name grammars the engine understands (DNS
//! domains, IP addresses, RFC 2821 mailboxes, URIs) together with [`San`],
//! the classified form of one raw SAN string, and [`SubjectAltNames`], the
//! four-bucket collection the engine validates.

pub(crate) mod domain;
pub mod ip;
pub(crate) mod mailbox;
pub(crate) mod uri;

use std::net::IpAddr;

use url::Url;

/// One subject alternative name, classified into its name type.
///
/// Classification mirrors how untyped SAN strings are split before policy
/// evaluation: a parseable IP address wins, then anything with a URI scheme,
/// then anything containing `@`, and everything else is a DNS name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum San {
    /// A DNS domain name, e.g. `www.example.com`.
    Dns(String),
    /// An IP address, e.g. `10.1.2.3` or `2001:db8::1`.
    Ip(IpAddr),
    /// An email address, e.g. `bob@example.com`.
    Email(String),
    /// A URI, e.g. `https://www.example.com/`.
    Uri(Box<Url>),
}

impl San {
    /// Classify a raw SAN string into its name type.
    ///
    /// Classification never fails; a string that fits no other bucket is a
    /// DNS name, and whether it is a *valid* DNS name is decided at
    /// validation time.
    pub fn classify(san: &str) -> Self {
        if let Ok(ip) = san.parse::<IpAddr>() {
            return Self::Ip(ip);
        }
        if let Ok(uri) = Url::parse(san) {
            return Self::Uri(Box::new(uri));
        }
        if san.contains('@') {
            return Self::Email(san.to_owned());
        }
        Self::Dns(san.to_owned())
    }
}

/// The subject alternative names of one certificate or signing request,
/// split into the four name types the policy engine constrains.
///
/// Instances are produced by an external certificate/CSR parser, by
/// [`SubjectAltNames::from_sans`] for untyped SAN strings, or field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltNames {
    /// DNS domain names.
    pub dns_names: Vec<String>,
    /// IP addresses.
    pub ip_addresses: Vec<IpAddr>,
    /// Email addresses.
    pub email_addresses: Vec<String>,
    /// URIs.
    pub uris: Vec<Url>,
}

impl SubjectAltNames {
    /// Classify raw SAN strings into their buckets.
    pub fn from_sans<'a, I>(sans: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut names = Self::default();
        for san in sans {
            names.push(San::classify(san));
        }
        names
    }

    /// Append one classified name to its bucket.
    pub fn push(&mut self, san: San) {
        match san {
            San::Dns(dns) => self.dns_names.push(dns),
            San::Ip(ip) => self.ip_addresses.push(ip),
            San::Email(email) => self.email_addresses.push(email),
            San::Uri(uri) => self.uris.push(*uri),
        }
    }

    /// Total number of names across all four buckets.
    pub fn len(&self) -> usize {
        self.dns_names.len()
            + self.ip_addresses.len()
            + self.email_addresses.len()
            + self.uris.len()
    }

    /// Returns true if no names are present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
