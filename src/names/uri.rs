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

//! URI constraint matching.

use std::net::IpAddr;

use url::{Host, Url};

use crate::error::{PolicyError, Result};
use crate::names::domain::match_domain_constraint;

/// Check whether `uri` falls within the URI `constraint`.
///
/// RFC 5280 Section 4.2.1.10: a uniformResourceIdentifier whose authority
/// component is missing, or whose host is specified as an IP address rather
/// than a fully qualified domain name, must be rejected. Any port in the
/// authority is ignored; the remaining host is matched as a domain.
pub(crate) fn match_uri_constraint(uri: &Url, constraint: &str) -> Result<bool> {
    let host = match uri.host() {
        None => return Err(PolicyError::EmptyUriHost(uri.to_string())),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {
            return Err(PolicyError::IpUriHost(uri.to_string()))
        }
        Some(Host::Domain(host)) => host,
    };

    if host.is_empty() {
        return Err(PolicyError::EmptyUriHost(uri.to_string()));
    }

    // Non-special schemes keep their host opaque, so an address literal can
    // still reach this point spelled as a domain.
    if (host.starts_with('[') && host.ends_with(']')) || host.parse::<IpAddr>().is_ok() {
        return Err(PolicyError::IpUriHost(uri.to_string()));
    }

    match_domain_constraint(host, constraint)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_domain_host_matches() {
        assert!(match_uri_constraint(&uri("https://www.example.com/path"), "example.com").unwrap());
        assert!(match_uri_constraint(&uri("ldap://www.example.com"), ".example.com").unwrap());
        assert!(!match_uri_constraint(&uri("https://www.example.org"), "example.com").unwrap());
        assert!(!match_uri_constraint(&uri("https://example.com"), ".example.com").unwrap());
    }

    #[test]
    fn test_port_is_ignored() {
        assert!(
            match_uri_constraint(&uri("https://app.example.com:8443/x"), "example.com").unwrap()
        );
    }

    #[test]
    fn test_empty_host_is_an_error() {
        let err = match_uri_constraint(&uri("mailto:bob@example.com"), "example.com").unwrap_err();
        assert!(matches!(err, PolicyError::EmptyUriHost(_)));

        let err = match_uri_constraint(&uri("urn:isbn:0451450523"), "example.com").unwrap_err();
        assert!(matches!(err, PolicyError::EmptyUriHost(_)));
    }

    #[test]
    fn test_ip_hosts_are_rejected() {
        let err = match_uri_constraint(&uri("https://192.168.1.1/admin"), "example.com").unwrap_err();
        assert!(matches!(err, PolicyError::IpUriHost(_)));

        let err = match_uri_constraint(&uri("https://[2001:db8::1]:8080/"), "example.com").unwrap_err();
        assert!(matches!(err, PolicyError::IpUriHost(_)));

        // The rejection does not depend on the constraint.
        let err = match_uri_constraint(&uri("https://10.0.0.1"), "").unwrap_err();
        assert!(matches!(err, PolicyError::IpUriHost(_)));
    }

    #[test]
    fn test_ip_host_in_non_special_scheme_is_rejected() {
        // Opaque-host schemes do not classify address literals; the explicit
        // re-parse must catch them.
        let err = match_uri_constraint(&uri("gopher://10.0.0.1/1"), "example.com").unwrap_err();
        assert!(matches!(err, PolicyError::IpUriHost(_)));
    }
}
