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

//! Subject alternative name extraction from parsed certificates and CSRs.
//!
//! The policy engine never touches raw certificate bytes; callers hand it
//! `x509_cert` values their issuance pipeline already parsed. This module
//! walks the SubjectAltName extension of a certificate, or the
//! extensionRequest attribute of a PKCS#10 request, and buckets the general
//! names into a [`SubjectAltNames`] value. otherName, directoryName,
//! ediPartyName, and registeredID entries carry no constrainable name and
//! are skipped.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use const_oid::AssociatedOid;
use der::{Decode, Encode};
use url::Url;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::SubjectAltName;
use x509_cert::ext::Extension;
use x509_cert::request::{CertReq, ExtensionReq};
use x509_cert::Certificate;

use crate::error::{PolicyError, Result};
use crate::names::SubjectAltNames;

/// Collect the subject alternative names of a parsed certificate.
///
/// A certificate without a SubjectAltName extension yields empty buckets.
pub fn certificate_names(cert: &Certificate) -> Result<SubjectAltNames> {
    let mut names = SubjectAltNames::default();
    if let Some(extensions) = &cert.tbs_certificate.extensions {
        collect_san_names(extensions, &mut names)?;
    }
    Ok(names)
}

/// Collect the subject alternative names requested by a parsed PKCS#10 CSR.
///
/// CSRs carry requested extensions inside the extensionRequest attribute
/// (RFC 2985 Section 5.4.2); every SubjectAltName extension found there
/// contributes its names.
pub fn csr_names(csr: &CertReq) -> Result<SubjectAltNames> {
    let mut names = SubjectAltNames::default();
    for attribute in csr.info.attributes.iter() {
        if attribute.oid != ExtensionReq::OID {
            continue;
        }
        for value in attribute.values.iter() {
            let encoded = value.to_der().map_err(|err| {
                PolicyError::cannot_parse("extensionRequest attribute", err.to_string())
            })?;
            let extension_req = ExtensionReq::from_der(&encoded).map_err(|err| {
                PolicyError::cannot_parse("extensionRequest attribute", err.to_string())
            })?;
            collect_san_names(&extension_req.0, &mut names)?;
        }
    }
    Ok(names)
}

/// Bucket the general names of every SubjectAltName extension in `extensions`.
fn collect_san_names(extensions: &[Extension], names: &mut SubjectAltNames) -> Result<()> {
    for extension in extensions {
        if extension.extn_id != SubjectAltName::OID {
            continue;
        }
        let san = SubjectAltName::from_der(extension.extn_value.as_bytes()).map_err(|err| {
            PolicyError::cannot_parse("subjectAltName extension", err.to_string())
        })?;

        for general_name in &san.0 {
            match general_name {
                GeneralName::DnsName(dns) => names.dns_names.push(dns.to_string()),
                GeneralName::Rfc822Name(email) => names.email_addresses.push(email.to_string()),
                GeneralName::IpAddress(octets) => {
                    names.ip_addresses.push(ip_from_octets(octets.as_bytes())?);
                }
                GeneralName::UniformResourceIdentifier(uri) => {
                    let uri = uri.to_string();
                    let parsed = Url::parse(&uri)
                        .map_err(|_| PolicyError::cannot_parse("uri", uri.clone()))?;
                    names.uris.push(parsed);
                }
                // No constrainable DNS/IP/email/URI name in these forms.
                _ => {}
            }
        }
    }
    Ok(())
}

/// Decode the 4- or 16-octet address form used by iPAddress general names.
fn ip_from_octets(octets: &[u8]) -> Result<IpAddr> {
    match octets.len() {
        4 => {
            let mut addr = [0u8; 4];
            addr.copy_from_slice(octets);
            Ok(IpAddr::V4(Ipv4Addr::from(addr)))
        }
        16 => {
            let mut addr = [0u8; 16];
            addr.copy_from_slice(octets);
            Ok(IpAddr::V6(Ipv6Addr::from(addr)))
        }
        _ => {
            let hex: String = octets.iter().map(|b| format!("{b:02x}")).collect();
            Err(PolicyError::cannot_parse("ip address", hex))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::asn1::{Ia5String, OctetString};

    fn san_extension(names: Vec<GeneralName>) -> Extension {
        let san = SubjectAltName(names);
        Extension {
            extn_id: SubjectAltName::OID,
            critical: false,
            extn_value: OctetString::new(san.to_der().unwrap()).unwrap(),
        }
    }

    fn ia5(s: &str) -> Ia5String {
        Ia5String::new(s).unwrap()
    }

    #[test]
    fn test_collect_all_four_name_types() {
        let extension = san_extension(vec![
            GeneralName::DnsName(ia5("www.example.com")),
            GeneralName::Rfc822Name(ia5("bob@example.com")),
            GeneralName::UniformResourceIdentifier(ia5("https://app.example.com/login")),
            GeneralName::IpAddress(OctetString::new(vec![10, 1, 2, 3]).unwrap()),
        ]);

        let mut names = SubjectAltNames::default();
        collect_san_names(std::slice::from_ref(&extension), &mut names).unwrap();

        assert_eq!(names.dns_names, vec!["www.example.com"]);
        assert_eq!(names.email_addresses, vec!["bob@example.com"]);
        assert_eq!(names.uris[0].as_str(), "https://app.example.com/login");
        assert_eq!(
            names.ip_addresses,
            vec!["10.1.2.3".parse::<IpAddr>().unwrap()]
        );
    }

    #[test]
    fn test_sixteen_octet_addresses_become_ipv6() {
        let mut octets = vec![0u8; 16];
        octets[0] = 0x20;
        octets[1] = 0x01;
        octets[2] = 0x0d;
        octets[3] = 0xb8;
        octets[15] = 0x01;
        let extension = san_extension(vec![GeneralName::IpAddress(
            OctetString::new(octets).unwrap(),
        )]);

        let mut names = SubjectAltNames::default();
        collect_san_names(std::slice::from_ref(&extension), &mut names).unwrap();
        assert_eq!(
            names.ip_addresses,
            vec!["2001:db8::1".parse::<IpAddr>().unwrap()]
        );
    }

    #[test]
    fn test_odd_length_address_is_an_error() {
        let extension = san_extension(vec![GeneralName::IpAddress(
            OctetString::new(vec![10, 1, 2]).unwrap(),
        )]);
        let mut names = SubjectAltNames::default();
        let err = collect_san_names(std::slice::from_ref(&extension), &mut names).unwrap_err();
        assert!(matches!(err, PolicyError::CannotParse { kind: "ip address", .. }));
    }

    #[test]
    fn test_unrelated_extensions_are_ignored() {
        let unrelated = Extension {
            // keyUsage
            extn_id: "2.5.29.15".parse().unwrap(),
            critical: true,
            extn_value: OctetString::new(vec![0x03, 0x02, 0x05, 0xa0]).unwrap(),
        };
        let mut names = SubjectAltNames::default();
        collect_san_names(std::slice::from_ref(&unrelated), &mut names).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_relative_uri_is_an_error() {
        let extension = san_extension(vec![GeneralName::UniformResourceIdentifier(ia5(
            "not-a-uri",
        ))]);
        let mut names = SubjectAltNames::default();
        let err = collect_san_names(std::slice::from_ref(&extension), &mut names).unwrap_err();
        assert!(matches!(err, PolicyError::CannotParse { kind: "uri", .. }));
    }
}
