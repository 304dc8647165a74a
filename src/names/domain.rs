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

//! Domain label parsing and domain constraint matching.

use crate::error::{PolicyError, Result};

/// Convert a textual domain name like `foo.example.com` to its labels in
/// reverse order, e.g. `["com", "example", "foo"]`.
///
/// Fails for absolute names (trailing dot), empty labels, and labels
/// containing bytes outside the visible ASCII range 33..=126. Case is
/// preserved; comparison happens case-insensitively in the matcher. The
/// empty string parses to an empty label sequence.
pub(crate) fn reverse_labels(domain: &str) -> Result<Vec<String>> {
    let mut labels = Vec::new();
    let mut rest = domain;
    while !rest.is_empty() {
        match rest.rfind('.') {
            Some(i) => {
                labels.push(rest[i + 1..].to_owned());
                rest = &rest[..i];
            }
            None => {
                labels.push(rest.to_owned());
                rest = "";
            }
        }
    }

    // An empty label at the end indicates an absolute name.
    if labels.first().is_some_and(String::is_empty) {
        return Err(PolicyError::cannot_parse("domain", domain));
    }

    for label in &labels {
        if label.is_empty() {
            return Err(PolicyError::cannot_parse("domain", domain));
        }
        if label.bytes().any(|b| !(33..=126).contains(&b)) {
            return Err(PolicyError::cannot_parse("domain", domain));
        }
    }

    Ok(labels)
}

/// Check whether `domain` falls within the domain `constraint`.
///
/// An empty constraint matches everything (following NSS, since the meaning
/// of zero-length constraints is unspecified). A constraint with a leading
/// period requires at least one additional label on the candidate, so
/// `.example.com` matches `host.example.com` but not `example.com` itself.
/// Without the leading period the constraint also matches itself exactly.
pub(crate) fn match_domain_constraint(domain: &str, constraint: &str) -> Result<bool> {
    if constraint.is_empty() {
        return Ok(true);
    }

    let domain_labels = reverse_labels(domain)?;

    let (must_have_subdomains, constraint) = match constraint.strip_prefix('.') {
        Some(rest) => (true, rest),
        None => (false, constraint),
    };
    let constraint_labels = reverse_labels(constraint)?;

    if domain_labels.len() < constraint_labels.len()
        || (must_have_subdomains && domain_labels.len() == constraint_labels.len())
    {
        return Ok(false);
    }

    Ok(constraint_labels
        .iter()
        .zip(&domain_labels)
        .all(|(c, d)| c.eq_ignore_ascii_case(d)))
}
