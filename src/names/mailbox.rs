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

//! RFC 2821 mailbox parsing and email constraint matching.
//!
//! RFC 5280 Section 4.2.1.6 defines an rfc822Name as a "Mailbox" per
//! RFC 2821 Section 4.1.2, so email subject alternative names and email
//! constraints both go through this grammar. The local part has two forms,
//! selected by the first character: a quoted string or a dot-separated atom
//! run. A few deviations from the strict ABNF that are widespread in real
//! addresses (space inside quoted strings, quoted pairs outside quoted
//! strings, arbitrary text after the `@`) are accepted; RFC 3696 and its
//! errata argue for them.

use crate::error::{PolicyError, Result};
use crate::names::domain::{match_domain_constraint, reverse_labels};

/// An email address split at the `@` into its local and domain parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Mailbox {
    /// The local part, with quoting and escapes resolved.
    pub local: String,
    /// The raw domain part. Always has a valid reverse label sequence.
    pub domain: String,
}

/// Parse an email address into local and domain parts, based on the ABNF
/// for a "Mailbox" from RFC 2821.
pub(crate) fn parse_mailbox(input: &str) -> Result<Mailbox> {
    let fail = || PolicyError::cannot_parse("email", input);

    if input.is_empty() {
        return Err(fail());
    }

    let bytes = input.as_bytes();
    let mut local = Vec::with_capacity(bytes.len() / 2);
    let mut i = 0usize;

    if bytes[0] == b'"' {
        // quoted-string = DQUOTE *qcontent DQUOTE
        // qcontent = qtext / quoted-pair
        //
        // The obsolete syntax from RFC 2822 Section 4 is not accepted.
        i = 1;
        loop {
            if i >= bytes.len() {
                // End of input before the closing quote.
                return Err(fail());
            }
            let c = bytes[i];
            i += 1;

            match c {
                b'"' => break,
                b'\\' => {
                    // quoted-pair: the escaped byte must be "text".
                    if i >= bytes.len() {
                        return Err(fail());
                    }
                    let e = bytes[i];
                    if e == 11 || e == 12 || (1..=9).contains(&e) || (14..=127).contains(&e) {
                        local.push(e);
                        i += 1;
                    } else {
                        return Err(fail());
                    }
                }
                // qtext. Space (32) is not allowed by the BNF, but RFC 3696
                // gives an example assuming it is, and several verified
                // errata continue to argue the point. It is accepted here.
                c if c == 11
                    || c == 12
                    || c == 32
                    || c == 33
                    || c == 127
                    || (1..=8).contains(&c)
                    || (14..=31).contains(&c)
                    || (35..=91).contains(&c)
                    || (93..=126).contains(&c) =>
                {
                    local.push(c);
                }
                _ => return Err(fail()),
            }
        }
    } else {
        // Atom ("." Atom)*, atext per RFC 2822 Section 3.2.4. An escaped
        // byte outside a quoted string is accepted unconditionally, per the
        // examples in RFC 3696.
        while i < bytes.len() {
            let c = bytes[i];
            if c == b'\\' {
                i += 1;
                if i >= bytes.len() {
                    return Err(fail());
                }
                local.push(bytes[i]);
                i += 1;
                continue;
            }
            if c.is_ascii_alphanumeric()
                || matches!(
                    c,
                    b'!' | b'#'
                        | b'$'
                        | b'%'
                        | b'&'
                        | b'\''
                        | b'*'
                        | b'+'
                        | b'-'
                        | b'/'
                        | b'='
                        | b'?'
                        | b'^'
                        | b'_'
                        | b'`'
                        | b'{'
                        | b'|'
                        | b'}'
                        | b'~'
                        | b'.'
                )
            {
                local.push(c);
                i += 1;
            } else {
                break;
            }
        }

        if local.is_empty() {
            return Err(fail());
        }

        // RFC 3696 Section 3: a period may not start or end the local part,
        // nor may two consecutive periods appear.
        if local[0] == b'.'
            || local[local.len() - 1] == b'.'
            || local.windows(2).any(|pair| pair == b"..")
        {
            return Err(fail());
        }
    }

    if i >= bytes.len() || bytes[i] != b'@' {
        return Err(fail());
    }

    // The RFC specifies a format for domains, but that is known to be
    // violated in practice, so anything after the '@' is taken as the
    // domain part as long as it has a valid label sequence.
    let domain = &input[i + 1..];
    reverse_labels(domain).map_err(|_| fail())?;

    let local = String::from_utf8(local).map_err(|_| fail())?;

    Ok(Mailbox {
        local,
        domain: domain.to_owned(),
    })
}

/// Check whether `mailbox` falls within the email `constraint`.
///
/// A constraint containing an `@` names an exact mailbox: the local parts
/// must be equal (case-sensitively) and the domains equal ignoring case.
/// Otherwise the constraint acts as a domain constraint on the mailbox's
/// domain part.
pub(crate) fn match_email_constraint(mailbox: &Mailbox, constraint: &str) -> Result<bool> {
    if constraint.contains('@') {
        let constraint_mailbox = parse_mailbox(constraint)
            .map_err(|_| PolicyError::cannot_parse("constraint", constraint))?;
        return Ok(mailbox.local == constraint_mailbox.local
            && mailbox.domain.eq_ignore_ascii_case(&constraint_mailbox.domain));
    }

    match_domain_constraint(&mailbox.domain, constraint)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailbox(s: &str) -> Mailbox {
        parse_mailbox(s).unwrap()
    }

    #[test]
    fn test_parse_simple_mailbox() {
        let m = mailbox("bob@example.com");
        assert_eq!(m.local, "bob");
        assert_eq!(m.domain, "example.com");
    }

    #[test]
    fn test_atom_special_characters() {
        assert_eq!(mailbox("first.last@example.com").local, "first.last");
        assert_eq!(mailbox("user+tag@example.com").local, "user+tag");
        assert_eq!(mailbox("!#$%&'*+-/=?^_`{|}~@example.com").local, "!#$%&'*+-/=?^_`{|}~");
    }

    #[test]
    fn test_atom_escape_admits_anything() {
        assert_eq!(mailbox(r"fred\ bloggs@example.com").local, "fred bloggs");
        assert_eq!(mailbox(r"joe\@home@example.com").local, "joe@home");
    }

    #[test]
    fn test_atom_dot_rules() {
        assert!(parse_mailbox(".leading@example.com").is_err());
        assert!(parse_mailbox("trailing.@example.com").is_err());
        assert!(parse_mailbox("two..dots@example.com").is_err());
    }

    #[test]
    fn test_quoted_string_local() {
        assert_eq!(mailbox("\"bob smith\"@example.com").local, "bob smith");
        assert_eq!(mailbox("\"user@host\"@example.com").local, "user@host");
        // Empty quoted locals are tolerated; only atoms require content.
        assert_eq!(mailbox("\"\"@example.com").local, "");
    }

    #[test]
    fn test_quoted_string_escapes() {
        assert_eq!(mailbox("\"a\\\"b\"@example.com").local, "a\"b");
        assert_eq!(mailbox("\"a\\\\b\"@example.com").local, "a\\b");
        // Control bytes in the 14..=31 range are valid qtext.
        assert_eq!(mailbox("\"a\u{1b}b\"@example.com").local, "a\u{1b}b");
    }

    #[test]
    fn test_quoted_string_rejects_bad_bytes() {
        // Unterminated quoted string.
        assert!(parse_mailbox("\"unterminated@example.com").is_err());
        // Newline is neither qtext nor escapable.
        assert!(parse_mailbox("\"a\nb\"@example.com").is_err());
        assert!(parse_mailbox("\"a\\\nb\"@example.com").is_err());
    }

    #[test]
    fn test_missing_or_misplaced_at() {
        assert!(parse_mailbox("").is_err());
        assert!(parse_mailbox("bob").is_err());
        assert!(parse_mailbox("\"bob\"").is_err());
        assert!(parse_mailbox("@example.com").is_err());
    }

    #[test]
    fn test_empty_domain_is_tolerated() {
        // "anything after the '@' is the domain part", and the empty string
        // has a valid (empty) label sequence. Such a mailbox can still only
        // match the empty constraint.
        let m = mailbox("bob@");
        assert_eq!(m.domain, "");
        assert!(!match_email_constraint(&m, "example.com").unwrap());
        assert!(match_email_constraint(&m, "").unwrap());
    }

    #[test]
    fn test_domain_must_have_valid_labels() {
        assert!(parse_mailbox("bob@example.com.").is_err());
        assert!(parse_mailbox("bob@bad..domain").is_err());
        assert!(parse_mailbox("bob@exa mple.com").is_err());
    }

    #[test]
    fn test_exact_mailbox_constraint() {
        let m = mailbox("bob@example.com");
        assert!(match_email_constraint(&m, "bob@example.com").unwrap());
        assert!(match_email_constraint(&m, "bob@EXAMPLE.com").unwrap());
        // The local part compares case-sensitively.
        assert!(!match_email_constraint(&m, "Bob@example.com").unwrap());
        assert!(!match_email_constraint(&m, "alice@example.com").unwrap());
    }

    #[test]
    fn test_domain_constraint_fallback() {
        let m = mailbox("bob@mail.example.com");
        assert!(match_email_constraint(&m, "mail.example.com").unwrap());
        assert!(match_email_constraint(&m, "example.com").unwrap());
        assert!(match_email_constraint(&m, ".example.com").unwrap());
        assert!(!match_email_constraint(&m, "other.org").unwrap());

        // Leading dot requires a subdomain of the constraint.
        let direct = mailbox("bob@example.com");
        assert!(!match_email_constraint(&direct, ".example.com").unwrap());
    }

    #[test]
    fn test_unparsable_exact_constraint_is_an_error() {
        let m = mailbox("bob@example.com");
        assert!(match_email_constraint(&m, "bad..local@example.com").is_err());
    }
}
