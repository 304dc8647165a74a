//! Error types for the name policy engine.
//!
//! Every failure is surfaced to the caller as a typed [`PolicyError`]; nothing
//! is logged-and-swallowed internally, and no error is retryable (a name that
//! fails its grammar will not become valid on retry). The calling issuance
//! pipeline must treat any returned error as "do not issue this certificate"
//! and surface the detail message for operator diagnosis.

use thiserror::Error;

/// Result type alias using [`PolicyError`].
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Errors that can occur while constructing or consulting a name policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A name is excluded by a constraint, or no permitted constraint
    /// matched it. The detail names the offending value and, for exclusions,
    /// the constraint that triggered the refusal.
    #[error("not authorized to sign for this name: {0}")]
    NotAuthorized(String),

    /// A name or constraint does not conform to its grammar.
    #[error("cannot parse {kind} {value:?}")]
    CannotParse {
        /// What was being parsed ("dns", "email", "domain", ...).
        kind: &'static str,
        /// The value that failed to parse.
        value: String,
    },

    /// A URI without a host in its authority component cannot be matched
    /// against URI constraints.
    #[error("URI with empty host ({0:?}) cannot be matched against constraints")]
    EmptyUriHost(String),

    /// A URI whose host is an IP literal cannot be matched against URI
    /// constraints (RFC 5280 Section 4.2.1.10 restricts URI constraints to
    /// fully qualified domain name hosts).
    #[error("URI with IP host ({0:?}) cannot be matched against constraints")]
    IpUriHost(String),

    /// A configuration step supplied an unparsable constraint. Engine
    /// construction aborts; no partially built engine exists.
    #[error("invalid {kind} constraint {value:?}: {reason}")]
    InvalidConstraint {
        /// The constraint list the entry was destined for.
        kind: &'static str,
        /// The rejected entry.
        value: String,
        /// Why the entry was rejected.
        reason: String,
    },

    /// A validation call exceeded the configured comparison budget.
    ///
    /// Only returned when a budget was set via
    /// [`NamePolicyBuilder::max_comparisons`](crate::NamePolicyBuilder::max_comparisons).
    #[error("name checks exceeded the comparison limit of {limit}")]
    TooManyComparisons {
        /// The configured limit.
        limit: usize,
    },

    /// Several violations gathered from one validation call.
    ///
    /// Only returned when the engine was built with
    /// [`NamePolicyBuilder::collect_all_violations`](crate::NamePolicyBuilder::collect_all_violations)
    /// and more than one name was refused.
    #[error("{}", summarize_violations(.0))]
    Violations(Vec<PolicyError>),

    /// A policy configuration document could not be read or deserialized.
    #[cfg(feature = "config-file")]
    #[error("configuration error: {0}")]
    Config(String),
}

impl PolicyError {
    /// Create a not-authorized error with the given detail.
    pub fn not_authorized(detail: impl Into<String>) -> Self {
        Self::NotAuthorized(detail.into())
    }

    /// Create a cannot-parse error for the given kind of value.
    pub fn cannot_parse(kind: &'static str, value: impl Into<String>) -> Self {
        Self::CannotParse {
            kind,
            value: value.into(),
        }
    }

    /// Create an invalid-constraint construction error.
    pub fn invalid_constraint(
        kind: &'static str,
        value: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::InvalidConstraint {
            kind,
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if this error refuses issuance for a name (as opposed to
    /// a construction or configuration failure).
    pub fn is_refusal(&self) -> bool {
        match self {
            Self::NotAuthorized(_)
            | Self::CannotParse { .. }
            | Self::EmptyUriHost(_)
            | Self::IpUriHost(_) => true,
            Self::Violations(errors) => errors.iter().any(PolicyError::is_refusal),
            _ => false,
        }
    }

    /// View this error as a list of individual violations.
    ///
    /// Returns the inner list for [`PolicyError::Violations`] and a
    /// single-element slice for every other variant, so callers can iterate
    /// uniformly regardless of the engine's violation-collection mode.
    pub fn violations(&self) -> &[PolicyError] {
        match self {
            Self::Violations(errors) => errors,
            other => std::slice::from_ref(other),
        }
    }
}

fn summarize_violations(errors: &[PolicyError]) -> String {
    let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!(
        "{} name policy violations: {}",
        errors.len(),
        details.join("; ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PolicyError::not_authorized("dns \"a.test\" is excluded by constraint \"a.test\"");
        assert_eq!(
            err.to_string(),
            "not authorized to sign for this name: dns \"a.test\" is excluded by constraint \"a.test\""
        );

        let err = PolicyError::cannot_parse("dns", "bad..name");
        assert_eq!(err.to_string(), "cannot parse dns \"bad..name\"");
    }

    #[test]
    fn test_violations_display() {
        let err = PolicyError::Violations(vec![
            PolicyError::not_authorized("one"),
            PolicyError::not_authorized("two"),
        ]);
        assert_eq!(
            err.to_string(),
            "2 name policy violations: not authorized to sign for this name: one; \
             not authorized to sign for this name: two"
        );
    }

    #[test]
    fn test_is_refusal() {
        assert!(PolicyError::not_authorized("x").is_refusal());
        assert!(PolicyError::cannot_parse("dns", "x").is_refusal());
        assert!(!PolicyError::invalid_constraint("ip", "10.0.0.0/40", "bad prefix").is_refusal());
        assert!(!PolicyError::TooManyComparisons { limit: 8 }.is_refusal());
    }

    #[test]
    fn test_violations_view() {
        let single = PolicyError::not_authorized("x");
        assert_eq!(single.violations().len(), 1);

        let multi = PolicyError::Violations(vec![
            PolicyError::not_authorized("one"),
            PolicyError::not_authorized("two"),
        ]);
        assert_eq!(multi.violations().len(), 2);
    }
}
