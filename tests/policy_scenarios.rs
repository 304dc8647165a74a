//! End-to-end policy decision scenarios.
//!
//! These tests exercise the public decision operations the way an issuance
//! pipeline would: build an engine once, then consult it for certificates'
//! worth of names.

use std::net::IpAddr;

use san_policy::{NamePolicyEngine, PolicyError, SubjectAltNames, Url};

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[test]
fn dns_policy_scenario() {
    let engine = NamePolicyEngine::builder()
        .add_permitted_dns_domain("example.com")
        .add_excluded_dns_domain("secret.example.com")
        .build()
        .unwrap();

    assert!(engine.is_dns_allowed("www.example.com").is_ok());
    assert!(engine.is_dns_allowed("example.com").is_ok());

    let err = engine.is_dns_allowed("secret.example.com").unwrap_err();
    assert!(err.to_string().contains("excluded by constraint"));

    let err = engine.is_dns_allowed("example.org").unwrap_err();
    assert!(err.to_string().contains("not permitted by any constraint"));
}

#[test]
fn ip_policy_scenario() {
    let engine = NamePolicyEngine::builder()
        .add_permitted_ip_range("10.0.0.0/8")
        .build()
        .unwrap();

    assert!(engine.is_ip_allowed(ip("10.1.2.3")).is_ok());
    assert!(engine.is_ip_allowed(ip("192.168.1.1")).is_err());

    // IPv6 candidates never fall inside an IPv4 range.
    assert!(engine.is_ip_allowed(ip("2001:db8::1")).is_err());
}

#[test]
fn ip_representation_does_not_change_the_decision() {
    let engine = NamePolicyEngine::builder()
        .add_permitted_ip_range("127.0.0.0/24")
        .build()
        .unwrap();

    assert!(engine.is_ip_allowed(ip("127.0.0.1")).is_ok());
    assert!(engine.is_ip_allowed(ip("::ffff:127.0.0.1")).is_ok());
    assert!(engine.is_ip_allowed(ip("127.0.1.1")).is_err());
}

#[test]
fn email_subdomain_scenario() {
    let engine = NamePolicyEngine::builder()
        .add_permitted_email_address(".example.com")
        .build()
        .unwrap();

    assert!(engine.are_sans_allowed(&["bob@mail.example.com"]).is_ok());
    // The leading dot demands a subdomain, not the bare domain.
    assert!(engine.are_sans_allowed(&["bob@example.com"]).is_err());
}

#[test]
fn exclusion_always_wins() {
    let engine = NamePolicyEngine::builder()
        .add_permitted_email_address("example.com")
        .add_excluded_email_address("ceo@example.com")
        .build()
        .unwrap();

    assert!(engine.are_sans_allowed(&["staff@example.com"]).is_ok());
    assert!(engine.are_sans_allowed(&["ceo@example.com"]).is_err());
}

#[test]
fn uri_constraints_reject_ip_hosts() {
    let engine = NamePolicyEngine::builder()
        .add_permitted_uri_domain("example.com")
        .build()
        .unwrap();

    assert!(engine
        .are_sans_allowed(&["https://login.example.com:8443/auth"])
        .is_ok());
    assert!(engine.are_sans_allowed(&["https://192.168.1.1/auth"]).is_err());
    assert!(engine.are_sans_allowed(&["https://[2001:db8::1]/auth"]).is_err());
}

#[test]
fn raw_and_typed_paths_produce_identical_decisions() {
    let engine = NamePolicyEngine::builder()
        .add_permitted_dns_domain("example.com")
        .add_permitted_ip_range("10.0.0.0/8")
        .add_permitted_email_address("example.com")
        .add_permitted_uri_domain("example.com")
        .add_excluded_dns_domain("secret.example.com")
        .build()
        .unwrap();

    let sans = [
        "www.example.com",
        "10.1.2.3",
        "bob@example.com",
        "https://app.example.com/",
    ];

    let typed = SubjectAltNames {
        dns_names: vec!["www.example.com".into()],
        ip_addresses: vec![ip("10.1.2.3")],
        email_addresses: vec!["bob@example.com".into()],
        uris: vec![Url::parse("https://app.example.com/").unwrap()],
    };

    assert_eq!(SubjectAltNames::from_sans(sans), typed);
    assert!(engine.are_sans_allowed(&sans).is_ok());
    assert!(engine.are_names_allowed(&typed).is_ok());

    // Same refusal, same detail, through either path.
    let bad = ["www.example.com", "secret.example.com"];
    let typed_bad = SubjectAltNames {
        dns_names: bad.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    };
    assert_eq!(
        engine.are_sans_allowed(&bad).unwrap_err().to_string(),
        engine.are_names_allowed(&typed_bad).unwrap_err().to_string()
    );
}

#[test]
fn mixed_buckets_stop_at_the_first_violation() {
    let engine = NamePolicyEngine::builder()
        .add_permitted_dns_domain("example.com")
        .add_permitted_ip_range("10.0.0.0/8")
        .build()
        .unwrap();

    // The DNS violation is reported even though the IP would also fail;
    // DNS names are checked first.
    let err = engine
        .are_sans_allowed(&["bad.example.org", "192.168.1.1"])
        .unwrap_err();
    assert!(err.to_string().contains("bad.example.org"));
    assert_eq!(err.violations().len(), 1);
}

#[test]
fn collect_all_violations_reports_everything() {
    let engine = NamePolicyEngine::builder()
        .add_permitted_dns_domain("example.com")
        .add_permitted_ip_range("10.0.0.0/8")
        .collect_all_violations()
        .build()
        .unwrap();

    let err = engine
        .are_sans_allowed(&["bad.example.org", "192.168.1.1", "ok.example.com"])
        .unwrap_err();

    let details: Vec<String> = err.violations().iter().map(ToString::to_string).collect();
    assert_eq!(details.len(), 2);
    assert!(details[0].contains("bad.example.org"));
    assert!(details[1].contains("192.168.1.1"));
}

#[test]
fn engine_is_shared_across_concurrent_decisions() {
    use std::sync::Arc;

    let engine = Arc::new(
        NamePolicyEngine::builder()
            .add_permitted_dns_domain("example.com")
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                let name = format!("host-{i}.example.com");
                engine.is_dns_allowed(&name).is_ok()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn unparseable_names_refuse_issuance() {
    let engine = NamePolicyEngine::builder().build().unwrap();

    let err = engine.is_dns_allowed("absolute.example.com.").unwrap_err();
    assert!(matches!(err, PolicyError::CannotParse { .. }));
    assert!(err.is_refusal());

    let err = engine.are_sans_allowed(&["bad..local@example.com"]).unwrap_err();
    assert!(matches!(err, PolicyError::CannotParse { .. }));
}
