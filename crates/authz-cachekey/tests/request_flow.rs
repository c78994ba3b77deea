use authz_cachekey::prelude::*;
use authz_cachekey::{matcher_fingerprint, OTEL_NAMESPACE_KEY};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

const CONFIG: &str = r#"
matcher: "kubernetes_namespace_name,k8s_namespace_name"
matcherOp: "or"
matcherSkipTenants: "audit"
matcherAdminGroups: "system:cluster-admins,dedicated-admin"
"#;

const OTEL_MATCHER_HASH: &str =
    "m:63ef1e06752e96333e3ae17570b81df7b194ad421c2a8920708832815bf0a6b0";
const LEGACY_MATCHER_HASH: &str =
    "m:e87a64ecd681d9831b31f30f429773801d276cf23e4b112cce2f077a1a092060";

fn subject(username: &str, groups: &[&str]) -> Subject {
    Subject {
        credential: format!("sha256~{username}-token"),
        username: username.to_string(),
        groups: groups.iter().map(|g| g.to_string()).collect(),
    }
}

fn read_logs(tenant: &str) -> Action {
    Action {
        verb: Verb::Get,
        resource: "logs".to_string(),
        resource_name: tenant.to_string(),
        api_group: "loki.grafana.com".to_string(),
        namespaces: vec!["log-test-0".to_string()],
        metadata_only: false,
    }
}

fn otel_selector() -> HashMap<String, Vec<String>> {
    let mut selectors = HashMap::new();
    selectors.insert(OTEL_NAMESPACE_KEY.to_string(), vec!["log-test-0".to_string()]);
    selectors
}

/// Run the per-request pipeline the authorizer uses
fn request_key(
    tenant_matcher: &Matcher,
    tenant: &str,
    subject: &Subject,
    selectors: &HashMap<String, Vec<String>>,
) -> String {
    let mut matcher = tenant_matcher.for_request(tenant, &subject.groups);
    matcher.to_mut().migrate_schema(selectors);
    cache_key(subject, &read_logs(tenant), Some(&*matcher))
}

#[test]
fn test_flow_selects_schema_specific_fingerprint() {
    let tenant_matcher = MatcherConfig::from_yaml(CONFIG).unwrap().to_matcher();
    let user = subject("testuser-0", &["system:authenticated"]);

    let otel = request_key(&tenant_matcher, "application", &user, &otel_selector());
    assert!(otel.ends_with(OTEL_MATCHER_HASH), "{otel}");

    let legacy = request_key(&tenant_matcher, "application", &user, &HashMap::new());
    assert!(legacy.ends_with(LEGACY_MATCHER_HASH), "{legacy}");

    // the shared tenant matcher keeps both schema keys
    assert_eq!(tenant_matcher.keys().len(), 2);
}

#[test]
fn test_flow_bypass_yields_empty_fingerprint() {
    let tenant_matcher = MatcherConfig::from_yaml(CONFIG).unwrap().to_matcher();

    let admin = subject("kube:admin", &["system:authenticated", "system:cluster-admins"]);
    let key = request_key(&tenant_matcher, "application", &admin, &otel_selector());
    assert!(key.ends_with(",m:empty"), "{key}");

    let auditor = subject("testuser-0", &["system:authenticated"]);
    let key = request_key(&tenant_matcher, "audit", &auditor, &otel_selector());
    assert!(key.ends_with(",m:empty"), "{key}");
}

#[test]
fn test_flow_key_fits_backend_limit() {
    let tenant_matcher = MatcherConfig::from_yaml(CONFIG).unwrap().to_matcher();
    let user = subject(
        "system:serviceaccount:openshift-logging:logcollector",
        &["system:serviceaccounts", "system:authenticated"],
    );

    for tenant in ["application", "infrastructure", "audit"] {
        let mut matcher = tenant_matcher.for_request(tenant, &user.groups);
        matcher.to_mut().migrate_schema(&otel_selector());
        let key = checked_cache_key(
            &user,
            &read_logs(tenant),
            Some(&*matcher),
            MAX_CACHE_KEY_LENGTH,
        );
        assert!(key.is_ok(), "{tenant}: {key:?}");
    }
}

#[test]
fn test_shared_matcher_across_threads() {
    let tenant_matcher = Arc::new(MatcherConfig::from_yaml(CONFIG).unwrap().to_matcher());
    let user = subject("testuser-0", &["system:authenticated"]);
    let expected_otel = request_key(&tenant_matcher, "application", &user, &otel_selector());
    let expected_legacy = request_key(&tenant_matcher, "application", &user, &HashMap::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let tenant_matcher = Arc::clone(&tenant_matcher);
            let user = user.clone();
            thread::spawn(move || {
                let selectors = if i % 2 == 0 { otel_selector() } else { HashMap::new() };
                (0..100)
                    .map(|_| request_key(&tenant_matcher, "application", &user, &selectors))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let expected = if i % 2 == 0 { &expected_otel } else { &expected_legacy };
        for key in handle.join().unwrap() {
            assert_eq!(&key, expected);
        }
    }

    assert_eq!(tenant_matcher.keys().len(), 2);
    assert_ne!(
        matcher_fingerprint(Some(&*tenant_matcher)),
        matcher_fingerprint(None)
    );
}
