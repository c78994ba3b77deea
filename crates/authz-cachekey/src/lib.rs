//! authz-cachekey: decision-cache keys for an authorization policy-decision point
//!
//! Policy evaluation is expensive, so callers memoize decisions in an external
//! cache. This crate derives the cache key: a short, deterministic string that
//! captures every authorization-relevant field of a request and nothing else.
//!
//! # Components
//!
//! - **Fingerprint**: folds subject, action and effective matcher into one key
//! - **Matcher**: per-tenant label matcher with tenant/group bypass and
//!   label schema migration
//! - **Config**: builds the base matcher from comma-separated settings
//!
//! # Example
//!
//! ```rust
//! use authz_cachekey::prelude::*;
//! use std::collections::HashMap;
//!
//! let config = MatcherConfig::from_yaml(
//!     "matcher: kubernetes_namespace_name,k8s_namespace_name\n\
//!      matcherAdminGroups: system:cluster-admins\n",
//! )
//! .unwrap();
//! let tenant_matcher = config.to_matcher();
//!
//! let subject = Subject {
//!     credential: "sha256~token".to_string(),
//!     username: "testuser-0".to_string(),
//!     groups: vec!["system:authenticated".to_string()],
//! };
//! let action = Action {
//!     verb: Verb::Get,
//!     resource: "logs".to_string(),
//!     resource_name: "application".to_string(),
//!     api_group: "loki.grafana.com".to_string(),
//!     namespaces: vec!["log-test-0".to_string()],
//!     metadata_only: false,
//! };
//!
//! let mut matcher = tenant_matcher.for_request("application", &subject.groups);
//! matcher.to_mut().migrate_schema(&HashMap::new());
//!
//! let key = checked_cache_key(&subject, &action, Some(&*matcher), MAX_CACHE_KEY_LENGTH).unwrap();
//! assert!(key.starts_with("get,false,loki.grafana.com,application,logs,log-test-0,testuser-0:"));
//! ```

pub mod config;
pub mod digest;
pub mod fingerprint;
pub mod matcher;

// Re-export public types
pub use config::{parse_csv_set, MatcherConfig};
pub use digest::sha256_hex_concat;
pub use fingerprint::{
    cache_key, checked_cache_key, identity_fingerprint, matcher_fingerprint, Action,
    CacheKeyError, Subject, UnknownVerb, Verb, EMPTY_MATCHER_FINGERPRINT, MAX_CACHE_KEY_LENGTH,
};
pub use matcher::{
    Matcher, MatcherOp, MatcherOpError, SchemaMigration, LEGACY_NAMESPACE_KEY,
    OTEL_NAMESPACE_KEY, VIAQ_TO_OTEL,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::MatcherConfig;
    pub use crate::fingerprint::{
        cache_key, checked_cache_key, Action, CacheKeyError, Subject, Verb, MAX_CACHE_KEY_LENGTH,
    };
    pub use crate::matcher::{Matcher, MatcherOp};
}
