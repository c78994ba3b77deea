//! Label matcher policy
//!
//! A [`Matcher`] lists the label keys that must be injected into downstream
//! queries for a tenant. It is loaded once per tenant and shared read-only
//! between requests; every request works on its own copy obtained from
//! [`Matcher::for_request`].

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Label key used by the legacy (ViaQ) log schema
pub const LEGACY_NAMESPACE_KEY: &str = "kubernetes_namespace_name";

/// Label key used by the OpenTelemetry log schema
pub const OTEL_NAMESPACE_KEY: &str = "k8s_namespace_name";

/// How the matcher keys are combined by the downstream query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MatcherOp {
    /// Any key may match
    #[default]
    Or,
    /// All keys must match
    And,
}

impl MatcherOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatcherOp::Or => "or",
            MatcherOp::And => "and",
        }
    }
}

impl fmt::Display for MatcherOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an operator other than `or` / `and`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown matcher operator {0:?}, expected \"or\" or \"and\"")]
pub struct MatcherOpError(pub String);

impl FromStr for MatcherOp {
    type Err = MatcherOpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "or" => Ok(MatcherOp::Or),
            "and" => Ok(MatcherOp::And),
            _ => Err(MatcherOpError(s.to_string())),
        }
    }
}

impl TryFrom<String> for MatcherOp {
    type Error = MatcherOpError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MatcherOp> for String {
    fn from(op: MatcherOp) -> Self {
        op.as_str().to_string()
    }
}

/// A pair of label key names for the same field under two schemas
///
/// Exactly one of the two should stay in a matcher's keys, depending on
/// which schema the query selectors use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaMigration {
    /// Key name in the schema being phased out
    pub legacy_key: &'static str,
    /// Key name in the schema being phased in
    pub current_key: &'static str,
}

/// Namespace label rename from the ViaQ data model to OpenTelemetry
pub const VIAQ_TO_OTEL: SchemaMigration = SchemaMigration {
    legacy_key: LEGACY_NAMESPACE_KEY,
    current_key: OTEL_NAMESPACE_KEY,
};

/// Per-tenant label matcher configuration
///
/// Cloning copies `keys` and shares the bypass sets, which are never
/// modified after construction. Keys only change through schema migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matcher {
    /// Label keys to enforce; empty means no matching is required
    keys: Vec<String>,
    /// Combination operator, carried through to the query layer
    op: MatcherOp,
    skip_tenants: Arc<HashSet<String>>,
    admin_groups: Arc<HashSet<String>>,
}

impl Matcher {
    /// Create a matcher with no bypass rules
    pub fn new<I, S>(keys: I, op: MatcherOp) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            op,
            ..Default::default()
        }
    }

    /// A matcher that enforces nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Tenants for which matching is bypassed entirely
    pub fn with_skip_tenants<I, S>(mut self, tenants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_tenants = Arc::new(tenants.into_iter().map(Into::into).collect());
        self
    }

    /// Groups whose members bypass matching entirely
    pub fn with_admin_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admin_groups = Arc::new(groups.into_iter().map(Into::into).collect());
        self
    }

    /// Label keys to enforce, in configured order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn op(&self) -> MatcherOp {
        self.op
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.keys.len() == 1
    }

    pub fn skips_tenant(&self, tenant: &str) -> bool {
        self.skip_tenants.contains(tenant)
    }

    pub fn is_admin_group(&self, group: &str) -> bool {
        self.admin_groups.contains(group)
    }

    /// Resolve the effective matcher for one request
    ///
    /// Checks, in order:
    /// 1. already empty: the matcher itself is returned borrowed
    /// 2. `tenant` is a skip tenant: a fresh empty matcher
    /// 3. any of `groups` is an admin group: a fresh empty matcher
    /// 4. otherwise an owned clone the caller may mutate freely
    pub fn for_request<S: AsRef<str>>(&self, tenant: &str, groups: &[S]) -> Cow<'_, Matcher> {
        if self.is_empty() {
            return Cow::Borrowed(self);
        }

        if self.skips_tenant(tenant) {
            debug!(tenant, "tenant bypasses label matching");
            return Cow::Owned(Matcher::empty());
        }

        if let Some(group) = groups
            .iter()
            .map(AsRef::as_ref)
            .find(|g| self.is_admin_group(g))
        {
            debug!(tenant, group, "admin group bypasses label matching");
            return Cow::Owned(Matcher::empty());
        }

        Cow::Owned(self.clone())
    }

    /// Keep only the namespace key matching the schema used by `selectors`
    ///
    /// See [`Matcher::migrate_schema_with`]; uses [`VIAQ_TO_OTEL`].
    pub fn migrate_schema(&mut self, selectors: &HashMap<String, Vec<String>>) {
        self.migrate_schema_with(&VIAQ_TO_OTEL, selectors);
    }

    /// Keep only one of the two schema key names in `keys`
    ///
    /// When `selectors` has a non-empty entry for the current key, the legacy
    /// key is dropped. Otherwise the current key is dropped, which covers both
    /// an explicit legacy selector and no selector at all.
    pub fn migrate_schema_with(
        &mut self,
        migration: &SchemaMigration,
        selectors: &HashMap<String, Vec<String>>,
    ) {
        let current_selected = selectors
            .get(migration.current_key)
            .is_some_and(|vals| !vals.is_empty());

        let stale = if current_selected {
            migration.legacy_key
        } else {
            migration.current_key
        };

        let before = self.keys.len();
        self.keys.retain(|k| k != stale);
        if self.keys.len() != before {
            trace!(removed = stale, remaining = self.keys.len(), "migrated matcher keys");
        }
    }
}
