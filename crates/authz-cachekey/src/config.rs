//! Matcher configuration loading
//!
//! The matcher is configured with comma-separated lists, e.g.
//!
//! ```yaml
//! matcher: kubernetes_namespace_name,k8s_namespace_name
//! matcherOp: or
//! matcherSkipTenants: audit,infrastructure
//! matcherAdminGroups: system:cluster-admins,dedicated-admin
//! ```

use crate::matcher::{Matcher, MatcherOp};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

const LIST_SEPARATOR: char = ',';

/// Raw matcher settings as they appear in the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatcherConfig {
    /// Label keys to enforce (comma-separated)
    pub matcher: String,

    /// How keys are combined: "or" (default) or "and"
    pub matcher_op: MatcherOp,

    /// Tenants that bypass matching (comma-separated)
    pub matcher_skip_tenants: String,

    /// Groups that bypass matching (comma-separated)
    pub matcher_admin_groups: String,
}

impl MatcherConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read matcher config from {}", path.display()))?;

        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: MatcherConfig =
            serde_yaml::from_str(yaml).with_context(|| "Failed to parse matcher config YAML")?;

        Ok(config)
    }

    /// Build the tenant's base matcher
    ///
    /// A `matcher` string that is empty or starts with an empty token yields a
    /// matcher with no keys. Otherwise key tokens are kept verbatim; empty
    /// tokens in the bypass lists are dropped.
    pub fn to_matcher(&self) -> Matcher {
        let mut keys: Vec<&str> = self.matcher.split(LIST_SEPARATOR).collect();
        if !keys.first().is_some_and(|k| !k.is_empty()) {
            keys.clear();
        }

        let matcher = Matcher::new(keys, self.matcher_op)
            .with_skip_tenants(parse_csv_set(&self.matcher_skip_tenants))
            .with_admin_groups(parse_csv_set(&self.matcher_admin_groups));

        debug!(
            keys = ?matcher.keys(),
            op = %matcher.op(),
            "loaded label matcher"
        );

        matcher
    }
}

/// Split a comma-separated list into a set, skipping empty tokens
pub fn parse_csv_set(input: &str) -> HashSet<String> {
    input
        .split(LIST_SEPARATOR)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
