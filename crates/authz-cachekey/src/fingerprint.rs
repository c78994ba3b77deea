//! Decision-cache key generation
//!
//! Folds the authorization-relevant parts of a request (subject, action and
//! the effective [`Matcher`]) into one deterministic string. The key never
//! contains the raw credential.

use crate::digest::sha256_hex_concat;
use crate::matcher::Matcher;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Longest key accepted by memcached-style backends
pub const MAX_CACHE_KEY_LENGTH: usize = 250;

/// Matcher fingerprint used when no label matching applies
pub const EMPTY_MATCHER_FINGERPRINT: &str = "m:empty";

/// Request verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    List,
    Watch,
    Create,
    Update,
    Patch,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::List => "list",
            Verb::Watch => "watch",
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown verb {0:?}")]
pub struct UnknownVerb(pub String);

impl FromStr for Verb {
    type Err = UnknownVerb;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Verb::Get),
            "list" => Ok(Verb::List),
            "watch" => Ok(Verb::Watch),
            "create" => Ok(Verb::Create),
            "update" => Ok(Verb::Update),
            "patch" => Ok(Verb::Patch),
            "delete" => Ok(Verb::Delete),
            _ => Err(UnknownVerb(s.to_string())),
        }
    }
}

/// Who is making the request
#[derive(Clone, PartialEq, Eq)]
pub struct Subject {
    /// Bearer token; only ever hashed
    pub credential: String,
    pub username: String,
    /// Group memberships, in any order
    pub groups: Vec<String>,
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("credential", &"<redacted>")
            .field("username", &self.username)
            .field("groups", &self.groups)
            .finish()
    }
}

/// What the request wants to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub verb: Verb,
    pub resource: String,
    pub resource_name: String,
    pub api_group: String,
    /// Kept in the given order; callers canonicalize if order must not matter
    pub namespaces: Vec<String>,
    pub metadata_only: bool,
}

/// Error for keys the cache backend would reject
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheKeyError {
    #[error("cache key is {len} bytes, exceeding the {max} byte limit")]
    KeyTooLong { len: usize, max: usize },
}

/// `username:hex(sha256(credential ‖ username ‖ sorted groups))`
///
/// Fields are hashed without separators.
pub fn identity_fingerprint<S: AsRef<str>>(
    credential: &str,
    username: &str,
    groups: &[S],
) -> String {
    let mut sorted: Vec<&str> = groups.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let digest = sha256_hex_concat([credential, username].into_iter().chain(sorted));
    format!("{}:{}", username, digest)
}

/// `m:hex(sha256(sorted keys))`, or `m:empty` when there is nothing to match
pub fn matcher_fingerprint(matcher: Option<&Matcher>) -> String {
    let Some(matcher) = matcher.filter(|m| !m.is_empty()) else {
        return EMPTY_MATCHER_FINGERPRINT.to_string();
    };

    let mut keys: Vec<&str> = matcher.keys().iter().map(String::as_str).collect();
    keys.sort_unstable();

    format!("m:{}", sha256_hex_concat(keys))
}

/// Build the decision-cache key for a request
///
/// Layout: `verb,metadataOnly,apiGroup,resourceName,resource,ns1:ns2,identity,matcher`.
/// The length is not checked; see [`checked_cache_key`].
pub fn cache_key(subject: &Subject, action: &Action, matcher: Option<&Matcher>) -> String {
    let identity = identity_fingerprint(&subject.credential, &subject.username, &subject.groups);
    let matcher = matcher_fingerprint(matcher);
    let metadata_only = if action.metadata_only { "true" } else { "false" };
    let namespaces = action.namespaces.join(":");

    [
        action.verb.as_str(),
        metadata_only,
        action.api_group.as_str(),
        action.resource_name.as_str(),
        action.resource.as_str(),
        namespaces.as_str(),
        identity.as_str(),
        matcher.as_str(),
    ]
    .join(",")
}

/// Like [`cache_key`], but rejects keys longer than `max_len` bytes
///
/// Callers typically skip caching for the request on error.
pub fn checked_cache_key(
    subject: &Subject,
    action: &Action,
    matcher: Option<&Matcher>,
    max_len: usize,
) -> Result<String, CacheKeyError> {
    let key = cache_key(subject, action, matcher);
    if key.len() > max_len {
        debug!(
            user = %subject.username,
            len = key.len(),
            max = max_len,
            "cache key too long, not caching"
        );
        return Err(CacheKeyError::KeyTooLong {
            len: key.len(),
            max: max_len,
        });
    }
    Ok(key)
}
