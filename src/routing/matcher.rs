//! Path prefix matching.
//!
//! # Design Decisions
//! - Matching is on whole path segments: `/api` matches `/api` and
//!   `/api/x`, never `/apix`
//! - Path matching is case-sensitive
//! - No regex in the hot path

/// Matches a request path against one normalized prefix and strips it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Normalize `prefix` (trailing `/` trimmed, leading `/` ensured).
    ///
    /// Returns `None` when nothing is left to match on, i.e. for `""` or `"/"`.
    pub fn new(prefix: &str) -> Option<Self> {
        let trimmed = prefix.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        let prefix = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        Some(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// The path with the prefix removed, or `None` when it does not match.
    ///
    /// An exact match strips to `/`.
    pub fn strip(&self, path: &str) -> Option<String> {
        if !self.matches(path) {
            return None;
        }
        let rest = &path[self.prefix.len()..];
        Some(if rest.is_empty() {
            "/".to_string()
        } else {
            rest.to_string()
        })
    }
}
