//! Route lookup.
//!
//! # Responsibilities
//! - Store prefix rules in evaluation order
//! - Resolve a request path to a pool and the path to forward
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) prefix scan, first match wins
//! - A fallback pool always exists, so lookup never fails

use std::sync::Arc;

use thiserror::Error;

use crate::load_balancer::pool::BackendPool;
use crate::routing::matcher::PathPrefixMatcher;

/// Name the fallback route reports in logs and metrics.
pub const DEFAULT_ROUTE: &str = "default";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("route {name:?}: prefix {prefix:?} must name a non-root path")]
    InvalidPrefix { name: String, prefix: String },

    #[error("route {0:?} is defined twice")]
    DuplicateName(String),
}

#[derive(Debug)]
struct RoutingRule {
    name: String,
    matcher: PathPrefixMatcher,
    pool: Arc<BackendPool>,
}

/// Result of a lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub name: &'a str,
    pub pool: &'a Arc<BackendPool>,
    /// Path to send upstream: prefix stripped for prefix rules.
    pub path: String,
}

#[derive(Debug)]
pub struct RoutingTable {
    rules: Vec<RoutingRule>,
    fallback: Arc<BackendPool>,
}

impl RoutingTable {
    pub fn new(fallback: Arc<BackendPool>) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    /// Append a prefix rule. Rules are evaluated in insertion order, all
    /// before the fallback.
    pub fn with_prefix(
        mut self,
        name: impl Into<String>,
        prefix: &str,
        pool: Arc<BackendPool>,
    ) -> Result<Self, RoutingError> {
        let name = name.into();
        if name == DEFAULT_ROUTE || self.rules.iter().any(|r| r.name == name) {
            return Err(RoutingError::DuplicateName(name));
        }
        let matcher = PathPrefixMatcher::new(prefix).ok_or_else(|| RoutingError::InvalidPrefix {
            name: name.clone(),
            prefix: prefix.to_string(),
        })?;

        tracing::debug!(route = %name, prefix = %matcher.prefix(), "Registered prefix route");
        self.rules.push(RoutingRule { name, matcher, pool });
        Ok(self)
    }

    pub fn route(&self, path: &str) -> RouteMatch<'_> {
        let path = if path.is_empty() { "/" } else { path };

        for rule in &self.rules {
            if let Some(stripped) = rule.matcher.strip(path) {
                return RouteMatch {
                    name: &rule.name,
                    pool: &rule.pool,
                    path: stripped,
                };
            }
        }

        RouteMatch {
            name: DEFAULT_ROUTE,
            pool: &self.fallback,
            path: path.to_string(),
        }
    }

    /// Every pool with its route name, fallback first.
    pub fn pools(&self) -> Vec<(String, Arc<BackendPool>)> {
        std::iter::once((DEFAULT_ROUTE.to_string(), self.fallback.clone()))
            .chain(self.rules.iter().map(|r| (r.name.clone(), r.pool.clone())))
            .collect()
    }

    /// `(name, prefix)` for each prefix rule, in evaluation order.
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules.iter().map(|r| (r.name.as_str(), r.matcher.prefix()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::probe::TcpProbe;
    use std::time::Duration;

    fn pool(port: u16) -> Arc<BackendPool> {
        Arc::new(
            BackendPool::new("127.0.0.1", vec![port], "/health", Duration::from_secs(1), Arc::new(TcpProbe))
                .unwrap(),
        )
    }

    #[test]
    fn tenant_prefix_is_stripped() {
        let table = RoutingTable::new(pool(9000))
            .with_prefix("tenant", "/tenant", pool(9100))
            .unwrap();

        let hit = table.route("/tenant/foo");
        assert_eq!(hit.name, "tenant");
        assert_eq!(hit.pool.candidates(), &[9100]);
        assert_eq!(hit.path, "/foo");

        let exact = table.route("/tenant");
        assert_eq!(exact.name, "tenant");
        assert_eq!(exact.path, "/");
    }

    #[test]
    fn other_paths_fall_back_unchanged() {
        let table = RoutingTable::new(pool(9000))
            .with_prefix("tenant", "/tenant/", pool(9100))
            .unwrap();

        for path in ["/other", "/tenantx/a", "/"] {
            let hit = table.route(path);
            assert_eq!(hit.name, DEFAULT_ROUTE);
            assert_eq!(hit.pool.candidates(), &[9000]);
            assert_eq!(hit.path, path);
        }
        assert_eq!(table.route("").path, "/");
    }

    #[test]
    fn first_matching_prefix_wins() {
        let table = RoutingTable::new(pool(9000))
            .with_prefix("outer", "/a", pool(9001))
            .unwrap()
            .with_prefix("inner", "/a/b", pool(9002))
            .unwrap();

        assert_eq!(table.route("/a/b/c").name, "outer");
        assert_eq!(table.route("/a/b/c").path, "/b/c");
    }

    #[test]
    fn root_prefix_rejected() {
        let err = RoutingTable::new(pool(9000))
            .with_prefix("tenant", "/", pool(9100))
            .unwrap_err();
        assert!(matches!(err, RoutingError::InvalidPrefix { .. }));
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = RoutingTable::new(pool(9000))
            .with_prefix("default", "/x", pool(9100))
            .unwrap_err();
        assert_eq!(err, RoutingError::DuplicateName("default".into()));
    }

    #[test]
    fn pools_lists_fallback_first() {
        let table = RoutingTable::new(pool(9000))
            .with_prefix("tenant", "/tenant", pool(9100))
            .unwrap();
        let names: Vec<_> = table.pools().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["default", "tenant"]);
        assert_eq!(table.prefixes().collect::<Vec<_>>(), vec![("tenant", "/tenant")]);
    }
}
