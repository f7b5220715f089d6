use reqwest::Url;
use std::collections::HashSet;
use std::fmt;
use tracing::info;

use crate::error::{GatewayError, Result};

// Reference deployment: every service lives on the same backend authority
pub const DEFAULT_ROUTES: &[&str] = &[
    "/auth=localhost:3333/auth",
    "/users=localhost:3333/users",
    "/chats=localhost:3333/chats",
    "/payment=localhost:3333/payment",
];

/// One prefix route: requests under `prefix` go to `target` with the prefix
/// stripped from their path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    prefix: String,
    target: Url,
}

impl RouteEntry {
    pub fn new(prefix: &str, target: &str) -> Result<Self> {
        let prefix = prefix.trim();
        if !prefix.starts_with('/') {
            return Err(GatewayError::InvalidRoute(format!(
                "prefix '{prefix}' must start with '/'"
            )));
        }

        // add http:// if not present
        let target = target.trim();
        let full_target = if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            format!("http://{target}")
        };
        let target = Url::parse(&full_target)
            .map_err(|e| GatewayError::InvalidRoute(format!("target '{full_target}': {e}")))?;
        if target.host_str().is_none() {
            return Err(GatewayError::InvalidRoute(format!(
                "target '{full_target}' has no host"
            )));
        }

        Ok(Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            target,
        })
    }

    // "PREFIX=TARGET", e.g. "/auth=localhost:3333/auth"
    pub fn parse(spec: &str) -> Result<Self> {
        let (prefix, target) = spec.split_once('=').ok_or_else(|| {
            GatewayError::InvalidRoute(format!("'{spec}' is not of the form PREFIX=TARGET"))
        })?;
        Self::new(prefix, target)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    // Matches on a segment boundary: "/auth" takes "/auth" and "/auth/x", not "/authx"
    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.prefix.is_empty(),
            None => false,
        }
    }

    /// Path sent upstream: the matched prefix removed once from the front.
    pub fn rewrite<'a>(&self, path: &'a str) -> &'a str {
        path.strip_prefix(self.prefix.as_str()).unwrap_or(path)
    }

    /// Full upstream URL: target base path + rewritten path + original query.
    pub fn upstream_url(&self, path: &str, query: Option<&str>) -> Url {
        let base = self.target.path().trim_end_matches('/');
        let mut url = self.target.clone();
        url.set_path(&format!("{base}{}", self.rewrite(path)));
        url.set_query(query);
        url
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.prefix, self.target)
    }
}

/// Ordered, immutable set of routes. First match wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.prefix.as_str()) {
                return Err(GatewayError::InvalidRoute(format!(
                    "duplicate prefix '{}'",
                    entry.prefix
                )));
            }
        }

        info!("Route table initialized with {} routes:", entries.len());
        for (i, entry) in entries.iter().enumerate() {
            info!("  [{}]  {}", i + 1, entry);
        }

        Ok(Self { entries })
    }

    pub fn from_specs<S: AsRef<str>>(specs: &[S]) -> Result<Self> {
        let entries = specs
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .map(RouteEntry::parse)
            .collect::<Result<Vec<_>>>()?;
        Self::new(entries)
    }

    pub fn resolve(&self, path: &str) -> Option<&RouteEntry> {
        self.entries.iter().find(|entry| entry.matches(path))
    }
}
