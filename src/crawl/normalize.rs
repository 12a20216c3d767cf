// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! URL normalization and crawl validity checks
//!
//! Two URLs that should be treated as the same page must normalize to the
//! same string, and normalizing an already-normalized URL is a no-op. The
//! normalizer itself accepts cross-origin URLs; rejecting them is the
//! validity check's job.

use url::Url;

use crate::config::{CrawlOptions, ExerciserConfig};
use crate::crawl::ModuleMap;

/// Normalization and validity context for one run
#[derive(Debug, Clone)]
pub struct UrlContext {
    /// Target origin scheme
    scheme: String,
    /// Target origin host
    host: String,
    /// Keep query strings in the normalized form
    include_query: bool,
    /// Keep hash fragments in the normalized form
    include_hash: bool,
    /// Lowercased exclusion substrings
    excluded: Vec<String>,
    /// Active single-module filter, when set
    module_filter: Option<(String, ModuleMap)>,
}

impl UrlContext {
    /// Build a context from the run configuration
    pub fn from_config(config: &ExerciserConfig, origin: &Url) -> Self {
        Self::new(origin, &config.crawl, &config.excluded_url_patterns)
    }

    /// Build a context from an origin and crawl options
    pub fn new(origin: &Url, crawl: &CrawlOptions, excluded_patterns: &[String]) -> Self {
        Self {
            scheme: origin.scheme().to_string(),
            host: host_with_port(origin),
            include_query: crawl.include_query_params,
            include_hash: crawl.include_hash,
            excluded: excluded_patterns.iter().map(|p| p.to_lowercase()).collect(),
            module_filter: None,
        }
    }

    /// Restrict validity to URLs inside one module
    pub fn with_module_filter(mut self, name: impl Into<String>, modules: ModuleMap) -> Self {
        self.module_filter = Some((name.into(), modules));
        self
    }

    /// Resolve a raw URL against the page it was found on
    pub fn resolve(&self, base_url: &str, raw: &str) -> Option<Url> {
        if raw.is_empty() {
            return None;
        }
        match Url::parse(raw) {
            Ok(absolute) => Some(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(base_url).ok()?.join(raw).ok()
            }
            Err(_) => None,
        }
    }

    /// Canonical string key for a URL, resolved against its base page
    ///
    /// scheme://host/path, plus query/hash when retained, with a single
    /// trailing slash stripped unless the path is root.
    pub fn normalize(&self, base_url: &str, raw: &str) -> Option<String> {
        let resolved = self.resolve(base_url, raw)?;
        let host = resolved.host_str()?;

        let mut normalized = format!("{}://{}", resolved.scheme(), host);
        if let Some(port) = resolved.port() {
            normalized.push(':');
            normalized.push_str(&port.to_string());
        }
        let root_len = normalized.len() + 1;
        normalized.push_str(resolved.path());

        if self.include_query {
            if let Some(query) = resolved.query() {
                if !query.is_empty() {
                    normalized.push('?');
                    normalized.push_str(query);
                }
            }
        }
        if self.include_hash {
            if let Some(fragment) = resolved.fragment() {
                if !fragment.is_empty() {
                    normalized.push('#');
                    normalized.push_str(fragment);
                }
            }
        }

        if normalized.ends_with('/') && normalized.len() > root_len {
            normalized.pop();
        }

        Some(normalized)
    }

    /// Whether a discovered URL should enter the crawl
    ///
    /// Rejects non-http(s) schemes, cross-origin URLs, exclusion-pattern
    /// matches, and (for single-module runs) URLs outside the module.
    pub fn is_valid(&self, base_url: &str, raw: &str) -> bool {
        let resolved = match self.resolve(base_url, raw) {
            Some(url) => url,
            None => return false,
        };

        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            return false;
        }
        if resolved.scheme() != self.scheme {
            return false;
        }
        if host_with_port(&resolved) != self.host {
            return false;
        }

        let lower = resolved.as_str().to_lowercase();
        if self.excluded.iter().any(|p| !p.is_empty() && lower.contains(p)) {
            return false;
        }

        if let Some((ref name, ref modules)) = self.module_filter {
            if !modules.contains(resolved.as_str(), name) {
                return false;
            }
        }

        true
    }

    /// Whether a URL stays on the target origin (scheme and host match)
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.scheme() == self.scheme && host_with_port(url) == self.host
    }

    /// The active single-module name, when set
    pub fn module_filter(&self) -> Option<&str> {
        self.module_filter.as_ref().map(|(name, _)| name.as_str())
    }
}

fn host_with_port(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}
