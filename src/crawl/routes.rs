// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Route-seed expansion from a client-side route table
//!
//! Pattern-matches `path: '...'` / `path="..."` string literals out of a
//! React/Vue router source file and turns them into crawlable seed URLs.
//! Dynamic segments (`/orders/:id`) expand as the cartesian product of
//! known parameter values, and values are learned back from URLs observed
//! during the crawl.
//!
//! This is a best-effort heuristic, not a parser: paths assembled from
//! runtime expressions or constants are invisible to it. Callers must treat
//! the output as extra coverage, never as ground truth.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::RouteOptions;
use crate::error::{Error, Result};

/// Values that mean "no value" in a path segment
const SENTINEL_VALUES: &[&str] = &["undefined", "null", "none", "nan"];

/// Known values for dynamic route parameters, by parameter name
///
/// Grows monotonically over a run: merging never removes a value. Sentinel
/// values ("undefined", "null", empty) are rejected at insertion.
#[derive(Debug, Clone, Default)]
pub struct ParamValues {
    values: BTreeMap<String, BTreeSet<String>>,
}

impl ParamValues {
    /// Empty value table
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from configured parameter values, filtering sentinels
    pub fn from_config(seed: &BTreeMap<String, Vec<String>>) -> Self {
        let mut values = Self::new();
        for (name, list) in seed {
            for value in list {
                values.insert(name, value);
            }
        }
        values
    }

    /// Whether a raw value counts as "no value"
    pub fn is_sentinel(value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty() || SENTINEL_VALUES.iter().any(|s| trimmed.eq_ignore_ascii_case(s))
    }

    /// Record one observed value; returns true if it was new
    pub fn insert(&mut self, name: &str, value: &str) -> bool {
        if Self::is_sentinel(value) {
            return false;
        }
        self.values
            .entry(name.to_string())
            .or_default()
            .insert(value.trim().to_string())
    }

    /// Merge another table in, keeping everything already known
    ///
    /// Returns the number of values that were new.
    pub fn merge(&mut self, other: &ParamValues) -> usize {
        let mut added = 0;
        for (name, list) in &other.values {
            for value in list {
                if self.insert(name, value) {
                    added += 1;
                }
            }
        }
        added
    }

    /// Known values for a parameter, in sorted order
    pub fn get(&self, name: &str) -> Vec<&str> {
        self.values
            .get(name)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether any values are known at all
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Total number of known values across all parameters
    pub fn total(&self) -> usize {
        self.values.values().map(BTreeSet::len).sum()
    }
}

/// Counters describing one expansion pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionStats {
    /// Paths extracted from the route table
    pub total_paths: usize,
    /// Paths with no dynamic segments
    pub static_paths: usize,
    /// Paths with at least one dynamic segment
    pub dynamic_paths: usize,
    /// URLs produced by dynamic expansion
    pub dynamic_expanded: usize,
    /// Dynamic paths whose cartesian product hit the per-path cap
    pub capped_paths: usize,
}

/// A parsed route table: extracted paths plus compiled dynamic matchers
#[derive(Debug, Clone)]
pub struct RouteSet {
    /// Extracted paths, leading-slash form, first-seen order
    paths: Vec<String>,
    /// (matcher, parameter names) for each dynamic path
    matchers: Vec<(Regex, Vec<String>)>,
}

impl RouteSet {
    /// Parse route paths out of route-table source text
    pub fn parse(content: &str) -> Self {
        // matches both JSX (path="/x") and object (path: '/x') declarations
        let literal = Regex::new(r#"path\s*[=:]\s*\{?\s*["']([^"']+)["']"#)
            .expect("route literal pattern is valid");

        let mut seen = BTreeSet::new();
        let mut paths = Vec::new();
        for cap in literal.captures_iter(content) {
            let raw = cap[1].trim();
            if raw.is_empty() || raw.contains('*') {
                continue;
            }
            let path = if raw.starts_with('/') {
                raw.to_string()
            } else {
                format!("/{}", raw)
            };
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }

        let matchers = paths
            .iter()
            .filter_map(|path| compile_dynamic_matcher(path))
            .collect();

        Self { paths, matchers }
    }

    /// Parse a route table file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::RouteFile {
            path: path.display().to_string(),
            source,
        })?;
        let set = Self::parse(&content);
        debug!(
            file = %path.display(),
            paths = set.paths.len(),
            dynamic = set.matchers.len(),
            "parsed route table"
        );
        Ok(set)
    }

    /// Extracted paths in first-seen order
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Whether the table produced any paths
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Harvest dynamic parameter values from observed URLs
    ///
    /// Each dynamic path compiles to an exact-segment-count matcher; a URL
    /// whose path matches contributes one value per named segment.
    pub fn extract_param_values<'a>(&self, urls: impl IntoIterator<Item = &'a str>) -> ParamValues {
        let mut collected = ParamValues::new();
        for url in urls {
            let path = match Url::parse(url) {
                Ok(parsed) => parsed.path().to_string(),
                Err(_) => continue,
            };
            for (matcher, params) in &self.matchers {
                let caps = match matcher.captures(&path) {
                    Some(caps) => caps,
                    None => continue,
                };
                for (i, name) in params.iter().enumerate() {
                    if let Some(value) = caps.get(i + 1) {
                        collected.insert(name, value.as_str());
                    }
                }
            }
        }
        collected
    }

    /// Expand the table into seed URLs against an origin
    ///
    /// Static paths emit one URL each. Dynamic paths emit the cartesian
    /// product of known values per segment, bounded by
    /// `options.max_expansions_per_path`; a path with a value-less segment
    /// is skipped entirely (the `skip_missing` flag does not change this:
    /// both branches skip, matching the long-standing behavior).
    pub fn expand(
        &self,
        origin: &Url,
        params: &ParamValues,
        options: &RouteOptions,
    ) -> (Vec<String>, ExpansionStats) {
        let mut stats = ExpansionStats {
            total_paths: self.paths.len(),
            ..Default::default()
        };
        let mut seen = BTreeSet::new();
        let mut urls = Vec::new();

        let push = |path: &str, seen: &mut BTreeSet<String>, urls: &mut Vec<String>| {
            if let Ok(url) = origin.join(path) {
                let url = url.to_string();
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
        };

        for path in &self.paths {
            let segments = dynamic_params(path);
            if segments.is_empty() {
                stats.static_paths += 1;
                push(path, &mut seen, &mut urls);
                continue;
            }

            stats.dynamic_paths += 1;
            if !options.include_dynamic {
                continue;
            }

            let value_lists: Vec<Vec<&str>> = segments.iter().map(|p| params.get(p)).collect();
            if value_lists.iter().any(Vec::is_empty) {
                // no placeholder emission in either skip_missing branch
                continue;
            }

            let combos = cartesian(&value_lists, options.max_expansions_per_path);
            if combos.capped {
                stats.capped_paths += 1;
                warn!(
                    path = %path,
                    cap = options.max_expansions_per_path,
                    "dynamic expansion capped"
                );
            }
            for combo in combos.rows {
                let expanded = substitute(path, &segments, &combo);
                stats.dynamic_expanded += 1;
                push(&expanded, &mut seen, &mut urls);
            }
        }

        (urls, stats)
    }
}

/// Named dynamic segments of a path, in order
fn dynamic_params(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix(':'))
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .collect()
}

/// Compile a dynamic path into an exact-segment-count matcher
fn compile_dynamic_matcher(path: &str) -> Option<(Regex, Vec<String>)> {
    let params = dynamic_params(path);
    if params.is_empty() || path == "/" {
        return None;
    }

    let pattern: Vec<String> = path
        .trim_matches('/')
        .split('/')
        .map(|segment| {
            if segment.starts_with(':') {
                "([^/]+)".to_string()
            } else {
                regex::escape(segment)
            }
        })
        .collect();

    let regex = Regex::new(&format!("^/{}$", pattern.join("/"))).ok()?;
    Some((regex, params))
}

/// Replace dynamic segments with concrete values, position by position
fn substitute(path: &str, params: &[String], values: &[&str]) -> String {
    let mut next = 0;
    let substituted: Vec<String> = path
        .split('/')
        .map(|segment| {
            if segment.strip_prefix(':').is_some_and(|n| !n.is_empty()) {
                let value = values.get(next).copied().unwrap_or(segment);
                next += 1;
                value.to_string()
            } else {
                segment.to_string()
            }
        })
        .collect();
    debug_assert_eq!(next, params.len());
    substituted.join("/")
}

struct Cartesian<'a> {
    rows: Vec<Vec<&'a str>>,
    capped: bool,
}

/// Cartesian product of value lists, bounded by `cap` rows
fn cartesian<'a>(lists: &[Vec<&'a str>], cap: usize) -> Cartesian<'a> {
    let mut rows = Vec::new();
    let mut indices = vec![0usize; lists.len()];
    let mut capped = false;

    'outer: loop {
        if cap > 0 && rows.len() >= cap {
            capped = true;
            break;
        }
        rows.push(
            indices
                .iter()
                .zip(lists)
                .map(|(&i, list)| list[i])
                .collect(),
        );
        // odometer increment, most-significant list first
        for pos in (0..lists.len()).rev() {
            indices[pos] += 1;
            if indices[pos] < lists[pos].len() {
                continue 'outer;
            }
            indices[pos] = 0;
        }
        break;
    }

    Cartesian { rows, capped }
}
