// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session result models
//!
//! One [`TestSession`] per run, one [`PageResult`] per tested page. A page
//! result is immutable once its page finishes testing; the aggregate
//! counters are computed, never stored.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::crawl::ExpansionStats;
use crate::error::Result;
use crate::report::explain::Explanation;

/// Outcome of a page or element test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Warning,
    Failed,
    Skipped,
}

impl TestStatus {
    /// Lowercase name for reports
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Warning => "warning",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
        }
    }
}

/// A flagged network response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkError {
    /// Response URL
    pub url: String,
    /// Request method
    pub method: String,
    /// Status code
    pub status_code: u16,
    /// Status text
    pub status_text: String,
    /// When it was captured
    pub timestamp: String,
    /// What it means and what to do about it
    pub explanation: Explanation,
}

/// A flagged console or page error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleError {
    /// Message text
    pub message: String,
    /// Category: "error", "pageerror", "warning"
    pub error_type: String,
    /// Script URL that emitted it, when known
    pub source: String,
    /// Line number, when known
    pub line_number: u32,
    /// When it was captured
    pub timestamp: String,
    /// What it means and what to do about it
    pub explanation: Explanation,
}

/// Outcome of exercising one interactive element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementResult {
    /// Element category
    pub element_type: String,
    /// Human-readable label
    pub element_text: String,
    /// Best-effort selector
    pub element_selector: String,
    /// Action performed ("click", "focus (editable)", ...)
    pub action: String,
    /// Outcome
    pub status: TestStatus,
    /// Why it failed or was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Screenshot captured on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
    /// Where a navigation side effect went
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigated_to: Option<String>,
    /// When the element was tested
    pub timestamp: String,
    /// Explanation, attached to failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
}

impl ElementResult {
    /// A fresh result in passed state
    pub fn new(
        element_type: impl Into<String>,
        element_text: impl Into<String>,
        element_selector: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            element_type: element_type.into(),
            element_text: element_text.into(),
            element_selector: element_selector.into(),
            action: action.into(),
            status: TestStatus::Passed,
            error_message: None,
            screenshot_path: None,
            navigated_to: None,
            timestamp: now(),
            explanation: None,
        }
    }
}

/// Everything observed on one tested page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// Normalized page URL
    pub url: String,
    /// Page title
    pub title: String,
    /// Aggregate status
    pub status: TestStatus,
    /// Page load time
    pub load_time_ms: u64,
    /// Load failure message, when navigation itself failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
    /// Flagged network responses
    pub network_errors: Vec<NetworkError>,
    /// Flagged console messages
    pub console_errors: Vec<ConsoleError>,
    /// Per-element outcomes
    pub element_results: Vec<ElementResult>,
    /// Valid, normalized, unvisited links found on the page
    pub discovered_links: Vec<String>,
    /// Label of whatever discovered this page
    pub discovered_from: String,
    /// Link depth from the seeds
    pub crawl_depth: u32,
    /// Module this page resolved to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// When testing started
    pub timestamp: String,
}

impl PageResult {
    /// A fresh result for a page about to be tested
    pub fn new(url: impl Into<String>, discovered_from: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            status: TestStatus::Passed,
            load_time_ms: 0,
            load_error: None,
            network_errors: Vec::new(),
            console_errors: Vec::new(),
            element_results: Vec::new(),
            discovered_links: Vec::new(),
            discovered_from: discovered_from.into(),
            crawl_depth: depth,
            module: None,
            timestamp: now(),
        }
    }

    /// Number of elements tested
    pub fn total_elements_tested(&self) -> usize {
        self.element_results.len()
    }

    /// Elements that passed
    pub fn elements_passed(&self) -> usize {
        self.count_elements(TestStatus::Passed)
    }

    /// Elements that failed
    pub fn elements_failed(&self) -> usize {
        self.count_elements(TestStatus::Failed)
    }

    /// Elements skipped at preflight
    pub fn elements_skipped(&self) -> usize {
        self.count_elements(TestStatus::Skipped)
    }

    /// Whether anything on the page went wrong
    pub fn has_errors(&self) -> bool {
        !self.network_errors.is_empty()
            || !self.console_errors.is_empty()
            || self.elements_failed() > 0
            || self.load_error.is_some()
    }

    fn count_elements(&self, status: TestStatus) -> usize {
        self.element_results
            .iter()
            .filter(|e| e.status == status)
            .count()
    }
}

/// One step of the crawl-path trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStep {
    /// 1-based step number
    pub step_number: usize,
    /// Page URL
    pub url: String,
    /// Page title
    pub title: String,
    /// Where it was discovered
    pub discovered_from: String,
    /// Page status
    pub status: TestStatus,
    /// How many new links the page yielded
    pub links_found: usize,
    /// Resolved module, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

/// One full run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSession {
    /// Target site
    pub website_url: String,
    /// Single-module filter, when one was active
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_module: Option<String>,
    /// Run start, RFC 3339
    pub started_at: String,
    /// Run end, RFC 3339
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    /// Route-seed expansion counters, when a route table was used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_seed_stats: Option<ExpansionStats>,
    /// Per-page results in test order
    pub pages: Vec<PageResult>,
    /// Ordered crawl-path trace
    pub crawl_path: Vec<CrawlStep>,
}

impl TestSession {
    /// Start a new session
    pub fn new(website_url: impl Into<String>) -> Self {
        Self {
            website_url: website_url.into(),
            single_module: None,
            started_at: now(),
            finished_at: None,
            route_seed_stats: None,
            pages: Vec::new(),
            crawl_path: Vec::new(),
        }
    }

    /// Stamp the end of the run
    pub fn finish(&mut self) {
        self.finished_at = Some(now());
    }

    /// Total pages tested
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// Pages with any error
    pub fn pages_with_errors(&self) -> usize {
        self.pages.iter().filter(|p| p.has_errors()).count()
    }

    /// Total flagged network responses
    pub fn total_network_errors(&self) -> usize {
        self.pages.iter().map(|p| p.network_errors.len()).sum()
    }

    /// Total flagged console messages
    pub fn total_console_errors(&self) -> usize {
        self.pages.iter().map(|p| p.console_errors.len()).sum()
    }

    /// Total elements exercised
    pub fn total_element_tests(&self) -> usize {
        self.pages.iter().map(|p| p.total_elements_tested()).sum()
    }

    /// Total element failures
    pub fn total_element_failures(&self) -> usize {
        self.pages.iter().map(|p| p.elements_failed()).sum()
    }

    /// Run duration in seconds, zero until finished
    pub fn duration_seconds(&self) -> f64 {
        let finished = match self.finished_at {
            Some(ref finished) => finished,
            None => return 0.0,
        };
        match (
            DateTime::parse_from_rfc3339(&self.started_at),
            DateTime::parse_from_rfc3339(finished),
        ) {
            (Ok(start), Ok(end)) => (end - start).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        }
    }

    /// Write the session as pretty JSON next to the report
    pub fn save_json(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join("session_data.json");
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

fn now() -> String {
    Local::now().to_rfc3339()
}
