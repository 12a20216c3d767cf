// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Exerciser configuration
//!
//! Everything has a default; the only value a run cannot start without is
//! the target origin. Loadable from a JSON file, overridable in code via
//! the builder methods.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::crawl::Strategy;
use crate::error::{Error, Result};

/// Top-level exerciser configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExerciserConfig {
    /// Target website URL (origin); required
    pub website_url: String,
    /// Restrict the run to one named module (always forces DFS)
    pub single_module: Option<String>,
    /// Named modules and their seed URLs, in declaration order
    pub modules: Vec<ModuleConfig>,
    /// Login flow options
    pub login: LoginOptions,
    /// Crawl loop options
    pub crawl: CrawlOptions,
    /// Timeouts for driver operations
    pub timeouts: TimeoutOptions,
    /// Discovery expansion options
    pub discovery: DiscoveryOptions,
    /// Network and console error capture options
    pub errors: ErrorCaptureOptions,
    /// Route-seed expansion options
    pub routes: RouteOptions,
    /// Screenshot options
    pub screenshots: ScreenshotOptions,
    /// Browser launch options
    pub browser: BrowserOptions,
    /// Output options
    pub output: OutputOptions,
    /// URL substrings that exclude a link from crawling (case-insensitive)
    pub excluded_url_patterns: Vec<String>,
    /// CSS selectors for elements that must never be interacted with
    pub excluded_element_selectors: Vec<String>,
}

impl Default for ExerciserConfig {
    fn default() -> Self {
        Self {
            website_url: String::new(),
            single_module: None,
            modules: Vec::new(),
            login: LoginOptions::default(),
            crawl: CrawlOptions::default(),
            timeouts: TimeoutOptions::default(),
            discovery: DiscoveryOptions::default(),
            errors: ErrorCaptureOptions::default(),
            routes: RouteOptions::default(),
            screenshots: ScreenshotOptions::default(),
            browser: BrowserOptions::default(),
            output: OutputOptions::default(),
            excluded_url_patterns: default_excluded_url_patterns(),
            excluded_element_selectors: default_excluded_element_selectors(),
        }
    }
}

impl ExerciserConfig {
    /// Create a config with defaults for the given target URL
    pub fn new(website_url: impl Into<String>) -> Self {
        Self {
            website_url: website_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: ExerciserConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Restrict the run to a single module
    pub fn single_module(mut self, name: impl Into<String>) -> Self {
        self.single_module = Some(name.into());
        self
    }

    /// Add a module with its seed URLs
    pub fn module(mut self, name: impl Into<String>, seeds: Vec<String>) -> Self {
        self.modules.push(ModuleConfig {
            name: name.into(),
            seeds,
        });
        self
    }

    /// Set the crawl strategy
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.crawl.strategy = strategy;
        self
    }

    /// Set the page budget
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.crawl.max_pages = max_pages;
        self
    }

    /// Set the depth budget
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.crawl.max_depth = max_depth;
        self
    }

    /// Validate the configuration; must pass before any browser session opens
    pub fn validate(&self) -> Result<()> {
        if self.website_url.is_empty() || self.website_url.contains("your-website") {
            return Err(Error::Config(
                "website_url is not set; point it at the site under test".to_string(),
            ));
        }
        if !self.website_url.starts_with("http://") && !self.website_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "website_url must be http(s), got: {}",
                self.website_url
            )));
        }
        Url::parse(&self.website_url)
            .map_err(|e| Error::Config(format!("website_url does not parse: {}", e)))?;
        if let Some(ref name) = self.single_module {
            if !self.modules.iter().any(|m| &m.name == name) {
                return Err(Error::Config(format!(
                    "single_module '{}' is not a configured module",
                    name
                )));
            }
        }
        if self.crawl.max_pages == 0 {
            return Err(Error::Config("crawl.max_pages must be at least 1".to_string()));
        }
        Ok(())
    }

    /// The parsed target origin
    pub fn origin(&self) -> Result<Url> {
        Ok(Url::parse(&self.website_url)?)
    }

    /// The login URL: explicit, or the target URL
    pub fn login_url(&self) -> &str {
        match self.login.url {
            Some(ref url) if !url.is_empty() => url,
            _ => &self.website_url,
        }
    }
}

/// One named module: a feature area of the site defined by seed URLs
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    /// Module name (unique)
    pub name: String,
    /// Seed URLs; a URL belongs to the module when some seed path
    /// slash-prefixes it
    pub seeds: Vec<String>,
}

/// Login flow options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoginOptions {
    /// Login page URL; empty means the target URL
    pub url: Option<String>,
    /// Seconds to wait for a manual (OTP) login to complete
    pub wait_seconds: u64,
    /// CSS selector whose presence confirms login success
    pub success_selector: Option<String>,
    /// URL keywords that confirm login success
    pub success_url_keywords: Vec<String>,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            url: None,
            wait_seconds: 30,
            success_selector: None,
            success_url_keywords: vec!["dashboard".to_string(), "home".to_string()],
        }
    }
}

/// Crawl loop options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlOptions {
    /// Traversal order; a single-module run forces DFS regardless
    pub strategy: Strategy,
    /// Maximum number of pages to test
    pub max_pages: usize,
    /// Maximum link depth from the seeds
    pub max_depth: u32,
    /// Settle delay after each page load
    pub page_delay_ms: u64,
    /// Settle delay between element interactions
    pub interaction_delay_ms: u64,
    /// Keep query strings when normalizing URLs
    pub include_query_params: bool,
    /// Keep hash fragments when normalizing URLs
    pub include_hash: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Dfs,
            max_pages: 100,
            max_depth: 5,
            page_delay_ms: 1000,
            interaction_delay_ms: 500,
            include_query_params: true,
            include_hash: false,
        }
    }
}

/// Timeouts for driver operations, in milliseconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutOptions {
    /// Page load timeout
    pub page_load_ms: u64,
    /// Element state / action timeout
    pub element_ms: u64,
    /// Navigation-settle timeout
    pub navigation_ms: u64,
    /// How long to wait for a popup after a click
    pub popup_wait_ms: u64,
}

impl Default for TimeoutOptions {
    fn default() -> Self {
        Self {
            page_load_ms: 30_000,
            element_ms: 5_000,
            navigation_ms: 30_000,
            popup_wait_ms: 1_500,
        }
    }
}

impl TimeoutOptions {
    /// Page load timeout as a Duration
    pub fn page_load(&self) -> Duration {
        Duration::from_millis(self.page_load_ms)
    }

    /// Element timeout as a Duration
    pub fn element(&self) -> Duration {
        Duration::from_millis(self.element_ms)
    }

    /// Navigation timeout as a Duration
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    /// Popup wait window as a Duration
    pub fn popup_wait(&self) -> Duration {
        Duration::from_millis(self.popup_wait_ms)
    }
}

/// Discovery expansion options: open menus and scroll before scanning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryOptions {
    /// Click collapsed navigation toggles to reveal hidden links
    pub expand_nav: bool,
    /// Upper bound on expansion clicks per page
    pub max_expand_clicks: usize,
    /// Selectors for expansion candidates
    pub click_selectors: Vec<String>,
    /// Element text that disqualifies an expansion click
    pub excluded_text: Vec<String>,
    /// Scroll through the page to trigger lazy-loaded content
    pub scroll: bool,
    /// Number of scroll steps down the page
    pub scroll_steps: u32,
    /// Pause between scroll steps
    pub scroll_pause_ms: u64,
    /// Return to the top after scrolling
    pub scroll_to_top: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            expand_nav: true,
            max_expand_clicks: 8,
            click_selectors: vec![
                "[aria-expanded='false']".to_string(),
                ".dropdown-toggle".to_string(),
                "[data-toggle]".to_string(),
                "[data-bs-toggle]".to_string(),
                "[aria-controls]".to_string(),
            ],
            excluded_text: vec![
                "logout".to_string(),
                "sign out".to_string(),
                "log out".to_string(),
                "delete".to_string(),
            ],
            scroll: true,
            scroll_steps: 4,
            scroll_pause_ms: 250,
            scroll_to_top: true,
        }
    }
}

/// Network and console error capture options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ErrorCaptureOptions {
    /// Response status codes that count as network errors
    pub status_codes: Vec<u16>,
    /// URL substrings whose network errors are ignored (analytics noise)
    pub ignore_url_patterns: Vec<String>,
    /// Console message categories that count as console errors
    pub console_types: Vec<String>,
}

impl Default for ErrorCaptureOptions {
    fn default() -> Self {
        Self {
            status_codes: vec![400, 401, 403, 404, 405, 500, 502, 503, 504],
            ignore_url_patterns: vec![
                "google-analytics.com".to_string(),
                "gtag/js".to_string(),
                "googletagmanager.com".to_string(),
                "facebook.com/tr".to_string(),
                "sentry.io".to_string(),
            ],
            console_types: vec![
                "error".to_string(),
                "pageerror".to_string(),
                "warning".to_string(),
            ],
        }
    }
}

/// Route-seed expansion options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    /// Path to the client route table file (React Router style)
    pub file: Option<String>,
    /// Expand dynamic segments (`:id`) with known parameter values
    pub include_dynamic: bool,
    /// Skip a dynamic path when a segment has no known values.
    /// The non-skip branch behaves identically today; the flag is kept
    /// for config compatibility.
    pub skip_missing: bool,
    /// Seed values for dynamic parameters, by parameter name
    pub param_values: BTreeMap<String, Vec<String>>,
    /// Cap on cartesian expansion per dynamic path
    pub max_expansions_per_path: usize,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            file: None,
            include_dynamic: true,
            skip_missing: true,
            param_values: BTreeMap::new(),
            max_expansions_per_path: 64,
        }
    }
}

/// Screenshot options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScreenshotOptions {
    /// Capture a screenshot on every failed element outcome
    pub on_error: bool,
    /// Capture the full page rather than the viewport
    pub full_page: bool,
}

impl Default for ScreenshotOptions {
    fn default() -> Self {
        Self {
            on_error: true,
            full_page: true,
        }
    }
}

/// Browser launch options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// Run without a visible window
    pub headless: bool,
    /// Slow every driver action down by this many milliseconds
    pub slow_mo_ms: u64,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            slow_mo_ms: 0,
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}

/// Output options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Directory under which per-run output folders are created
    pub dir: String,
    /// Filename of the HTML report inside the run folder
    pub report_filename: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            dir: "test_results".to_string(),
            report_filename: "test_report.html".to_string(),
        }
    }
}

fn default_excluded_url_patterns() -> Vec<String> {
    [
        "logout", "signout", "sign-out", "log-out", "/api/", ".pdf", ".zip", ".exe", "mailto:",
        "tel:", "javascript:",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_excluded_element_selectors() -> Vec<String> {
    [
        "[data-testid='logout']",
        ".logout-btn",
        "#logout",
        "[href*='logout']",
        "[href*='signout']",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_fails_validation() {
        let config = ExerciserConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_config() {
        let config = ExerciserConfig::new("https://devapp.example.com/");
        assert!(config.validate().is_ok());
        assert_eq!(config.crawl.max_pages, 100);
        assert_eq!(config.crawl.strategy, Strategy::Dfs);
    }

    #[test]
    fn test_single_module_must_exist() {
        let config = ExerciserConfig::new("https://devapp.example.com/").single_module("Ghost");
        assert!(config.validate().is_err());

        let config = ExerciserConfig::new("https://devapp.example.com/")
            .module("Shop", vec!["https://devapp.example.com/shop".to_string()])
            .single_module("Shop");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let json = r#"{
            "website_url": "https://devapp.example.com/",
            "crawl": { "strategy": "bfs", "max_pages": 10 },
            "modules": [
                { "name": "Shop", "seeds": ["https://devapp.example.com/shop"] }
            ]
        }"#;
        let config: ExerciserConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.crawl.strategy, Strategy::Bfs);
        assert_eq!(config.crawl.max_pages, 10);
        // untouched sections keep their defaults
        assert_eq!(config.crawl.max_depth, 5);
        assert_eq!(config.timeouts.element_ms, 5_000);
        assert_eq!(config.modules.len(), 1);
    }

    #[test]
    fn test_login_url_fallback() {
        let mut config = ExerciserConfig::new("https://devapp.example.com/");
        assert_eq!(config.login_url(), "https://devapp.example.com/");
        config.login.url = Some("https://devapp.example.com/login".to_string());
        assert_eq!(config.login_url(), "https://devapp.example.com/login");
    }
}
