// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! The exerciser engine: login, seeding, the crawl loop, per-page testing
//!
//! Strictly sequential: one page is fully navigated, discovered, and
//! element-tested before the next frontier entry is dequeued. The single
//! browser session (one login, one cookie jar) is shared state, and the
//! interaction tester's recovery step restores it after every click that
//! navigates. Stop conditions (frontier empty, page budget) apply only
//! between pages; a broken page never aborts the run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use colored::Colorize;
use tracing::{info, warn};

use crate::config::ExerciserConfig;
use crate::crawl::{CrawlState, FrontierEntry, ModuleMap, ParamValues, RouteSet, Strategy, UrlContext};
use crate::discover::{merge_navigated_link, Discoverer, DiscoveryExpander};
use crate::driver::PageDriver;
use crate::error::Result;
use crate::events::ErrorMonitor;
use crate::interact::ElementTester;
use crate::report::{CrawlStep, PageResult, TestSession, TestStatus};

/// Colored console status line, in the tool's run-log voice
pub(crate) fn status(message: &str, kind: StatusKind) {
    let timestamp = format!("[{}]", Local::now().format("%H:%M:%S"));
    let line = match kind {
        StatusKind::Info => message.cyan(),
        StatusKind::Success => message.green(),
        StatusKind::Warning => message.yellow(),
        StatusKind::Error => message.red(),
        StatusKind::Highlight => message.magenta(),
    };
    println!("{} {}", timestamp.white(), line);
}

#[derive(Clone, Copy)]
pub(crate) enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
    Highlight,
}

/// One run of the exerciser against one site
pub struct Exerciser {
    config: ExerciserConfig,
    driver: Arc<dyn PageDriver>,
    output_dir: Option<PathBuf>,
}

impl Exerciser {
    /// Build an engine; fails fast on malformed configuration
    pub fn new(config: ExerciserConfig, driver: Arc<dyn PageDriver>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            driver,
            output_dir: None,
        })
    }

    /// Enable on-disk output (failure screenshots) under this run directory
    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }

    /// Run the whole exercise and return the finished session
    pub async fn run(&self) -> Result<TestSession> {
        let origin = self.config.origin()?;
        let modules = ModuleMap::from_config(&self.config.modules);

        // a single-module run always walks depth-first
        let strategy = match self.config.single_module {
            Some(_) => {
                if self.config.crawl.strategy == Strategy::Bfs {
                    info!("single-module run forces DFS over configured BFS");
                }
                Strategy::Dfs
            }
            None => self.config.crawl.strategy,
        };

        let mut context = UrlContext::from_config(&self.config, &origin);
        if let Some(ref name) = self.config.single_module {
            context = context.with_module_filter(name.clone(), modules.clone());
            status(
                &format!("Module scope: {} (DFS)", name),
                StatusKind::Highlight,
            );
        }

        let screenshots_dir = match self.output_dir {
            Some(ref dir) => {
                let screenshots = dir.join("screenshots");
                std::fs::create_dir_all(&screenshots)?;
                Some(screenshots)
            }
            None => None,
        };

        let interaction_delay = Duration::from_millis(self.config.crawl.interaction_delay_ms);
        let discoverer = Discoverer::new(
            Arc::clone(&self.driver),
            context.clone(),
            self.config.excluded_element_selectors.clone(),
        );
        let expander = DiscoveryExpander::new(
            Arc::clone(&self.driver),
            self.config.discovery.clone(),
            self.config.excluded_element_selectors.clone(),
            self.config.timeouts.element(),
            interaction_delay,
        );
        let tester = ElementTester::new(
            Arc::clone(&self.driver),
            self.config.timeouts.clone(),
            interaction_delay,
            self.config.screenshots.clone(),
            screenshots_dir,
        );
        let monitor = ErrorMonitor::new(self.config.errors.clone());

        let mut session = TestSession::new(&self.config.website_url);
        session.single_module = self.config.single_module.clone();

        self.wait_for_login().await?;

        let mut state = CrawlState::new(
            strategy,
            self.config.crawl.max_depth,
            self.config.crawl.max_pages,
        );
        state.seed_params(ParamValues::from_config(&self.config.routes.param_values));

        let routes = self.load_routes();
        self.seed_frontier(&mut state, &mut session, &context, &modules, &origin, routes.as_ref())
            .await;

        status("Starting automated tests", StatusKind::Highlight);

        while let Some(entry) = state.next() {
            let page_number = state.pages_tested();
            status(
                &format!(
                    "[{}/{}] Testing: {}",
                    page_number,
                    state.max_pages(),
                    entry.url
                ),
                StatusKind::Highlight,
            );

            let page = self
                .test_page(&entry, &state, &discoverer, &expander, &tester, &monitor, &modules, &context)
                .await;

            let mut new_links = 0;
            for link in &page.discovered_links {
                if state.enqueue(link.clone(), entry.url.clone(), entry.depth + 1) {
                    new_links += 1;
                }
            }

            if let Some(ref routes) = routes {
                self.learn_route_params(&mut state, &context, &origin, routes, &page);
            }

            session.crawl_path.push(CrawlStep {
                step_number: page_number,
                url: page.url.clone(),
                title: page.title.clone(),
                discovered_from: page.discovered_from.clone(),
                status: page.status,
                links_found: page.discovered_links.len(),
                module: page.module.clone(),
            });

            self.print_page_summary(&page, new_links);
            session.pages.push(page);
        }

        session.finish();
        status(
            &format!(
                "Done: {} pages, {} with errors, {} element failures",
                session.total_pages(),
                session.pages_with_errors(),
                session.total_element_failures()
            ),
            if session.pages_with_errors() > 0 {
                StatusKind::Warning
            } else {
                StatusKind::Success
            },
        );
        Ok(session)
    }

    /// Open the login page and wait for a manual (OTP) login to complete
    ///
    /// Success is a URL change away from anything login-like, a configured
    /// success keyword, or the configured success selector appearing. A
    /// timeout is not fatal; the run continues against whatever session
    /// state exists.
    async fn wait_for_login(&self) -> Result<bool> {
        let login_url = self.config.login_url().to_string();
        status(&format!("Opening login page: {}", login_url), StatusKind::Info);
        self.driver
            .navigate(&login_url, self.config.timeouts.page_load())
            .await?;

        let wait = self.config.login.wait_seconds;
        if wait == 0 {
            return Ok(true);
        }
        status(
            &format!("Waiting up to {}s for manual login (OTP)...", wait),
            StatusKind::Warning,
        );

        let initial = self.driver.current_url().await.unwrap_or_default();
        let deadline = Instant::now() + Duration::from_secs(wait);

        while Instant::now() < deadline {
            if let Some(ref selector) = self.config.login.success_selector {
                if !selector.is_empty() {
                    if let Ok(Some(_)) = self.driver.query(selector).await {
                        status("Login detected, continuing", StatusKind::Success);
                        tokio::time::sleep(Duration::from_secs(2)).await;
                        return Ok(true);
                    }
                }
            }

            let current = self.driver.current_url().await.unwrap_or_default();
            let lower = current.to_lowercase();
            let keyword_hit = self
                .config
                .login
                .success_url_keywords
                .iter()
                .any(|k| !k.is_empty() && lower.contains(&k.to_lowercase()));
            if (current != initial && !lower.contains("login")) || keyword_hit {
                status("Login detected, continuing", StatusKind::Success);
                tokio::time::sleep(Duration::from_secs(2)).await;
                return Ok(true);
            }

            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        status("Login timeout reached, continuing anyway", StatusKind::Warning);
        Ok(false)
    }

    fn load_routes(&self) -> Option<RouteSet> {
        let file = self.config.routes.file.as_ref()?;
        if file.is_empty() {
            return None;
        }
        match RouteSet::from_file(file) {
            Ok(routes) if !routes.is_empty() => Some(routes),
            Ok(_) => {
                warn!(file = %file, "route table produced no paths");
                None
            }
            Err(e) => {
                warn!(file = %file, "route table unavailable: {}", e);
                None
            }
        }
    }

    /// Populate the initial frontier: module seeds, route seeds, start page
    async fn seed_frontier(
        &self,
        state: &mut CrawlState,
        session: &mut TestSession,
        context: &UrlContext,
        modules: &ModuleMap,
        origin: &url::Url,
        routes: Option<&RouteSet>,
    ) {
        for (name, seed) in modules.seed_urls() {
            if let Some(ref filter) = self.config.single_module {
                if name != filter {
                    continue;
                }
            }
            if let Some(normalized) = context.normalize(seed.as_str(), seed.as_str()) {
                state.enqueue(normalized, format!("Module Seed: {}", name), 0);
            }
        }

        if let Some(routes) = routes {
            let (urls, stats) = routes.expand(origin, state.params(), &self.config.routes);
            session.route_seed_stats = Some(stats);
            let mut added = 0;
            for url in urls {
                if self.admit_route_seed(state, context, origin, &url, "Route Seed") {
                    added += 1;
                }
            }
            status(
                &format!(
                    "Route seeds: {} static, {} dynamic-expanded, {} enqueued",
                    stats.static_paths, stats.dynamic_expanded, added
                ),
                StatusKind::Info,
            );
        }

        match self.driver.current_url().await {
            Ok(current) if !current.is_empty() => {
                let in_scope = match self.config.single_module {
                    Some(ref name) => modules.contains(&current, name),
                    None => true,
                };
                if in_scope {
                    if let Some(normalized) = context.normalize(&current, &current) {
                        state.enqueue(normalized, "Start Page", 0);
                    }
                } else {
                    warn!(
                        url = %current,
                        "start page is outside the selected module; not enqueued"
                    );
                }
            }
            _ => {}
        }
    }

    fn admit_route_seed(
        &self,
        state: &mut CrawlState,
        context: &UrlContext,
        origin: &url::Url,
        url: &str,
        label: &str,
    ) -> bool {
        if !context.is_valid(origin.as_str(), url) {
            return false;
        }
        match context.normalize(origin.as_str(), url) {
            Some(normalized) => state.enqueue_route_seed(normalized, label),
            None => false,
        }
    }

    /// Harvest dynamic parameter values from this page's URLs and, when
    /// something new was learned, re-expand the route table
    fn learn_route_params(
        &self,
        state: &mut CrawlState,
        context: &UrlContext,
        origin: &url::Url,
        routes: &RouteSet,
        page: &PageResult,
    ) {
        if !self.config.routes.include_dynamic {
            return;
        }
        let candidates = page
            .discovered_links
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(page.url.as_str()));
        let harvested = routes.extract_param_values(candidates);
        if state.learn_params(&harvested) == 0 {
            return;
        }

        let (urls, _) = routes.expand(origin, state.params(), &self.config.routes);
        let mut added = 0;
        for url in urls {
            if self.admit_route_seed(state, context, origin, &url, "Route Seed (dynamic)") {
                added += 1;
            }
        }
        if added > 0 {
            info!(seeds = added, "dynamic route seeds from learned parameters");
        }
    }

    /// Navigate, discover, exercise, and harvest errors for one page
    #[allow(clippy::too_many_arguments)]
    async fn test_page(
        &self,
        entry: &FrontierEntry,
        state: &CrawlState,
        discoverer: &Discoverer,
        expander: &DiscoveryExpander,
        tester: &ElementTester,
        monitor: &ErrorMonitor,
        modules: &ModuleMap,
        context: &UrlContext,
    ) -> PageResult {
        let mut page = PageResult::new(&entry.url, &entry.discovered_from, entry.depth);
        page.module = modules.resolve(&entry.url).map(str::to_string);

        monitor.discard(self.driver.as_ref()).await;

        let started = Instant::now();
        if let Err(e) = self
            .driver
            .navigate(&entry.url, self.config.timeouts.page_load())
            .await
        {
            page.load_time_ms = started.elapsed().as_millis() as u64;
            page.status = TestStatus::Failed;
            page.load_error = Some(e.to_string());
            status(&format!("  Page load failed: {}", e), StatusKind::Error);
            return page;
        }
        page.load_time_ms = started.elapsed().as_millis() as u64;
        page.title = self.driver.title().await.unwrap_or_default();

        tokio::time::sleep(Duration::from_millis(self.config.crawl.page_delay_ms)).await;

        expander.expand_navigation().await;
        expander.scroll_for_lazy_content().await;

        page.discovered_links = discoverer.discover_links(|url| state.is_visited(url)).await;

        let elements = discoverer.discover_elements().await;
        status(
            &format!("  Found {} interactive elements", elements.len()),
            StatusKind::Info,
        );

        for element in &elements {
            let result = tester.test_element(element).await;
            if let Some(ref target) = result.navigated_to {
                merge_navigated_link(&mut page.discovered_links, context, &entry.url, target);
            }
            if result.status == TestStatus::Failed {
                page.status = TestStatus::Failed;
            }
            page.element_results.push(result);
        }

        let (network_errors, console_errors) = monitor.collect(self.driver.as_ref()).await;
        if (!network_errors.is_empty() || !console_errors.is_empty())
            && page.status != TestStatus::Failed
        {
            page.status = TestStatus::Warning;
        }
        page.network_errors = network_errors;
        page.console_errors = console_errors;

        page
    }

    fn print_page_summary(&self, page: &PageResult, new_links: usize) {
        let kind = match page.status {
            TestStatus::Passed => StatusKind::Success,
            TestStatus::Warning => StatusKind::Warning,
            _ => StatusKind::Error,
        };
        status(
            &format!("  Status: {}", page.status.as_str().to_uppercase()),
            kind,
        );
        status(
            &format!(
                "  Load {}ms | network errors {} | console errors {} | elements {} (failed {}) | {} new links",
                page.load_time_ms,
                page.network_errors.len(),
                page.console_errors.len(),
                page.total_elements_tested(),
                page.elements_failed(),
                new_links
            ),
            StatusKind::Info,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ClickEffect, ScriptedDriver, ScriptedElement, ScriptedPage};
    use std::io::Write;

    const HOME: &str = "https://x.test/home";

    fn fast_config() -> ExerciserConfig {
        let mut config = ExerciserConfig::new(HOME);
        config.login.wait_seconds = 0;
        config.crawl.page_delay_ms = 0;
        config.crawl.interaction_delay_ms = 0;
        config.discovery.scroll_pause_ms = 0;
        config.timeouts.popup_wait_ms = 10;
        config
    }

    fn scripted_site() -> Arc<ScriptedDriver> {
        let driver = Arc::new(ScriptedDriver::new());
        driver.add_page(
            ScriptedPage::new(HOME)
                .title("Home")
                .link("https://x.test/shop")
                .link("https://x.test/about"),
        );
        driver.add_page(
            ScriptedPage::new("https://x.test/shop")
                .title("Shop")
                .element(ScriptedElement::button("Add to cart"))
                .response_event(500, "https://x.test/api/cart"),
        );
        driver.add_page(
            ScriptedPage::new("https://x.test/about")
                .title("About")
                .console_event("error", "ReferenceError: x is not defined"),
        );
        driver
    }

    #[tokio::test]
    async fn test_full_run_over_scripted_site() {
        let driver = scripted_site();
        let engine = Exerciser::new(fast_config(), driver.clone()).unwrap();
        let session = engine.run().await.unwrap();

        assert_eq!(session.total_pages(), 3);
        assert_eq!(session.crawl_path.len(), 3);
        assert_eq!(session.crawl_path[0].step_number, 1);
        assert_eq!(session.crawl_path[0].url, HOME);

        let by_url = |url: &str| session.pages.iter().find(|p| p.url == url).unwrap();
        assert_eq!(by_url(HOME).status, TestStatus::Passed);
        // one flagged network response makes the page a warning, not a failure
        let shop = by_url("https://x.test/shop");
        assert_eq!(shop.status, TestStatus::Warning);
        assert_eq!(shop.network_errors.len(), 1);
        assert_eq!(shop.elements_failed(), 0);
        // console error on about
        let about = by_url("https://x.test/about");
        assert_eq!(about.status, TestStatus::Warning);
        assert_eq!(about.console_errors.len(), 1);
        assert!(session.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_page_budget_stops_run() {
        let driver = scripted_site();
        let mut config = fast_config();
        config.crawl.max_pages = 2;
        let engine = Exerciser::new(config, driver).unwrap();
        let session = engine.run().await.unwrap();
        assert_eq!(session.total_pages(), 2);
    }

    #[tokio::test]
    async fn test_failed_element_dominates_page_status() {
        let driver = Arc::new(ScriptedDriver::new());
        driver.add_page(
            ScriptedPage::new(HOME)
                .title("Home")
                .element(ScriptedElement::button("Break").on_click(ClickEffect::ErrorDialog))
                .response_event(500, "https://x.test/api/x"),
        );
        let engine = Exerciser::new(fast_config(), driver).unwrap();
        let session = engine.run().await.unwrap();

        let page = &session.pages[0];
        assert_eq!(page.status, TestStatus::Failed);
        assert_eq!(page.elements_failed(), 1);
        assert_eq!(page.network_errors.len(), 1);
    }

    #[tokio::test]
    async fn test_ignored_network_noise_keeps_page_passed() {
        let driver = Arc::new(ScriptedDriver::new());
        driver.add_page(
            ScriptedPage::new(HOME)
                .title("Home")
                .response_event(404, "https://google-analytics.com/collect"),
        );
        let engine = Exerciser::new(fast_config(), driver).unwrap();
        let session = engine.run().await.unwrap();
        assert_eq!(session.pages[0].status, TestStatus::Passed);
        assert!(session.pages[0].network_errors.is_empty());
    }

    #[tokio::test]
    async fn test_navigation_failure_fails_page_but_not_run() {
        let driver = Arc::new(ScriptedDriver::new());
        driver.add_page(
            ScriptedPage::new(HOME)
                .title("Home")
                .link("https://x.test/dead")
                .link("https://x.test/alive"),
        );
        driver.add_page(ScriptedPage::new("https://x.test/dead").fails_to_load("timeout"));
        driver.add_page(ScriptedPage::new("https://x.test/alive").title("Alive"));

        let engine = Exerciser::new(fast_config(), driver).unwrap();
        let session = engine.run().await.unwrap();

        assert_eq!(session.total_pages(), 3);
        let dead = session
            .pages
            .iter()
            .find(|p| p.url == "https://x.test/dead")
            .unwrap();
        assert_eq!(dead.status, TestStatus::Failed);
        assert!(dead.load_error.is_some());
        let alive = session
            .pages
            .iter()
            .find(|p| p.url == "https://x.test/alive")
            .unwrap();
        assert_eq!(alive.status, TestStatus::Passed);
    }

    #[tokio::test]
    async fn test_element_navigation_feeds_frontier() {
        // a button that navigates somewhere no link points at
        let driver = Arc::new(ScriptedDriver::new());
        driver.add_page(ScriptedPage::new(HOME).title("Home").element(
            ScriptedElement::button("Secret").on_click(ClickEffect::Navigate(
                "https://x.test/hidden".to_string(),
            )),
        ));
        driver.add_page(ScriptedPage::new("https://x.test/hidden").title("Hidden"));

        let engine = Exerciser::new(fast_config(), driver).unwrap();
        let session = engine.run().await.unwrap();

        assert!(session
            .pages
            .iter()
            .any(|p| p.url == "https://x.test/hidden"));
    }

    #[tokio::test]
    async fn test_route_learning_mints_unlinked_seeds() {
        // routes: /orders/:id and /invoices/:id. The site links /orders/42;
        // learning id=42 mints /invoices/42, which nothing links to.
        let mut routes_file = tempfile::NamedTempFile::new().unwrap();
        write!(
            routes_file,
            "{{ path: '/orders/:id' }}, {{ path: '/invoices/:id' }}"
        )
        .unwrap();

        let driver = Arc::new(ScriptedDriver::new());
        driver.add_page(
            ScriptedPage::new(HOME)
                .title("Home")
                .link("https://x.test/orders/42"),
        );
        driver.add_page(ScriptedPage::new("https://x.test/orders/42").title("Order 42"));
        driver.add_page(ScriptedPage::new("https://x.test/invoices/42").title("Invoice 42"));

        let mut config = fast_config();
        config.routes.file = Some(routes_file.path().display().to_string());
        let engine = Exerciser::new(config, driver).unwrap();
        let session = engine.run().await.unwrap();

        let invoice = session
            .pages
            .iter()
            .find(|p| p.url == "https://x.test/invoices/42")
            .expect("dynamic route seed was never tested");
        assert_eq!(invoice.discovered_from, "Route Seed (dynamic)");
        assert_eq!(invoice.crawl_depth, 0);
        assert!(session.route_seed_stats.is_some());
    }

    #[tokio::test]
    async fn test_single_module_scopes_run_and_forces_dfs() {
        let driver = Arc::new(ScriptedDriver::new());
        driver.add_page(
            ScriptedPage::new("https://x.test/shop")
                .title("Shop")
                .link("https://x.test/shop/items")
                .link("https://x.test/blog"), // outside the module
        );
        driver.add_page(ScriptedPage::new("https://x.test/shop/items").title("Items"));
        driver.add_page(ScriptedPage::new("https://x.test/blog").title("Blog"));
        driver.add_page(ScriptedPage::new(HOME).title("Home"));

        let mut config = fast_config();
        config.crawl.strategy = Strategy::Bfs;
        config = config
            .module("Shop", vec!["https://x.test/shop".to_string()])
            .single_module("Shop");
        let engine = Exerciser::new(config, driver).unwrap();
        let session = engine.run().await.unwrap();

        let urls: Vec<&str> = session.pages.iter().map(|p| p.url.as_str()).collect();
        assert!(urls.contains(&"https://x.test/shop"));
        assert!(urls.contains(&"https://x.test/shop/items"));
        // the start page (outside the module) and the blog were omitted
        assert!(!urls.contains(&HOME));
        assert!(!urls.contains(&"https://x.test/blog"));

        let shop = &session.pages[0];
        assert_eq!(shop.discovered_from, "Module Seed: Shop");
        assert_eq!(shop.module.as_deref(), Some("Shop"));
    }

    #[tokio::test]
    async fn test_module_attribution_on_pages() {
        let driver = scripted_site();
        let mut config = fast_config();
        config = config.module("Shop", vec!["https://x.test/shop".to_string()]);
        let engine = Exerciser::new(config, driver).unwrap();
        let session = engine.run().await.unwrap();

        let shop = session
            .pages
            .iter()
            .find(|p| p.url == "https://x.test/shop")
            .unwrap();
        assert_eq!(shop.module.as_deref(), Some("Shop"));
        let home = session.pages.iter().find(|p| p.url == HOME).unwrap();
        assert_eq!(home.module, None);
    }
}
