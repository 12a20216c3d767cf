// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # Mustekala - Automated Web-Application Exerciser
//!
//! Point it at a site, log in, and it crawls every reachable page module
//! by module, exercises every interactive element that is safe to touch,
//! and reports navigation failures, network errors, and console errors.
//!
//! ## Features
//!
//! - Frontier-driven crawl (BFS/DFS) with depth and page budgets
//! - Module-scoped runs over named feature areas of the site
//! - Route-seed expansion from a client route table, with dynamic
//!   parameter values learned during the crawl
//! - Non-destructive interaction: never logout links, never form fills,
//!   always back to the original page after a navigation side effect
//! - Discovery expansion: menu toggles and lazy-content scrolling before
//!   each DOM scan
//! - Network/console error capture with explanations and severity tiers
//! - Self-contained HTML report plus a JSON session dump
//!
//! The engine is driver-agnostic: it depends only on the capability traits
//! in [`driver`], implemented by the Chrome adapter (feature `chrome`) and
//! by the deterministic scripted driver the test suite uses.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mustekala::{Exerciser, ExerciserConfig};
//! use mustekala::driver::{ScriptedDriver, ScriptedPage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = Arc::new(ScriptedDriver::new());
//!     driver.add_page(ScriptedPage::new("https://example.com/").title("Home"));
//!
//!     let mut config = ExerciserConfig::new("https://example.com/");
//!     config.login.wait_seconds = 0;
//!
//!     let session = Exerciser::new(config, driver)?.run().await?;
//!     println!("{} pages tested", session.total_pages());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawl;
pub mod discover;
pub mod driver;
pub mod engine;
pub mod error;
pub mod events;
pub mod interact;
pub mod report;

// Re-exports for convenience

// Engine and configuration
pub use config::ExerciserConfig;
pub use engine::Exerciser;

// Crawl core
pub use crawl::{CrawlState, FrontierEntry, ModuleMap, ParamValues, RouteSet, Strategy, UrlContext};

// Discovery and interaction
pub use discover::{DiscoveredElement, Discoverer, DiscoveryExpander, ElementKind};
pub use interact::ElementTester;

// Events
pub use events::ErrorMonitor;

// Results and reporting
pub use report::{
    ConsoleError, CrawlStep, ElementResult, NetworkError, PageResult, TestSession, TestStatus,
};

// Errors
pub use error::{Error, Result};

/// Mustekala version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
