// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Browser driver capability interface
//!
//! The engine never touches a concrete browser type. It depends on the
//! [`PageDriver`] and [`ElementHandle`] traits, and an adapter implements
//! them against whatever actually renders pages: `driver::chrome` drives a
//! real Chrome/Chromium via CDP (feature `chrome`), `driver::scripted` is a
//! deterministic in-memory implementation used by the test suite.
//!
//! Probe methods return `Result<bool>` rather than swallowing failures;
//! [`Probe`] maps a failed probe to an explicit "unknown" state that
//! admission policies treat as "no".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[cfg(feature = "chrome")]
pub mod chrome;
pub mod scripted;

pub use scripted::{ClickEffect, ScriptedDriver, ScriptedElement, ScriptedPage};

/// A console or uncaught-page-error message observed by the driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleEvent {
    /// Message category: "error", "warning", "pageerror", ...
    pub kind: String,
    /// Message text
    pub text: String,
    /// Source URL of the script that emitted it, when known
    pub source: String,
    /// Line number, when known
    pub line: u32,
}

/// A network response observed by the driver during a page's lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEvent {
    /// Response URL
    pub url: String,
    /// Request method
    pub method: String,
    /// Status code
    pub status: u16,
    /// Status text
    pub status_text: String,
}

/// Tri-state outcome of an element probe
///
/// A probe that errors (detached element, dead frame) is `Unknown`, and
/// `Unknown` never admits an element for interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Yes,
    No,
    Unknown,
}

impl Probe {
    /// Collapse a probe result into an admission decision
    pub fn admits(self) -> bool {
        matches!(self, Probe::Yes)
    }

    /// Build a probe from a driver call result
    pub fn from_result(result: Result<bool>) -> Self {
        match result {
            Ok(true) => Probe::Yes,
            Ok(false) => Probe::No,
            Err(_) => Probe::Unknown,
        }
    }
}

/// Shared handle to a discovered element
pub type ElementRef = Arc<dyn ElementHandle>;

/// Capability interface for a single DOM element
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Whether the element is rendered and visible
    async fn is_visible(&self) -> Result<bool>;

    /// Whether the element is enabled (not disabled/aria-disabled)
    async fn is_enabled(&self) -> Result<bool>;

    /// Whether the element accepts text input
    async fn is_editable(&self) -> Result<bool>;

    /// Read an attribute value
    async fn attribute(&self, name: &str) -> Result<Option<String>>;

    /// Rendered inner text
    async fn inner_text(&self) -> Result<String>;

    /// Raw text content (includes hidden text)
    async fn text_content(&self) -> Result<String>;

    /// Resolved text of the elements referenced by aria-labelledby
    async fn labelled_text(&self) -> Result<String>;

    /// Lowercase tag name
    async fn tag_name(&self) -> Result<String>;

    /// Whether the element matches a CSS selector
    async fn matches(&self, selector: &str) -> Result<bool>;

    /// Click the element
    async fn click(&self, timeout: Duration) -> Result<()>;

    /// Focus the element
    async fn focus(&self) -> Result<()>;
}

/// Capability interface for the single browser page the run drives
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to a URL and wait for the load to settle
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Current page URL
    async fn current_url(&self) -> Result<String>;

    /// Current page title
    async fn title(&self) -> Result<String>;

    /// All elements matching a CSS selector
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementRef>>;

    /// First element matching a CSS selector
    async fn query(&self, selector: &str) -> Result<Option<ElementRef>>;

    /// Navigate back in history and wait for the load to settle
    async fn go_back(&self, timeout: Duration) -> Result<()>;

    /// Wait for any in-flight navigation to settle
    async fn wait_for_load(&self, timeout: Duration) -> Result<()>;

    /// Press a keyboard key ("Escape", "Enter", ...)
    async fn press_key(&self, key: &str) -> Result<()>;

    /// Scroll the window to a vertical offset
    async fn scroll_to(&self, y: f64) -> Result<()>;

    /// Total scrollable page height
    async fn page_height(&self) -> Result<f64>;

    /// Capture a screenshot as PNG bytes
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>>;

    /// Number of popup windows opened since the last close
    async fn popup_count(&self) -> Result<usize>;

    /// Close any open popup windows, returning how many were closed
    async fn close_popups(&self) -> Result<usize>;

    /// Drain console/page-error events buffered since the last drain
    async fn drain_console_events(&self) -> Vec<ConsoleEvent>;

    /// Drain network response events buffered since the last drain
    async fn drain_response_events(&self) -> Vec<ResponseEvent>;
}
