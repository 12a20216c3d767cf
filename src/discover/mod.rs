// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Link and interactive-element discovery
//!
//! Scans the loaded page for navigable links (anchors plus data-attribute
//! carriers) and for interactive elements in six categories. Everything is
//! filtered through the exclusion rules: never surface a logout-like
//! element, and in a single-module run never surface an element whose
//! navigation target leaves the module.
//!
//! Every per-element driver failure is contained to that element; one
//! detached handle never aborts the scan.

mod expand;

pub use expand::DiscoveryExpander;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::crawl::UrlContext;
use crate::driver::{ElementRef, PageDriver, Probe};

/// Interactive element categories, scanned in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Button,
    Clickable,
    Input,
    NavLink,
    Dropdown,
    ModalTrigger,
}

impl ElementKind {
    /// Category name used in results and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Button => "button",
            ElementKind::Clickable => "clickable",
            ElementKind::Input => "input",
            ElementKind::NavLink => "nav_link",
            ElementKind::Dropdown => "dropdown",
            ElementKind::ModalTrigger => "modal_trigger",
        }
    }

    /// CSS selector that finds this category
    fn selector(&self) -> &'static str {
        match self {
            ElementKind::Button => {
                "button, [role='button'], input[type='button'], input[type='submit']"
            }
            ElementKind::Clickable => "[onclick], [data-action]",
            ElementKind::Input => "input, select, textarea",
            ElementKind::NavLink => "nav a, .nav a, .navbar a, .menu a",
            ElementKind::Dropdown => "[data-toggle], [data-bs-toggle], .dropdown-toggle",
            ElementKind::ModalTrigger => "[data-modal], [data-bs-target^='#']",
        }
    }

    const ALL: [ElementKind; 6] = [
        ElementKind::Button,
        ElementKind::Clickable,
        ElementKind::Input,
        ElementKind::NavLink,
        ElementKind::Dropdown,
        ElementKind::ModalTrigger,
    ];
}

/// One discovered interactive element, ready for testing
pub struct DiscoveredElement {
    /// Element category
    pub kind: ElementKind,
    /// Best-effort human-readable label
    pub label: String,
    /// Best-effort unique selector, for the report
    pub selector: String,
    /// Live handle
    pub handle: ElementRef,
}

/// Attributes that may carry a navigation target
const TARGET_ATTRS: &[&str] = &["href", "data-href", "data-route", "data-url"];

/// Label fallback when nothing readable was found
pub const NO_TEXT: &str = "[no text]";
/// Label fallback when every probe failed
pub const UNKNOWN_TEXT: &str = "[unknown]";

/// Page scanner for one run
pub struct Discoverer {
    driver: Arc<dyn PageDriver>,
    context: UrlContext,
    excluded_selectors: Vec<String>,
}

impl Discoverer {
    /// Build a scanner over a driver and the run's URL context
    pub fn new(
        driver: Arc<dyn PageDriver>,
        context: UrlContext,
        excluded_selectors: Vec<String>,
    ) -> Self {
        Self {
            driver,
            context,
            excluded_selectors,
        }
    }

    /// Collect valid, normalized, unvisited links from the current page
    pub async fn discover_links<F>(&self, is_visited: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let base = match self.driver.current_url().await {
            Ok(url) => url,
            Err(_) => return Vec::new(),
        };

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        let consider = |raw: &str, seen: &mut HashSet<String>, links: &mut Vec<String>| {
            if !self.context.is_valid(&base, raw) {
                return;
            }
            if let Some(normalized) = self.context.normalize(&base, raw) {
                if !is_visited(&normalized) && seen.insert(normalized.clone()) {
                    links.push(normalized);
                }
            }
        };

        if let Ok(anchors) = self.driver.query_all("a[href]").await {
            for anchor in anchors {
                if let Ok(Some(href)) = anchor.attribute("href").await {
                    consider(&href, &mut seen, &mut links);
                }
            }
        }

        for (selector, attr) in [
            ("[data-href]", "data-href"),
            ("[data-route]", "data-route"),
            ("[data-url]", "data-url"),
        ] {
            if let Ok(carriers) = self.driver.query_all(selector).await {
                for carrier in carriers {
                    if let Ok(Some(value)) = carrier.attribute(attr).await {
                        consider(&value, &mut seen, &mut links);
                    }
                }
            }
        }

        debug!(page = %base, links = links.len(), "link discovery");
        links
    }

    /// Collect interactive elements from the current page, by category
    pub async fn discover_elements(&self) -> Vec<DiscoveredElement> {
        let base = match self.driver.current_url().await {
            Ok(url) => url,
            Err(_) => return Vec::new(),
        };

        let mut elements = Vec::new();
        for kind in ElementKind::ALL {
            let handles = match self.driver.query_all(kind.selector()).await {
                Ok(handles) => handles,
                Err(_) => continue,
            };
            for handle in handles {
                if kind == ElementKind::Input && is_hidden_input(&handle).await {
                    continue;
                }
                if !Probe::from_result(handle.is_visible().await).admits() {
                    continue;
                }
                if !self.should_include(&base, &handle).await {
                    continue;
                }
                let label = element_label(&handle).await;
                let selector = element_selector(&handle, &label).await;
                elements.push(DiscoveredElement {
                    kind,
                    label,
                    selector,
                    handle,
                });
            }
        }

        debug!(page = %base, elements = elements.len(), "element discovery");
        elements
    }

    /// Exclusion rules plus, for module-scoped runs, the target-URL check
    async fn should_include(&self, base: &str, handle: &ElementRef) -> bool {
        if is_excluded(handle, &self.excluded_selectors).await {
            return false;
        }
        if self.context.module_filter().is_none() {
            return true;
        }

        let target = match element_target_url(handle).await {
            Some(target) => target,
            None => return true,
        };
        let lower = target.to_lowercase();
        if target.starts_with('#') || lower.starts_with("javascript:") {
            return true;
        }

        let resolved = match self.context.resolve(base, &target) {
            Some(resolved) => resolved,
            None => return true,
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            return false;
        }
        if !self.context.is_same_origin(&resolved) {
            return false;
        }
        self.context.is_valid(base, &target)
    }
}

/// Whether the element matches any "do not touch" selector
///
/// A failed probe does not exclude: exclusion needs a positive match.
pub(crate) async fn is_excluded(handle: &ElementRef, excluded_selectors: &[String]) -> bool {
    for selector in excluded_selectors {
        if Probe::from_result(handle.matches(selector).await) == Probe::Yes {
            return true;
        }
    }
    false
}

/// First navigation target found on the element, skipping void hrefs
pub(crate) async fn element_target_url(handle: &ElementRef) -> Option<String> {
    for attr in TARGET_ATTRS {
        let value = match handle.attribute(attr).await {
            Ok(Some(value)) if !value.is_empty() => value,
            _ => continue,
        };
        if *attr == "href" && is_void_href(&value) {
            continue;
        }
        return Some(value);
    }
    None
}

/// "#", javascript: and void(0) hrefs do not navigate
pub(crate) fn is_void_href(href: &str) -> bool {
    let lower = href.to_lowercase();
    href == "#" || lower.starts_with("javascript:") || lower.contains("void(0)")
}

/// Best-effort human-readable label for an element
///
/// Probe order: inner text, aria-label, aria-labelledby resolution, text
/// content, then value/placeholder/title/name/alt/data-testid.
pub(crate) async fn element_label(handle: &ElementRef) -> String {
    let mut any_probe_succeeded = false;

    if let Ok(text) = handle.inner_text().await {
        any_probe_succeeded = true;
        if !text.trim().is_empty() {
            return truncate_label(&text);
        }
    }

    if let Ok(Some(aria)) = handle.attribute("aria-label").await {
        any_probe_succeeded = true;
        if !aria.trim().is_empty() {
            return truncate_label(&aria);
        }
    }

    if let Ok(labelled) = handle.labelled_text().await {
        any_probe_succeeded = true;
        if !labelled.trim().is_empty() {
            return truncate_label(&labelled);
        }
    }

    if let Ok(content) = handle.text_content().await {
        any_probe_succeeded = true;
        if !content.trim().is_empty() {
            return truncate_label(&content);
        }
    }

    for attr in ["value", "placeholder", "title", "name", "alt", "data-testid"] {
        match handle.attribute(attr).await {
            Ok(Some(value)) if !value.trim().is_empty() => return truncate_label(&value),
            Ok(_) => any_probe_succeeded = true,
            Err(_) => {}
        }
    }

    if any_probe_succeeded {
        NO_TEXT.to_string()
    } else {
        UNKNOWN_TEXT.to_string()
    }
}

/// Best-effort unique selector: id, test-id, first class, tag name
pub(crate) async fn element_selector(handle: &ElementRef, label: &str) -> String {
    if let Ok(Some(id)) = handle.attribute("id").await {
        if !id.is_empty() {
            return format!("#{}", id);
        }
    }
    if let Ok(Some(testid)) = handle.attribute("data-testid").await {
        if !testid.is_empty() {
            return format!("[data-testid='{}']", testid);
        }
    }
    if let Ok(Some(classes)) = handle.attribute("class").await {
        if let Some(first) = classes.split_whitespace().next() {
            if label != NO_TEXT && label != UNKNOWN_TEXT {
                let short: String = label.chars().take(30).collect();
                return format!(".{} ('{}')", first, short);
            }
            return format!(".{}", first);
        }
    }
    match handle.tag_name().await {
        Ok(tag) => tag,
        Err(_) => UNKNOWN_TEXT.to_string(),
    }
}

async fn is_hidden_input(handle: &ElementRef) -> bool {
    match handle.tag_name().await {
        Ok(tag) if tag == "input" => matches!(
            handle.attribute("type").await,
            Ok(Some(input_type)) if input_type.eq_ignore_ascii_case("hidden")
        ),
        _ => false,
    }
}

fn truncate_label(text: &str) -> String {
    text.trim().chars().take(100).collect()
}

/// Fold an element's navigation side effect into the page's link set
pub fn merge_navigated_link(
    links: &mut Vec<String>,
    context: &UrlContext,
    base: &str,
    navigated_to: &str,
) {
    if !context.is_valid(base, navigated_to) {
        return;
    }
    if let Some(normalized) = context.normalize(base, navigated_to) {
        if !links.contains(&normalized) {
            links.push(normalized);
        }
    }
}
