// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Element interaction testing
//!
//! Per element: preflight, act, recover, post-check. Preflight failures are
//! `skipped`, never defects. The act step tolerates popups (wait briefly,
//! close whatever opened). Recovery navigates back whenever a click moved
//! the page, so sibling elements on the original page stay testable. The
//! post-check looks for error dialogs and dismisses them before the next
//! element runs.
//!
//! Nothing here fills a form or follows a logout link; the discoverer
//! already filtered those out, and inputs only ever get focused.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, warn};

use crate::config::{ScreenshotOptions, TimeoutOptions};
use crate::discover::{DiscoveredElement, ElementKind};
use crate::driver::{ElementRef, PageDriver, Probe};
use crate::error::Error;
use crate::report::{element_explanation, ElementResult, TestStatus};

/// Selectors that look like an error dialog
const ERROR_DIALOG_SELECTORS: &[&str] = &[
    ".error-modal",
    ".error-dialog",
    "[role='alertdialog']",
    ".alert-danger",
    ".toast-error",
    ".notification-error",
];

/// Close-button probes tried before falling back to Escape
const DIALOG_CLOSE_SELECTORS: &[&str] = &[
    ".modal .close",
    ".modal .btn-close",
    "[aria-label='Close']",
    ".dialog-close",
    ".modal-close",
];

/// Exercises discovered elements against the live page
pub struct ElementTester {
    driver: Arc<dyn PageDriver>,
    timeouts: TimeoutOptions,
    interaction_delay: Duration,
    screenshots: ScreenshotOptions,
    screenshots_dir: Option<PathBuf>,
}

impl ElementTester {
    /// Build a tester; pass a screenshots directory to capture failures
    pub fn new(
        driver: Arc<dyn PageDriver>,
        timeouts: TimeoutOptions,
        interaction_delay: Duration,
        screenshots: ScreenshotOptions,
        screenshots_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            driver,
            timeouts,
            interaction_delay,
            screenshots,
            screenshots_dir,
        }
    }

    /// Run the category-appropriate protocol for one element
    pub async fn test_element(&self, element: &DiscoveredElement) -> ElementResult {
        match element.kind {
            ElementKind::Button => self.test_button(element).await,
            ElementKind::Clickable | ElementKind::NavLink => self.test_link(element).await,
            ElementKind::Input => self.test_input(element).await,
            ElementKind::Dropdown | ElementKind::ModalTrigger => self.test_dropdown(element).await,
        }
    }

    /// Buttons: click, tolerate a popup, recover, check for dialogs
    async fn test_button(&self, element: &DiscoveredElement) -> ElementResult {
        let mut result = self.fresh_result(element, "click");

        if self.skip_unless_visible(element, &mut result).await {
            return result;
        }
        match Probe::from_result(element.handle.is_enabled().await) {
            Probe::Yes => {}
            Probe::No => return self.skip(result, "Element not enabled"),
            Probe::Unknown => return self.skip(result, "Element state unknown"),
        }

        let initial_url = match self.driver.current_url().await {
            Ok(url) => url,
            Err(e) => {
                self.fail(&mut result, e.to_string(), "button").await;
                return result;
            }
        };

        if let Err(e) = self.click_with_optional_popup(&element.handle).await {
            self.fail(&mut result, click_failure_message(&e), "button").await;
            return result;
        }
        tokio::time::sleep(self.interaction_delay).await;

        result.navigated_to = self.recover(&initial_url).await;
        self.post_check(&mut result, "button").await;
        result
    }

    /// Links and generic clickables: click, wait for settle, recover
    async fn test_link(&self, element: &DiscoveredElement) -> ElementResult {
        let mut result = self.fresh_result(element, "click");

        if self.skip_unless_visible(element, &mut result).await {
            return result;
        }

        let initial_url = match self.driver.current_url().await {
            Ok(url) => url,
            Err(e) => {
                self.fail(&mut result, e.to_string(), "link").await;
                return result;
            }
        };

        if let Err(e) = self.click_with_optional_popup(&element.handle).await {
            self.fail(&mut result, click_failure_message(&e), "link").await;
            return result;
        }
        tokio::time::sleep(self.interaction_delay).await;

        if let Err(e) = self.driver.wait_for_load(self.timeouts.navigation()).await {
            debug!("navigation settle after link click: {}", e);
        }

        result.navigated_to = self.recover(&initial_url).await;
        self.post_check(&mut result, "link").await;
        result
    }

    /// Inputs: focus only, never fill; record editability
    async fn test_input(&self, element: &DiscoveredElement) -> ElementResult {
        let mut result = self.fresh_result(element, "focus");

        if self.skip_unless_visible(element, &mut result).await {
            return result;
        }

        if let Err(e) = element.handle.focus().await {
            self.fail(&mut result, e.to_string(), "input").await;
            return result;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        result.action = match Probe::from_result(element.handle.is_editable().await) {
            Probe::Yes => "focus (editable)".to_string(),
            Probe::No => "focus (read-only)".to_string(),
            Probe::Unknown => "focus".to_string(),
        };
        result
    }

    /// Dropdowns and modal triggers: open, then close again
    async fn test_dropdown(&self, element: &DiscoveredElement) -> ElementResult {
        let mut result = self.fresh_result(element, "click");

        if self.skip_unless_visible(element, &mut result).await {
            return result;
        }

        if let Err(e) = element.handle.click(self.timeouts.element()).await {
            self.fail(&mut result, click_failure_message(&e), "dropdown").await;
            return result;
        }
        tokio::time::sleep(self.interaction_delay).await;

        // close again; if the toggle went stale, Escape gets us out
        if element.handle.click(self.timeouts.element()).await.is_err() {
            let _ = self.driver.press_key("Escape").await;
        }
        tokio::time::sleep(self.interaction_delay).await;

        self.post_check(&mut result, "dropdown").await;
        result
    }

    fn fresh_result(&self, element: &DiscoveredElement, action: &str) -> ElementResult {
        ElementResult::new(
            element.kind.as_str(),
            element.label.clone(),
            element.selector.clone(),
            action,
        )
    }

    /// Returns true when the element failed the visibility preflight
    async fn skip_unless_visible(
        &self,
        element: &DiscoveredElement,
        result: &mut ElementResult,
    ) -> bool {
        match Probe::from_result(element.handle.is_visible().await) {
            Probe::Yes => false,
            Probe::No => {
                *result = self.skip(result.clone(), "Element not visible");
                true
            }
            Probe::Unknown => {
                *result = self.skip(result.clone(), "Element state unknown");
                true
            }
        }
    }

    fn skip(&self, mut result: ElementResult, reason: &str) -> ElementResult {
        result.status = TestStatus::Skipped;
        result.error_message = Some(reason.to_string());
        result
    }

    async fn fail(&self, result: &mut ElementResult, message: String, shot_prefix: &str) {
        result.status = TestStatus::Failed;
        result.explanation = Some(element_explanation(&message, &result.element_type));
        result.error_message = Some(truncate(&message, 500));
        result.screenshot_path = self.capture(shot_prefix, &result.element_text).await;
    }

    /// Click, then give a popup a short window to appear; close whatever did
    ///
    /// A popup that never shows up within the window is not an error.
    async fn click_with_optional_popup(&self, handle: &ElementRef) -> crate::error::Result<()> {
        handle.click(self.timeouts.element()).await?;

        let deadline = tokio::time::Instant::now() + self.timeouts.popup_wait();
        loop {
            match self.driver.popup_count().await {
                Ok(0) => {}
                Ok(_) => {
                    // let it settle before closing it
                    tokio::time::sleep(self.interaction_delay).await;
                    match self.driver.close_popups().await {
                        Ok(closed) => debug!(closed, "closed popups after click"),
                        Err(e) => warn!("failed to close popup: {}", e),
                    }
                    break;
                }
                Err(_) => break,
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Ok(())
    }

    /// Navigate back when the click moved the page; best-effort
    ///
    /// Returns where the click navigated to, when it did.
    async fn recover(&self, initial_url: &str) -> Option<String> {
        let current = self.driver.current_url().await.ok()?;
        if current == initial_url {
            return None;
        }
        if let Err(e) = self.driver.go_back(self.timeouts.navigation()).await {
            warn!(from = %current, "failed to navigate back: {}", e);
        }
        tokio::time::sleep(self.interaction_delay).await;
        Some(current)
    }

    /// Scan for an error dialog; on a hit, fail the result and dismiss it
    async fn post_check(&self, result: &mut ElementResult, shot_prefix: &str) {
        if !self.error_dialog_present().await {
            return;
        }
        self.fail(
            result,
            "Error dialog appeared after click".to_string(),
            shot_prefix,
        )
        .await;
        self.close_dialogs().await;
    }

    async fn error_dialog_present(&self) -> bool {
        for selector in ERROR_DIALOG_SELECTORS {
            if let Ok(Some(dialog)) = self.driver.query(selector).await {
                if Probe::from_result(dialog.is_visible().await).admits() {
                    return true;
                }
            }
        }
        false
    }

    /// Close-button probe first, Escape as the fallback
    async fn close_dialogs(&self) {
        for selector in DIALOG_CLOSE_SELECTORS {
            if let Ok(Some(button)) = self.driver.query(selector).await {
                if Probe::from_result(button.is_visible().await).admits()
                    && button.click(self.timeouts.element()).await.is_ok()
                {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    break;
                }
            }
        }
        let _ = self.driver.press_key("Escape").await;
    }

    /// Capture a failure screenshot when configured
    async fn capture(&self, prefix: &str, label: &str) -> Option<String> {
        if !self.screenshots.on_error {
            return None;
        }
        let dir = self.screenshots_dir.as_ref()?;
        let bytes = match self.driver.screenshot(self.screenshots.full_page).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("screenshot capture failed: {}", e);
                return None;
            }
        };
        let filename = format!(
            "{}_{}_{}.png",
            prefix,
            sanitize(label),
            Local::now().format("%Y%m%d_%H%M%S_%3f"),
        );
        let path = dir.join(filename);
        match std::fs::write(&path, bytes) {
            Ok(()) => Some(path.display().to_string()),
            Err(e) => {
                warn!("screenshot write failed: {}", e);
                None
            }
        }
    }
}

fn click_failure_message(error: &Error) -> String {
    if error.is_timeout() {
        "Click action timed out".to_string()
    } else {
        error.to_string()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(20)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ClickEffect, ScriptedDriver, ScriptedElement, ScriptedPage};
    use crate::discover::Discoverer;
    use crate::crawl::UrlContext;
    use crate::config::CrawlOptions;
    use url::Url;

    const HOME: &str = "https://x.test/home";

    fn tester(driver: Arc<ScriptedDriver>, shots_dir: Option<PathBuf>) -> ElementTester {
        let timeouts = TimeoutOptions {
            popup_wait_ms: 50,
            ..Default::default()
        };
        ElementTester::new(
            driver,
            timeouts,
            Duration::from_millis(0),
            ScreenshotOptions::default(),
            shots_dir,
        )
    }

    async fn setup(page: ScriptedPage) -> (Arc<ScriptedDriver>, Vec<DiscoveredElement>) {
        let driver = Arc::new(ScriptedDriver::new());
        driver.add_page(page);
        driver.navigate(HOME, Duration::from_secs(1)).await.unwrap();
        let origin = Url::parse("https://x.test/").unwrap();
        let context = UrlContext::new(&origin, &CrawlOptions::default(), &[]);
        let discoverer = Discoverer::new(driver.clone(), context, vec![]);
        let elements = discoverer.discover_elements().await;
        (driver, elements)
    }

    #[tokio::test]
    async fn test_button_click_passes() {
        let (driver, elements) = setup(
            ScriptedPage::new(HOME).element(ScriptedElement::button("Save")),
        )
        .await;
        let result = tester(driver.clone(), None).test_element(&elements[0]).await;
        assert_eq!(result.status, TestStatus::Passed);
        assert_eq!(driver.clicked(), vec!["Save"]);
    }

    #[tokio::test]
    async fn test_popup_closed_and_url_unchanged() {
        let (driver, elements) = setup(
            ScriptedPage::new(HOME)
                .element(ScriptedElement::button("Open window").on_click(ClickEffect::OpenPopup)),
        )
        .await;
        let result = tester(driver.clone(), None).test_element(&elements[0]).await;

        assert_eq!(result.status, TestStatus::Passed);
        assert_eq!(driver.open_popups(), 0);
        assert_eq!(driver.current_url().await.unwrap(), HOME);
        assert!(result.navigated_to.is_none());
    }

    #[tokio::test]
    async fn test_navigation_recovered_after_click() {
        let (driver, elements) = setup(ScriptedPage::new(HOME).element(
            ScriptedElement::button("Go").on_click(ClickEffect::Navigate(
                "https://x.test/away".to_string(),
            )),
        ))
        .await;
        let result = tester(driver.clone(), None).test_element(&elements[0]).await;

        assert_eq!(result.status, TestStatus::Passed);
        assert_eq!(result.navigated_to.as_deref(), Some("https://x.test/away"));
        // back on the original page for the next sibling element
        assert_eq!(driver.current_url().await.unwrap(), HOME);
    }

    #[tokio::test]
    async fn test_error_dialog_fails_and_is_dismissed() {
        let (driver, elements) = setup(
            ScriptedPage::new(HOME)
                .element(ScriptedElement::button("Break").on_click(ClickEffect::ErrorDialog)),
        )
        .await;
        let shots = tempfile::tempdir().unwrap();
        let result = tester(driver.clone(), Some(shots.path().to_path_buf()))
            .test_element(&elements[0])
            .await;

        assert_eq!(result.status, TestStatus::Failed);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Error dialog appeared after click"),
        );
        assert_eq!(
            result.explanation.as_ref().unwrap().title,
            "Error Dialog After Click",
        );
        // dialog must not block the next element
        assert!(!driver.dialog_open());
        // a screenshot landed in the run folder
        let shot = result.screenshot_path.unwrap();
        assert!(std::path::Path::new(&shot).exists());
    }

    #[tokio::test]
    async fn test_preflight_skips_are_not_defects() {
        let (driver, elements) = setup(
            ScriptedPage::new(HOME)
                .element(ScriptedElement::button("Disabled").disabled())
                .element(ScriptedElement::input("text").attr("placeholder", "Hidden").hidden()),
        )
        .await;
        // hidden elements never get discovered, so only the disabled button is here
        assert_eq!(elements.len(), 1);
        let result = tester(driver, None).test_element(&elements[0]).await;
        assert_eq!(result.status, TestStatus::Skipped);
        assert_eq!(result.error_message.as_deref(), Some("Element not enabled"));
    }

    #[tokio::test]
    async fn test_failing_click_is_failed_with_explanation() {
        let (driver, elements) = setup(ScriptedPage::new(HOME).element(
            ScriptedElement::button("Covered").on_click(ClickEffect::Fail(
                "click intercepted by overlay".to_string(),
            )),
        ))
        .await;
        let result = tester(driver, None).test_element(&elements[0]).await;

        assert_eq!(result.status, TestStatus::Failed);
        assert!(result.error_message.unwrap().contains("intercepted"));
        assert_eq!(result.explanation.unwrap().title, "Click Intercepted");
    }

    #[tokio::test]
    async fn test_input_focus_records_editability() {
        let (driver, elements) = setup(
            ScriptedPage::new(HOME)
                .element(ScriptedElement::input("text").attr("placeholder", "Email"))
                .element(
                    ScriptedElement::input("text")
                        .attr("placeholder", "Locked")
                        .read_only(),
                ),
        )
        .await;
        let tester = tester(driver, None);

        let editable = tester.test_element(&elements[0]).await;
        assert_eq!(editable.status, TestStatus::Passed);
        assert_eq!(editable.action, "focus (editable)");

        let locked = tester.test_element(&elements[1]).await;
        assert_eq!(locked.action, "focus (read-only)");
    }

    #[tokio::test]
    async fn test_dropdown_open_close() {
        let (driver, elements) = setup(ScriptedPage::new(HOME).element(
            ScriptedElement::new("a").text("Menu").class("dropdown-toggle"),
        ))
        .await;
        let result = tester(driver.clone(), None).test_element(&elements[0]).await;

        assert_eq!(result.status, TestStatus::Passed);
        // opened and closed
        assert_eq!(driver.clicked().len(), 2);
    }

    #[tokio::test]
    async fn test_nav_link_recovery() {
        let (driver, elements) = setup(
            ScriptedPage::new(HOME).element(
                ScriptedElement::link("Orders", "https://x.test/orders").in_container("nav"),
            ),
        )
        .await;
        // discovered as nav_link
        let nav = elements
            .iter()
            .find(|e| e.kind == ElementKind::NavLink)
            .unwrap();
        let result = tester(driver.clone(), None).test_element(nav).await;

        assert_eq!(result.status, TestStatus::Passed);
        assert_eq!(result.navigated_to.as_deref(), Some("https://x.test/orders"));
        assert_eq!(driver.current_url().await.unwrap(), HOME);
    }
}
