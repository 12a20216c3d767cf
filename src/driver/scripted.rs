// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Deterministic in-memory driver for the test suite
//!
//! Pages are declared as data: elements, links, console/network events, and
//! click side effects (navigation, popups, error dialogs). The engine runs
//! against it exactly as it would against a real browser, which makes the
//! crawl loop and the interaction protocol testable without Chrome.
//!
//! Selector support is intentionally small: tag, `#id`, `.class`,
//! `[attr]` / `[attr='v']` / `[attr*='v']` / `[attr^='v']`, compounds of
//! those, comma lists, and a single descendant level resolved against an
//! element's declared containers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::driver::{ConsoleEvent, ElementHandle, ElementRef, PageDriver, ResponseEvent};
use crate::error::{Error, Result};

/// What clicking a scripted element does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickEffect {
    /// Nothing happens
    None,
    /// The page navigates to a URL
    Navigate(String),
    /// A popup window opens
    OpenPopup,
    /// An error dialog appears
    ErrorDialog,
    /// The click itself fails with this message
    Fail(String),
}

/// A declared element on a scripted page
#[derive(Debug, Clone)]
pub struct ScriptedElement {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: HashMap<String, String>,
    text: String,
    visible: bool,
    enabled: bool,
    editable: bool,
    /// Container tokens for descendant selectors ("nav", ".navbar")
    containers: Vec<String>,
    effect: ClickEffect,
}

impl ScriptedElement {
    /// A bare element with a tag name
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            id: None,
            classes: Vec::new(),
            attrs: HashMap::new(),
            text: String::new(),
            visible: true,
            enabled: true,
            editable: false,
            containers: Vec::new(),
            effect: ClickEffect::None,
        }
    }

    /// A button with visible text
    pub fn button(text: impl Into<String>) -> Self {
        Self::new("button").text(text)
    }

    /// An anchor with text and an href
    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        let href = href.into();
        Self::new("a")
            .text(text)
            .attr("href", href.clone())
            .on_click(ClickEffect::Navigate(href))
    }

    /// A form input of a given type
    pub fn input(input_type: impl Into<String>) -> Self {
        let mut element = Self::new("input").attr("type", input_type);
        element.editable = true;
        element
    }

    /// Set the element id
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a class
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set an attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Set the element text
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Mark the element invisible
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Mark the element disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Mark the element read-only
    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Declare a container for descendant selectors ("nav", ".navbar")
    pub fn in_container(mut self, token: impl Into<String>) -> Self {
        self.containers.push(token.into());
        self
    }

    /// Set the click side effect
    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.effect = effect;
        self
    }
}

/// A declared page
#[derive(Debug, Clone)]
pub struct ScriptedPage {
    url: String,
    title: String,
    height: f64,
    load_failure: Option<String>,
    elements: Vec<ScriptedElement>,
    console_events: Vec<ConsoleEvent>,
    response_events: Vec<ResponseEvent>,
}

impl ScriptedPage {
    /// A page at a URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            height: 0.0,
            load_failure: None,
            elements: Vec::new(),
            console_events: Vec::new(),
            response_events: Vec::new(),
        }
    }

    /// Set the page title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the scrollable height
    pub fn height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    /// Make navigation to this page fail
    pub fn fails_to_load(mut self, reason: impl Into<String>) -> Self {
        self.load_failure = Some(reason.into());
        self
    }

    /// Add an element
    pub fn element(mut self, element: ScriptedElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Add a plain anchor link to a URL
    pub fn link(self, href: impl Into<String>) -> Self {
        let href = href.into();
        self.element(ScriptedElement::link(href.clone(), href))
    }

    /// Emit a console event when the page loads
    pub fn console_event(mut self, kind: impl Into<String>, text: impl Into<String>) -> Self {
        self.console_events.push(ConsoleEvent {
            kind: kind.into(),
            text: text.into(),
            source: self.url.clone(),
            line: 0,
        });
        self
    }

    /// Emit a network response event when the page loads
    pub fn response_event(mut self, status: u16, url: impl Into<String>) -> Self {
        self.response_events.push(ResponseEvent {
            url: url.into(),
            method: "GET".to_string(),
            status,
            status_text: String::new(),
        });
        self
    }
}

#[derive(Debug, Default)]
struct DriverState {
    pages: HashMap<String, ScriptedPage>,
    current: String,
    history: Vec<String>,
    console_buf: Vec<ConsoleEvent>,
    response_buf: Vec<ResponseEvent>,
    popups: usize,
    dialog_open: bool,
    clicked: Vec<String>,
    navigations: Vec<String>,
    scrolls: Vec<f64>,
    pressed_keys: Vec<String>,
}

impl DriverState {
    fn load(&mut self, url: &str) -> Result<()> {
        if let Some(page) = self.pages.get(url) {
            if let Some(ref reason) = page.load_failure {
                return Err(Error::Navigation {
                    url: url.to_string(),
                    reason: reason.clone(),
                });
            }
            self.console_buf.extend(page.console_events.iter().cloned());
            self.response_buf.extend(page.response_events.iter().cloned());
        }
        self.current = url.to_string();
        self.history.push(url.to_string());
        self.navigations.push(url.to_string());
        self.dialog_open = false;
        Ok(())
    }

    fn dialog_element() -> ScriptedElement {
        ScriptedElement::new("div")
            .class("alert-danger")
            .text("Something went wrong")
    }
}

/// The in-memory driver
#[derive(Clone, Default)]
pub struct ScriptedDriver {
    state: Arc<Mutex<DriverState>>,
}

impl ScriptedDriver {
    /// Empty driver; add pages before navigating
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a page
    pub fn add_page(&self, page: ScriptedPage) {
        self.state.lock().pages.insert(page.url.clone(), page);
    }

    /// Labels of every element clicked so far (test assertions)
    pub fn clicked(&self) -> Vec<String> {
        self.state.lock().clicked.clone()
    }

    /// Every navigation performed so far (test assertions)
    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    /// Scroll offsets requested so far (test assertions)
    pub fn scrolls(&self) -> Vec<f64> {
        self.state.lock().scrolls.clone()
    }

    /// Keys pressed so far (test assertions)
    pub fn pressed_keys(&self) -> Vec<String> {
        self.state.lock().pressed_keys.clone()
    }

    /// Number of popups currently open (test assertions)
    pub fn open_popups(&self) -> usize {
        self.state.lock().popups
    }

    /// Whether the error dialog is currently open (test assertions)
    pub fn dialog_open(&self) -> bool {
        self.state.lock().dialog_open
    }

    fn handles_for(&self, selector: &str) -> Vec<ElementRef> {
        let state = self.state.lock();
        let mut out: Vec<ElementRef> = Vec::new();
        if let Some(page) = state.pages.get(&state.current) {
            for spec in &page.elements {
                if matches_selector_list(spec, selector) {
                    out.push(Arc::new(ScriptedHandle {
                        spec: spec.clone(),
                        page_url: state.current.clone(),
                        is_dialog: false,
                        driver: Arc::clone(&self.state),
                    }));
                }
            }
        }
        if state.dialog_open {
            let dialog = DriverState::dialog_element();
            if matches_selector_list(&dialog, selector) {
                out.push(Arc::new(ScriptedHandle {
                    spec: dialog,
                    page_url: state.current.clone(),
                    is_dialog: true,
                    driver: Arc::clone(&self.state),
                }));
            }
        }
        out
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.state.lock().load(url)
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().current.clone())
    }

    async fn title(&self) -> Result<String> {
        let state = self.state.lock();
        Ok(state
            .pages
            .get(&state.current)
            .map(|p| p.title.clone())
            .unwrap_or_default())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementRef>> {
        Ok(self.handles_for(selector))
    }

    async fn query(&self, selector: &str) -> Result<Option<ElementRef>> {
        Ok(self.handles_for(selector).into_iter().next())
    }

    async fn go_back(&self, _timeout: Duration) -> Result<()> {
        let mut state = self.state.lock();
        state.history.pop();
        if let Some(previous) = state.history.last().cloned() {
            state.current = previous.clone();
            state.navigations.push(previous);
        }
        state.dialog_open = false;
        Ok(())
    }

    async fn wait_for_load(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.pressed_keys.push(key.to_string());
        if key == "Escape" {
            state.dialog_open = false;
        }
        Ok(())
    }

    async fn scroll_to(&self, y: f64) -> Result<()> {
        self.state.lock().scrolls.push(y);
        Ok(())
    }

    async fn page_height(&self) -> Result<f64> {
        let state = self.state.lock();
        Ok(state
            .pages
            .get(&state.current)
            .map(|p| p.height)
            .unwrap_or(0.0))
    }

    async fn screenshot(&self, _full_page: bool) -> Result<Vec<u8>> {
        // minimal PNG header; enough for the report to embed something
        Ok(vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'])
    }

    async fn popup_count(&self) -> Result<usize> {
        Ok(self.state.lock().popups)
    }

    async fn close_popups(&self) -> Result<usize> {
        let mut state = self.state.lock();
        let closed = state.popups;
        state.popups = 0;
        Ok(closed)
    }

    async fn drain_console_events(&self) -> Vec<ConsoleEvent> {
        std::mem::take(&mut self.state.lock().console_buf)
    }

    async fn drain_response_events(&self) -> Vec<ResponseEvent> {
        std::mem::take(&mut self.state.lock().response_buf)
    }
}

/// Handle to one scripted element
struct ScriptedHandle {
    spec: ScriptedElement,
    page_url: String,
    is_dialog: bool,
    driver: Arc<Mutex<DriverState>>,
}

impl ScriptedHandle {
    /// Detached when the page navigated away, or the dialog was dismissed
    fn check_attached(&self) -> Result<()> {
        let state = self.driver.lock();
        if self.is_dialog {
            if !state.dialog_open {
                return Err(Error::element("dialog dismissed"));
            }
            return Ok(());
        }
        if state.current != self.page_url {
            return Err(Error::element("element detached: page navigated away"));
        }
        Ok(())
    }
}

#[async_trait]
impl ElementHandle for ScriptedHandle {
    async fn is_visible(&self) -> Result<bool> {
        self.check_attached()?;
        Ok(self.spec.visible)
    }

    async fn is_enabled(&self) -> Result<bool> {
        self.check_attached()?;
        Ok(self.spec.enabled)
    }

    async fn is_editable(&self) -> Result<bool> {
        self.check_attached()?;
        Ok(self.spec.editable)
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.check_attached()?;
        if name == "id" {
            return Ok(self.spec.id.clone());
        }
        if name == "class" && !self.spec.classes.is_empty() {
            return Ok(Some(self.spec.classes.join(" ")));
        }
        Ok(self.spec.attrs.get(name).cloned())
    }

    async fn inner_text(&self) -> Result<String> {
        self.check_attached()?;
        Ok(if self.spec.visible {
            self.spec.text.clone()
        } else {
            String::new()
        })
    }

    async fn text_content(&self) -> Result<String> {
        self.check_attached()?;
        Ok(self.spec.text.clone())
    }

    async fn labelled_text(&self) -> Result<String> {
        self.check_attached()?;
        let ids = match self.spec.attrs.get("aria-labelledby") {
            Some(ids) => ids.clone(),
            None => return Ok(String::new()),
        };
        let state = self.driver.lock();
        let page = match state.pages.get(&state.current) {
            Some(page) => page,
            None => return Ok(String::new()),
        };
        let mut parts = Vec::new();
        for id in ids.split_whitespace() {
            if let Some(target) = page.elements.iter().find(|e| e.id.as_deref() == Some(id)) {
                if !target.text.is_empty() {
                    parts.push(target.text.clone());
                }
            }
        }
        Ok(parts.join(" "))
    }

    async fn tag_name(&self) -> Result<String> {
        self.check_attached()?;
        Ok(self.spec.tag.clone())
    }

    async fn matches(&self, selector: &str) -> Result<bool> {
        self.check_attached()?;
        Ok(matches_selector_list(&self.spec, selector))
    }

    async fn click(&self, _timeout: Duration) -> Result<()> {
        self.check_attached()?;
        let effect = self.spec.effect.clone();
        let label = if self.spec.text.is_empty() {
            self.spec.tag.clone()
        } else {
            self.spec.text.clone()
        };
        let mut state = self.driver.lock();
        state.clicked.push(label);
        match effect {
            ClickEffect::None => Ok(()),
            ClickEffect::Navigate(url) => state.load(&url),
            ClickEffect::OpenPopup => {
                state.popups += 1;
                Ok(())
            }
            ClickEffect::ErrorDialog => {
                state.dialog_open = true;
                Ok(())
            }
            ClickEffect::Fail(message) => Err(Error::element(message)),
        }
    }

    async fn focus(&self) -> Result<()> {
        self.check_attached()?;
        Ok(())
    }
}

/// Comma-list selector match
fn matches_selector_list(spec: &ScriptedElement, selector: &str) -> bool {
    selector
        .split(',')
        .any(|single| matches_selector(spec, single.trim()))
}

/// Single selector match, with one descendant level against containers
fn matches_selector(spec: &ScriptedElement, selector: &str) -> bool {
    let mut parts: Vec<&str> = selector.split_whitespace().collect();
    let target = match parts.pop() {
        Some(target) if !target.is_empty() => target,
        _ => return false,
    };
    if !matches_compound(spec, target) {
        return false;
    }
    parts
        .iter()
        .all(|token| spec.containers.iter().any(|c| c == token))
}

/// Compound selector: tag, #id, .class, [attr...] in any combination
fn matches_compound(spec: &ScriptedElement, compound: &str) -> bool {
    let mut rest = compound;
    let mut matched_anything = false;

    // leading tag name
    let tag_end = rest
        .find(|c| c == '#' || c == '.' || c == '[')
        .unwrap_or(rest.len());
    if tag_end > 0 {
        let tag = &rest[..tag_end];
        if tag != "*" && !tag.eq_ignore_ascii_case(&spec.tag) {
            return false;
        }
        matched_anything = true;
        rest = &rest[tag_end..];
    }

    while !rest.is_empty() {
        matched_anything = true;
        if let Some(after) = rest.strip_prefix('#') {
            let end = after
                .find(|c| c == '.' || c == '[' || c == '#')
                .unwrap_or(after.len());
            if spec.id.as_deref() != Some(&after[..end]) {
                return false;
            }
            rest = &after[end..];
        } else if let Some(after) = rest.strip_prefix('.') {
            let end = after
                .find(|c| c == '.' || c == '[' || c == '#')
                .unwrap_or(after.len());
            if !spec.classes.iter().any(|c| c == &after[..end]) {
                return false;
            }
            rest = &after[end..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let end = match after.find(']') {
                Some(end) => end,
                None => return false,
            };
            if !matches_attr_condition(spec, &after[..end]) {
                return false;
            }
            rest = &after[end + 1..];
        } else {
            return false;
        }
    }

    matched_anything
}

/// Attribute condition: name, name='v', name*='v', name^='v'
fn matches_attr_condition(spec: &ScriptedElement, condition: &str) -> bool {
    let attr_value = |name: &str| -> Option<String> {
        if name == "id" {
            return spec.id.clone();
        }
        if name == "class" {
            return if spec.classes.is_empty() {
                None
            } else {
                Some(spec.classes.join(" "))
            };
        }
        spec.attrs.get(name).cloned()
    };

    for (op, contains) in [("*=", true), ("^=", false), ("=", false)] {
        if let Some(pos) = condition.find(op) {
            // make sure we did not split "*=" at its "=".
            if op == "=" && pos > 0 {
                let prev = condition.as_bytes()[pos - 1];
                if prev == b'*' || prev == b'^' {
                    continue;
                }
            }
            let name = condition[..pos].trim();
            let value = condition[pos + op.len()..]
                .trim()
                .trim_matches('\'')
                .trim_matches('"');
            return match attr_value(name) {
                Some(actual) if contains => actual.contains(value),
                Some(actual) if op == "^=" => actual.starts_with(value),
                Some(actual) => actual == value,
                None => false,
            };
        }
    }
    attr_value(condition.trim()).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_element() -> ScriptedElement {
        ScriptedElement::button("Save")
            .id("save-btn")
            .class("btn")
            .class("btn-primary")
            .attr("data-testid", "save")
            .attr("href", "/account/logout")
            .in_container("nav")
    }

    #[test]
    fn test_selector_matching() {
        let spec = sample_element();
        assert!(matches_selector_list(&spec, "button"));
        assert!(matches_selector_list(&spec, "#save-btn"));
        assert!(matches_selector_list(&spec, ".btn-primary"));
        assert!(matches_selector_list(&spec, "button.btn"));
        assert!(matches_selector_list(&spec, "[data-testid='save']"));
        assert!(matches_selector_list(&spec, "[data-testid]"));
        assert!(matches_selector_list(&spec, "[href*='logout']"));
        assert!(matches_selector_list(&spec, "[href^='/account']"));
        assert!(matches_selector_list(&spec, "nav button"));
        assert!(matches_selector_list(&spec, "div, button"));

        assert!(!matches_selector_list(&spec, "a"));
        assert!(!matches_selector_list(&spec, "#other"));
        assert!(!matches_selector_list(&spec, ".missing"));
        assert!(!matches_selector_list(&spec, "[href*='signup']"));
        assert!(!matches_selector_list(&spec, ".navbar button"));
        assert!(!matches_selector_list(&spec, "input[type='submit']"));
    }

    #[tokio::test]
    async fn test_navigation_and_events() {
        let driver = ScriptedDriver::new();
        driver.add_page(
            ScriptedPage::new("https://x.test/home")
                .title("Home")
                .console_event("error", "boom")
                .response_event(500, "https://x.test/api/fail"),
        );

        driver
            .navigate("https://x.test/home", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(driver.current_url().await.unwrap(), "https://x.test/home");
        assert_eq!(driver.title().await.unwrap(), "Home");

        let console = driver.drain_console_events().await;
        assert_eq!(console.len(), 1);
        assert_eq!(console[0].text, "boom");
        // drained means gone
        assert!(driver.drain_console_events().await.is_empty());
        assert_eq!(driver.drain_response_events().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_navigation() {
        let driver = ScriptedDriver::new();
        driver.add_page(ScriptedPage::new("https://x.test/dead").fails_to_load("timeout"));
        let result = driver
            .navigate("https://x.test/dead", Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(Error::Navigation { .. })));
    }

    #[tokio::test]
    async fn test_click_navigate_and_go_back() {
        let driver = ScriptedDriver::new();
        driver.add_page(
            ScriptedPage::new("https://x.test/a").element(ScriptedElement::link(
                "to b",
                "https://x.test/b",
            )),
        );
        driver.add_page(ScriptedPage::new("https://x.test/b"));

        driver
            .navigate("https://x.test/a", Duration::from_secs(1))
            .await
            .unwrap();
        let link = driver.query("a[href]").await.unwrap().unwrap();
        link.click(Duration::from_secs(1)).await.unwrap();
        assert_eq!(driver.current_url().await.unwrap(), "https://x.test/b");

        // the handle is now detached
        assert!(link.is_visible().await.is_err());

        driver.go_back(Duration::from_secs(1)).await.unwrap();
        assert_eq!(driver.current_url().await.unwrap(), "https://x.test/a");
        assert!(link.is_visible().await.unwrap());
    }

    #[tokio::test]
    async fn test_dialog_lifecycle() {
        let driver = ScriptedDriver::new();
        driver.add_page(
            ScriptedPage::new("https://x.test/a").element(
                ScriptedElement::button("Break").on_click(ClickEffect::ErrorDialog),
            ),
        );
        driver
            .navigate("https://x.test/a", Duration::from_secs(1))
            .await
            .unwrap();

        assert!(driver.query(".alert-danger").await.unwrap().is_none());
        let button = driver.query("button").await.unwrap().unwrap();
        button.click(Duration::from_secs(1)).await.unwrap();
        assert!(driver.query(".alert-danger").await.unwrap().is_some());

        driver.press_key("Escape").await.unwrap();
        assert!(driver.query(".alert-danger").await.unwrap().is_none());
        assert!(!driver.dialog_open());
    }

    #[tokio::test]
    async fn test_popup_counting() {
        let driver = ScriptedDriver::new();
        driver.add_page(
            ScriptedPage::new("https://x.test/a")
                .element(ScriptedElement::button("Open").on_click(ClickEffect::OpenPopup)),
        );
        driver
            .navigate("https://x.test/a", Duration::from_secs(1))
            .await
            .unwrap();
        let button = driver.query("button").await.unwrap().unwrap();
        button.click(Duration::from_secs(1)).await.unwrap();
        assert_eq!(driver.popup_count().await.unwrap(), 1);
        assert_eq!(driver.close_popups().await.unwrap(), 1);
        assert_eq!(driver.popup_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_labelled_text_resolution() {
        let driver = ScriptedDriver::new();
        driver.add_page(
            ScriptedPage::new("https://x.test/a")
                .element(ScriptedElement::new("span").id("lbl").text("Shipping address"))
                .element(
                    ScriptedElement::button("")
                        .id("edit")
                        .attr("aria-labelledby", "lbl"),
                ),
        );
        driver
            .navigate("https://x.test/a", Duration::from_secs(1))
            .await
            .unwrap();
        let button = driver.query("#edit").await.unwrap().unwrap();
        assert_eq!(button.labelled_text().await.unwrap(), "Shipping address");
    }
}
