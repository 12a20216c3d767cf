// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Chrome/Chromium adapter over the `headless_chrome` crate
//!
//! The CDP client is synchronous, so every call is bridged through
//! `tokio::task::spawn_blocking`. DOM probing, clicking, and event capture
//! all go through injected JavaScript evaluated in the page: discovered
//! elements are parked in `window.__mk_registry` and referenced by index,
//! console/network/popup activity is recorded by hooks installed after
//! every navigation and drained with `evaluate`.
//!
//! Known gap of the hook approach: events fired between the navigation
//! commit and hook installation are not captured. Good enough for "did
//! this page error," which is all the engine asks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::BrowserOptions;
use crate::driver::{ConsoleEvent, ElementHandle, ElementRef, PageDriver, ResponseEvent};
use crate::error::{Error, Result};

/// Instrumentation installed into every document after navigation
const HOOK_SCRIPT: &str = r#"
(function() {
    if (window.__mk_hooked) return true;
    window.__mk_hooked = true;
    window.__mk_console = [];
    window.__mk_responses = [];
    window.__mk_popups = [];

    ['error', 'warn'].forEach(function(level) {
        var original = console[level];
        console[level] = function() {
            try {
                var parts = [];
                for (var i = 0; i < arguments.length; i++) parts.push(String(arguments[i]));
                window.__mk_console.push({
                    kind: level === 'warn' ? 'warning' : 'error',
                    text: parts.join(' '),
                    source: 'console',
                    line: 0
                });
            } catch (e) {}
            return original.apply(console, arguments);
        };
    });

    window.addEventListener('error', function(e) {
        window.__mk_console.push({
            kind: 'pageerror',
            text: String(e.message || e),
            source: String(e.filename || 'page'),
            line: e.lineno || 0
        });
    });
    window.addEventListener('unhandledrejection', function(e) {
        window.__mk_console.push({
            kind: 'pageerror',
            text: 'Unhandled rejection: ' + String(e.reason),
            source: 'page',
            line: 0
        });
    });

    var originalFetch = window.fetch;
    if (originalFetch) {
        window.fetch = function() {
            var args = arguments;
            return originalFetch.apply(window, args).then(function(resp) {
                try {
                    window.__mk_responses.push({
                        url: resp.url,
                        method: (args[1] && args[1].method) || 'GET',
                        status: resp.status,
                        status_text: resp.statusText || ''
                    });
                } catch (e) {}
                return resp;
            });
        };
    }

    var originalOpen = XMLHttpRequest.prototype.open;
    var originalSend = XMLHttpRequest.prototype.send;
    XMLHttpRequest.prototype.open = function(method, url) {
        this.__mk_request = { method: String(method || 'GET'), url: String(url || '') };
        return originalOpen.apply(this, arguments);
    };
    XMLHttpRequest.prototype.send = function() {
        var xhr = this;
        xhr.addEventListener('loadend', function() {
            try {
                window.__mk_responses.push({
                    url: xhr.responseURL || (xhr.__mk_request && xhr.__mk_request.url) || '',
                    method: (xhr.__mk_request && xhr.__mk_request.method) || 'GET',
                    status: xhr.status,
                    status_text: xhr.statusText || ''
                });
            } catch (e) {}
        });
        return originalSend.apply(this, arguments);
    };

    var originalWindowOpen = window.open;
    window.open = function() {
        var handle = originalWindowOpen ? originalWindowOpen.apply(window, arguments) : null;
        window.__mk_popups.push(handle);
        return handle;
    };
    return true;
})()
"#;

/// Sentinel returned by element scripts when the node left the DOM
const DETACHED: &str = "__mk_detached__";

/// Driver over one Chrome tab
pub struct ChromeDriver {
    /// Keeps the browser process alive for the driver's lifetime
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeDriver {
    /// Launch a browser and open the tab the run will use
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let headless = options.headless;
        let width = options.viewport_width;
        let height = options.viewport_height;

        let (browser, tab) = tokio::task::spawn_blocking(move || -> Result<(Browser, Arc<Tab>)> {
            let launch = LaunchOptions::default_builder()
                .headless(headless)
                .window_size(Some((width, height)))
                .idle_browser_timeout(Duration::from_secs(600))
                .build()
                .map_err(Error::driver)?;
            let browser = Browser::new(launch).map_err(Error::driver)?;
            let tab = browser.new_tab().map_err(Error::driver)?;
            Ok((browser, tab))
        })
        .await
        .map_err(Error::driver)??;

        debug!("chrome launched");
        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    /// Evaluate a script in the page, returning its JSON value
    async fn eval(&self, script: String) -> Result<Value> {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || -> Result<Value> {
            let result = tab.evaluate(&script, true).map_err(Error::driver)?;
            Ok(result.value.unwrap_or(Value::Null))
        })
        .await
        .map_err(Error::driver)?
    }

    /// Install the console/network/popup hooks into the current document
    async fn install_hooks(&self) -> Result<()> {
        self.eval(HOOK_SCRIPT.to_string()).await?;
        Ok(())
    }

    /// Drain one of the hook buffers as deserialized events
    async fn drain_buffer<T: serde::de::DeserializeOwned>(&self, name: &str) -> Vec<T> {
        let script = format!(
            "JSON.stringify((window.{} || []).splice(0, window.{} ? window.{}.length : 0))",
            name, name, name
        );
        match self.eval(script).await {
            Ok(Value::String(json)) => serde_json::from_str(&json).unwrap_or_default(),
            Ok(_) => Vec::new(),
            Err(e) => {
                trace!("event drain failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        let target = url.to_string();
        let nav_target = target.clone();
        let result = tokio::time::timeout(
            timeout,
            tokio::task::spawn_blocking(move || -> Result<()> {
                tab.navigate_to(&nav_target)
                    .map_err(|e| Error::Navigation {
                        url: nav_target.clone(),
                        reason: e.to_string(),
                    })?;
                tab.wait_until_navigated().map_err(|e| Error::Navigation {
                    url: nav_target.clone(),
                    reason: e.to_string(),
                })?;
                Ok(())
            }),
        )
        .await;

        match result {
            Ok(joined) => joined.map_err(Error::driver)??,
            Err(_) => {
                return Err(Error::timeout_at(
                    "navigate",
                    timeout.as_millis() as u64,
                    target,
                ))
            }
        }

        self.install_hooks().await
    }

    async fn current_url(&self) -> Result<String> {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || Ok(tab.get_url()))
            .await
            .map_err(Error::driver)?
    }

    async fn title(&self) -> Result<String> {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || tab.get_title().map_err(Error::driver))
            .await
            .map_err(Error::driver)?
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementRef>> {
        let script = format!(
            r#"(function() {{
                window.__mk_registry = window.__mk_registry || [];
                var out = [];
                var nodes;
                try {{ nodes = document.querySelectorAll({selector}); }}
                catch (e) {{ return JSON.stringify(out); }}
                nodes.forEach(function(el) {{
                    out.push(window.__mk_registry.push(el) - 1);
                }});
                return JSON.stringify(out);
            }})()"#,
            selector = js_string(selector),
        );
        let indices: Vec<usize> = match self.eval(script).await? {
            Value::String(json) => serde_json::from_str(&json).unwrap_or_default(),
            _ => Vec::new(),
        };
        Ok(indices
            .into_iter()
            .map(|index| {
                Arc::new(ChromeElement {
                    tab: Arc::clone(&self.tab),
                    index,
                }) as ElementRef
            })
            .collect())
    }

    async fn query(&self, selector: &str) -> Result<Option<ElementRef>> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    async fn go_back(&self, timeout: Duration) -> Result<()> {
        self.eval("history.back()".to_string()).await?;
        // history.back in an SPA may not trigger a load; give it a moment
        tokio::time::sleep(Duration::from_millis(300).min(timeout)).await;
        let tab = Arc::clone(&self.tab);
        let _ = tokio::task::spawn_blocking(move || tab.wait_until_navigated().map(|_| ()))
            .await
            .map_err(Error::driver)?;
        self.install_hooks().await
    }

    async fn wait_for_load(&self, timeout: Duration) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        let waited = tokio::time::timeout(
            timeout,
            tokio::task::spawn_blocking(move || tab.wait_until_navigated().map(|_| ())),
        )
        .await;
        match waited {
            Ok(joined) => {
                joined.map_err(Error::driver)?.map_err(Error::driver)?;
                self.install_hooks().await
            }
            Err(_) => Err(Error::timeout("wait_for_load", timeout.as_millis() as u64)),
        }
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            tab.press_key(&key).map(|_| ()).map_err(Error::driver)
        })
        .await
        .map_err(Error::driver)?
    }

    async fn scroll_to(&self, y: f64) -> Result<()> {
        self.eval(format!("window.scrollTo(0, {})", y)).await?;
        Ok(())
    }

    async fn page_height(&self) -> Result<f64> {
        match self
            .eval("document.body ? document.body.scrollHeight : 0".to_string())
            .await?
        {
            Value::Number(height) => Ok(height.as_f64().unwrap_or(0.0)),
            _ => Ok(0.0),
        }
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>> {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || {
            tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, full_page)
                .map_err(Error::driver)
        })
        .await
        .map_err(Error::driver)?
    }

    async fn popup_count(&self) -> Result<usize> {
        let script = "(window.__mk_popups || []).filter(function(p) { return p && !p.closed; }).length".to_string();
        match self.eval(script).await? {
            Value::Number(count) => Ok(count.as_u64().unwrap_or(0) as usize),
            _ => Ok(0),
        }
    }

    async fn close_popups(&self) -> Result<usize> {
        let script = r#"(function() {
            var closed = 0;
            (window.__mk_popups || []).forEach(function(p) {
                try { if (p && !p.closed) { p.close(); closed++; } } catch (e) {}
            });
            window.__mk_popups = [];
            return closed;
        })()"#
            .to_string();
        match self.eval(script).await? {
            Value::Number(count) => Ok(count.as_u64().unwrap_or(0) as usize),
            _ => Ok(0),
        }
    }

    async fn drain_console_events(&self) -> Vec<ConsoleEvent> {
        self.drain_buffer("__mk_console").await
    }

    async fn drain_response_events(&self) -> Vec<ResponseEvent> {
        self.drain_buffer("__mk_responses").await
    }
}

/// Handle to one element parked in the page-side registry
struct ChromeElement {
    tab: Arc<Tab>,
    index: usize,
}

impl ChromeElement {
    /// Run a script with `el` bound to this element
    ///
    /// The body must `return` a JSON-serializable value; a detached node
    /// yields an element error instead.
    async fn eval_on_element(&self, body: &str) -> Result<Value> {
        let script = format!(
            r#"(function() {{
                var el = (window.__mk_registry || [])[{index}];
                if (!el || !document.contains(el)) return "{detached}";
                {body}
            }})()"#,
            index = self.index,
            detached = DETACHED,
            body = body,
        );
        let tab = Arc::clone(&self.tab);
        let value = tokio::task::spawn_blocking(move || -> Result<Value> {
            let result = tab.evaluate(&script, true).map_err(Error::driver)?;
            Ok(result.value.unwrap_or(Value::Null))
        })
        .await
        .map_err(Error::driver)??;

        if value.as_str() == Some(DETACHED) {
            return Err(Error::element("element detached from the DOM"));
        }
        Ok(value)
    }

    async fn eval_bool(&self, body: &str) -> Result<bool> {
        Ok(self.eval_on_element(body).await?.as_bool().unwrap_or(false))
    }

    async fn eval_string(&self, body: &str) -> Result<String> {
        Ok(self
            .eval_on_element(body)
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl ElementHandle for ChromeElement {
    async fn is_visible(&self) -> Result<bool> {
        self.eval_bool(
            "var r = el.getBoundingClientRect(); \
             var s = window.getComputedStyle(el); \
             return !!(r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none');",
        )
        .await
    }

    async fn is_enabled(&self) -> Result<bool> {
        self.eval_bool("return !el.disabled && el.getAttribute('aria-disabled') !== 'true';")
            .await
    }

    async fn is_editable(&self) -> Result<bool> {
        self.eval_bool(
            "var tag = el.tagName; \
             if (el.isContentEditable) return true; \
             if (tag !== 'INPUT' && tag !== 'TEXTAREA' && tag !== 'SELECT') return false; \
             return !el.disabled && !el.readOnly;",
        )
        .await
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        let body = format!("return el.getAttribute({});", js_string(name));
        match self.eval_on_element(&body).await? {
            Value::String(value) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    async fn inner_text(&self) -> Result<String> {
        self.eval_string("return el.innerText || '';").await
    }

    async fn text_content(&self) -> Result<String> {
        self.eval_string("return (el.textContent || '').trim();")
            .await
    }

    async fn labelled_text(&self) -> Result<String> {
        self.eval_string(
            "var ids = (el.getAttribute('aria-labelledby') || '').split(/\\s+/).filter(Boolean); \
             if (!ids.length) return ''; \
             var parts = ids.map(function(id) { \
                 var target = document.getElementById(id); \
                 return target ? (target.innerText || target.textContent || '').trim() : ''; \
             }).filter(Boolean); \
             return parts.join(' ');",
        )
        .await
    }

    async fn tag_name(&self) -> Result<String> {
        self.eval_string("return el.tagName.toLowerCase();").await
    }

    async fn matches(&self, selector: &str) -> Result<bool> {
        let body = format!(
            "try {{ return el.matches({}); }} catch (e) {{ return false; }}",
            js_string(selector),
        );
        self.eval_bool(&body).await
    }

    async fn click(&self, _timeout: Duration) -> Result<()> {
        self.eval_on_element(
            "el.scrollIntoView({block: 'center', inline: 'center'}); el.click(); return true;",
        )
        .await?;
        Ok(())
    }

    async fn focus(&self) -> Result<()> {
        self.eval_on_element("el.focus(); return true;").await?;
        Ok(())
    }
}

/// Quote a Rust string as a JavaScript string literal
fn js_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}
