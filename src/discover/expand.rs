// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Discovery expansion: reveal content a static DOM scan cannot see
//!
//! SPAs hide half their navigation behind collapsed menus and lazy-rendered
//! lists. Before scanning a page, the expander clicks a bounded number of
//! low-risk toggles (things that do not navigate) and scrolls through the
//! page to trigger intersection observers. Trades run time for coverage;
//! everything here is best-effort and per-click failures are swallowed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::DiscoveryOptions;
use crate::discover::{element_label, element_selector, is_excluded, is_void_href, NO_TEXT, UNKNOWN_TEXT};
use crate::driver::{PageDriver, Probe};

/// Menu expansion and lazy-content scrolling for one run
pub struct DiscoveryExpander {
    driver: Arc<dyn PageDriver>,
    options: DiscoveryOptions,
    excluded_selectors: Vec<String>,
    element_timeout: Duration,
    interaction_delay: Duration,
}

impl DiscoveryExpander {
    /// Build an expander over a driver
    pub fn new(
        driver: Arc<dyn PageDriver>,
        options: DiscoveryOptions,
        excluded_selectors: Vec<String>,
        element_timeout: Duration,
        interaction_delay: Duration,
    ) -> Self {
        Self {
            driver,
            options,
            excluded_selectors,
            element_timeout,
            interaction_delay,
        }
    }

    /// Click collapsed toggles to reveal hidden navigation
    ///
    /// Returns the number of clicks performed. Bounded by
    /// `max_expand_clicks` no matter how many candidates match or fail.
    pub async fn expand_navigation(&self) -> usize {
        if !self.options.expand_nav || self.options.max_expand_clicks == 0 {
            return 0;
        }

        let mut clicked = 0;
        let mut seen: HashSet<String> = HashSet::new();

        for selector in &self.options.click_selectors {
            if clicked >= self.options.max_expand_clicks {
                break;
            }
            let candidates = match self.driver.query_all(selector).await {
                Ok(candidates) => candidates,
                Err(_) => continue,
            };
            for candidate in candidates {
                if clicked >= self.options.max_expand_clicks {
                    break;
                }
                if !self.is_safe_target(&candidate).await {
                    continue;
                }

                let label = element_label(&candidate).await;
                let key = format!(
                    "{}|{}",
                    element_selector(&candidate, &label).await,
                    label
                );
                if !seen.insert(key) {
                    continue;
                }

                match candidate.click(self.element_timeout).await {
                    Ok(()) => {
                        clicked += 1;
                        tokio::time::sleep(self.interaction_delay).await;
                    }
                    Err(e) => trace!("expansion click failed: {}", e),
                }
            }
        }

        debug!(clicks = clicked, "navigation expansion");
        clicked
    }

    /// Low-risk targets only: visible, not disabled, not excluded, and
    /// either no href at all or a void one
    async fn is_safe_target(&self, candidate: &crate::driver::ElementRef) -> bool {
        if is_excluded(candidate, &self.excluded_selectors).await {
            return false;
        }
        if self.has_excluded_text(candidate).await {
            return false;
        }
        if !Probe::from_result(candidate.is_visible().await).admits() {
            return false;
        }
        // an unknown enabled-state does not block the click
        if Probe::from_result(candidate.is_enabled().await) == Probe::No {
            return false;
        }
        match candidate.attribute("href").await {
            Ok(Some(href)) if !href.is_empty() => is_void_href(&href),
            _ => true,
        }
    }

    async fn has_excluded_text(&self, candidate: &crate::driver::ElementRef) -> bool {
        if self.options.excluded_text.is_empty() {
            return false;
        }
        let text = element_label(candidate).await.to_lowercase();
        if text.is_empty() || text == NO_TEXT || text == UNKNOWN_TEXT {
            return false;
        }
        self.options
            .excluded_text
            .iter()
            .any(|token| !token.is_empty() && text.contains(&token.to_lowercase()))
    }

    /// Scroll through the page in steps to trigger lazy-loaded content
    ///
    /// Returns false (a no-op) when the page has no scrollable height or
    /// the driver cannot scroll.
    pub async fn scroll_for_lazy_content(&self) -> bool {
        if !self.options.scroll {
            return false;
        }
        let total_height = match self.driver.page_height().await {
            Ok(height) if height > 0.0 => height,
            _ => return false,
        };

        let steps = self.options.scroll_steps.max(1);
        let step_size = total_height / steps as f64;
        let pause = Duration::from_millis(self.options.scroll_pause_ms);

        for step in 1..=steps {
            let position = (step as f64 * step_size).min(total_height);
            if self.driver.scroll_to(position).await.is_err() {
                return false;
            }
            tokio::time::sleep(pause).await;
        }

        if self.options.scroll_to_top {
            if self.driver.scroll_to(0.0).await.is_err() {
                return false;
            }
            tokio::time::sleep(pause).await;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ClickEffect, ScriptedDriver, ScriptedElement, ScriptedPage};

    const HOME: &str = "https://x.test/home";

    fn fast_options() -> DiscoveryOptions {
        DiscoveryOptions {
            scroll_pause_ms: 0,
            ..Default::default()
        }
    }

    fn expander(driver: Arc<ScriptedDriver>, options: DiscoveryOptions) -> DiscoveryExpander {
        DiscoveryExpander::new(
            driver,
            options,
            vec!["[href*='logout']".to_string()],
            Duration::from_millis(100),
            Duration::from_millis(0),
        )
    }

    async fn driver_with(page: ScriptedPage) -> Arc<ScriptedDriver> {
        let driver = Arc::new(ScriptedDriver::new());
        driver.add_page(page);
        driver.navigate(HOME, Duration::from_secs(1)).await.unwrap();
        driver
    }

    #[tokio::test]
    async fn test_expansion_clicks_safe_toggles_only() {
        let page = ScriptedPage::new(HOME)
            .element(
                ScriptedElement::button("Menu")
                    .attr("aria-expanded", "false")
                    .class("dropdown-toggle"),
            )
            .element(
                // navigating link must not be expansion-clicked
                ScriptedElement::link("Away", "https://x.test/away")
                    .attr("aria-expanded", "false"),
            )
            .element(
                // logout-flavored text must not be expansion-clicked
                ScriptedElement::button("Log Out now").attr("data-toggle", "menu"),
            )
            .element(
                ScriptedElement::new("a")
                    .text("More")
                    .attr("href", "#")
                    .attr("data-toggle", "collapse"),
            );
        let driver = driver_with(page).await;

        let clicks = expander(driver.clone(), fast_options()).expand_navigation().await;
        assert_eq!(clicks, 2);
        assert_eq!(driver.clicked(), vec!["Menu", "More"]);
        // nothing navigated
        assert_eq!(driver.navigations(), vec![HOME]);
    }

    #[tokio::test]
    async fn test_expansion_deduplicates_and_bounds_clicks() {
        // the same toggle matches two selectors; it must be clicked once
        let page = ScriptedPage::new(HOME).element(
            ScriptedElement::button("Menu")
                .attr("aria-expanded", "false")
                .attr("data-toggle", "x")
                .class("dropdown-toggle"),
        );
        let driver = driver_with(page).await;
        let clicks = expander(driver.clone(), fast_options()).expand_navigation().await;
        assert_eq!(clicks, 1);

        // a page full of toggles stops at the bound
        let many = (0..20).fold(ScriptedPage::new(HOME), |page, i| {
            page.element(
                ScriptedElement::button(format!("Toggle {}", i)).attr("aria-expanded", "false"),
            )
        });
        let driver = driver_with(many).await;
        let options = DiscoveryOptions {
            max_expand_clicks: 3,
            scroll_pause_ms: 0,
            ..Default::default()
        };
        assert_eq!(expander(driver.clone(), options).expand_navigation().await, 3);
    }

    #[tokio::test]
    async fn test_expansion_survives_failing_clicks() {
        let page = ScriptedPage::new(HOME)
            .element(
                ScriptedElement::button("Broken")
                    .attr("aria-expanded", "false")
                    .on_click(ClickEffect::Fail("intercepted".to_string())),
            )
            .element(ScriptedElement::button("Fine").attr("aria-expanded", "false"));
        let driver = driver_with(page).await;
        let clicks = expander(driver.clone(), fast_options()).expand_navigation().await;
        assert_eq!(clicks, 1);
        assert_eq!(driver.clicked(), vec!["Broken", "Fine"]);
    }

    #[tokio::test]
    async fn test_expansion_disabled() {
        let page = ScriptedPage::new(HOME)
            .element(ScriptedElement::button("Menu").attr("aria-expanded", "false"));
        let driver = driver_with(page).await;
        let options = DiscoveryOptions {
            expand_nav: false,
            ..fast_options()
        };
        assert_eq!(expander(driver, options).expand_navigation().await, 0);
    }

    #[tokio::test]
    async fn test_scroll_steps_and_return_to_top() {
        let driver = driver_with(ScriptedPage::new(HOME).height(4000.0)).await;
        let scrolled = expander(driver.clone(), fast_options())
            .scroll_for_lazy_content()
            .await;
        assert!(scrolled);
        assert_eq!(driver.scrolls(), vec![1000.0, 2000.0, 3000.0, 4000.0, 0.0]);
    }

    #[tokio::test]
    async fn test_scroll_noop_on_flat_page() {
        let driver = driver_with(ScriptedPage::new(HOME)).await;
        let scrolled = expander(driver.clone(), fast_options())
            .scroll_for_lazy_content()
            .await;
        assert!(!scrolled);
        assert!(driver.scrolls().is_empty());
    }
}
