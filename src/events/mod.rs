// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Passive error aggregation over a page's lifetime
//!
//! The driver buffers every network response and console message it sees;
//! between pages the monitor drains those buffers, keeps what matters (the
//! configured status-code set minus the ignore list, the configured
//! console categories), and enriches each keeper with its explanation.

use chrono::Local;
use tracing::debug;

use crate::config::ErrorCaptureOptions;
use crate::driver::PageDriver;
use crate::report::{console_explanation, network_explanation, ConsoleError, NetworkError};

/// Network/console error collector for one run
pub struct ErrorMonitor {
    options: ErrorCaptureOptions,
}

impl ErrorMonitor {
    /// Build a monitor from the capture options
    pub fn new(options: ErrorCaptureOptions) -> Self {
        Self { options }
    }

    /// Throw away everything buffered so far (called before a page loads)
    pub async fn discard(&self, driver: &dyn PageDriver) {
        let responses = driver.drain_response_events().await.len();
        let console = driver.drain_console_events().await.len();
        if responses + console > 0 {
            debug!(responses, console, "discarded stale events");
        }
    }

    /// Drain and filter everything captured during the current page's test
    pub async fn collect(&self, driver: &dyn PageDriver) -> (Vec<NetworkError>, Vec<ConsoleError>) {
        let timestamp = Local::now().to_rfc3339();

        let network = driver
            .drain_response_events()
            .await
            .into_iter()
            .filter(|event| self.flags_response(event.status, &event.url))
            .map(|event| NetworkError {
                explanation: network_explanation(event.status),
                url: event.url,
                method: event.method,
                status_code: event.status,
                status_text: event.status_text,
                timestamp: timestamp.clone(),
            })
            .collect();

        let console = driver
            .drain_console_events()
            .await
            .into_iter()
            .filter(|event| self.flags_console(&event.kind))
            .map(|event| ConsoleError {
                explanation: console_explanation(&event.text, &event.kind),
                message: event.text,
                error_type: event.kind,
                source: event.source,
                line_number: event.line,
                timestamp: timestamp.clone(),
            })
            .collect();

        (network, console)
    }

    /// Whether a response status/URL pair counts as a network error
    fn flags_response(&self, status: u16, url: &str) -> bool {
        if !self.options.status_codes.contains(&status) {
            return false;
        }
        let lower = url.to_lowercase();
        !self
            .options
            .ignore_url_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && lower.contains(&pattern.to_lowercase()))
    }

    /// Whether a console message category is captured
    fn flags_console(&self, kind: &str) -> bool {
        self.options.console_types.iter().any(|t| t == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ScriptedDriver, ScriptedPage};
    use crate::report::Severity;
    use std::time::Duration;

    async fn monitor_page(page: ScriptedPage) -> (Vec<NetworkError>, Vec<ConsoleError>) {
        let driver = ScriptedDriver::new();
        driver.add_page(page);
        driver
            .navigate("https://x.test/a", Duration::from_secs(1))
            .await
            .unwrap();
        let monitor = ErrorMonitor::new(ErrorCaptureOptions::default());
        monitor.collect(&driver).await
    }

    #[tokio::test]
    async fn test_flagged_statuses_captured_with_explanations() {
        let page = ScriptedPage::new("https://x.test/a")
            .response_event(500, "https://x.test/api/orders")
            .response_event(200, "https://x.test/api/ok")
            .response_event(404, "https://x.test/missing.png");
        let (network, console) = monitor_page(page).await;

        assert_eq!(network.len(), 2);
        assert_eq!(network[0].status_code, 500);
        assert_eq!(network[0].explanation.severity, Severity::Critical);
        assert_eq!(network[1].status_code, 404);
        assert!(console.is_empty());
    }

    #[tokio::test]
    async fn test_ignored_patterns_silence_noise() {
        let page = ScriptedPage::new("https://x.test/a")
            .response_event(404, "https://www.Google-Analytics.com/collect")
            .response_event(404, "https://x.test/real-miss");
        let (network, _) = monitor_page(page).await;

        assert_eq!(network.len(), 1);
        assert_eq!(network[0].url, "https://x.test/real-miss");
    }

    #[tokio::test]
    async fn test_console_categories() {
        let page = ScriptedPage::new("https://x.test/a")
            .console_event("error", "ReferenceError: x is not defined")
            .console_event("pageerror", "Uncaught TypeError")
            .console_event("log", "just logging")
            .console_event("warning", "deprecated API");
        let (_, console) = monitor_page(page).await;

        assert_eq!(console.len(), 3);
        assert_eq!(console[0].error_type, "error");
        assert_eq!(console[0].explanation.title, "Undefined Variable or Function");
    }

    #[tokio::test]
    async fn test_discard_clears_buffers() {
        let driver = ScriptedDriver::new();
        driver.add_page(
            ScriptedPage::new("https://x.test/a")
                .console_event("error", "stale")
                .response_event(500, "https://x.test/api"),
        );
        driver
            .navigate("https://x.test/a", Duration::from_secs(1))
            .await
            .unwrap();

        let monitor = ErrorMonitor::new(ErrorCaptureOptions::default());
        monitor.discard(&driver).await;
        let (network, console) = monitor.collect(&driver).await;
        assert!(network.is_empty());
        assert!(console.is_empty());
    }
}
