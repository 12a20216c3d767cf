// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Human-readable explanations for captured errors
//!
//! Stateless lookups: (error category, code or message) in, explanation
//! out. The text targets whoever reads the report, not whoever wrote the
//! crawler, so it says what probably broke and what to look at first.

use serde::{Deserialize, Serialize};

/// How bad a captured error is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Lowercase name for reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Explanation metadata attached to a captured error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Short title
    pub title: String,
    /// What this error means
    pub explanation: String,
    /// What to look at first
    pub suggestion: String,
    /// Severity tier
    pub severity: Severity,
}

impl Explanation {
    fn new(title: &str, explanation: &str, suggestion: &str, severity: Severity) -> Self {
        Self {
            title: title.to_string(),
            explanation: explanation.to_string(),
            suggestion: suggestion.to_string(),
            severity,
        }
    }
}

/// Explanation for a flagged network response
pub fn network_explanation(status_code: u16) -> Explanation {
    match status_code {
        400 => Explanation::new(
            "Bad Request",
            "The server could not understand the request, usually a malformed payload or missing required parameters.",
            "Check what the endpoint expects and compare it with the request the page actually sent.",
            Severity::Medium,
        ),
        401 => Explanation::new(
            "Unauthorized",
            "The request reached a resource that needs authentication without valid credentials.",
            "Make sure the session token is attached to this request and has not expired mid-run.",
            Severity::High,
        ),
        403 => Explanation::new(
            "Forbidden",
            "The server understood the request but refused it; the logged-in user lacks permission.",
            "Verify the user's role covers this resource, or hide the entry point from users who cannot access it.",
            Severity::High,
        ),
        404 => Explanation::new(
            "Not Found",
            "The requested resource does not exist: a broken link, a deleted record, or a bad URL.",
            "Check whether the resource moved or was removed, and update whatever links to it.",
            Severity::Medium,
        ),
        405 => Explanation::new(
            "Method Not Allowed",
            "The HTTP method is not supported by this endpoint, e.g. POST where only GET is allowed.",
            "Compare the form or fetch call's method with what the endpoint supports.",
            Severity::Medium,
        ),
        500 => Explanation::new(
            "Internal Server Error",
            "The server hit an unexpected condition. This is a backend defect, not a client one.",
            "Check the server logs for the stack trace behind this request.",
            Severity::Critical,
        ),
        502 => Explanation::new(
            "Bad Gateway",
            "A gateway or proxy got an invalid response from the upstream service.",
            "Check that the backend services behind the proxy are up and healthy.",
            Severity::Critical,
        ),
        503 => Explanation::new(
            "Service Unavailable",
            "The server is temporarily unable to handle requests, from maintenance or overload.",
            "Check service status and resource utilization; retry once the backend recovers.",
            Severity::Critical,
        ),
        504 => Explanation::new(
            "Gateway Timeout",
            "A gateway did not get a timely response from the upstream service.",
            "Check backend response times; something behind the proxy is too slow.",
            Severity::High,
        ),
        status => Explanation::new(
            &format!("HTTP Error {}", status),
            &format!("The server returned status code {}.", status),
            "Check the server logs for details on this request.",
            Severity::Medium,
        ),
    }
}

/// Explanation for a flagged console message
pub fn console_explanation(message: &str, kind: &str) -> Explanation {
    let lower = message.to_lowercase();

    if lower.contains("is not defined") || lower.contains("undefined") {
        return Explanation::new(
            "Undefined Variable or Function",
            "Something is used before it is defined, or its name is misspelled.",
            "Check for typos and script load order; verify the import actually resolves.",
            Severity::High,
        );
    }
    if lower.contains("cannot read propert") {
        return Explanation::new(
            "Null Reference",
            "Code accessed a property of null or undefined; the object it expected is not there.",
            "Guard the access or make sure the data is loaded before it is used.",
            Severity::High,
        );
    }
    if lower.contains("cors") || lower.contains("cross-origin") {
        return Explanation::new(
            "CORS Policy Error",
            "The browser blocked a cross-origin request the server did not allow.",
            "Add the origin to the server's CORS configuration, or proxy the request.",
            Severity::High,
        );
    }
    if lower.contains("failed to fetch") || lower.contains("network error") {
        return Explanation::new(
            "Fetch Failure",
            "A network request failed outright: connectivity, a down service, or CORS.",
            "Verify the endpoint is reachable from the browser and check for CORS blocks.",
            Severity::High,
        );
    }
    if lower.contains("syntax error") {
        return Explanation::new(
            "JavaScript Syntax Error",
            "A script failed to parse and never ran.",
            "Find the unbalanced bracket or quote; a linter will point at it immediately.",
            Severity::Critical,
        );
    }
    if lower.contains("typeerror") || lower.contains("type error") {
        return Explanation::new(
            "Type Error",
            "An operation ran against an incompatible type, like calling something that is not a function.",
            "Check the shapes of the values flowing into this call.",
            Severity::High,
        );
    }
    if lower.contains("deprecated") {
        return Explanation::new(
            "Deprecation Warning",
            "A deprecated API is in use and may disappear in a future browser release.",
            "Migrate to the documented replacement.",
            Severity::Low,
        );
    }
    if lower.contains("mixed content") {
        return Explanation::new(
            "Mixed Content",
            "An HTTPS page loaded an HTTP resource.",
            "Serve every resource over HTTPS.",
            Severity::Medium,
        );
    }
    if lower.contains("cookie") && (lower.contains("samesite") || lower.contains("secure")) {
        return Explanation::new(
            "Cookie Security Warning",
            "A cookie is set without proper SameSite/Secure attributes.",
            "Set the attributes server-side when the cookie is issued.",
            Severity::Medium,
        );
    }

    match kind {
        "error" | "pageerror" => Explanation::new(
            "JavaScript Error",
            "An error fired during script execution on this page.",
            "Reproduce with the devtools console open and follow the stack trace.",
            Severity::High,
        ),
        "warning" => Explanation::new(
            "Console Warning",
            "A warning was logged; functionality survived but something is off.",
            "Read the message; warnings have a habit of becoming errors.",
            Severity::Low,
        ),
        _ => Explanation::new(
            "Console Message",
            "A message was logged to the console.",
            "Review the message content.",
            Severity::Low,
        ),
    }
}

/// Explanation for a failed element interaction
pub fn element_explanation(error_message: &str, element_type: &str) -> Explanation {
    let lower = error_message.to_lowercase();

    if lower.contains("timeout") || lower.contains("timed out") {
        return Explanation::new(
            "Interaction Timeout",
            &format!("The {} took too long to respond or become interactive.", element_type),
            "Check whether an overlay is covering it or the page is still loading when it is reached.",
            Severity::Medium,
        );
    }
    if lower.contains("not visible") || lower.contains("hidden") {
        return Explanation::new(
            "Element Not Visible",
            &format!("The {} is in the DOM but not visible.", element_type),
            "Check its display/visibility CSS and whether another element sits on top of it.",
            Severity::Medium,
        );
    }
    if lower.contains("detached") {
        return Explanation::new(
            "Element Detached",
            &format!("The {} was removed from the DOM mid-interaction.", element_type),
            "The page re-rendered underneath the test; check for an unexpected reload or state reset.",
            Severity::High,
        );
    }
    if lower.contains("dialog") {
        return Explanation::new(
            "Error Dialog After Click",
            &format!("Clicking the {} surfaced an error dialog.", element_type),
            "Reproduce the click by hand; the dialog text and the network tab will name the failing call.",
            Severity::High,
        );
    }
    if lower.contains("intercept") || lower.contains("click") {
        return Explanation::new(
            "Click Intercepted",
            &format!("Another element covered the {} and swallowed the click.", element_type),
            "Look for modals, toasts, or sticky overlays sitting above the target.",
            Severity::Medium,
        );
    }

    Explanation::new(
        "Element Interaction Error",
        &format!("Interacting with the {} failed.", element_type),
        "Check the element's state and read the full error message.",
        Severity::Medium,
    )
}

/// Explanation for a page-level failure
pub fn page_explanation(error_message: &str) -> Explanation {
    let lower = error_message.to_lowercase();

    if lower.contains("timeout") || lower.contains("timed out") {
        return Explanation::new(
            "Page Load Timeout",
            "The page did not finish loading in time.",
            "Check server response times and the size of the assets this page pulls in.",
            Severity::High,
        );
    }
    if lower.contains("navigation") {
        return Explanation::new(
            "Navigation Error",
            "The browser failed to navigate to this page.",
            "Verify the URL resolves and does not bounce through a broken redirect.",
            Severity::High,
        );
    }

    Explanation::new(
        "Page Error",
        "Something failed while loading or testing this page.",
        "Read the full error message for the specifics.",
        Severity::Medium,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_status_codes() {
        assert_eq!(network_explanation(500).severity, Severity::Critical);
        assert_eq!(network_explanation(404).title, "Not Found");
        assert_eq!(network_explanation(401).severity, Severity::High);
    }

    #[test]
    fn test_unknown_status_code_falls_back() {
        let explanation = network_explanation(418);
        assert_eq!(explanation.title, "HTTP Error 418");
        assert_eq!(explanation.severity, Severity::Medium);
    }

    #[test]
    fn test_console_pattern_matching() {
        assert_eq!(
            console_explanation("Uncaught ReferenceError: foo is not defined", "error").title,
            "Undefined Variable or Function",
        );
        assert_eq!(
            console_explanation("TypeError: Cannot read properties of null", "error").title,
            "Null Reference",
        );
        assert_eq!(
            console_explanation("blocked by CORS policy", "error").severity,
            Severity::High,
        );
        // category fallback
        assert_eq!(
            console_explanation("something odd", "warning").severity,
            Severity::Low,
        );
    }

    #[test]
    fn test_element_explanations() {
        assert_eq!(
            element_explanation("Click action timed out", "button").title,
            "Interaction Timeout",
        );
        assert_eq!(
            element_explanation("element detached: page navigated away", "nav_link").severity,
            Severity::High,
        );
        assert_eq!(
            element_explanation("Error dialog appeared after click", "button").title,
            "Error Dialog After Click",
        );
    }

    #[test]
    fn test_page_explanations() {
        assert_eq!(
            page_explanation("Operation timed out after 30000ms: navigate").title,
            "Page Load Timeout",
        );
        assert_eq!(
            page_explanation("Navigation failed to https://x.test: refused").title,
            "Navigation Error",
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }
}
