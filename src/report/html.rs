// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Self-contained HTML report
//!
//! One file, no external assets: styles inline, failure screenshots
//! embedded as base64 data URIs. Layout: summary cards, per-module rollup,
//! the crawl path, then one detail section per tested page.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::warn;

use crate::error::Result;
use crate::report::explain::page_explanation;
use crate::report::session::{PageResult, TestSession, TestStatus};

/// Render the session report and write it into the run directory
pub fn write_html_report(
    session: &TestSession,
    dir: impl AsRef<Path>,
    filename: &str,
) -> Result<PathBuf> {
    let path = dir.as_ref().join(filename);
    std::fs::write(&path, render(session))?;
    Ok(path)
}

fn render(session: &TestSession) -> String {
    let mut html = String::with_capacity(64 * 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "<title>Mustekala report - {}</title>\n",
        escape(&session.website_url)
    ));
    html.push_str("<style>\n");
    html.push_str(STYLES);
    html.push_str("</style>\n</head>\n<body>\n");

    header(&mut html, session);
    summary_cards(&mut html, session);
    module_rollup(&mut html, session);
    crawl_path(&mut html, session);

    html.push_str("<h2>Pages</h2>\n");
    for page in &session.pages {
        page_section(&mut html, page);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn header(html: &mut String, session: &TestSession) {
    html.push_str("<header>\n<h1>Mustekala test report</h1>\n");
    html.push_str(&format!(
        "<p class=\"target\">{}</p>\n",
        escape(&session.website_url)
    ));
    if let Some(ref module) = session.single_module {
        html.push_str(&format!(
            "<p class=\"scope\">Scoped to module: <strong>{}</strong></p>\n",
            escape(module)
        ));
    }
    html.push_str(&format!(
        "<p class=\"meta\">Started {} &middot; duration {:.1}s</p>\n",
        escape(&session.started_at),
        session.duration_seconds()
    ));
    html.push_str("</header>\n");
}

fn summary_cards(html: &mut String, session: &TestSession) {
    let cards = [
        ("Pages tested", session.total_pages().to_string(), ""),
        (
            "Pages with errors",
            session.pages_with_errors().to_string(),
            if session.pages_with_errors() > 0 { "bad" } else { "good" },
        ),
        (
            "Network errors",
            session.total_network_errors().to_string(),
            if session.total_network_errors() > 0 { "bad" } else { "good" },
        ),
        (
            "Console errors",
            session.total_console_errors().to_string(),
            if session.total_console_errors() > 0 { "bad" } else { "good" },
        ),
        ("Elements tested", session.total_element_tests().to_string(), ""),
        (
            "Element failures",
            session.total_element_failures().to_string(),
            if session.total_element_failures() > 0 { "bad" } else { "good" },
        ),
    ];

    html.push_str("<section class=\"cards\">\n");
    for (label, value, class) in cards {
        html.push_str(&format!(
            "<div class=\"card {}\"><div class=\"value\">{}</div><div class=\"label\">{}</div></div>\n",
            class, value, label
        ));
    }
    html.push_str("</section>\n");

    if let Some(stats) = session.route_seed_stats {
        html.push_str(&format!(
            "<p class=\"meta\">Route seeds: {} paths parsed, {} static, {} dynamic ({} expanded{})</p>\n",
            stats.total_paths,
            stats.static_paths,
            stats.dynamic_paths,
            stats.dynamic_expanded,
            if stats.capped_paths > 0 {
                format!(", {} capped", stats.capped_paths)
            } else {
                String::new()
            }
        ));
    }
}

fn module_rollup(html: &mut String, session: &TestSession) {
    #[derive(Default)]
    struct Rollup {
        pages: usize,
        with_errors: usize,
        network: usize,
        console: usize,
        element_failures: usize,
    }

    let mut rollups: BTreeMap<String, Rollup> = BTreeMap::new();
    for page in &session.pages {
        let name = page
            .module
            .clone()
            .unwrap_or_else(|| "Uncategorized".to_string());
        let rollup = rollups.entry(name).or_default();
        rollup.pages += 1;
        if page.has_errors() {
            rollup.with_errors += 1;
        }
        rollup.network += page.network_errors.len();
        rollup.console += page.console_errors.len();
        rollup.element_failures += page.elements_failed();
    }

    if rollups.is_empty() {
        return;
    }

    html.push_str("<h2>Modules</h2>\n<table>\n<tr><th>Module</th><th>Pages</th><th>Pages with errors</th><th>Network</th><th>Console</th><th>Element failures</th></tr>\n");
    for (name, rollup) in rollups {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(&name),
            rollup.pages,
            rollup.with_errors,
            rollup.network,
            rollup.console,
            rollup.element_failures
        ));
    }
    html.push_str("</table>\n");
}

fn crawl_path(html: &mut String, session: &TestSession) {
    if session.crawl_path.is_empty() {
        return;
    }
    html.push_str("<h2>Crawl path</h2>\n<table>\n<tr><th>#</th><th>URL</th><th>Title</th><th>Discovered from</th><th>Module</th><th>Links</th><th>Status</th></tr>\n");
    for step in &session.crawl_path {
        html.push_str(&format!(
            "<tr><td>{}</td><td class=\"url\">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            step.step_number,
            escape(&step.url),
            escape(&step.title),
            escape(&step.discovered_from),
            escape(step.module.as_deref().unwrap_or("Uncategorized")),
            step.links_found,
            badge(step.status)
        ));
    }
    html.push_str("</table>\n");
}

fn page_section(html: &mut String, page: &PageResult) {
    html.push_str(&format!(
        "<details class=\"page {}\">\n<summary>{} <span class=\"url\">{}</span> <span class=\"meta\">{}ms &middot; depth {} &middot; via {}</span></summary>\n",
        page.status.as_str(),
        badge(page.status),
        escape(&page.url),
        page.load_time_ms,
        page.crawl_depth,
        escape(&page.discovered_from)
    ));

    if !page.title.is_empty() {
        html.push_str(&format!("<p><strong>{}</strong></p>\n", escape(&page.title)));
    }
    if let Some(ref error) = page.load_error {
        let explanation = page_explanation(error);
        html.push_str(&format!(
            "<div class=\"issue sev-{}\"><p><strong>{}</strong> &mdash; <span class=\"error-line\">{}</span></p><p>{}</p><p class=\"suggestion\">{}</p></div>\n",
            explanation.severity.as_str(),
            escape(&explanation.title),
            escape(error),
            escape(&explanation.explanation),
            escape(&explanation.suggestion)
        ));
    }

    if !page.element_results.is_empty() {
        html.push_str("<h3>Elements</h3>\n<table>\n<tr><th>Type</th><th>Label</th><th>Selector</th><th>Action</th><th>Status</th><th>Detail</th></tr>\n");
        for element in &page.element_results {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td class=\"url\">{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape(&element.element_type),
                escape(&element.element_text),
                escape(&element.element_selector),
                escape(&element.action),
                badge(element.status),
                escape(element.error_message.as_deref().unwrap_or(""))
            ));
            if let Some(ref shot) = element.screenshot_path {
                embed_screenshot(html, shot);
            }
        }
        html.push_str("</table>\n");
    }

    for error in &page.network_errors {
        html.push_str(&format!(
            "<div class=\"issue sev-{}\"><p><strong>{} {}</strong> &mdash; {} {}</p><p>{}</p><p class=\"suggestion\">{}</p></div>\n",
            error.explanation.severity.as_str(),
            error.status_code,
            escape(&error.explanation.title),
            escape(&error.method),
            escape(&error.url),
            escape(&error.explanation.explanation),
            escape(&error.explanation.suggestion)
        ));
    }

    for error in &page.console_errors {
        html.push_str(&format!(
            "<div class=\"issue sev-{}\"><p><strong>{} ({})</strong></p><p class=\"console\">{}</p><p>{}</p><p class=\"suggestion\">{}</p></div>\n",
            error.explanation.severity.as_str(),
            escape(&error.explanation.title),
            escape(&error.error_type),
            escape(&error.message),
            escape(&error.explanation.explanation),
            escape(&error.explanation.suggestion)
        ));
    }

    if !page.discovered_links.is_empty() {
        html.push_str(&format!(
            "<p class=\"meta\">{} links discovered</p>\n",
            page.discovered_links.len()
        ));
    }

    html.push_str("</details>\n");
}

fn embed_screenshot(html: &mut String, path: &str) {
    match std::fs::read(path) {
        Ok(bytes) => {
            html.push_str(&format!(
                "<tr><td colspan=\"6\"><img class=\"shot\" alt=\"failure screenshot\" src=\"data:image/png;base64,{}\"></td></tr>\n",
                BASE64.encode(bytes)
            ));
        }
        Err(e) => warn!(path = %path, "could not embed screenshot: {}", e),
    }
}

fn badge(status: TestStatus) -> String {
    format!(
        "<span class=\"badge {}\">{}</span>",
        status.as_str(),
        status.as_str().to_uppercase()
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const STYLES: &str = r#"
body { font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; margin: 0 auto; max-width: 1100px; padding: 2rem; color: #1c2330; background: #f6f7f9; }
header h1 { margin-bottom: 0.2rem; }
.target { font-size: 1.1rem; color: #4a5568; margin-top: 0; }
.meta { color: #718096; font-size: 0.85rem; }
.scope { color: #2b6cb0; }
.cards { display: flex; flex-wrap: wrap; gap: 0.8rem; margin: 1rem 0; }
.card { background: #fff; border-radius: 8px; padding: 0.9rem 1.2rem; min-width: 120px; box-shadow: 0 1px 3px rgba(0,0,0,0.08); }
.card .value { font-size: 1.6rem; font-weight: 700; }
.card .label { color: #718096; font-size: 0.8rem; }
.card.bad .value { color: #c53030; }
.card.good .value { color: #2f855a; }
table { border-collapse: collapse; width: 100%; background: #fff; margin: 0.6rem 0 1.2rem; font-size: 0.9rem; }
th, td { text-align: left; padding: 0.45rem 0.6rem; border-bottom: 1px solid #e2e8f0; }
th { background: #edf2f7; }
.url { font-family: ui-monospace, monospace; font-size: 0.82rem; word-break: break-all; }
.badge { display: inline-block; padding: 0.1rem 0.5rem; border-radius: 10px; font-size: 0.7rem; font-weight: 700; }
.badge.passed { background: #c6f6d5; color: #22543d; }
.badge.warning { background: #fefcbf; color: #744210; }
.badge.failed { background: #fed7d7; color: #822727; }
.badge.skipped { background: #e2e8f0; color: #4a5568; }
details.page { background: #fff; border-radius: 8px; margin-bottom: 0.6rem; padding: 0.6rem 1rem; box-shadow: 0 1px 3px rgba(0,0,0,0.08); }
details.page summary { cursor: pointer; }
.issue { border-left: 4px solid #cbd5e0; background: #fff; padding: 0.5rem 0.9rem; margin: 0.5rem 0; }
.issue.sev-critical { border-color: #c53030; }
.issue.sev-high { border-color: #dd6b20; }
.issue.sev-medium { border-color: #d69e2e; }
.issue.sev-low { border-color: #718096; }
.suggestion { color: #2b6cb0; font-size: 0.85rem; }
.console { font-family: ui-monospace, monospace; font-size: 0.82rem; background: #1a202c; color: #e2e8f0; padding: 0.4rem 0.6rem; border-radius: 4px; }
.error-line { color: #c53030; }
img.shot { max-width: 100%; border: 1px solid #e2e8f0; border-radius: 4px; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::session::{CrawlStep, ElementResult};

    fn sample_session() -> TestSession {
        let mut session = TestSession::new("https://devapp.example.com/");
        let mut page = PageResult::new("https://devapp.example.com/shop", "Start Page", 0);
        page.title = "Shop <& Co>".to_string();
        page.module = Some("ShopYosa".to_string());
        let mut failed = ElementResult::new("button", "Buy", "#buy", "click");
        failed.status = TestStatus::Failed;
        failed.error_message = Some("Error dialog appeared after click".to_string());
        page.element_results.push(failed);
        page.status = TestStatus::Failed;
        session.pages.push(page);
        session.crawl_path.push(CrawlStep {
            step_number: 1,
            url: "https://devapp.example.com/shop".to_string(),
            title: "Shop".to_string(),
            discovered_from: "Module Seed: ShopYosa".to_string(),
            status: TestStatus::Failed,
            links_found: 3,
            module: Some("ShopYosa".to_string()),
        });
        session.finish();
        session
    }

    #[test]
    fn test_report_contains_sections_and_escapes() {
        let html = render(&sample_session());
        assert!(html.contains("Mustekala test report"));
        assert!(html.contains("Shop &lt;&amp; Co&gt;"));
        assert!(html.contains("Module Seed: ShopYosa"));
        assert!(html.contains("class=\"badge failed\""));
        assert!(html.contains("<h2>Modules</h2>"));
        assert!(html.contains("<h2>Crawl path</h2>"));
    }

    #[test]
    fn test_write_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_html_report(&sample_session(), dir.path(), "test_report.html").unwrap();
        assert!(path.exists());
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_screenshot_embedding() {
        let dir = tempfile::tempdir().unwrap();
        let shot = dir.path().join("failure.png");
        std::fs::write(&shot, b"\x89PNG\r\n\x1a\n").unwrap();

        let mut session = sample_session();
        session.pages[0].element_results[0].screenshot_path =
            Some(shot.display().to_string());
        let html = render(&session);
        assert!(html.contains("data:image/png;base64,"));
    }
}
