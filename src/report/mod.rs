// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session results, error explanations, and report output

mod explain;
mod html;
mod session;

pub use explain::{
    console_explanation, element_explanation, network_explanation, page_explanation, Explanation,
    Severity,
};
pub use html::write_html_report;
pub use session::{
    ConsoleError, CrawlStep, ElementResult, NetworkError, PageResult, TestSession, TestStatus,
};
