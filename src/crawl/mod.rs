// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Crawl core: URL normalization, module matching, route seeds, frontier

mod frontier;
mod modules;
mod normalize;
mod routes;

pub use frontier::{CrawlState, FrontierEntry, Strategy};
pub use modules::ModuleMap;
pub use normalize::UrlContext;
pub use routes::{ExpansionStats, ParamValues, RouteSet};
