// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Crawl frontier and visitation state
//!
//! All mutable crawl state lives in [`CrawlState`] and every mutation goes
//! through its methods, which keeps the traversal testable without a
//! browser. Admission (visited / depth) is checked at dequeue, the page
//! budget at the top of each pop, so the stop conditions only ever apply
//! between pages.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::crawl::ParamValues;

/// Traversal order for the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Oldest entry first
    Bfs,
    /// Most recently added entry first
    Dfs,
}

/// One pending page: where to go, where it was found, how deep it is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL to test
    pub url: String,
    /// Human-readable label of the discovery source
    pub discovered_from: String,
    /// Link depth from the seeds
    pub depth: u32,
}

/// The run's crawl state: frontier, visited set, learned route parameters
#[derive(Debug)]
pub struct CrawlState {
    strategy: Strategy,
    max_depth: u32,
    max_pages: usize,
    frontier: VecDeque<FrontierEntry>,
    /// URLs currently sitting in the frontier
    queued: HashSet<String>,
    /// URLs already dequeued for testing this run
    visited: HashSet<String>,
    /// Route-seed URLs ever enqueued, so re-expansion never repeats one
    seeded_routes: HashSet<String>,
    /// Learned dynamic route parameter values
    params: ParamValues,
    pages_tested: usize,
}

impl CrawlState {
    /// New crawl state with the effective strategy and budgets
    pub fn new(strategy: Strategy, max_depth: u32, max_pages: usize) -> Self {
        Self {
            strategy,
            max_depth,
            max_pages,
            frontier: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            seeded_routes: HashSet::new(),
            params: ParamValues::new(),
            pages_tested: 0,
        }
    }

    /// Seed the learned parameter table
    pub fn seed_params(&mut self, params: ParamValues) {
        self.params.merge(&params);
    }

    /// The active traversal strategy
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Queue a discovered URL unless it is already visited or queued
    ///
    /// Returns true when the entry was actually added.
    pub fn enqueue(
        &mut self,
        url: impl Into<String>,
        discovered_from: impl Into<String>,
        depth: u32,
    ) -> bool {
        let url = url.into();
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }
        if depth > self.max_depth {
            trace!(url = %url, depth, "discovered past max depth, dropped");
            return false;
        }
        self.queued.insert(url.clone());
        self.frontier.push_back(FrontierEntry {
            url,
            discovered_from: discovered_from.into(),
            depth,
        });
        true
    }

    /// Queue a route-seed URL at depth 0, at most once per run
    ///
    /// Route seeds have their own seen-set so that re-running the expander
    /// after learning new parameter values never enqueues an old seed again.
    pub fn enqueue_route_seed(&mut self, url: impl Into<String>, label: impl Into<String>) -> bool {
        let url = url.into();
        if !self.seeded_routes.insert(url.clone()) {
            return false;
        }
        self.enqueue(url, label, 0)
    }

    /// Pop the next admissible entry, marking it visited
    ///
    /// Returns None when the page budget is spent or the frontier runs dry.
    /// A popped entry that is already visited or too deep is discarded and
    /// the next one is tried; an entry this method returns is guaranteed
    /// fresh, which makes "never test the same URL twice" a structural
    /// property rather than a caller obligation.
    pub fn next(&mut self) -> Option<FrontierEntry> {
        loop {
            if self.pages_tested >= self.max_pages {
                return None;
            }
            let entry = match self.strategy {
                Strategy::Bfs => self.frontier.pop_front()?,
                Strategy::Dfs => self.frontier.pop_back()?,
            };
            self.queued.remove(&entry.url);
            if entry.depth > self.max_depth {
                continue;
            }
            if !self.visited.insert(entry.url.clone()) {
                continue;
            }
            self.pages_tested += 1;
            return Some(entry);
        }
    }

    /// Whether a URL has already been dequeued for testing
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Number of pages handed out for testing so far
    pub fn pages_tested(&self) -> usize {
        self.pages_tested
    }

    /// The configured page budget
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Entries still waiting in the frontier
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// The learned route parameter table
    pub fn params(&self) -> &ParamValues {
        &self.params
    }

    /// Merge harvested parameter values in; returns how many were new
    pub fn learn_params(&mut self, harvested: &ParamValues) -> usize {
        self.params.merge(harvested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(state: &mut CrawlState) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(entry) = state.next() {
            out.push(entry.url);
        }
        out
    }

    #[test]
    fn test_bfs_pops_oldest_dfs_pops_newest() {
        for (strategy, expected_first) in [(Strategy::Bfs, "https://x.test/a"), (Strategy::Dfs, "https://x.test/c")] {
            let mut state = CrawlState::new(strategy, 5, 100);
            state.enqueue("https://x.test/a", "seed", 0);
            state.enqueue("https://x.test/b", "seed", 1);
            state.enqueue("https://x.test/c", "seed", 1);
            let first = state.next().unwrap();
            assert_eq!(first.url, expected_first, "{:?}", strategy);
        }
    }

    #[test]
    fn test_never_dequeues_same_url_twice() {
        let mut state = CrawlState::new(Strategy::Bfs, 5, 100);
        state.enqueue("https://x.test/a", "seed", 0);
        assert!(!state.enqueue("https://x.test/a", "again", 0));

        assert_eq!(urls(&mut state), vec!["https://x.test/a"]);
        assert!(state.is_visited("https://x.test/a"));

        // once visited, re-enqueueing is refused
        assert!(!state.enqueue("https://x.test/a", "later", 1));
        assert!(state.next().is_none());
    }

    #[test]
    fn test_depth_limit() {
        let mut state = CrawlState::new(Strategy::Bfs, 2, 100);
        assert!(state.enqueue("https://x.test/ok", "seed", 2));
        assert!(!state.enqueue("https://x.test/deep", "seed", 3));
        assert_eq!(urls(&mut state), vec!["https://x.test/ok"]);
    }

    #[test]
    fn test_page_budget() {
        let mut state = CrawlState::new(Strategy::Bfs, 5, 2);
        state.enqueue("https://x.test/a", "seed", 0);
        state.enqueue("https://x.test/b", "seed", 0);
        state.enqueue("https://x.test/c", "seed", 0);

        assert_eq!(urls(&mut state).len(), 2);
        assert_eq!(state.pages_tested(), 2);
        // budget spent with the frontier still non-empty
        assert_eq!(state.frontier_len(), 1);
    }

    #[test]
    fn test_route_seed_enqueued_once_across_expansions() {
        let mut state = CrawlState::new(Strategy::Dfs, 5, 100);
        assert!(state.enqueue_route_seed("https://x.test/orders/42", "Route Seed"));
        // same seed from a later expansion pass
        assert!(!state.enqueue_route_seed("https://x.test/orders/42", "Route Seed (dynamic)"));

        assert_eq!(urls(&mut state), vec!["https://x.test/orders/42"]);
        // even after visiting, the seen-set refuses it
        assert!(!state.enqueue_route_seed("https://x.test/orders/42", "Route Seed (dynamic)"));
    }

    #[test]
    fn test_param_learning_is_monotonic() {
        let mut state = CrawlState::new(Strategy::Bfs, 5, 100);
        let mut first = ParamValues::new();
        first.insert("id", "1");
        state.seed_params(first);

        let mut harvested = ParamValues::new();
        harvested.insert("id", "2");
        assert_eq!(state.learn_params(&harvested), 1);
        assert_eq!(state.learn_params(&harvested), 0);
        assert_eq!(state.params().get("id"), vec!["1", "2"]);
    }
}
