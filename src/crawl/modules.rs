// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Module matching: which feature area of the site does a URL belong to
//!
//! Resolution is first-match-wins over declaration order. When two modules'
//! seed paths prefix each other (`/shop` and `/shop/premium`), the one
//! declared first claims the URL; the ordered storage keeps that stable.

use tracing::warn;
use url::Url;

use crate::config::ModuleConfig;

/// Ordered collection of named modules and their seed URLs
#[derive(Debug, Clone, Default)]
pub struct ModuleMap {
    modules: Vec<ModuleEntry>,
}

#[derive(Debug, Clone)]
struct ModuleEntry {
    name: String,
    seeds: Vec<Url>,
}

impl ModuleMap {
    /// Build from configuration, preserving declaration order
    ///
    /// Seeds that fail to parse are dropped with a warning rather than
    /// failing the run.
    pub fn from_config(configs: &[ModuleConfig]) -> Self {
        let mut modules = Vec::with_capacity(configs.len());
        for config in configs {
            let mut seeds = Vec::with_capacity(config.seeds.len());
            for raw in &config.seeds {
                match Url::parse(raw) {
                    Ok(url) => seeds.push(url),
                    Err(e) => warn!(module = %config.name, seed = %raw, "unparseable module seed: {}", e),
                }
            }
            modules.push(ModuleEntry {
                name: config.name.clone(),
                seeds,
            });
        }
        Self { modules }
    }

    /// Number of configured modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no modules are configured
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }

    /// All (module name, seed URL) pairs in declaration order
    pub fn seed_urls(&self) -> impl Iterator<Item = (&str, &Url)> {
        self.modules
            .iter()
            .flat_map(|m| m.seeds.iter().map(move |s| (m.name.as_str(), s)))
    }

    /// Seed URLs of one module
    pub fn seeds_of(&self, module: &str) -> &[Url] {
        self.modules
            .iter()
            .find(|m| m.name == module)
            .map(|m| m.seeds.as_slice())
            .unwrap_or(&[])
    }

    /// First module whose seed path prefixes the URL, in declaration order
    pub fn resolve(&self, url: &str) -> Option<&str> {
        let parsed = Url::parse(url).ok()?;
        self.modules
            .iter()
            .find(|m| m.seeds.iter().any(|seed| url_under_seed(&parsed, seed)))
            .map(|m| m.name.as_str())
    }

    /// Whether the URL belongs to one specific module
    ///
    /// False when the module is unknown or has no seeds.
    pub fn contains(&self, url: &str, module: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(url) => url,
            Err(_) => return false,
        };
        self.modules
            .iter()
            .filter(|m| m.name == module)
            .any(|m| m.seeds.iter().any(|seed| url_under_seed(&parsed, seed)))
    }
}

/// Slash-bounded path-prefix test on matching scheme and host
fn url_under_seed(url: &Url, seed: &Url) -> bool {
    if url.scheme() != seed.scheme() || url.host_str() != seed.host_str() || url.port() != seed.port()
    {
        return false;
    }
    let seed_path = seed.path().trim_end_matches('/');
    let url_path = url.path().trim_end_matches('/');
    url_path == seed_path || url_path.starts_with(&format!("{}/", seed_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pet_modules() -> ModuleMap {
        ModuleMap::from_config(&[
            ModuleConfig {
                name: "PawMatch".to_string(),
                seeds: vec!["https://devapp.example.com/pawmatch".to_string()],
            },
            ModuleConfig {
                name: "GroomUp".to_string(),
                seeds: vec!["https://devapp.example.com/grooming".to_string()],
            },
        ])
    }

    #[test]
    fn test_contains_matches_seed_and_subpath() {
        let modules = pet_modules();
        assert!(modules.contains("https://devapp.example.com/pawmatch", "PawMatch"));
        assert!(modules.contains("https://devapp.example.com/pawmatch/profile", "PawMatch"));
        assert!(modules.contains("https://devapp.example.com/pawmatch/", "PawMatch"));
    }

    #[test]
    fn test_contains_rejects_other_module_and_lookalikes() {
        let modules = pet_modules();
        assert!(!modules.contains("https://devapp.example.com/grooming", "PawMatch"));
        // prefix must be slash-bounded
        assert!(!modules.contains("https://devapp.example.com/pawmatcher", "PawMatch"));
        // unknown module has no seeds
        assert!(!modules.contains("https://devapp.example.com/pawmatch", "Ghost"));
    }

    #[test]
    fn test_contains_requires_same_origin() {
        let modules = pet_modules();
        assert!(!modules.contains("https://other.example.com/pawmatch", "PawMatch"));
        assert!(!modules.contains("http://devapp.example.com/pawmatch", "PawMatch"));
    }

    #[test]
    fn test_resolve_first_match_wins() {
        let modules = ModuleMap::from_config(&[
            ModuleConfig {
                name: "Shop".to_string(),
                seeds: vec!["https://devapp.example.com/shop".to_string()],
            },
            ModuleConfig {
                name: "Premium".to_string(),
                seeds: vec!["https://devapp.example.com/shop/premium".to_string()],
            },
        ]);
        // /shop/premium is under both; declaration order decides
        assert_eq!(
            modules.resolve("https://devapp.example.com/shop/premium"),
            Some("Shop"),
        );
        assert_eq!(
            modules.resolve("https://devapp.example.com/elsewhere"),
            None,
        );
    }

    #[test]
    fn test_seed_urls_order() {
        let modules = pet_modules();
        let order: Vec<&str> = modules.seed_urls().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["PawMatch", "GroomUp"]);
    }
}
