//! The rule store: published table, then local cache, then the embedded list.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use inkcal_core::{RuleRow, RuleSet};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{load_cache_if_valid, save_cache};
use crate::csv_source::{CsvFetcher, HttpFetcher, parse_rule_rows};
use crate::error::RulesError;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Where the active rule set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOrigin {
    External,
    Cache,
    Fallback,
}

impl fmt::Display for RuleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::External => "external",
            Self::Cache => "cache",
            Self::Fallback => "fallback",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedRules {
    pub rules: RuleSet,
    pub origin: RuleOrigin,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedRules {
    fn fallback(now: DateTime<Utc>) -> Self {
        Self {
            rules: RuleSet::fallback(),
            origin: RuleOrigin::Fallback,
            loaded_at: now,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuleStoreConfig {
    pub csv_url: Option<String>,
    pub cache_path: PathBuf,
    pub cache_ttl: Duration,
}

/// Owns the active rule set and knows how to refresh it.
///
/// `load` never fails: every error on the way degrades to the next source
/// and the embedded list is always available.
pub struct RuleStore<F> {
    config: RuleStoreConfig,
    fetcher: F,
    active: LoadedRules,
}

impl RuleStore<HttpFetcher> {
    pub fn with_http(config: RuleStoreConfig, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self::new(config, HttpFetcher::new(timeout)?))
    }
}

impl<F: CsvFetcher> RuleStore<F> {
    /// Start with the embedded list active; call `reload` to pick up the table.
    pub fn new(config: RuleStoreConfig, fetcher: F) -> Self {
        Self {
            config,
            fetcher,
            active: LoadedRules::fallback(Utc::now()),
        }
    }

    pub fn config(&self) -> &RuleStoreConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn active(&self) -> &LoadedRules {
        &self.active
    }

    /// Resolve the rule set without touching the active one.
    ///
    /// A configured or explicit URL is always tried first and a good result
    /// is written to the cache. With `force_refresh` the cache is not read,
    /// so a failed fetch goes straight to the embedded list.
    pub async fn load(&self, force_refresh: bool, explicit_url: Option<&str>) -> LoadedRules {
        self.load_at(force_refresh, explicit_url, Utc::now()).await
    }

    pub async fn load_at(
        &self,
        force_refresh: bool,
        explicit_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> LoadedRules {
        match self.fetch_remote(explicit_url).await {
            Ok(rules) => {
                if let Err(e) = save_cache(&self.config.cache_path, &rules, now) {
                    warn!(error = %e, "could not write rule cache");
                }
                info!(count = rules.len(), "loaded rules from published table");
                return LoadedRules {
                    rules,
                    origin: RuleOrigin::External,
                    loaded_at: now,
                };
            }
            Err(RulesError::NoSourceUrl) => debug!("no rule source URL configured"),
            Err(e) => warn!(error = %e, "rule table fetch failed"),
        }

        if !force_refresh {
            if let Some(rules) = load_cache_if_valid(&self.config.cache_path, self.config.cache_ttl, now) {
                info!(count = rules.len(), path = %self.config.cache_path.display(), "loaded rules from cache");
                return LoadedRules {
                    rules,
                    origin: RuleOrigin::Cache,
                    loaded_at: now,
                };
            }
        }

        info!("using embedded fallback rules");
        LoadedRules::fallback(now)
    }

    /// Fetch and decode the published table. Does not read or write the cache.
    pub async fn fetch_remote(&self, explicit_url: Option<&str>) -> Result<RuleSet, RulesError> {
        let rules = RuleSet::from_rows(self.fetch_rows(explicit_url).await?);
        if rules.is_empty() {
            return Err(RulesError::EmptyRuleSet);
        }
        Ok(rules)
    }

    /// The published table as raw rows, unvalidated.
    pub async fn fetch_rows(&self, explicit_url: Option<&str>) -> Result<Vec<RuleRow>, RulesError> {
        let url = explicit_url
            .or(self.config.csv_url.as_deref())
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(RulesError::NoSourceUrl)?;

        let body = self.fetcher.fetch(url).await?;
        parse_rule_rows(&body)
    }

    /// Load and make the result the active rule set.
    pub async fn reload(&mut self, force_refresh: bool, explicit_url: Option<&str>) -> &LoadedRules {
        self.active = self.load(force_refresh, explicit_url).await;
        &self.active
    }
}
