use anyhow::{Context, Result};
use chrono::NaiveDate;
use inkcal_ingest::PipelineOptions;
use inkcal_ingest::calendar::DEFAULT_HOLIDAY_PREFIX;
use inkcal_ingest::pipeline::DEFAULT_DAYS;
use inkcal_ingest::time::DEFAULT_TIMEZONE;
use inkcal_ingest::waste::DEFAULT_WASTE_PREFIX;
use inkcal_rules::{DEFAULT_CACHE_TTL, RuleStoreConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::{default_cache_path, ensure_inkcal_home};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rules: RulesSection,
    pub display: DisplaySection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesSection {
    /// Published CSV of mapping rules. Unset means cache and built-in rules only.
    pub csv_url: Option<String>,
    /// Defaults to `~/.inkcal/event_mappings_cache.json`.
    pub cache_path: Option<PathBuf>,
    pub cache_ttl_seconds: u64,
    pub fetch_timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    pub days: u32,
    pub timezone: String,
    pub include_holidays: bool,
    pub holiday_prefix: String,
    pub waste_prefix: String,
}

impl Default for RulesSection {
    fn default() -> Self {
        Self {
            csv_url: None,
            cache_path: None,
            cache_ttl_seconds: DEFAULT_CACHE_TTL.as_secs(),
            fetch_timeout_seconds: 15,
        }
    }
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            days: DEFAULT_DAYS,
            timezone: DEFAULT_TIMEZONE.to_string(),
            include_holidays: true,
            holiday_prefix: DEFAULT_HOLIDAY_PREFIX.to_string(),
            waste_prefix: DEFAULT_WASTE_PREFIX.to_string(),
        }
    }
}

impl Config {
    pub fn store_config(&self) -> Result<RuleStoreConfig> {
        let cache_path = match &self.rules.cache_path {
            Some(p) => p.clone(),
            None => default_cache_path()?,
        };
        Ok(RuleStoreConfig {
            csv_url: self.rules.csv_url.clone().filter(|u| !u.trim().is_empty()),
            cache_path,
            cache_ttl: Duration::from_secs(self.rules.cache_ttl_seconds),
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.rules.fetch_timeout_seconds)
    }

    pub fn pipeline_options(&self, today: NaiveDate) -> PipelineOptions {
        PipelineOptions {
            today,
            days: self.display.days,
            include_holidays: self.display.include_holidays,
            holiday_prefix: self.display.holiday_prefix.clone(),
            waste_prefix: self.display.waste_prefix.clone(),
        }
    }

    /// Apply `INKCAL_*` overrides; `lookup` is usually `std::env::var`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("INKCAL_RULES_URL") {
            self.rules.csv_url = Some(url);
        }
        if let Some(path) = lookup("INKCAL_RULES_CACHE") {
            self.rules.cache_path = Some(PathBuf::from(path));
        }
        if let Some(ttl) = lookup("INKCAL_RULES_TTL") {
            self.rules.cache_ttl_seconds = ttl
                .trim()
                .parse()
                .with_context(|| format!("INKCAL_RULES_TTL is not a number of seconds: {ttl}"))?;
        }
        if let Some(days) = lookup("INKCAL_DAYS") {
            self.display.days = days
                .trim()
                .parse()
                .with_context(|| format!("INKCAL_DAYS is not a day count: {days}"))?;
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_inkcal_home()?.join("config.toml"))
}

/// Config file plus environment overrides.
pub fn load_config() -> Result<Config> {
    let mut cfg = load_config_from(&config_path()?)?;
    cfg.apply_env_overrides(|k| std::env::var(k).ok())?;
    Ok(cfg)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(p: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&p, &Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
