use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use inkcal_core::{RuleMode, RuleSet, apply};
use inkcal_rules::{CsvFetcher, RuleOrigin, RuleStore, RuleStoreConfig, RulesError};

const SHEET: &str = "keyword,icon,replacement,mode,color,match_type,size_px\n\
                     Middag:,coffee,,replace_icon,RED,contains,18\n\
                     trening,dumbbell,Trening,replace_text,GREEN,contains,20\n";

const URL: &str = "https://sheet.example/pub.csv";

/// Canned bodies per URL; unknown URLs fail like an unreachable host.
struct StubFetcher {
    bodies: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    fn serving(pairs: &[(&str, &str)]) -> Self {
        Self {
            bodies: Mutex::new(pairs.iter().map(|(u, b)| (u.to_string(), b.to_string())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn offline() -> Self {
        Self::serving(&[])
    }

    fn go_offline(&self) {
        self.bodies.lock().unwrap().clear();
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CsvFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<String, RulesError> {
        self.calls.lock().unwrap().push(url.to_string());
        let body = self.bodies.lock().unwrap().get(url).cloned();
        body.ok_or_else(|| RulesError::Status {
            url: url.to_string(),
            status: 503,
        })
    }
}

fn config(dir: &tempfile::TempDir, url: Option<&str>) -> RuleStoreConfig {
    RuleStoreConfig {
        csv_url: url.map(str::to_string),
        cache_path: dir.path().join("event_mappings_cache.json"),
        cache_ttl: Duration::from_secs(3600),
    }
}

#[tokio::test]
async fn remote_rules_are_cached_and_survive_an_outage() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::new(config(&dir, Some(URL)), StubFetcher::serving(&[(URL, SHEET)]));
    let t0 = Utc.with_ymd_and_hms(2026, 10, 16, 7, 0, 0).unwrap();

    let first = store.load_at(false, None, t0).await;
    assert_eq!(first.origin, RuleOrigin::External);
    assert_eq!(first.rules.len(), 2);
    assert!(dir.path().join("event_mappings_cache.json").exists());

    store.fetcher().go_offline();
    let second = store.load_at(false, None, t0 + chrono::Duration::minutes(30)).await;
    assert_eq!(second.origin, RuleOrigin::Cache);
    assert_eq!(second.rules, first.rules);
}

#[tokio::test]
async fn expired_cache_falls_back_to_embedded_rules() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::new(config(&dir, Some(URL)), StubFetcher::serving(&[(URL, SHEET)]));
    let t0 = Utc.with_ymd_and_hms(2026, 10, 16, 7, 0, 0).unwrap();
    store.load_at(false, None, t0).await;

    store.fetcher().go_offline();
    let later = store.load_at(false, None, t0 + chrono::Duration::hours(2)).await;
    assert_eq!(later.origin, RuleOrigin::Fallback);
    assert_eq!(later.rules, RuleSet::fallback());
}

#[tokio::test]
async fn nothing_configured_still_yields_rules() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = StubFetcher::offline();
    let store = RuleStore::new(config(&dir, None), fetcher);

    let loaded = store.load(false, None).await;
    assert_eq!(loaded.origin, RuleOrigin::Fallback);
    assert!(!loaded.rules.is_empty());
    assert!(store.fetcher().calls().is_empty());

    let mapped = apply("Middag: Pasta", &loaded.rules);
    assert_eq!(mapped.icon.as_deref(), Some("coffee"));
}

#[tokio::test]
async fn force_refresh_skips_a_fresh_cache() {
    let dir = tempfile::tempdir().unwrap();
    let store = RuleStore::new(config(&dir, Some(URL)), StubFetcher::serving(&[(URL, SHEET)]));
    let t0 = Utc.with_ymd_and_hms(2026, 10, 16, 7, 0, 0).unwrap();
    store.load_at(false, None, t0).await;

    store.fetcher().go_offline();
    let forced = store.load_at(true, None, t0 + chrono::Duration::minutes(1)).await;
    assert_eq!(forced.origin, RuleOrigin::Fallback);
    assert_eq!(store.fetcher().calls(), vec![URL.to_string(), URL.to_string()]);
}

#[tokio::test]
async fn explicit_url_wins_over_configured_one() {
    let dir = tempfile::tempdir().unwrap();
    let other = "https://other.example/rules.csv";
    let body = "keyword,icon,mode\noslo,city,add_icon\n";
    let store = RuleStore::new(
        config(&dir, Some(URL)),
        StubFetcher::serving(&[(URL, SHEET), (other, body)]),
    );

    let loaded = store.load(false, Some(other)).await;
    assert_eq!(loaded.origin, RuleOrigin::External);
    assert_eq!(loaded.rules.len(), 1);
    assert_eq!(loaded.rules.rules()[0].mode, RuleMode::AddIcon);
    assert_eq!(store.fetcher().calls(), vec![other.to_string()]);
}

#[tokio::test]
async fn table_without_valid_rows_is_not_used() {
    let dir = tempfile::tempdir().unwrap();
    let body = "keyword,icon\n,orphan\n";
    let store = RuleStore::new(config(&dir, Some(URL)), StubFetcher::serving(&[(URL, body)]));

    let loaded = store.load(false, None).await;
    assert_eq!(loaded.origin, RuleOrigin::Fallback);
    assert!(!dir.path().join("event_mappings_cache.json").exists());
    assert!(matches!(
        store.fetch_remote(None).await,
        Err(RulesError::EmptyRuleSet)
    ));
}

#[tokio::test]
async fn reload_swaps_the_active_set() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = RuleStore::new(config(&dir, Some(URL)), StubFetcher::serving(&[(URL, SHEET)]));
    assert_eq!(store.active().origin, RuleOrigin::Fallback);

    let before = store.active().rules.clone();
    let loaded = store.reload(false, None).await.clone();
    assert_eq!(loaded.origin, RuleOrigin::External);
    assert_eq!(store.active(), &loaded);
    // the earlier value is untouched
    assert_eq!(before, RuleSet::fallback());
}

#[tokio::test]
async fn fetched_rows_without_match_type_look_up_by_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = "keyword,icon,mode\nhusk,bell,replace_icon\n";
    let store = RuleStore::new(config(&dir, Some(URL)), StubFetcher::serving(&[(URL, sheet)]));

    let rows = store.fetch_rows(None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(inkcal_core::match_info_in_rows(&rows, "Husk melk").is_some());
    assert!(inkcal_core::match_info_in_rows(&rows, "kjøp husk").is_none());

    // The tolerant loader reads the same row as `contains`.
    let rules = RuleSet::from_rows(rows);
    assert!(rules.match_info("kjøp husk").is_some());
    assert!(!dir.path().join("event_mappings_cache.json").exists());
}

#[tokio::test]
async fn unwritable_cache_does_not_abort_a_good_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir, Some(URL));
    // a directory cannot be written as a file
    cfg.cache_path = dir.path().to_path_buf();
    let store = RuleStore::new(cfg, StubFetcher::serving(&[(URL, SHEET)]));

    let loaded = store.load(false, None).await;
    assert_eq!(loaded.origin, RuleOrigin::External);
    assert_eq!(loaded.rules.len(), 2);
    assert!(dir.path().is_dir());
}
