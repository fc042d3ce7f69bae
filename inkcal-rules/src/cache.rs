//! On-disk copy of the last successfully fetched rule table.
//!
//! Layout: `{"meta": {"fetched_at": <unix seconds>}, "mappings": [row, ...]}`

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use inkcal_core::{RuleRow, RuleSet};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::RulesError;

#[derive(Debug, Serialize, Deserialize)]
struct CacheMeta {
    fetched_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    meta: CacheMeta,
    #[serde(default)]
    mappings: Vec<Value>,
}

/// Write `rules` to `path`, creating parent directories.
pub fn save_cache(path: &Path, rules: &RuleSet, now: DateTime<Utc>) -> Result<(), RulesError> {
    let io = |source| RulesError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io)?;
    }

    let mappings = rules
        .iter()
        .map(|r| {
            json!({
                "keyword": r.keyword,
                "icon": r.icon,
                "replacement": r.replacement,
                "mode": r.mode.as_str(),
                "color": r.color,
                "match_type": r.match_type.as_str(),
                "size_px": r.size_px,
            })
        })
        .collect();
    let file = CacheFile {
        meta: CacheMeta {
            fetched_at: now.timestamp(),
        },
        mappings,
    };
    let body = serde_json::to_string_pretty(&file)?;
    fs::write(path, body).map_err(io)
}

/// Read the cache if it exists, parses, is no older than `ttl` and holds at
/// least one valid rule. Any other outcome is `None`.
pub fn load_cache_if_valid(path: &Path, ttl: Duration, now: DateTime<Utc>) -> Option<RuleSet> {
    match read_cache(path, ttl, now) {
        Ok(rules) => rules,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "rule cache unreadable");
            None
        }
    }
}

fn read_cache(path: &Path, ttl: Duration, now: DateTime<Utc>) -> Result<Option<RuleSet>, RulesError> {
    if !path.exists() {
        return Ok(None);
    }
    let body = fs::read_to_string(path).map_err(|source| RulesError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: CacheFile = serde_json::from_str(&body)?;

    let age = now.timestamp() - file.meta.fetched_at;
    let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    if age > ttl_secs {
        debug!(path = %path.display(), age, "rule cache expired");
        return Ok(None);
    }

    let rules = RuleSet::from_rows(file.mappings.iter().filter_map(row_from_json));
    Ok((!rules.is_empty()).then_some(rules))
}

/// Cached rows may carry numbers where the CSV had text.
fn row_from_json(v: &Value) -> Option<RuleRow> {
    let obj = v.as_object()?;
    let field = |k: &str| match obj.get(k) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    Some(RuleRow {
        keyword: field("keyword"),
        icon: field("icon"),
        replacement: field("replacement"),
        mode: field("mode"),
        color: field("color"),
        match_type: field("match_type"),
        size_px: field("size_px"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use inkcal_core::{Rule, RuleMode};

    fn sample() -> RuleSet {
        RuleSet::new(vec![
            Rule::new("Middag:", RuleMode::ReplaceIcon).with_icon("coffee").with_color("RED"),
            Rule::new("bursdag:", RuleMode::ReplaceAll)
                .with_icon("cake")
                .with_replacement("bursdag"),
        ])
    }

    #[test]
    fn fresh_cache_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let t0 = Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap();
        save_cache(&path, &sample(), t0).unwrap();

        let later = t0 + chrono::Duration::seconds(3600);
        let rules = load_cache_if_valid(&path, Duration::from_secs(3600), later).unwrap();
        assert_eq!(rules, sample());
    }

    #[test]
    fn stale_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let t0 = Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap();
        save_cache(&path, &sample(), t0).unwrap();

        let later = t0 + chrono::Duration::seconds(3601);
        assert!(load_cache_if_valid(&path, Duration::from_secs(3600), later).is_none());
    }

    #[test]
    fn missing_corrupt_or_empty_cache_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let ttl = Duration::from_secs(60);

        let path = dir.path().join("absent.json");
        assert!(load_cache_if_valid(&path, ttl, now).is_none());

        fs::write(&path, "{not json").unwrap();
        assert!(load_cache_if_valid(&path, ttl, now).is_none());

        let empty = format!(r#"{{"meta":{{"fetched_at":{}}},"mappings":[]}}"#, now.timestamp());
        fs::write(&path, empty).unwrap();
        assert!(load_cache_if_valid(&path, ttl, now).is_none());
    }

    #[test]
    fn hand_written_rows_with_string_sizes_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let now = Utc::now();
        let body = json!({
            "meta": {"fetched_at": now.timestamp()},
            "mappings": [
                {"keyword": "skole", "icon": "school", "size_px": "20"},
                {"keyword": "", "icon": "orphan"},
                "junk",
            ],
        });
        fs::write(&path, body.to_string()).unwrap();
        let rules = load_cache_if_valid(&path, Duration::from_secs(60), now).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.rules()[0].size_px, 20);
    }
}
