//! Waste collection schedule joined to fraction names.

use std::collections::HashMap;

use chrono::NaiveDate;
use inkcal_core::RuleSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::calendar::{mapped_event, window_end};
use crate::sink::EventSink;
use crate::time::date_prefix;

pub const DEFAULT_WASTE_PREFIX: &str = "Movar: ";
pub const UNKNOWN_FRACTION: &str = "Ukjent";

/// One fraction and the ISO dates it is collected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasteRecord {
    #[serde(default, alias = "fraksjonId", deserialize_with = "loose_id")]
    pub fraction_id: Option<i64>,
    #[serde(default, alias = "tommedatoer")]
    pub collection_dates: Vec<String>,
}

/// Fraction id to display name, e.g. `1 -> "Restavfall"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FractionNames(HashMap<i64, String>);

impl FractionNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: i64, name: impl Into<String>) {
        self.0.insert(id, name.into());
    }

    pub fn get(&self, id: i64) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Accepts either `[{"id": 1, "navn": "Restavfall"}, ...]` or `{"1": "Restavfall"}`.
    /// Entries that do not fit are skipped.
    pub fn from_json(value: &Value) -> Self {
        let mut names = Self::new();
        match value {
            Value::Array(items) => {
                for item in items {
                    let id = ["id", "fraksjonId", "fraction_id"]
                        .iter()
                        .find_map(|k| item.get(*k).and_then(id_from_value));
                    let name = ["navn", "name"]
                        .iter()
                        .find_map(|k| item.get(*k).and_then(Value::as_str));
                    if let (Some(id), Some(name)) = (id, name) {
                        names.insert(id, name.trim());
                    }
                }
            }
            Value::Object(map) => {
                for (k, v) in map {
                    if let (Ok(id), Some(name)) = (k.trim().parse(), v.as_str()) {
                        names.insert(id, name.trim());
                    }
                }
            }
            _ => {}
        }
        names
    }
}

fn id_from_value(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn loose_id<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(de)?;
    Ok(id_from_value(&v))
}

/// Collection events for `[today, today + days)`.
///
/// Each name is `prefix + fraction name` (or `prefix + "Ukjent"`), run
/// through the rules; filtered results are dropped and repeats of the
/// same `(date, name)` collapse.
pub fn waste_events(
    records: &[WasteRecord],
    fractions: &FractionNames,
    rules: &RuleSet,
    today: NaiveDate,
    days: u32,
    prefix: &str,
) -> EventSink {
    let first = today.format("%Y-%m-%d").to_string();
    let end = window_end(today, days).format("%Y-%m-%d").to_string();

    let mut sink = EventSink::new();
    for record in records {
        let fraction = record
            .fraction_id
            .and_then(|id| fractions.get(id))
            .unwrap_or(UNKNOWN_FRACTION);
        let raw_name = format!("{prefix}{fraction}");

        for iso in &record.collection_dates {
            let Some(date) = date_prefix(iso.trim()) else {
                continue;
            };
            // ISO dates compare correctly as text
            if date < first.as_str() || date >= end.as_str() {
                continue;
            }
            match mapped_event(date, &raw_name, &raw_name, rules) {
                Some(ev) => {
                    sink.push(ev);
                }
                None => debug!(date, name = %raw_name, "waste entry filtered out"),
            }
        }
    }
    sink
}
