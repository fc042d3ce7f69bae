//! Source files for `inkcal build`. A missing or broken file is logged and
//! treated as empty so one bad feed never blanks the whole display.

use std::fs;
use std::path::{Path, PathBuf};

use inkcal_ingest::{FractionNames, SourceData};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct SourcePaths {
    pub calendar: Option<PathBuf>,
    pub holidays: Option<PathBuf>,
    pub waste: Option<PathBuf>,
    pub fractions: Option<PathBuf>,
    pub events: Option<PathBuf>,
    pub weather: Option<PathBuf>,
    pub hourly: Option<PathBuf>,
}

pub fn load_sources(paths: &SourcePaths) -> SourceData {
    let mut data = SourceData {
        calendar: read_records(paths.calendar.as_deref(), "calendar"),
        holidays: read_records(paths.holidays.as_deref(), "holidays"),
        waste: read_records(paths.waste.as_deref(), "waste"),
        fractions: FractionNames::from_json(&read_value(paths.fractions.as_deref(), "fractions")),
        events: list_items(read_value(paths.events.as_deref(), "events")),
        ..Default::default()
    };

    // Either a bare list of days, or the forecast object with daily/hourly/meta.
    match read_value(paths.weather.as_deref(), "weather") {
        Value::Object(mut forecast) => {
            data.weather = list_items(forecast.remove("daily").unwrap_or_default());
            data.hourly = list_items(
                forecast
                    .remove("hourly_today")
                    .or_else(|| forecast.remove("hourly"))
                    .unwrap_or_default(),
            );
            data.meta = forecast.remove("meta").unwrap_or_default();
        }
        other => data.weather = list_items(other),
    }
    if paths.hourly.is_some() {
        data.hourly = list_items(read_value(paths.hourly.as_deref(), "hourly"));
    }

    data
}

/// Parse a JSON file; `Null` when absent or unusable.
pub fn read_value(path: Option<&Path>, label: &str) -> Value {
    let Some(path) = path else {
        return Value::Null;
    };
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            warn!(source = label, path = %path.display(), error = %e, "cannot read source file");
            return Value::Null;
        }
    };
    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            warn!(source = label, path = %path.display(), error = %e, "invalid JSON in source file");
            Value::Null
        }
    }
}

/// A list, a `{"items": [...]}` envelope, or a single object.
fn list_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("items") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                obj.insert("items".to_string(), other);
                vec![Value::Object(obj)]
            }
            None => vec![Value::Object(obj)],
        },
        _ => Vec::new(),
    }
}

/// Typed records; entries that do not fit the shape are skipped.
pub fn read_records<T: DeserializeOwned>(path: Option<&Path>, label: &str) -> Vec<T> {
    list_items(read_value(path, label))
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(r) => Some(r),
            Err(e) => {
                debug!(source = label, error = %e, "skipping malformed record");
                None
            }
        })
        .collect()
}
