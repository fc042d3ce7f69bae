//! Daily and hourly weather records in the shape the renderer reads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keyword to icon name. Checked exactly first, then as a substring, in order.
const WEATHER_ICONS: &[(&str, &str)] = &[
    ("sol", "sun"),
    ("klart", "sun"),
    ("cloud", "cloud"),
    ("regn", "cloud-rain"),
    ("rain", "cloud-rain"),
    ("snø", "cloud-snow"),
    ("snow", "cloud-snow"),
    ("vind", "wind"),
    ("torden", "cloud-lightning"),
];

/// Precipitation (mm/h) at or above which an hour is called wet.
const HEAVY_PRECIP_MM: f64 = 2.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    pub date: String,
    pub condition: Option<String>,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub precip: Option<f64>,
    pub wind_max: Option<f64>,
    pub wind_dir_deg: Option<f64>,
    pub source: Option<String>,
}

impl DailyWeather {
    /// `None` for records without a date. `condition` falls back to `symbol`.
    pub fn from_loose(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let date = text(obj, &["date"])?;
        Some(Self {
            date,
            condition: text(obj, &["condition", "symbol"]),
            temp_max: number(obj, &["temp_max"]),
            temp_min: number(obj, &["temp_min"]),
            precip: number(obj, &["precip"]),
            wind_max: number(obj, &["wind_max"]),
            wind_dir_deg: number(obj, &["wind_dir_deg"]),
            source: text(obj, &["source"]),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HourlyWeather {
    pub time: Option<String>,
    pub temp: Option<f64>,
    pub precip: f64,
    pub symbol_code: Option<String>,
    pub condition: String,
    /// Provider fields passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const TIME_KEYS: &[&str] = &["time", "dt", "datetime"];
const TEMP_KEYS: &[&str] = &["temp", "temperature", "air_temperature"];
const PRECIP_KEYS: &[&str] = &["precip", "precip_mm", "precipitation"];
const SYMBOL_KEYS: &[&str] = &["symbol_code", "symbol"];
const CONDITION_KEYS: &[&str] = &["condition"];

impl HourlyWeather {
    /// Normalize one provider record, filling `condition` from the record's
    /// symbol, then the matching day in `daily`, then a temperature and
    /// precipitation guess.
    pub fn from_loose(value: &Value, daily: &[DailyWeather]) -> Option<Self> {
        let obj = value.as_object()?;
        let time = text(obj, TIME_KEYS);
        let temp = number(obj, TEMP_KEYS);
        let precip = number(obj, PRECIP_KEYS).unwrap_or(0.0);
        let symbol_code = text(obj, SYMBOL_KEYS);

        let condition = text(obj, CONDITION_KEYS)
            .or_else(|| symbol_code.as_deref().map(condition_from_symbol))
            .or_else(|| {
                let date = time.as_deref().and_then(crate::time::date_prefix)?;
                daily
                    .iter()
                    .find(|d| d.date == date)
                    .and_then(|d| d.condition.clone())
            })
            .unwrap_or_else(|| guess_condition(temp, precip).to_string());

        let known = [TIME_KEYS, TEMP_KEYS, PRECIP_KEYS, SYMBOL_KEYS, CONDITION_KEYS].concat();
        let extra = obj
            .iter()
            .filter(|(k, _)| !known.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Some(Self {
            time,
            temp,
            precip,
            symbol_code,
            condition,
            extra,
        })
    }
}

pub fn normalize_daily(raw: &[Value]) -> Vec<DailyWeather> {
    raw.iter().filter_map(DailyWeather::from_loose).collect()
}

pub fn normalize_hourly(raw: &[Value], daily: &[DailyWeather]) -> Vec<HourlyWeather> {
    raw.iter()
        .filter_map(|h| HourlyWeather::from_loose(h, daily))
        .collect()
}

/// Friendly Norwegian condition for a forecast symbol code like `lightrain_day`.
/// Unknown codes pass through unchanged.
pub fn condition_from_symbol(symbol: &str) -> String {
    let sc = symbol.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| sc.contains(n));
    let cond = if has(&["clear"]) {
        "Klarvær"
    } else if has(&["fair", "partly"]) {
        "Delvis skyet"
    } else if has(&["cloud", "overcast"]) {
        "Skyet"
    } else if has(&["rain", "shower", "drizzle"]) {
        "Regn"
    } else if has(&["snow"]) {
        "Snø"
    } else if has(&["sleet"]) {
        "Sludd"
    } else if has(&["thunder", "tstorm"]) {
        "Torden"
    } else {
        return symbol.to_string();
    };
    cond.to_string()
}

pub fn guess_condition(temp: Option<f64>, precip: f64) -> &'static str {
    if precip >= HEAVY_PRECIP_MM {
        return match temp {
            Some(t) if t <= 1.5 => "Snø",
            _ => "Regn",
        };
    }
    match temp {
        None => "Skyet",
        Some(t) if t <= -1.5 => "Skyet",
        Some(t) if t <= 0.5 => "Delvis skyet",
        Some(_) => "Klarvær",
    }
}

pub fn weather_to_icon(symbol: &str) -> Option<&'static str> {
    let k = symbol.trim().to_lowercase();
    if k.is_empty() {
        return None;
    }
    WEATHER_ICONS
        .iter()
        .find(|(s, _)| *s == k)
        .or_else(|| WEATHER_ICONS.iter().find(|(s, _)| k.contains(s)))
        .map(|(_, icon)| *icon)
}

fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    })
}

fn number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| match obj.get(*k) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
