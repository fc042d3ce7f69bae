//! Merge every source into the bundle the display renders.

use chrono::NaiveDate;
use inkcal_core::{Event, RuleSet, TagEnricher};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::calendar::{CalendarItem, DEFAULT_HOLIDAY_PREFIX, Expander, window_end};
use crate::sink::EventSink;
use crate::waste::{DEFAULT_WASTE_PREFIX, FractionNames, WasteRecord, waste_events};
use crate::weather::{DailyWeather, HourlyWeather, normalize_daily, normalize_hourly};

pub const DEFAULT_DAYS: u32 = 14;

/// Raw source records. Anything a source failed to deliver is simply empty.
#[derive(Debug, Clone, Default)]
pub struct SourceData {
    pub calendar: Vec<CalendarItem>,
    pub holidays: Vec<CalendarItem>,
    pub waste: Vec<WasteRecord>,
    pub fractions: FractionNames,
    /// Already-built event records in any of the loose field spellings.
    pub events: Vec<Value>,
    pub weather: Vec<Value>,
    pub hourly: Vec<Value>,
    pub meta: Value,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// First local day shown.
    pub today: NaiveDate,
    pub days: u32,
    pub include_holidays: bool,
    pub holiday_prefix: String,
    pub waste_prefix: String,
}

impl PipelineOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            days: DEFAULT_DAYS,
            include_holidays: true,
            holiday_prefix: DEFAULT_HOLIDAY_PREFIX.to_string(),
            waste_prefix: DEFAULT_WASTE_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayBundle {
    pub events: Vec<Event>,
    pub weather: Vec<DailyWeather>,
    pub hourly_today: Vec<HourlyWeather>,
    pub meta: Value,
}

/// Build the display bundle. Never fails.
pub fn assemble(sources: &SourceData, rules: &RuleSet, opts: &PipelineOptions) -> DisplayBundle {
    let expander = Expander::new(rules, opts.today).until(window_end(opts.today, opts.days));

    let mut sink = EventSink::new();
    expander.expand_calendar(&sources.calendar, &mut sink);
    sink.extend(
        waste_events(
            &sources.waste,
            &sources.fractions,
            rules,
            opts.today,
            opts.days,
            &opts.waste_prefix,
        )
        .into_sorted(),
    );
    if opts.include_holidays {
        expander.expand_holidays(&sources.holidays, &opts.holiday_prefix, &mut sink);
    }
    sink.extend(
        sources
            .events
            .iter()
            .map(Event::from_loose)
            .filter(|e| !e.date.is_empty() && !e.filtered_out),
    );

    let mut events = TagEnricher::new(rules).enrich(sink.into_sorted());
    for ev in &mut events {
        if ev.name.is_empty() && !ev.display_text.is_empty() {
            ev.name = ev.display_text.clone();
        }
    }

    let weather = normalize_daily(&sources.weather);
    let hourly_today = normalize_hourly(&sources.hourly, &weather);

    info!(
        events = events.len(),
        days = weather.len(),
        hours = hourly_today.len(),
        "assembled display bundle"
    );

    DisplayBundle {
        events,
        weather,
        hourly_today,
        meta: sources.meta.clone(),
    }
}
