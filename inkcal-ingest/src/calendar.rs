//! Calendar and public-holiday items expanded into one event per day.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use inkcal_core::{Event, RuleSet, apply};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sink::EventSink;

pub const DEFAULT_HOLIDAY_PREFIX: &str = "Fridag: ";

/// `start`/`end` of a calendar item: `date` for all-day, `dateTime` for timed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(
        default,
        rename = "dateTime",
        alias = "date_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_time: Option<String>,
}

impl EventTime {
    pub fn all_day(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
            date_time: None,
        }
    }

    pub fn timed(date_time: impl Into<String>) -> Self {
        Self {
            date: None,
            date_time: Some(date_time.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarItem {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<String>,
}

impl CalendarItem {
    pub fn new(summary: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        Self {
            summary: Some(summary.into()),
            start,
            end,
            calendar: None,
        }
    }
}

/// How one item is labelled before mapping.
struct Labels<'s> {
    mapped_from: String,
    original: &'s str,
    is_holiday: bool,
}

/// Expands items over the display window `[query_start, query_end)`.
///
/// Days before `query_start` are never emitted. `query_end` is open when unset.
#[derive(Debug, Clone)]
pub struct Expander<'a> {
    rules: &'a RuleSet,
    query_start: NaiveDate,
    query_end: Option<NaiveDate>,
}

impl<'a> Expander<'a> {
    pub fn new(rules: &'a RuleSet, query_start: NaiveDate) -> Self {
        Self {
            rules,
            query_start,
            query_end: None,
        }
    }

    pub fn until(mut self, query_end: NaiveDate) -> Self {
        self.query_end = Some(query_end);
        self
    }

    pub fn expand_calendar(&self, items: &[CalendarItem], sink: &mut EventSink) {
        for item in items {
            let Some(summary) = non_blank(item.summary.as_deref()) else {
                continue;
            };
            let labels = Labels {
                mapped_from: summary.to_string(),
                original: summary,
                is_holiday: false,
            };
            self.expand_item(item, &labels, sink);
        }
    }

    /// Holidays get `prefix` in front of the summary so rules can tag them.
    pub fn expand_holidays(&self, items: &[CalendarItem], prefix: &str, sink: &mut EventSink) {
        for item in items {
            let Some(summary) = non_blank(item.summary.as_deref()) else {
                continue;
            };
            let labels = Labels {
                mapped_from: format!("{prefix}{summary}"),
                original: summary,
                is_holiday: true,
            };
            self.expand_item(item, &labels, sink);
        }
    }

    fn expand_item(&self, item: &CalendarItem, labels: &Labels<'_>, sink: &mut EventSink) {
        let mapped = apply(&labels.mapped_from, self.rules);
        if mapped.filtered_out {
            return;
        }
        let emit = |sink: &mut EventSink, date: String, time: String, all_day: bool| {
            let mut ev = Event::from_mapping(date, time, labels.original, &mapped);
            ev.calendar = item.calendar.clone();
            ev.is_holiday = labels.is_holiday;
            ev.all_day = all_day;
            sink.push(ev);
        };

        if let Some(sdate) = item.start.date.as_deref() {
            let edate = item.end.date.as_deref().unwrap_or(sdate);
            match (parse_date(sdate), parse_date(edate)) {
                (Some(start), Some(end)) => {
                    // end date is exclusive; a missing end means a single day
                    let last = end.pred_opt().unwrap_or(end).max(start);
                    for day in self.days(start, last) {
                        emit(sink, format_date(day), String::new(), true);
                    }
                }
                (start, _) => {
                    if start.is_some_and(|s| s < self.query_start) {
                        return;
                    }
                    emit(sink, sdate.trim().to_string(), String::new(), true);
                }
            }
        } else if let Some(sraw) = item.start.date_time.as_deref() {
            let eraw = item.end.date_time.as_deref().unwrap_or(sraw);
            let Some(start) = parse_date_time(sraw) else {
                debug!(start = sraw, summary = labels.original, "skipping item with unreadable start");
                return;
            };
            let time = start.format("%H:%M").to_string();
            let Some(end) = parse_date_time(eraw) else {
                emit(sink, format_date(start.date()), time, false);
                return;
            };

            let (sdt, edt) = (start.date(), end.date());
            let last = if end.time() != NaiveTime::MIN {
                edt
            } else {
                edt.pred_opt().unwrap_or(edt)
            };
            for day in self.days(sdt, last.max(sdt)) {
                let t = if day == sdt { time.clone() } else { String::new() };
                emit(sink, format_date(day), t, false);
            }
        }
    }

    /// Inclusive day range clamped to the window.
    fn days(&self, first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
        let end = self.query_end;
        first
            .max(self.query_start)
            .iter_days()
            .take_while(move |d| *d <= last && end.is_none_or(|e| *d < e))
    }
}

/// Map a single-day entry. `None` when the rules filter it out.
pub fn mapped_event(
    date: impl Into<String>,
    original_name: &str,
    mapped_from: &str,
    rules: &RuleSet,
) -> Option<Event> {
    let mapped = apply(mapped_from, rules);
    (!mapped.filtered_out).then(|| Event::from_mapping(date, "", original_name, &mapped))
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Reads the local wall-clock part and ignores any offset suffix.
fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    s.get(..19)
        .and_then(|core| NaiveDateTime::parse_from_str(core, "%Y-%m-%dT%H:%M:%S").ok())
        .or_else(|| {
            s.get(..16)
                .and_then(|core| NaiveDateTime::parse_from_str(core, "%Y-%m-%dT%H:%M").ok())
        })
}

fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// First day after a window of `days` starting at `start`.
pub fn window_end(start: NaiveDate, days: u32) -> NaiveDate {
    start
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}
