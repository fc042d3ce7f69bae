//! inkcal-ingest: normalizes calendar, holiday, waste and weather records and
//! assembles them into the display bundle.

pub mod calendar;
pub mod pipeline;
pub mod sink;
pub mod time;
pub mod waste;
pub mod weather;

pub use calendar::{CalendarItem, EventTime, Expander};
pub use pipeline::{DisplayBundle, PipelineOptions, SourceData, assemble};
pub use sink::EventSink;
pub use waste::{FractionNames, WasteRecord};
pub use weather::{DailyWeather, HourlyWeather, weather_to_icon};
