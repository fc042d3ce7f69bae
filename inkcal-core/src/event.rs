//! Canonical calendar event as handed to the renderer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::color::{Rgb, color_to_rgb, rgb_from_value};
use crate::mapping::MappingResult;

/// One colored chip drawn next to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_rgb: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl Tag {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_color_name(mut self, name: impl Into<String>) -> Self {
        self.color_name = Some(name.into());
        self
    }

    pub fn with_rgb(mut self, rgb: Rgb) -> Self {
        self.color_rgb = Some(rgb);
        self
    }

    /// Fill `color_rgb` from `color_name` when only the name is known.
    pub fn resolve_color(mut self) -> Self {
        if self.color_rgb.is_none() {
            self.color_rgb = self.color_name.as_deref().and_then(color_to_rgb);
        }
        self
    }
}

/// A calendar, holiday or waste-collection entry after mapping.
///
/// `tags` is the structured form. The scalar `tag_*` and `icon_*` fields
/// mirror it for renderers that predate tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`, or empty for all-day entries.
    pub time: String,
    pub calendar: Option<String>,
    pub all_day: bool,
    pub is_holiday: bool,

    pub original_name: String,
    pub display_text: String,
    pub name: String,

    pub tags: Vec<Tag>,

    pub tag_text: String,
    pub tag_color_name: Option<String>,
    pub tag_color_rgb: Option<Rgb>,
    pub icon: Option<String>,
    pub icon_size: Option<u32>,
    pub icon_color_name: Option<String>,
    pub icon_color_rgb: Option<Rgb>,
    pub icon_mode: Option<String>,

    pub filtered_out: bool,
}

impl Event {
    /// Build an event from a mapped summary.
    pub fn from_mapping(
        date: impl Into<String>,
        time: impl Into<String>,
        original_name: impl Into<String>,
        mapped: &MappingResult,
    ) -> Self {
        let time = time.into();
        Self {
            date: date.into(),
            all_day: time.is_empty(),
            time,
            original_name: original_name.into(),
            display_text: mapped.display_text.clone(),
            name: mapped.display_text.clone(),
            tags: mapped.tags.clone(),
            tag_text: mapped.tag_text.clone().unwrap_or_default(),
            tag_color_name: mapped.tag_color_name.clone(),
            tag_color_rgb: mapped.tag_color_rgb,
            icon: mapped.icon.clone(),
            icon_size: mapped.icon_size,
            icon_color_name: mapped.icon_color_name.clone(),
            icon_color_rgb: mapped.icon_color_rgb,
            icon_mode: mapped.mode.map(|m| m.as_str().to_string()),
            filtered_out: mapped.filtered_out,
            ..Default::default()
        }
    }

    pub fn set_display_text(&mut self, text: impl Into<String>) {
        self.display_text = text.into();
        self.name = self.display_text.clone();
    }

    /// Key used to drop duplicates when merging sources.
    pub fn dedupe_key(&self) -> (&str, &str, &str) {
        (&self.date, &self.name, &self.time)
    }

    /// Convert a loosely shaped record (any of the field spellings the
    /// upstream feeds use) into the canonical struct. Never fails; a
    /// non-object input yields an empty event.
    pub fn from_loose(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let date = first_str(obj, &["date", "dt"]).unwrap_or_default();
        let time = first_str(obj, &["time", "start_time", "time_str"]).unwrap_or_default();
        let original = first_str(obj, &["original_name", "name", "summary"]).unwrap_or_default();
        let display = match obj.get("display_text") {
            Some(Value::String(s)) => s.clone(),
            _ => first_str(obj, &["name"]).unwrap_or_else(|| original.clone()),
        };
        let display = display.trim().to_string();

        let tag_text = first_str(obj, &["tag_text", "tag", "tags_text"])
            .map(|t| collapse_whitespace(&t))
            .unwrap_or_default();

        let tags = ["tags", "structured_tags"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_array).filter(|a| !a.is_empty()))
            .map(|items| items.iter().filter_map(loose_tag).collect())
            .unwrap_or_default();

        Self {
            all_day: obj.get("all_day").and_then(Value::as_bool).unwrap_or(false) || time.is_empty(),
            is_holiday: obj.get("is_holiday").and_then(Value::as_bool).unwrap_or(false),
            date,
            time,
            calendar: first_str(obj, &["calendar", "source"]),
            original_name: original,
            name: display.clone(),
            display_text: display,
            tags,
            tag_text,
            tag_color_name: first_str(obj, &["tag_color_name", "color", "tag_color"]),
            tag_color_rgb: first_rgb(obj, &["tag_color_rgb", "color_rgb", "icon_color_rgb"]),
            icon: first_str(obj, &["icon"]),
            icon_size: ["icon_size", "size_px"].iter().find_map(|k| obj.get(*k).and_then(as_u32)),
            icon_color_name: first_str(obj, &["icon_color_name", "icon_color"]),
            icon_color_rgb: first_rgb(obj, &["icon_color_rgb", "icon_color"]),
            icon_mode: first_str(obj, &["icon_mode", "mode"]),
            filtered_out: obj.get("filtered_out").and_then(Value::as_bool).unwrap_or(false),
        }
    }
}

/// First key holding a non-empty string.
fn first_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    })
}

fn first_rgb(obj: &Map<String, Value>, keys: &[&str]) -> Option<Rgb> {
    keys.iter().find_map(|k| obj.get(*k).and_then(rgb_from_value))
}

fn as_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn loose_tag(v: &Value) -> Option<Tag> {
    let obj = v.as_object()?;
    let text = first_str(obj, &["text"])?.trim().to_string();
    let mut tag = Tag::new(text);
    match obj.get("color_rgb").and_then(rgb_from_value) {
        Some(rgb) => tag.color_rgb = Some(rgb),
        None => tag.color_name = first_str(obj, &["color_name"]),
    }
    tag.icon = first_str(obj, &["icon"]);
    tag.mode = first_str(obj, &["mode"]);
    Some(tag)
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
