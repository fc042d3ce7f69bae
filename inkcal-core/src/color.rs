//! Color names and RGB parsing for tags and icons.
//!
//! The seven palette colors match what the e-paper panel can show. A few extra
//! CSS names are accepted so mapping sheets written by hand still resolve.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
}

const PALETTE: &[(&str, Rgb)] = &[
    ("black", Rgb(0, 0, 0)),
    ("white", Rgb(255, 255, 255)),
    ("red", Rgb(255, 0, 0)),
    ("yellow", Rgb(255, 255, 0)),
    ("green", Rgb(0, 128, 0)),
    ("blue", Rgb(0, 0, 255)),
    ("orange", Rgb(255, 128, 0)),
];

const EXTRA_NAMES: &[(&str, Rgb)] = &[
    ("gray", Rgb(128, 128, 128)),
    ("grey", Rgb(128, 128, 128)),
    ("purple", Rgb(128, 0, 128)),
    ("pink", Rgb(255, 192, 203)),
    ("brown", Rgb(165, 42, 42)),
    ("cyan", Rgb(0, 255, 255)),
    ("magenta", Rgb(255, 0, 255)),
    ("navy", Rgb(0, 0, 128)),
    ("lime", Rgb(0, 255, 0)),
];

/// Resolve a color name (`RED`, `#f80`, `#ff8800`, `rgb(1, 2, 3)`) to RGB.
///
/// Returns `None` for empty or unrecognized input.
pub fn color_to_rgb(name: &str) -> Option<Rgb> {
    let k = name.trim().to_lowercase();
    if k.is_empty() {
        return None;
    }

    if let Some((_, rgb)) = PALETTE.iter().chain(EXTRA_NAMES).find(|(n, _)| *n == k) {
        return Some(*rgb);
    }

    if let Some(hex) = k.strip_prefix('#') {
        return parse_hex(hex);
    }

    if k.starts_with("rgb") {
        return parse_rgb_numbers(&k);
    }

    None
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        3 => {
            let mut it = hex.chars().map(|c| u8::from_str_radix(&format!("{c}{c}"), 16));
            Some(Rgb(it.next()?.ok()?, it.next()?.ok()?, it.next()?.ok()?))
        }
        6 => Some(Rgb(
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        )),
        _ => None,
    }
}

/// Pull the first three integers out of `rgb(…)`-ish or `"r,g,b"` text.
fn parse_rgb_numbers(s: &str) -> Option<Rgb> {
    let nums: Vec<i64> = s
        .split(|c: char| !(c.is_ascii_digit() || c == '-'))
        .filter(|p| !p.is_empty() && *p != "-")
        .filter_map(|p| p.parse().ok())
        .collect();
    if nums.len() < 3 {
        return None;
    }
    Some(Rgb(clamp_channel(nums[0]), clamp_channel(nums[1]), clamp_channel(nums[2])))
}

fn clamp_channel(v: i64) -> u8 {
    v.clamp(0, 255) as u8
}

/// Accept an RGB value in whatever shape an upstream record carried it:
/// a 3-element array, a `"r,g,b"` string, or `{r, g, b}`.
pub fn rgb_from_value(v: &Value) -> Option<Rgb> {
    match v {
        Value::Array(items) if items.len() == 3 => {
            let mut it = items.iter().map(|x| x.as_f64().map(|f| clamp_channel(f as i64)));
            Some(Rgb(it.next()??, it.next()??, it.next()??))
        }
        Value::String(s) => {
            let parts: Vec<&str> = s.split(',').collect();
            if parts.len() != 3 {
                return None;
            }
            let mut it = parts.iter().map(|p| p.trim().parse::<i64>().ok().map(clamp_channel));
            Some(Rgb(it.next()??, it.next()??, it.next()??))
        }
        Value::Object(map) => {
            let ch = |k: &str| map.get(k).and_then(Value::as_i64).map(clamp_channel);
            Some(Rgb(ch("r")?, ch("g")?, ch("b")?))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn palette_names_are_case_insensitive() {
        assert_eq!(color_to_rgb("RED"), Some(Rgb(255, 0, 0)));
        assert_eq!(color_to_rgb(" Yellow "), Some(Rgb(255, 255, 0)));
        assert_eq!(color_to_rgb("green"), Some(Rgb(0, 128, 0)));
    }

    #[test]
    fn hex_and_rgb_forms() {
        assert_eq!(color_to_rgb("#f80"), Some(Rgb(255, 136, 0)));
        assert_eq!(color_to_rgb("#0A0B0C"), Some(Rgb(10, 11, 12)));
        assert_eq!(color_to_rgb("rgb(1, 2, 3)"), Some(Rgb(1, 2, 3)));
        assert_eq!(color_to_rgb("#12"), None);
        assert_eq!(color_to_rgb("#zzzzzz"), None);
    }

    #[test]
    fn unknown_or_empty_is_none() {
        assert_eq!(color_to_rgb(""), None);
        assert_eq!(color_to_rgb("chartreuse-ish"), None);
    }

    #[test]
    fn loose_rgb_values() {
        assert_eq!(rgb_from_value(&json!([1, 2, 3])), Some(Rgb(1, 2, 3)));
        assert_eq!(rgb_from_value(&json!("4, 5, 6")), Some(Rgb(4, 5, 6)));
        assert_eq!(rgb_from_value(&json!({"r": 7, "g": 8, "b": 9})), Some(Rgb(7, 8, 9)));
        assert_eq!(rgb_from_value(&json!([1, 2])), None);
        assert_eq!(rgb_from_value(&json!("red")), None);
        assert_eq!(rgb_from_value(&json!(null)), None);
    }
}
