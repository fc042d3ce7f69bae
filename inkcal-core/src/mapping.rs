//! Mapping engine: run the ordered rule set over one event summary.
//!
//! A single pass threads a working text through the rules. A rule fires when
//! its keyword is contained (case-insensitive) in the *current* working
//! text, whatever its declared match type. The first firing rule with an
//! icon sets the primary icon. Replacements become tags. `replace_*` rules
//! strip their keyword before later rules look at the text.

use regex::{NoExpand, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::event::Tag;
use crate::rule::{Rule, RuleMode, RuleSet};

/// Output of one mapping pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingResult {
    pub original_name: String,
    pub display_text: String,
    pub icon: Option<String>,
    pub icon_size: Option<u32>,
    pub icon_color_name: Option<String>,
    pub icon_color_rgb: Option<Rgb>,
    pub tags: Vec<Tag>,
    pub tag_text: Option<String>,
    pub tag_color_name: Option<String>,
    pub tag_color_rgb: Option<Rgb>,
    pub mode: Option<RuleMode>,
    pub filtered_out: bool,
}

impl MappingResult {
    /// First color carried anywhere in the result: legacy tag color, icon
    /// color, then the first tag.
    pub fn any_color(&self) -> Option<Rgb> {
        self.tag_color_rgb
            .or(self.icon_color_rgb)
            .or_else(|| self.tags.first().and_then(|t| t.color_rgb))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PrimaryIcon {
    name: String,
    size: u32,
    color_name: Option<String>,
    color_rgb: Option<Rgb>,
}

/// Accumulator for the fold over the rule list.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingPass {
    original: String,
    working: String,
    icon: Option<PrimaryIcon>,
    tags: Vec<Tag>,
    mode: Option<RuleMode>,
}

impl MappingPass {
    pub fn start(summary: &str) -> Self {
        let original = summary.trim().to_string();
        Self {
            working: original.clone(),
            original,
            icon: None,
            tags: Vec::new(),
            mode: None,
        }
    }

    pub fn working_text(&self) -> &str {
        &self.working
    }

    /// Apply one rule to the accumulator.
    pub fn step(mut self, rule: &Rule) -> Self {
        let kw = rule.keyword.trim();
        if kw.is_empty() || !self.working.to_lowercase().contains(&kw.to_lowercase()) {
            return self;
        }

        if self.icon.is_none() {
            if let Some(icon) = &rule.icon {
                self.icon = Some(PrimaryIcon {
                    name: icon.clone(),
                    size: rule.size_px,
                    color_name: rule.color.clone(),
                    color_rgb: rule.color_rgb(),
                });
            }
        }

        if let Some(replacement) = &rule.replacement {
            let mut tag = Tag::new(replacement.clone());
            tag.color_name = rule.color.clone();
            self.tags.push(tag);
        }

        if rule.mode.is_additive() {
            self.mode = self.mode.or(Some(rule.mode));
            return self;
        }

        let stripped = strip_keyword(&self.working, kw, rule.mode == RuleMode::ReplaceAll);
        if stripped != self.working {
            self.working = stripped.trim().to_string();
            self.mode = self.mode.or(Some(rule.mode));
        } else if rule.mode == RuleMode::ReplaceAll {
            self.mode = self.mode.or(Some(rule.mode));
        }
        self
    }

    pub fn finish(self) -> MappingResult {
        let display_text = self.working.trim().to_string();

        let mut seen = Vec::<String>::new();
        let tags: Vec<Tag> = self
            .tags
            .into_iter()
            .filter_map(|mut t| {
                t.text = t.text.trim().to_string();
                if t.text.is_empty() || seen.contains(&t.text) {
                    return None;
                }
                seen.push(t.text.clone());
                Some(t.resolve_color())
            })
            .collect();

        let (tag_text, tag_color_rgb, tag_color_name) = match tags.first() {
            Some(first) => (
                Some(tags.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(", ")),
                first.color_rgb,
                first.color_name.clone(),
            ),
            None => (None, None, None),
        };

        let filtered_out = display_text.is_empty() && tags.is_empty();
        let icon = self.icon;

        MappingResult {
            original_name: self.original,
            display_text,
            icon_size: icon.as_ref().map(|i| i.size),
            icon_color_name: icon.as_ref().and_then(|i| i.color_name.clone()),
            icon_color_rgb: icon.as_ref().and_then(|i| i.color_rgb),
            icon: icon.map(|i| i.name),
            tags,
            tag_text,
            tag_color_name,
            tag_color_rgb,
            mode: self.mode,
            filtered_out,
        }
    }
}

/// Remove the first case-insensitive literal occurrence of `kw`, or with
/// `all`, every occurrence including ones formed by joining the remainder.
fn strip_keyword(text: &str, kw: &str, all: bool) -> String {
    let Ok(re) = RegexBuilder::new(&regex::escape(kw)).case_insensitive(true).build() else {
        return text.to_string();
    };
    if !all {
        return re.replacen(text, 1, NoExpand("")).into_owned();
    }
    // each pass removes at least one match, so the text shrinks every round
    let mut out = text.to_string();
    while re.is_match(&out) {
        out = re.replace_all(&out, NoExpand("")).into_owned();
    }
    out
}

/// Map one event summary through the rule set.
pub fn apply(summary: &str, rules: &RuleSet) -> MappingResult {
    let start = MappingPass::start(summary);
    if start.original.is_empty() {
        return MappingResult::default();
    }
    rules.iter().fold(start, MappingPass::step).finish()
}
