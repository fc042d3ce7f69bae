//! Tag enrichment for a batch of normalized events.
//!
//! Each event ends up with one canonical `tags` list. Strategies are tried
//! in order and the first one that yields tags wins:
//! 1. keep structured tags already present (colors normalized only)
//! 2. map the full display name through the rule set
//! 3. split the legacy `tag_text` into tokens and color each one
//! 4. scan the name for tokens that a rule explicitly tags or colors
//!
//! Nothing here fails. A token that cannot be resolved just contributes no
//! color, or no tag.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::color::{Rgb, color_to_rgb};
use crate::event::{Event, Tag, collapse_whitespace};
use crate::mapping::{self, MappingResult};
use crate::rule::{Rule, RuleSet};

static CAPITALIZED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-ZÆØÅ][a-zæøåA-ZÆØÅ\-']+\b").expect("static regex"));
static TAG_TEXT_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;/\-:]+|\s+").expect("static regex"));
static NAME_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s\-:]+").expect("static regex"));

const MAX_TOKEN_CHARS: usize = 30;
const MIN_NAME_TOKEN_CHARS: usize = 2;

/// Python-style `capitalize`: first char upper, the rest lower.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Title case: upper after any non-letter, lower elsewhere.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if prev_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}

/// Spellings tried for a token (or registered for a key), in lookup order:
/// verbatim, lowercased, without trailing colon, capitalized, title-cased.
pub fn spelling_variants(raw: &str) -> Vec<String> {
    let s = collapse_whitespace(raw);
    let bare = s.trim_end_matches(':');
    let candidates = [
        s.clone(),
        s.to_lowercase(),
        bare.to_string(),
        bare.to_lowercase(),
        capitalize(&s),
        title_case(&s),
    ];

    let mut out: Vec<String> = Vec::with_capacity(candidates.len());
    for c in candidates {
        if !c.is_empty() && !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

/// Tolerant keyword table built from a rule set.
///
/// Every rule registers all spelling variants of its keyword and of its
/// replacement. A later rule overwrites an earlier one on the same key, but
/// the key keeps its first-registration position for the overlap scan.
#[derive(Debug, Clone)]
pub struct TagLookup<'a> {
    keys: Vec<String>,
    entries: HashMap<String, &'a Rule>,
}

impl<'a> TagLookup<'a> {
    pub fn build(rules: &'a RuleSet) -> Self {
        let mut lookup = Self {
            keys: Vec::new(),
            entries: HashMap::new(),
        };
        for rule in rules {
            let fields = std::iter::once(rule.keyword.as_str()).chain(rule.replacement.as_deref());
            for field in fields {
                for key in spelling_variants(field) {
                    if lookup.entries.insert(key.clone(), rule).is_none() {
                        lookup.keys.push(key);
                    }
                }
            }
        }
        lookup
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&'a Rule> {
        self.entries.get(key).copied()
    }

    /// Try each spelling variant of `token` against the table.
    pub fn find(&self, token: &str) -> Option<&'a Rule> {
        spelling_variants(token).iter().find_map(|v| self.get(v))
    }

    /// Last-resort fuzzy hit: a key containing the token or contained in it.
    pub fn overlapping(&self, token: &str) -> Option<&'a Rule> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        self.keys
            .iter()
            .find(|k| k.contains(token) || token.contains(k.as_str()))
            .and_then(|k| self.get(k))
    }
}

/// Split legacy tag text into tokens: commas first, then a lone short word,
/// then runs of capitalized words, then any punctuation/whitespace.
pub fn split_tag_text(raw: &str) -> Vec<String> {
    let s = raw.trim();
    if s.is_empty() {
        return Vec::new();
    }

    if s.contains(',') {
        let parts: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if !parts.is_empty() {
            return parts;
        }
    }

    let clean = collapse_whitespace(s);
    if clean.chars().count() <= MAX_TOKEN_CHARS && !clean.contains(' ') {
        return vec![clean];
    }

    let caps: Vec<String> = CAPITALIZED_WORD
        .find_iter(&clean)
        .map(|m| m.as_str().to_string())
        .collect();
    if !caps.is_empty() {
        return caps;
    }

    TAG_TEXT_SPLIT
        .split(&clean)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Where a token's color (and icon/mode) came from.
#[derive(Debug, Clone, Default, PartialEq)]
struct Attribution {
    color: Option<Rgb>,
    icon: Option<String>,
    mode: Option<String>,
}

impl Attribution {
    fn from_rule(rule: &Rule) -> Self {
        Self {
            color: rule.color_rgb(),
            icon: rule.icon.clone(),
            mode: Some(rule.mode.as_str().to_string()),
        }
    }

    fn from_mapping(result: &MappingResult) -> Self {
        Self {
            color: result.any_color(),
            icon: result.icon.clone(),
            mode: result.mode.map(|m| m.as_str().to_string()),
        }
    }

    fn into_tag(self, text: &str) -> Tag {
        Tag {
            text: text.trim().to_string(),
            color_rgb: self.color,
            color_name: None,
            icon: self.icon,
            mode: self.mode,
        }
    }
}

/// Batch enricher bound to one rule set.
#[derive(Debug, Clone)]
pub struct TagEnricher<'a> {
    rules: &'a RuleSet,
    lookup: TagLookup<'a>,
}

impl<'a> TagEnricher<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self {
            rules,
            lookup: TagLookup::build(rules),
        }
    }

    /// Enrich every event, preserving order.
    pub fn enrich(&self, events: Vec<Event>) -> Vec<Event> {
        events.into_iter().map(|ev| self.enrich_event(ev)).collect()
    }

    pub fn enrich_event(&self, mut ev: Event) -> Event {
        if !ev.tags.is_empty() {
            ev.tags = normalize_tags(std::mem::take(&mut ev.tags));
            return ev;
        }

        let name = if ev.name.is_empty() { &ev.display_text } else { &ev.name };
        let mapped = mapping::apply(name, self.rules);
        if !mapped.tags.is_empty() {
            ev.tags = mapped.tags;
            return ev;
        }

        let from_text = self.tags_from_tag_text(&ev);
        if !from_text.is_empty() {
            ev.tags = from_text;
            return ev;
        }

        let scanned = self.tags_from_name_scan(&ev);
        ev.tags.extend(scanned);
        ev
    }

    fn tags_from_tag_text(&self, ev: &Event) -> Vec<Tag> {
        let legacy = ev
            .tag_color_rgb
            .or_else(|| ev.tag_color_name.as_deref().and_then(color_to_rgb));

        split_tag_text(&ev.tag_text)
            .iter()
            .map(|token| {
                let mut attr = self.attribute_token(token);
                if attr.color.is_none() {
                    attr.color = legacy;
                }
                attr.into_tag(token)
            })
            .filter(|t| !t.text.is_empty())
            .collect()
    }

    /// Color a single tag-text token: table lookup, then the mapping engine
    /// on the token, then substring overlap with table keys.
    fn attribute_token(&self, token: &str) -> Attribution {
        let entry = self.lookup.find(token);
        if let Some(rule) = entry {
            let attr = Attribution::from_rule(rule);
            if attr.color.is_some() {
                return attr;
            }
        }

        let mapped = mapping::apply(token, self.rules);
        let via_mapping = Attribution::from_mapping(&mapped);
        if via_mapping.color.is_some() {
            return match entry {
                Some(rule) => Attribution {
                    color: via_mapping.color,
                    ..Attribution::from_rule(rule)
                },
                None => via_mapping,
            };
        }

        if let Some(rule) = entry {
            return Attribution::from_rule(rule);
        }

        match self.lookup.overlapping(token) {
            Some(rule) => Attribution::from_rule(rule),
            None => {
                debug!(token, "no mapping entry for tag token");
                Attribution::default()
            }
        }
    }

    /// Conservative fallback: only tokens a rule explicitly tags or colors.
    fn tags_from_name_scan(&self, ev: &Event) -> Vec<Tag> {
        let source = if ev.name.is_empty() { &ev.original_name } else { &ev.name };

        NAME_SPLIT
            .split(source)
            .map(str::trim)
            .filter(|t| (MIN_NAME_TOKEN_CHARS..=MAX_TOKEN_CHARS).contains(&t.chars().count()))
            .filter_map(|token| self.qualifying_attribution(token).map(|a| a.into_tag(token)))
            .collect()
    }

    fn qualifying_attribution(&self, token: &str) -> Option<Attribution> {
        if let Some(rule) = self.lookup.find(token) {
            let attr = Attribution::from_rule(rule);
            if rule.replacement.is_some() || attr.color.is_some() {
                return Some(attr);
            }
        }

        spelling_variants(token).iter().find_map(|candidate| {
            let mapped = mapping::apply(candidate, self.rules);
            let attr = Attribution::from_mapping(&mapped);
            (!mapped.tags.is_empty() || attr.color.is_some()).then_some(attr)
        })
    }
}

fn normalize_tags(tags: Vec<Tag>) -> Vec<Tag> {
    let normalized: Vec<Tag> = tags
        .iter()
        .cloned()
        .map(|mut t| {
            t.text = t.text.trim().to_string();
            t.resolve_color()
        })
        .filter(|t| !t.text.is_empty())
        .collect();
    if normalized.is_empty() { tags } else { normalized }
}

/// Enrich a batch of events against `rules`.
pub fn enrich(events: Vec<Event>, rules: &RuleSet) -> Vec<Event> {
    TagEnricher::new(rules).enrich(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleMode;

    fn event(name: &str) -> Event {
        let mut ev = Event {
            date: "2026-10-16".into(),
            original_name: name.into(),
            ..Default::default()
        };
        ev.set_display_text(name);
        ev
    }

    #[test]
    fn variants_cover_case_and_colon() {
        assert_eq!(spelling_variants("fridag:"), vec!["fridag:", "fridag", "Fridag:"]);
        assert_eq!(
            spelling_variants(" Ferie  Hellas "),
            vec!["Ferie Hellas", "ferie hellas", "Ferie hellas"]
        );
        assert!(spelling_variants("  ").is_empty());
    }

    #[test]
    fn title_case_follows_non_letters() {
        assert_eq!(title_case("r.i.p: per"), "R.I.P: Per");
        assert_eq!(capitalize("hELLO wORLD"), "Hello world");
    }

    #[test]
    fn split_prefers_commas() {
        assert_eq!(split_tag_text("Fridag, Skole"), vec!["Fridag", "Skole"]);
        assert_eq!(split_tag_text(" , ,Peter"), vec!["Peter"]);
    }

    #[test]
    fn split_single_short_word() {
        assert_eq!(split_tag_text("  Amalie "), vec!["Amalie"]);
        assert!(split_tag_text("   ").is_empty());
    }

    #[test]
    fn split_capitalized_runs_then_punctuation() {
        assert_eq!(split_tag_text("med Amalie og Sigrid"), vec!["Amalie", "Sigrid"]);
        assert_eq!(split_tag_text("fotball/ski - svømming"), vec!["fotball", "ski", "svømming"]);
    }

    #[test]
    fn existing_tags_only_get_colors_normalized() {
        let mut ev = event("Husk: melk");
        ev.tags = vec![
            Tag::new(" Peter ").with_color_name("blue"),
            Tag::new("Ukjent").with_color_name("no-such-color"),
        ];
        let out = enrich(vec![ev], &RuleSet::fallback());
        let texts: Vec<_> = out[0].tags.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Peter", "Ukjent"]);
        assert_eq!(out[0].tags[0].color_rgb, Some(Rgb(0, 0, 255)));
        assert_eq!(out[0].tags[1].color_rgb, None);
    }

    #[test]
    fn enrich_is_idempotent_on_tagged_events() {
        let once = enrich(vec![event("Amalie istrening")], &RuleSet::fallback());
        let twice = enrich(once.clone(), &RuleSet::fallback());
        let texts = |evs: &[Event]| evs[0].tags.iter().map(|t| t.text.clone()).collect::<Vec<_>>();
        assert_eq!(texts(&once), texts(&twice));
        assert_eq!(texts(&once), vec!["Amalie"]);
    }

    #[test]
    fn full_name_mapping_supplies_tags() {
        let out = enrich(vec![event("G16 IK - Seriekamp")], &RuleSet::fallback());
        assert_eq!(out[0].tags.len(), 1);
        assert_eq!(out[0].tags[0].text, "Peter");
        assert_eq!(out[0].tags[0].color_rgb, Some(Rgb(0, 0, 255)));
    }

    #[test]
    fn unmatched_tag_text_yields_uncolored_tags() {
        let mut ev = event("Planleggingsdag");
        ev.tag_text = "Fridag, Skole".into();
        let out = enrich(vec![ev], &RuleSet::default());
        assert_eq!(out[0].tags, vec![Tag::new("Fridag"), Tag::new("Skole")]);
    }

    #[test]
    fn tag_text_tokens_resolve_through_lookup_and_legacy_color() {
        let rules = RuleSet::new(vec![
            Rule::new("sigrid", RuleMode::ReplaceText)
                .with_replacement("Sigrid")
                .with_color("GREEN"),
            Rule::new("fridag:", RuleMode::ReplaceAll).with_icon("flag"),
        ]);
        let mut ev = event("Planleggingsdag");
        ev.tag_text = "SIGRID, Fridag, Annet".into();
        ev.tag_color_name = Some("orange".into());
        let out = enrich(vec![ev], &rules);
        let tags = &out[0].tags;
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].text, "SIGRID");
        assert_eq!(tags[0].color_rgb, Some(Rgb(0, 128, 0)));
        assert_eq!(tags[0].mode.as_deref(), Some("replace_text"));
        // icon-only rule: icon attached, color from the event's legacy field
        assert_eq!(tags[1].icon.as_deref(), Some("flag"));
        assert_eq!(tags[1].color_rgb, Some(Rgb(255, 128, 0)));
        assert_eq!(tags[2].text, "Annet");
        assert_eq!(tags[2].color_rgb, Some(Rgb(255, 128, 0)));
    }

    #[test]
    fn tag_token_inside_a_longer_keyword_borrows_its_color() {
        let rules = RuleSet::new(vec![
            Rule::new("G16 IK", RuleMode::ReplaceAll)
                .with_icon("soccer")
                .with_color("BLUE"),
        ]);
        let mut ev = event("Planleggingsdag");
        ev.tag_text = "IK".into();
        let out = enrich(vec![ev], &rules);
        let tags = &out[0].tags;
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].text, "IK");
        assert_eq!(tags[0].color_rgb, Some(Rgb(0, 0, 255)));
        assert_eq!(tags[0].mode.as_deref(), Some("replace_all"));

        let lookup = TagLookup::build(&rules);
        assert!(lookup.find("IK").is_none());
        assert_eq!(lookup.overlapping("IK").map(|r| r.keyword.as_str()), Some("G16 IK"));
        assert!(lookup.overlapping("  ").is_none());
    }

    #[test]
    fn name_scan_skips_icon_only_matches() {
        let rules = RuleSet::new(vec![
            Rule::new("oslo", RuleMode::AddIcon).with_icon("city"),
            Rule::new("leire", RuleMode::AddIcon).with_icon("palette").with_color("YELLOW"),
        ]);
        let mut ev = event("Tur til Oslo");
        // display name already stripped by an earlier pass; scan reads it as-is
        ev.set_display_text("Tur til Oslo");
        let out = enrich(vec![ev], &rules);
        assert!(out[0].tags.is_empty(), "bare icon match must not become a tag");

        // a colored rule does qualify; "Leire" hits through the lowercased variant
        let mut ev = event("x");
        ev.set_display_text("");
        ev.original_name = "Leire-verksted".into();
        let out = enrich(vec![ev], &rules);
        assert_eq!(out[0].tags.len(), 1);
        assert_eq!(out[0].tags[0].text, "Leire");
        assert_eq!(out[0].tags[0].icon.as_deref(), Some("palette"));
    }

    #[test]
    fn lookup_registers_keyword_and_replacement_variants() {
        let rules = RuleSet::fallback();
        let lookup = TagLookup::build(&rules);
        assert!(!lookup.is_empty());
        assert_eq!(lookup.find("BURSDAG").map(|r| r.keyword.as_str()), Some("bursdag:"));
        assert_eq!(lookup.find("Husk:").map(|r| r.keyword.as_str()), Some("husk:"));
        // "Peter" is registered by three rows; the last one wins
        assert_eq!(lookup.get("Peter").map(|r| r.keyword.as_str()), Some("G16"));
        assert!(lookup.find("").is_none());
    }
}
