//! Mapping rules: one row of the keyword table, and the ordered set of rows.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::{Rgb, color_to_rgb};
use crate::matcher::{Span, match_text};

pub const DEFAULT_ICON_SIZE: u32 = 18;

/// What a matching rule does to the working text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    ReplaceIcon,
    ReplaceText,
    ReplaceAll,
    AddIcon,
    AddAll,
}

impl RuleMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "replace_icon" => Some(Self::ReplaceIcon),
            "replace_text" => Some(Self::ReplaceText),
            "replace_all" => Some(Self::ReplaceAll),
            "add_icon" => Some(Self::AddIcon),
            "add_all" => Some(Self::AddAll),
            _ => None,
        }
    }

    /// Unknown or empty values coerce to `replace_icon`.
    pub fn parse_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::ReplaceIcon)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReplaceIcon => "replace_icon",
            Self::ReplaceText => "replace_text",
            Self::ReplaceAll => "replace_all",
            Self::AddIcon => "add_icon",
            Self::AddAll => "add_all",
        }
    }

    /// `add_*` modes never touch the working text.
    pub fn is_additive(self) -> bool {
        matches!(self, Self::AddIcon | Self::AddAll)
    }
}

/// How the strict matcher compares a keyword against text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Contains,
    Prefix,
    Exact,
    Startswith,
    Endswith,
    Regex,
}

impl MatchType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "contains" => Some(Self::Contains),
            "prefix" => Some(Self::Prefix),
            "exact" => Some(Self::Exact),
            "startswith" => Some(Self::Startswith),
            "endswith" => Some(Self::Endswith),
            "regex" => Some(Self::Regex),
            _ => None,
        }
    }

    /// Default used when loading table rows.
    pub fn parse_for_row(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Contains)
    }

    /// Default used by the strict single-text lookup path.
    pub fn parse_strict(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Prefix)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Prefix => "prefix",
            Self::Exact => "exact",
            Self::Startswith => "startswith",
            Self::Endswith => "endswith",
            Self::Regex => "regex",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("rule row has no keyword")]
    MissingKeyword,
}

/// A rule row as it appears in the table or cache: every column optional, all text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRow {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub replacement: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub match_type: Option<String>,
    #[serde(default)]
    pub size_px: Option<String>,
}

/// One validated mapping rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub keyword: String,
    pub icon: Option<String>,
    pub replacement: Option<String>,
    pub mode: RuleMode,
    pub color: Option<String>,
    pub match_type: MatchType,
    pub size_px: u32,
}

fn non_empty(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

impl TryFrom<RuleRow> for Rule {
    type Error = RowError;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        let keyword = non_empty(row.keyword.as_deref()).ok_or(RowError::MissingKeyword)?;
        let size_px = row
            .size_px
            .as_deref()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_ICON_SIZE);

        Ok(Rule {
            keyword,
            icon: non_empty(row.icon.as_deref()),
            replacement: non_empty(row.replacement.as_deref()),
            mode: RuleMode::parse_or_default(row.mode.as_deref().unwrap_or("")),
            color: non_empty(row.color.as_deref()),
            match_type: MatchType::parse_for_row(row.match_type.as_deref().unwrap_or("")),
            size_px,
        })
    }
}

impl From<&Rule> for RuleRow {
    fn from(rule: &Rule) -> Self {
        RuleRow {
            keyword: Some(rule.keyword.clone()),
            icon: Some(rule.icon.clone().unwrap_or_default()),
            replacement: Some(rule.replacement.clone().unwrap_or_default()),
            mode: Some(rule.mode.as_str().to_string()),
            color: Some(rule.color.clone().unwrap_or_default()),
            match_type: Some(rule.match_type.as_str().to_string()),
            size_px: Some(rule.size_px.to_string()),
        }
    }
}

impl Rule {
    pub fn new(keyword: impl Into<String>, mode: RuleMode) -> Self {
        Self {
            keyword: keyword.into(),
            icon: None,
            replacement: None,
            mode,
            color: None,
            match_type: MatchType::Contains,
            size_px: DEFAULT_ICON_SIZE,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = non_empty(Some(&icon.into()));
        self
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = non_empty(Some(&replacement.into()));
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = non_empty(Some(&color.into()));
        self
    }

    pub fn with_match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    pub fn color_rgb(&self) -> Option<Rgb> {
        self.color.as_deref().and_then(color_to_rgb)
    }
}

/// Result of the strict single-text lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchInfo {
    pub rule: Rule,
    pub color_rgb: Option<Rgb>,
    pub remaining_text: String,
    pub span: Span,
}

fn strict_match(rule: Rule, text: &str) -> Option<MatchInfo> {
    let span = match_text(text, &rule.keyword, rule.match_type)?;
    let remaining = format!("{}{}", &text[..span.start], &text[span.end..]);
    Some(MatchInfo {
        color_rgb: rule.color_rgb(),
        remaining_text: remaining.trim().to_string(),
        span,
        rule,
    })
}

/// Strict lookup over raw table rows. Here a missing or unknown
/// `match_type` means `prefix`, not the `contains` used when loading rows.
pub fn match_info_in_rows<'r>(
    rows: impl IntoIterator<Item = &'r RuleRow>,
    text: &str,
) -> Option<MatchInfo> {
    if text.is_empty() {
        return None;
    }
    rows.into_iter().find_map(|row| {
        let mut rule = Rule::try_from(row.clone()).ok()?;
        rule.match_type = MatchType::parse_strict(row.match_type.as_deref().unwrap_or(""));
        strict_match(rule, text)
    })
}

/// Ordered rule list. Order matters: earlier rules win the primary icon and
/// see the working text before later rules strip from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Validate raw rows, silently dropping the ones without a keyword.
    pub fn from_rows(rows: impl IntoIterator<Item = RuleRow>) -> Self {
        Self::new(rows.into_iter().filter_map(|r| Rule::try_from(r).ok()).collect())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn to_rows(&self) -> Vec<RuleRow> {
        self.rules.iter().map(RuleRow::from).collect()
    }

    /// First rule whose declared match type matches `text`, with the matched span cut out.
    pub fn match_info(&self, text: &str) -> Option<MatchInfo> {
        if text.is_empty() {
            return None;
        }
        self.rules.iter().find_map(|rule| strict_match(rule.clone(), text))
    }

    /// The embedded rule list used when neither the published table nor the cache is usable.
    pub fn fallback() -> Self {
        use RuleMode::*;
        let r = |kw: &str, icon: &str, repl: &str, mode: RuleMode, color: &str| {
            Rule::new(kw, mode).with_icon(icon).with_replacement(repl).with_color(color)
        };
        Self::new(vec![
            r("Middag:", "coffee", "", ReplaceIcon, "RED"),
            r("movar:", "trash-2", "", ReplaceIcon, "RED"),
            r("ferie:", "flag", "ferie", ReplaceAll, ""),
            r("husk:", "bell", "husk", ReplaceIcon, "RED"),
            r("bursdag:", "cake", "bursdag", ReplaceAll, ""),
            r("r.i.p:", "grave-stone", "", ReplaceIcon, ""),
            r("G16 IK", "soccer", "Peter", ReplaceAll, "BLUE"),
            r("oslo", "city", "", AddIcon, ""),
            r("amalie", "", "Amalie", ReplaceText, "YELLOW"),
            r("sigrid", "", "Sigrid", ReplaceText, "GREEN"),
            r("peter", "", "Peter", ReplaceText, "BLACK"),
            r("ingun", "", "Ingun", ReplaceText, "RED"),
            r("christian", "", "Christian", ReplaceText, "BLACK"),
            r("G16", "soccer", "Peter", ReplaceAll, "BLUE"),
            r("leire", "palette", "", AddIcon, "YELLOW"),
            r("skole", "school", "", AddIcon, ""),
            r("istrening", "skate", "Amalie", AddAll, "YELLOW"),
        ])
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
