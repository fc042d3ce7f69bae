//! Strict keyword matcher: one keyword, one text, one match strategy.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::rule::MatchType;

/// Byte range of a match within the searched text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

fn case_insensitive(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern).case_insensitive(true).build().ok()
}

/// Match `keyword` against `text` under `match_type`.
///
/// Never fails: an empty keyword is simply no match, and an invalid `regex`
/// keyword degrades to a literal `contains` search.
pub fn match_text(text: &str, keyword: &str, match_type: MatchType) -> Option<Span> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return None;
    }
    let lit = regex::escape(keyword);

    let re = match match_type {
        // optional trailing colon or word boundary, then any spaces
        MatchType::Prefix | MatchType::Startswith => {
            case_insensitive(&format!(r"^\s*{lit}(?::|\b)?\s*"))?
        }
        MatchType::Exact => case_insensitive(&format!(r"^\s*{lit}\s*$"))?,
        MatchType::Endswith => case_insensitive(&format!(r"{lit}\s*$"))?,
        MatchType::Regex => match case_insensitive(keyword) {
            Some(re) => re,
            None => case_insensitive(&lit)?,
        },
        MatchType::Contains => case_insensitive(&lit)?,
    };

    re.find(text).map(|m| Span {
        start: m.start(),
        end: m.end(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(text: &str, span: Span) -> &str {
        &text[span.start..span.end]
    }

    #[test]
    fn contains_finds_first_occurrence_anywhere() {
        let text = "G16 IK match";
        let span = match_text(text, "G16", MatchType::Contains).unwrap();
        assert_eq!(span, Span { start: 0, end: 3 });

        let text = "kamp: g16 mot g16";
        let span = match_text(text, "G16", MatchType::Contains).unwrap();
        assert_eq!(slice(text, span), "g16");
        assert_eq!(span.start, 6);
    }

    #[test]
    fn prefix_includes_trailing_colon_and_space() {
        let text = "Bursdag: Ola";
        let span = match_text(text, "bursdag", MatchType::Prefix).unwrap();
        assert_eq!(slice(text, span), "Bursdag: ");

        assert!(match_text("Ola bursdag", "bursdag", MatchType::Startswith).is_none());
    }

    #[test]
    fn exact_allows_surrounding_whitespace_only() {
        assert!(match_text("  Skole ", "skole", MatchType::Exact).is_some());
        assert!(match_text("Skole i dag", "skole", MatchType::Exact).is_none());
    }

    #[test]
    fn endswith_anchors_at_end() {
        let text = "Trening oslo ";
        let span = match_text(text, "OSLO", MatchType::Endswith).unwrap();
        assert_eq!(slice(text, span), "oslo ");
        assert!(match_text("oslo tur", "oslo", MatchType::Endswith).is_none());
    }

    #[test]
    fn regex_is_case_insensitive_and_degrades_on_bad_syntax() {
        let text = "Fotball G16";
        let span = match_text(text, r"g\d+", MatchType::Regex).unwrap();
        assert_eq!(slice(text, span), "G16");

        // unbalanced bracket: matched literally instead
        let text = "pris [kr";
        let span = match_text(text, "[kr", MatchType::Regex).unwrap();
        assert_eq!(slice(text, span), "[kr");
        assert!(match_text("ingen", "[kr", MatchType::Regex).is_none());
    }

    #[test]
    fn empty_keyword_never_matches() {
        assert!(match_text("anything", "", MatchType::Contains).is_none());
        assert!(match_text("anything", "   ", MatchType::Prefix).is_none());
    }

    #[test]
    fn keyword_metacharacters_are_literal_outside_regex_mode() {
        let text = "Minnestund r.i.p: Per";
        let span = match_text(text, "r.i.p:", MatchType::Contains).unwrap();
        assert_eq!(slice(text, span), "r.i.p:");
        assert!(match_text("rxixp:", "r.i.p:", MatchType::Contains).is_none());
    }
}
