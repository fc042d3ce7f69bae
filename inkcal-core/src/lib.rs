//! inkcal-core: rule-based event mapping and tag enrichment for the e-ink calendar.

pub mod color;
pub mod enrich;
pub mod event;
pub mod mapping;
pub mod matcher;
pub mod rule;

pub use color::{Rgb, color_to_rgb, rgb_from_value};
pub use enrich::{TagEnricher, TagLookup, enrich, split_tag_text, spelling_variants};
pub use event::{Event, Tag};
pub use mapping::{MappingPass, MappingResult, apply};
pub use matcher::{Span, match_text};
pub use rule::{MatchInfo, MatchType, RowError, Rule, RuleMode, RuleRow, RuleSet, match_info_in_rows};
