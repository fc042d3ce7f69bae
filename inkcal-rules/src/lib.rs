//! inkcal-rules: loading the event mapping rules from the published table,
//! the local cache or the embedded list.

pub mod cache;
pub mod csv_source;
pub mod error;
pub mod store;

pub use cache::{load_cache_if_valid, save_cache};
pub use csv_source::{CsvFetcher, HttpFetcher, parse_rule_rows, parse_rules_csv};
pub use error::RulesError;
pub use store::{DEFAULT_CACHE_TTL, LoadedRules, RuleOrigin, RuleStore, RuleStoreConfig};
