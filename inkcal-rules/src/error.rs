use std::path::PathBuf;

use thiserror::Error;

/// Failures while fetching, decoding or caching the rule table.
///
/// None of these reach the caller of `RuleStore::load`; they only decide
/// which link of the load chain is used.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("no rule source URL configured")]
    NoSourceUrl,

    #[error("fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("rule source {url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("decoding rule CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("cache file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rule source yielded no usable rows")]
    EmptyRuleSet,
}
