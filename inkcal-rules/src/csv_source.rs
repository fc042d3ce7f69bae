//! Published rule table: CSV decoding and the HTTP fetcher.
//!
//! Expected header row (any order, case-insensitive):
//! keyword,icon,replacement,mode,color,match_type,size_px

use std::future::Future;
use std::time::Duration;

use inkcal_core::{RuleRow, RuleSet};
use tracing::debug;

use crate::error::RulesError;

/// Column positions found in the header row.
struct Columns {
    keyword: Option<usize>,
    icon: Option<usize>,
    replacement: Option<usize>,
    mode: Option<usize>,
    color: Option<usize>,
    match_type: Option<usize>,
    size_px: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let col = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim().eq_ignore_ascii_case(name))
        };
        Self {
            keyword: col("keyword"),
            icon: col("icon"),
            replacement: col("replacement"),
            mode: col("mode"),
            color: col("color"),
            match_type: col("match_type"),
            size_px: col("size_px"),
        }
    }
}

/// Decode the CSV body into rules. Rows that fail to decode or validate are
/// skipped; only an unreadable header is an error.
pub fn parse_rules_csv(text: &str) -> Result<RuleSet, RulesError> {
    Ok(RuleSet::from_rows(parse_rule_rows(text)?))
}

/// Raw rows, before validation.
pub fn parse_rule_rows(text: &str) -> Result<Vec<RuleRow>, RulesError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let cols = Columns::from_headers(rdr.headers()?);

    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(line, error = %e, "skipping undecodable rule row");
                continue;
            }
        };
        let get = |i: Option<usize>| i.and_then(|i| record.get(i)).map(str::to_string);
        rows.push(RuleRow {
            keyword: get(cols.keyword),
            icon: get(cols.icon),
            replacement: get(cols.replacement),
            mode: get(cols.mode),
            color: get(cols.color),
            match_type: get(cols.match_type),
            size_px: get(cols.size_px),
        });
    }

    Ok(rows)
}

/// Network seam for the rule table, so tests can inject canned bodies.
pub trait CsvFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, RulesError>> + Send;
}

/// Fetches the published CSV over HTTP with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("inkcal/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl CsvFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, RulesError> {
        let http = |source| RulesError::Http {
            url: url.to_string(),
            source,
        };
        let resp = self.client.get(url).send().await.map_err(http)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RulesError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.text().await.map_err(http)
    }
}
