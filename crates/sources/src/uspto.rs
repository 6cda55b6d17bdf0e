//! USPTO patent application publications search.
//!
//! One GET per search against the publications endpoint; no paging.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;
use windowscout_core::adapter::PatentSearch;
use windowscout_core::error::AdapterError;
use windowscout_core::evidence::PatentRecord;

use crate::http::{RetryPolicy, get_json_with_retry};

/// Header carrying the USPTO API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The endpoint rejects larger `rows` values.
const MAX_ROWS: usize = 100;

pub struct UsptoPatents {
    client: reqwest::Client,
    url: String,
    policy: RetryPolicy,
}

impl UsptoPatents {
    /// `client` must already carry the API key header.
    pub fn new(client: reqwest::Client, url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            client,
            url: url.into(),
            policy,
        }
    }

    fn params(query: &str, rows: usize) -> Vec<(&'static str, String)> {
        vec![
            ("searchText", query.to_string()),
            ("rows", rows.to_string()),
            ("start", "0".to_string()),
        ]
    }
}

/// Parse a publications response body, keeping at most `limit` records.
pub fn parse_publications(body: &Value, limit: usize) -> Vec<PatentRecord> {
    body.get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(parse_publication)
        .take(limit)
        .collect()
}

/// A string field, or the first string of an array field.
fn text(item: &Value, key: &str) -> Option<String> {
    let value = match item.get(key)? {
        Value::Array(values) => values.iter().find_map(Value::as_str)?,
        other => other.as_str()?,
    };
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_publication(item: &Value) -> Option<PatentRecord> {
    let title = text(item, "inventionTitle")?;

    let assignee = match item.get("applicants") {
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => text(item, "applicants").unwrap_or_default(),
    };

    Some(PatentRecord {
        patent_id: text(item, "publicationDocumentIdentifier").unwrap_or_default(),
        title,
        assignee,
        abstract_text: text(item, "abstractText").unwrap_or_default(),
        filing_date: text(item, "filingDate"),
        publication_date: text(item, "publicationDate"),
        link: None,
    })
}

#[async_trait]
impl PatentSearch for UsptoPatents {
    fn name(&self) -> &str {
        "uspto-patents"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PatentRecord>, AdapterError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AdapterError::InvalidQuery("empty patent query".into()));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let params = Self::params(query, limit.min(MAX_ROWS));
        let body = get_json_with_retry(&self.client, &self.url, &params, self.policy).await?;
        let records = parse_publications(&body, limit);

        info!(query, count = records.len(), "USPTO patents fetched");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorded() -> Value {
        json!({
            "recordTotalQuantity": 3,
            "results": [
                {
                    "inventionTitle": "Hydration monitoring container",
                    "applicants": ["HydroCo Inc.", " Aqua Labs "],
                    "abstractText": ["A container that reports fluid intake."],
                    "publicationDocumentIdentifier": "US20230123456A1",
                    "filingDate": "2022-05-17",
                    "publicationDate": "2023-11-02"
                },
                {
                    "inventionTitle": "Smart lid",
                    "applicants": "Lidworks LLC",
                    "abstractText": "A lid with a flow sensor.",
                    "publicationDocumentIdentifier": "US20230999999A1"
                },
                { "abstractText": ["untitled, skipped"] }
            ]
        })
    }

    #[test]
    fn publications_map_to_records() {
        let records = parse_publications(&recorded(), 10);
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.patent_id, "US20230123456A1");
        assert_eq!(first.title, "Hydration monitoring container");
        assert_eq!(first.assignee, "HydroCo Inc., Aqua Labs");
        assert_eq!(first.abstract_text, "A container that reports fluid intake.");
        assert_eq!(first.filing_date.as_deref(), Some("2022-05-17"));
        assert_eq!(first.publication_date.as_deref(), Some("2023-11-02"));

        let second = &records[1];
        assert_eq!(second.assignee, "Lidworks LLC");
        assert_eq!(second.abstract_text, "A lid with a flow sensor.");
        assert!(second.filing_date.is_none());
    }

    #[test]
    fn limit_caps_records() {
        assert_eq!(parse_publications(&recorded(), 1).len(), 1);
    }

    #[test]
    fn missing_results_is_empty() {
        assert!(parse_publications(&json!({"error": "nothing"}), 10).is_empty());
    }

    #[test]
    fn params_start_at_zero() {
        let params = UsptoPatents::params("water bottle", 25);
        assert!(params.contains(&("searchText", "water bottle".into())));
        assert!(params.contains(&("rows", "25".into())));
        assert!(params.contains(&("start", "0".into())));
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let search = UsptoPatents::new(
            reqwest::Client::new(),
            "http://localhost/publications",
            RetryPolicy::default(),
        );
        assert!(matches!(search.search("  ", 5).await, Err(AdapterError::InvalidQuery(_))));
        assert!(search.search("bottle", 0).await.unwrap().is_empty());
    }
}
