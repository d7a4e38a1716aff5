//! tarkov.dev GraphQL integration.
//!
//! One query fetches everything a snapshot needs: the two designated
//! currency items, all traders with their reset timestamps and cash
//! offers, and the barter list. The API is public and unauthenticated.
//!
//! API: `https://api.tarkov.dev/graphql`

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::types::MarketSnapshot;

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Item ids of the USD and EUR currency items.
const USD_ITEM_ID: &str = "5696686a4bdc2da3298b456a";
const EUR_ITEM_ID: &str = "569668774bdc2da2298b4568";

/// Upper bound on barters per fetch; the game ships well under this.
const BARTER_LIMIT: u32 = 500;

fn snapshot_query() -> String {
    format!(
        r#"{{
    currencies: items(ids: ["{USD_ITEM_ID}", "{EUR_ITEM_ID}"]) {{
        name
        buyFor {{ price source }}
    }}

    traders {{
        name
        resetTime
        cashOffers {{
            item {{
                name
                iconLink
                wikiLink
                basePrice
                avg24hPrice
                lastLowPrice
                buyFor {{ price source }}
                sellFor {{ price source }}
            }}
            price
            currency
            minTraderLevel
            buyLimit
        }}
    }}

    barters(limit: {BARTER_LIMIT}) {{
        trader {{ name }}
        level
        buyLimit
        rewardItems {{
            item {{
                name
                iconLink
                wikiLink
                basePrice
                avg24hPrice
                lastLowPrice
                buyFor {{ price source }}
                sellFor {{ price source }}
            }}
            count
        }}
        requiredItems {{
            item {{
                name
                buyFor {{ price source }}
            }}
            count
        }}
    }}
}}"#
    )
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure modes of a snapshot fetch, kept distinct so the caller can
/// decide between falling back to the cache and surfacing the error.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned HTTP {0}")]
    Status(StatusCode),

    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    #[error("response contained no data")]
    Empty,
}

// ---------------------------------------------------------------------------
// Wire envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope {
    data: Option<MarketSnapshot>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

impl GraphQlEnvelope {
    /// Unwrap the envelope, preferring partial data over error noise:
    /// the API reports per-field errors alongside usable data.
    fn into_snapshot(self) -> Result<MarketSnapshot, FetchError> {
        if !self.errors.is_empty() {
            let joined = self
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            match self.data {
                Some(snapshot) => {
                    warn!(errors = %joined, "GraphQL reported errors alongside data");
                    return Ok(snapshot);
                }
                None => return Err(FetchError::GraphQl(joined)),
            }
        }
        self.data.ok_or(FetchError::Empty)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Anything that can produce a market snapshot. The live API client
/// implements this; tests substitute fixed snapshots.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<MarketSnapshot, FetchError>;
}

/// Live GraphQL API client.
pub struct ApiClient {
    http: Client,
    url: String,
}

impl ApiClient {
    pub fn new(url: &str, timeout: std::time::Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("flipscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl SnapshotSource for ApiClient {
    async fn fetch_snapshot(&self) -> Result<MarketSnapshot, FetchError> {
        debug!(url = %self.url, "Fetching market snapshot");

        let response = self
            .http
            .post(&self.url)
            .json(&json!({ "query": snapshot_query() }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let envelope: GraphQlEnvelope = response.json().await?;
        envelope.into_snapshot()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_with_data() {
        let raw = r#"{
            "data": {
                "currencies": [{"name": "Dollars", "buyFor": [{"price": 142, "source": "peacekeeper"}]}],
                "traders": [{"name": "prapor", "resetTime": "2026-08-30T12:00:00Z", "cashOffers": []}],
                "barters": []
            }
        }"#;
        let envelope: GraphQlEnvelope = serde_json::from_str(raw).unwrap();
        let snapshot = envelope.into_snapshot().unwrap();
        assert_eq!(snapshot.currencies.len(), 1);
        assert_eq!(snapshot.traders[0].name, "prapor");
    }

    #[test]
    fn test_envelope_errors_without_data() {
        let raw = r#"{"data": null, "errors": [{"message": "rate limited"}, {"message": "try later"}]}"#;
        let envelope: GraphQlEnvelope = serde_json::from_str(raw).unwrap();
        match envelope.into_snapshot() {
            Err(FetchError::GraphQl(msg)) => {
                assert!(msg.contains("rate limited"));
                assert!(msg.contains("try later"));
            }
            other => panic!("expected GraphQl error, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_partial_data_wins_over_errors() {
        let raw = r#"{
            "data": {"currencies": [], "traders": [], "barters": []},
            "errors": [{"message": "field resetTime unavailable"}]
        }"#;
        let envelope: GraphQlEnvelope = serde_json::from_str(raw).unwrap();
        assert!(envelope.into_snapshot().is_ok());
    }

    #[test]
    fn test_envelope_empty() {
        let raw = r#"{"data": null}"#;
        let envelope: GraphQlEnvelope = serde_json::from_str(raw).unwrap();
        assert!(matches!(envelope.into_snapshot(), Err(FetchError::Empty)));
    }

    #[test]
    fn test_query_names_expected_fields() {
        let q = snapshot_query();
        for field in ["currencies", "traders", "resetTime", "cashOffers", "barters", "requiredItems", "rewardItems"] {
            assert!(q.contains(field), "query missing {field}");
        }
    }
}
