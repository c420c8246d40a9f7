use std::sync::Arc;

use anyhow::Context;
use apify_client::ApifyClient;
use async_trait::async_trait;
use marginscout_common::SourcingError;
use serde_json::{json, Value};
use tracing::debug;

use crate::search::{first_str, parse_price};

/// Competitor-price snapshot for one candidate on the destination
/// marketplace. All prices in local currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketSnapshot {
    pub competitor_count: u32,
    pub price_min: i64,
    pub price_avg: i64,
    pub price_max: i64,
    /// Price the pipeline suggests listing at. Undercuts the average
    /// without going below the cheapest competitor.
    pub recommended_price: i64,
}

/// Recommendation policy: 90% of the competitor average, floored at the
/// minimum competitor price.
pub fn recommend_price(price_min: i64, price_avg: i64) -> i64 {
    ((price_avg as f64 * 0.9) as i64).max(price_min)
}

/// Looks up what a product already sells for on the destination
/// marketplace. The expensive half of enrichment.
#[async_trait]
pub trait MarketResearch: Send + Sync {
    async fn research(&self, query: &str, max_results: u32) -> anyhow::Result<MarketSnapshot>;
}

/// Apify-backed research against a destination-marketplace search actor.
pub struct ApifyMarketResearch {
    client: Arc<ApifyClient>,
    actor_id: String,
}

impl ApifyMarketResearch {
    pub fn new(client: Arc<ApifyClient>, actor_id: impl Into<String>) -> Self {
        Self {
            client,
            actor_id: actor_id.into(),
        }
    }

    fn snapshot_from_items(items: &[Value]) -> Option<MarketSnapshot> {
        let prices: Vec<i64> = items
            .iter()
            .filter_map(|item| {
                let url = first_str(item, &["url", "productUrl", "link"]);
                if url.is_empty() {
                    return None;
                }
                let price = item.get("price").map(parse_price).unwrap_or(0.0) as i64;
                (price > 0).then_some(price)
            })
            .collect();
        if prices.is_empty() {
            return None;
        }

        let min = *prices.iter().min().unwrap_or(&0);
        let max = *prices.iter().max().unwrap_or(&0);
        let avg = prices.iter().sum::<i64>() / prices.len() as i64;
        Some(MarketSnapshot {
            competitor_count: prices.len() as u32,
            price_min: min,
            price_avg: avg,
            price_max: max,
            recommended_price: recommend_price(min, avg),
        })
    }
}

#[async_trait]
impl MarketResearch for ApifyMarketResearch {
    async fn research(&self, query: &str, max_results: u32) -> anyhow::Result<MarketSnapshot> {
        let input = json!({
            "query": query,
            "maxItems": max_results,
        });
        let items = self
            .client
            .run_actor(&self.actor_id, &input)
            .await
            .map_err(|e| SourcingError::Provider(format!("market research '{query}': {e}")))?;
        debug!(query, items = items.len(), "Market research items fetched");
        Self::snapshot_from_items(&items)
            .with_context(|| format!("no priced competitors found for '{query}'"))
    }
}

/// Deterministic research for tests and token-less runs: three fixed
/// competitors at 35,000 / 38,500 / 42,000.
pub struct MockMarketResearch;

#[async_trait]
impl MarketResearch for MockMarketResearch {
    async fn research(&self, _query: &str, _max_results: u32) -> anyhow::Result<MarketSnapshot> {
        let (min, avg, max) = (35_000, 38_500, 42_000);
        Ok(MarketSnapshot {
            competitor_count: 3,
            price_min: min,
            price_avg: avg,
            price_max: max,
            recommended_price: recommend_price(min, avg),
        })
    }
}

/// Research double that always fails, for exercising the enrichment
/// fallback path.
pub struct FailingMarketResearch;

#[async_trait]
impl MarketResearch for FailingMarketResearch {
    async fn research(&self, query: &str, _max_results: u32) -> anyhow::Result<MarketSnapshot> {
        anyhow::bail!("research unavailable for '{query}'")
    }
}
