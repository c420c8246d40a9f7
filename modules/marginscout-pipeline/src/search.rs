use std::sync::Arc;

use apify_client::ApifyClient;
use async_trait::async_trait;
use marginscout_common::{RawListing, SourcingError};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// A source of wholesale listings for a search term. Implementations own
/// their vendor's JSON shape and emit normalized listings; callers never
/// see provider payloads.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, term: &str, max_results: u32) -> anyhow::Result<Vec<RawListing>>;

    fn name(&self) -> &str;
}

/// Tries providers in order until one returns a non-empty result set.
/// A provider error is logged and the chain moves on; only when every
/// provider comes back empty or failing does the chain return an empty
/// list (never an error — a keyword with no listings is not a failure).
pub struct ProviderChain {
    providers: Vec<Arc<dyn SearchProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn SearchProvider>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl SearchProvider for ProviderChain {
    async fn search(&self, term: &str, max_results: u32) -> anyhow::Result<Vec<RawListing>> {
        for provider in &self.providers {
            match provider.search(term, max_results).await {
                Ok(listings) if !listings.is_empty() => {
                    debug!(provider = provider.name(), term, count = listings.len(), "Provider returned listings");
                    return Ok(listings);
                }
                Ok(_) => {
                    debug!(provider = provider.name(), term, "Provider returned no listings, trying next");
                }
                Err(e) => {
                    warn!(provider = provider.name(), term, error = %e, "Provider failed, trying next");
                }
            }
        }
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "provider-chain"
    }
}

// --- Field normalization ---
//
// Scraper actors are loose about shape: the same field arrives as a
// number, a formatted string, or a range object depending on actor
// version. These helpers coerce defensively; a value that cannot be
// coerced becomes the zero value and the basic filter drops the listing.

fn first_value<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| {
        let v = item.get(k)?;
        if v.is_null() {
            None
        } else {
            Some(v)
        }
    })
}

pub(crate) fn first_str(item: &Value, keys: &[&str]) -> String {
    first_value(item, keys)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Parse a price that may be a bare number, a currency-formatted string
/// ("¥12.50", "$3,999"), a textual range ("8.5-12.0", "8.5~12.0"), or an
/// object with min/max bounds. Ranges resolve to the HIGHER bound so the
/// cost model always plans against the worse case.
pub(crate) fn parse_price(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-' || *c == '~')
                .collect();
            let parts: Vec<f64> = cleaned
                .split(['-', '~'])
                .filter_map(|p| p.trim().parse::<f64>().ok())
                .collect();
            parts.into_iter().fold(0.0, f64::max)
        }
        Value::Object(map) => {
            let min = map.get("min").map(parse_price).unwrap_or(0.0);
            let max = map.get("max").map(parse_price).unwrap_or(0.0);
            min.max(max)
        }
        _ => 0.0,
    }
}

/// Parse a sales count that may arrive as "1,234", "500+", "2k", or "3万".
pub(crate) fn parse_sales(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0) as u32,
        Value::String(s) => {
            let s = s.trim().to_lowercase();
            let multiplier = if s.contains('万') {
                10_000.0
            } else if s.contains('k') {
                1_000.0
            } else {
                1.0
            };
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            cleaned
                .parse::<f64>()
                .map(|n| (n * multiplier) as u32)
                .unwrap_or(0)
        }
        _ => 0,
    }
}

pub(crate) fn parse_rating(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

pub(crate) fn parse_images(item: &Value, keys: &[&str]) -> Vec<String> {
    match first_value(item, keys) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

// --- Apify-backed providers ---

/// Primary provider: a wholesale-marketplace scraper actor. Prices come
/// back in origin currency already.
pub struct WholesaleSearchProvider {
    client: Arc<ApifyClient>,
    actor_id: String,
}

impl WholesaleSearchProvider {
    pub fn new(client: Arc<ApifyClient>, actor_id: impl Into<String>) -> Self {
        Self {
            client,
            actor_id: actor_id.into(),
        }
    }

    fn normalize(item: &Value) -> Option<RawListing> {
        let source_url = first_str(item, &["url", "productUrl", "detailUrl", "link"]);
        if source_url.is_empty() {
            return None;
        }
        let price = first_value(item, &["price", "priceRange", "unitPrice"])
            .map(parse_price)
            .unwrap_or(0.0);
        Some(RawListing {
            source_url,
            title: first_str(item, &["title", "name", "productName"]),
            unit_price: price,
            sales_count: first_value(item, &["sales", "sold", "salesCount", "monthSales"])
                .map(parse_sales)
                .unwrap_or(0),
            seller_rating: first_value(item, &["shopRating", "rating", "supplierRating"])
                .map(parse_rating)
                .unwrap_or(0.0),
            image_urls: parse_images(item, &["images", "imageUrls", "image", "imageUrl", "mainImage"]),
            seller_name: first_str(item, &["shopName", "seller", "supplierName"]),
        })
    }
}

#[async_trait]
impl SearchProvider for WholesaleSearchProvider {
    async fn search(&self, term: &str, max_results: u32) -> anyhow::Result<Vec<RawListing>> {
        let input = json!({
            "keyword": term,
            "maxItems": max_results,
        });
        let items = self
            .client
            .run_actor(&self.actor_id, &input)
            .await
            .map_err(|e| SourcingError::Provider(format!("wholesale search '{term}': {e}")))?;
        Ok(items.iter().filter_map(Self::normalize).collect())
    }

    fn name(&self) -> &str {
        "wholesale-apify"
    }
}

/// Fallback provider: a retail-marketplace scraper actor whose prices
/// are USD. Converted to origin currency on the way in so the basic
/// filter's price band means the same thing for every provider.
pub struct RetailSearchProvider {
    client: Arc<ApifyClient>,
    actor_id: String,
    usd_to_origin_rate: f64,
}

impl RetailSearchProvider {
    pub fn new(client: Arc<ApifyClient>, actor_id: impl Into<String>) -> Self {
        Self {
            client,
            actor_id: actor_id.into(),
            usd_to_origin_rate: 7.2,
        }
    }

    fn normalize(&self, item: &Value) -> Option<RawListing> {
        let source_url = first_str(item, &["productUrl", "url", "link"]);
        if source_url.is_empty() {
            return None;
        }
        let usd = first_value(item, &["salePrice", "price", "originalPrice"])
            .map(parse_price)
            .unwrap_or(0.0);
        Some(RawListing {
            source_url,
            title: first_str(item, &["title", "productTitle", "name"]),
            unit_price: usd * self.usd_to_origin_rate,
            sales_count: first_value(item, &["tradeCount", "orders", "sold"])
                .map(parse_sales)
                .unwrap_or(0),
            seller_rating: first_value(item, &["storeRating", "rating", "evaluateRate"])
                .map(parse_rating)
                .unwrap_or(0.0),
            image_urls: parse_images(item, &["images", "imageUrl", "image"]),
            seller_name: first_str(item, &["storeName", "sellerName", "store"]),
        })
    }
}

#[async_trait]
impl SearchProvider for RetailSearchProvider {
    async fn search(&self, term: &str, max_results: u32) -> anyhow::Result<Vec<RawListing>> {
        let input = json!({
            "searchTerms": [term],
            "maxItems": max_results,
        });
        let items = self
            .client
            .run_actor(&self.actor_id, &input)
            .await
            .map_err(|e| SourcingError::Provider(format!("retail search '{term}': {e}")))?;
        Ok(items.iter().filter_map(|i| self.normalize(i)).collect())
    }

    fn name(&self) -> &str {
        "retail-apify"
    }
}

/// Deterministic provider for tests and token-less local runs. Emits a
/// fixed set per term: some listings that pass the default filter, some
/// that fail each numeric gate, and one brand-term listing.
pub struct MockSearchProvider;

#[async_trait]
impl SearchProvider for MockSearchProvider {
    async fn search(&self, term: &str, max_results: u32) -> anyhow::Result<Vec<RawListing>> {
        let slug: String = term
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        let mut listings = vec![
            RawListing {
                source_url: format!("https://detail.example.com/offer/{slug}-1.html"),
                title: format!("{term} premium"),
                unit_price: 18.5,
                sales_count: 1200,
                seller_rating: 4.8,
                image_urls: vec![format!("https://img.example.com/{slug}-1.jpg")],
                seller_name: "golden factory".into(),
            },
            RawListing {
                source_url: format!("https://detail.example.com/offer/{slug}-2.html"),
                title: format!("{term} budget"),
                unit_price: 9.9,
                sales_count: 450,
                seller_rating: 4.2,
                image_urls: vec![],
                seller_name: "silver trading".into(),
            },
            RawListing {
                source_url: format!("https://detail.example.com/offer/{slug}-3.html"),
                title: format!("{term} too cheap"),
                unit_price: 1.2,
                sales_count: 5000,
                seller_rating: 4.9,
                image_urls: vec![],
                seller_name: "penny goods".into(),
            },
            RawListing {
                source_url: format!("https://detail.example.com/offer/{slug}-4.html"),
                title: format!("{term} unproven"),
                unit_price: 22.0,
                sales_count: 12,
                seller_rating: 4.6,
                image_urls: vec![],
                seller_name: "new shop".into(),
            },
            RawListing {
                source_url: format!("https://detail.example.com/offer/{slug}-5.html"),
                title: format!("disney {term}"),
                unit_price: 15.0,
                sales_count: 800,
                seller_rating: 4.7,
                image_urls: vec![],
                seller_name: "character goods".into(),
            },
        ];
        listings.truncate(max_results as usize);
        Ok(listings)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_range_string_takes_higher_bound() {
        assert_eq!(parse_price(&json!("8.5-12.0")), 12.0);
        assert_eq!(parse_price(&json!("8.5~12.0")), 12.0);
        assert_eq!(parse_price(&json!("¥3,999.50")), 3999.5);
        assert_eq!(parse_price(&json!(7.25)), 7.25);
        assert_eq!(parse_price(&json!({"min": 5.0, "max": 9.0})), 9.0);
        assert_eq!(parse_price(&json!(null)), 0.0);
    }

    #[test]
    fn sales_strings_with_suffixes_parse() {
        assert_eq!(parse_sales(&json!("1,234")), 1234);
        assert_eq!(parse_sales(&json!("500+")), 500);
        assert_eq!(parse_sales(&json!("2k")), 2000);
        assert_eq!(parse_sales(&json!("3万")), 30_000);
        assert_eq!(parse_sales(&json!(77)), 77);
        assert_eq!(parse_sales(&json!("n/a")), 0);
    }

    #[test]
    fn wholesale_normalize_requires_a_url() {
        let with_url = json!({
            "detailUrl": "https://detail.example.com/offer/1.html",
            "priceRange": "10-14",
            "monthSales": "2k",
            "supplierRating": "4.6",
            "mainImage": "https://img.example.com/1.jpg",
            "supplierName": "factory"
        });
        let listing = WholesaleSearchProvider::normalize(&with_url).unwrap();
        assert_eq!(listing.unit_price, 14.0);
        assert_eq!(listing.sales_count, 2000);
        assert_eq!(listing.seller_rating, 4.6);
        assert_eq!(listing.image_urls, vec!["https://img.example.com/1.jpg".to_string()]);

        let without_url = json!({"price": 10.0});
        assert!(WholesaleSearchProvider::normalize(&without_url).is_none());
    }

    #[tokio::test]
    async fn chain_falls_through_failing_and_empty_providers() {
        struct Failing;
        #[async_trait]
        impl SearchProvider for Failing {
            async fn search(&self, _: &str, _: u32) -> anyhow::Result<Vec<RawListing>> {
                anyhow::bail!("actor quota exceeded")
            }
            fn name(&self) -> &str {
                "failing"
            }
        }
        struct Empty;
        #[async_trait]
        impl SearchProvider for Empty {
            async fn search(&self, _: &str, _: u32) -> anyhow::Result<Vec<RawListing>> {
                Ok(Vec::new())
            }
            fn name(&self) -> &str {
                "empty"
            }
        }

        let chain = ProviderChain::new(vec![
            Arc::new(Failing),
            Arc::new(Empty),
            Arc::new(MockSearchProvider),
        ]);
        let listings = chain.search("desk organizer", 10).await.unwrap();
        assert!(!listings.is_empty());

        let all_failing = ProviderChain::new(vec![Arc::new(Failing)]);
        let listings = all_failing.search("desk organizer", 10).await.unwrap();
        assert!(listings.is_empty());
    }

    #[tokio::test]
    async fn mock_provider_respects_max_results() {
        let listings = MockSearchProvider.search("laptop stand", 2).await.unwrap();
        assert_eq!(listings.len(), 2);
    }
}
