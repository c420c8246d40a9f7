use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// --- Enums ---

/// Review lifecycle of a sourcing candidate. Terminal review transitions
/// (approved/rejected) belong to the dashboard; uploaded/failed belong to
/// the publishing step. The pipeline only ever writes `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Pending,
    Approved,
    Rejected,
    Uploaded,
    Failed,
}

/// Compliance / profitability risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Safe,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    Air,
    Sea,
}

// --- Keywords ---

/// A search term the scheduler feeds into discovery. Soft-deactivated,
/// never hard-deleted while candidates reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcingKeyword {
    pub id: Uuid,
    pub keyword: String,
    pub category: String,
    pub active: bool,
    /// 1 = highest, 10 = lowest. Clamped on construction and on load,
    /// so a hand-edited store cannot feed the scheduler an
    /// out-of-range priority.
    #[serde(deserialize_with = "priority_in_range")]
    pub priority: u8,
    pub last_attempted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn priority_in_range<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(u8::deserialize(deserializer)?.clamp(1, 10))
}

impl SourcingKeyword {
    pub fn new(keyword: impl Into<String>, category: impl Into<String>, priority: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            keyword: keyword.into(),
            category: category.into(),
            active: true,
            priority: priority.clamp(1, 10),
            last_attempted_at: None,
            created_at: Utc::now(),
        }
    }
}

// --- Listings ---

/// A normalized wholesale listing from any search provider. Transient:
/// produced by provider adapters, consumed by discovery, never persisted
/// as-is. Each adapter owns the coercion from its vendor's JSON shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RawListing {
    pub source_url: String,
    pub title: String,
    /// Unit price in origin currency. Range prices are reduced to the
    /// higher bound: always plan against the worse case.
    pub unit_price: f64,
    pub sales_count: u32,
    pub seller_rating: f64,
    pub image_urls: Vec<String>,
    pub seller_name: String,
}

// --- Candidates ---

/// The central entity: a listing that survived discovery, frozen at
/// discovery time and scored in place by enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcingCandidate {
    pub id: Uuid,

    // Frozen at discovery
    pub source_url: String,
    pub source_title: String,
    pub source_price: f64,
    pub source_images: Vec<String>,
    pub source_seller_name: String,
    pub source_seller_rating: f64,
    pub source_sales_count: u32,

    // Filled exactly once by enrichment; zero/empty until then.
    pub localized_title: String,
    /// Estimated landed cost in local currency.
    pub landed_cost: i64,
    /// Margin rate at the recommended price. Exactly 0.0 marks
    /// "not yet enriched" — the enrichment idempotency guard.
    pub margin_rate: f64,
    pub recommended_price: i64,
    pub breakeven_price: i64,
    pub competitor_min_price: i64,
    pub competitor_avg_price: i64,
    pub competitor_max_price: i64,
    pub competitor_count: u32,

    pub risk_tier: RiskTier,
    pub risk_reasons: Vec<String>,

    // Review / publish lifecycle (written by out-of-scope layers)
    pub status: CandidateStatus,
    pub rejected_reason: String,
    pub approved_at: Option<DateTime<Utc>>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub listing_id: String,
    pub listing_url: String,

    // Back-reference to the keyword that produced this candidate
    pub keyword_id: Uuid,
    pub keyword: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SourcingCandidate {
    /// Freeze a listing into a pending candidate with zeroed enrichment
    /// fields. The cheap title-only risk pass is recorded here so a
    /// reviewer sees why a warning-tier listing was kept.
    pub fn from_listing(
        listing: &RawListing,
        keyword: &SourcingKeyword,
        risk_tier: RiskTier,
        risk_reasons: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            source_url: listing.source_url.clone(),
            source_title: listing.title.clone(),
            source_price: listing.unit_price,
            source_images: listing.image_urls.clone(),
            source_seller_name: listing.seller_name.clone(),
            source_seller_rating: listing.seller_rating,
            source_sales_count: listing.sales_count,
            localized_title: String::new(),
            landed_cost: 0,
            margin_rate: 0.0,
            recommended_price: 0,
            breakeven_price: 0,
            competitor_min_price: 0,
            competitor_avg_price: 0,
            competitor_max_price: 0,
            competitor_count: 0,
            risk_tier,
            risk_reasons,
            status: CandidateStatus::Pending,
            rejected_reason: String::new(),
            approved_at: None,
            uploaded_at: None,
            listing_id: String::new(),
            listing_url: String::new(),
            keyword_id: keyword.id,
            keyword: keyword.keyword.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Enrichment eligibility marker: a candidate with a non-zero margin
    /// rate has already been scored and must not re-charge providers.
    pub fn is_enriched(&self) -> bool {
        self.margin_rate != 0.0
    }
}

// --- Cost model output ---

/// Eleven named cost components. `total()` is the invariant sum the
/// cost model reports as total landed cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Origin unit cost converted to local currency.
    pub origin_cost: i64,
    /// Domestic-leg shipping on the origin side (factory → agent).
    pub origin_shipping: i64,
    pub agent_fee: i64,
    pub tariff: i64,
    pub vat: i64,
    pub international_shipping: i64,
    /// Final-mile carrier fee on the destination side.
    pub final_mile_shipping: i64,
    pub marketplace_commission: i64,
    /// Return / customer-service reserve.
    pub return_reserve: i64,
    pub advertising_reserve: i64,
    pub packaging: i64,
}

impl CostBreakdown {
    pub fn total(&self) -> i64 {
        self.origin_cost
            + self.origin_shipping
            + self.agent_fee
            + self.tariff
            + self.vat
            + self.international_shipping
            + self.final_mile_shipping
            + self.marketplace_commission
            + self.return_reserve
            + self.advertising_reserve
            + self.packaging
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_priority_clamped_to_valid_range() {
        assert_eq!(SourcingKeyword::new("desk organizer", "home", 0).priority, 1);
        assert_eq!(SourcingKeyword::new("desk organizer", "home", 7).priority, 7);
        assert_eq!(SourcingKeyword::new("desk organizer", "home", 99).priority, 10);
    }

    #[test]
    fn loaded_priority_is_clamped_to_valid_range() {
        let keyword = SourcingKeyword::new("desk organizer", "home", 5);
        let mut value = serde_json::to_value(&keyword).unwrap();

        value["priority"] = serde_json::json!(0);
        let loaded: SourcingKeyword = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(loaded.priority, 1);

        value["priority"] = serde_json::json!(200);
        let loaded: SourcingKeyword = serde_json::from_value(value).unwrap();
        assert_eq!(loaded.priority, 10);
    }

    #[test]
    fn candidate_from_listing_starts_unenriched_and_pending() {
        let keyword = SourcingKeyword::new("cable organizer", "office", 3);
        let listing = RawListing {
            source_url: "https://detail.example.com/offer/1.html".into(),
            title: "cable organizer box".into(),
            unit_price: 12.5,
            sales_count: 340,
            seller_rating: 4.7,
            image_urls: vec!["https://img.example.com/1.jpg".into()],
            seller_name: "factory one".into(),
        };
        let candidate =
            SourcingCandidate::from_listing(&listing, &keyword, RiskTier::Safe, vec![]);

        assert_eq!(candidate.status, CandidateStatus::Pending);
        assert!(!candidate.is_enriched());
        assert_eq!(candidate.landed_cost, 0);
        assert_eq!(candidate.recommended_price, 0);
        assert_eq!(candidate.keyword_id, keyword.id);
        assert_eq!(candidate.source_price, 12.5);
    }

    #[test]
    fn breakdown_total_is_sum_of_all_components() {
        let breakdown = CostBreakdown {
            origin_cost: 1,
            origin_shipping: 2,
            agent_fee: 3,
            tariff: 4,
            vat: 5,
            international_shipping: 6,
            final_mile_shipping: 7,
            marketplace_commission: 8,
            return_reserve: 9,
            advertising_reserve: 10,
            packaging: 11,
        };
        assert_eq!(breakdown.total(), 66);
    }
}
