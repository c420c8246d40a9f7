use std::sync::Arc;

use marginscout_common::{config::EnrichmentConfig, ShippingMethod, SourcingCandidate};
use tracing::{debug, info, warn};

use crate::cost::{CostInput, LandedCostCalculator};
use crate::repository::CandidateRepository;
use crate::research::{MarketResearch, MarketSnapshot};
use crate::stats::RunStats;

/// Title suffixes cycled deterministically per candidate so re-listing
/// the same catalog does not produce identical titles everywhere.
const TITLE_SUFFIXES: &[&str] = &["multi-purpose", "premium", "compact", "space-saving"];

/// The expensive stage: one market-research call per candidate, then the
/// full landed-cost model at the recommended price. Scores the candidate
/// in place and persists it once.
pub struct EnrichmentStage {
    research: Arc<dyn MarketResearch>,
    repository: Arc<dyn CandidateRepository>,
    calculator: LandedCostCalculator,
    config: EnrichmentConfig,
}

impl EnrichmentStage {
    pub fn new(
        research: Arc<dyn MarketResearch>,
        repository: Arc<dyn CandidateRepository>,
        calculator: LandedCostCalculator,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            research,
            repository,
            calculator,
            config,
        }
    }

    /// Enrich one candidate. Ok(false) means it was already enriched and
    /// no provider call was made. Research failure does not fail the
    /// candidate: the deterministic price fallback keeps every field
    /// populated.
    pub async fn enrich(
        &self,
        candidate: &mut SourcingCandidate,
        stats: &mut RunStats,
    ) -> anyhow::Result<bool> {
        if candidate.is_enriched() {
            debug!(id = %candidate.id, "Candidate already enriched, skipping");
            return Ok(false);
        }

        let snapshot = match self
            .research
            .research(&candidate.keyword, self.config.research_max_results)
            .await
        {
            Ok(s) if s.recommended_price > 0 => Some(s),
            Ok(s) => {
                warn!(id = %candidate.id, rec = s.recommended_price, "Research returned no usable price, using fallback");
                None
            }
            Err(e) => {
                warn!(id = %candidate.id, error = %e, "Market research failed, using fallback");
                stats.record_error(format!("research failed for {}: {e}", candidate.id));
                None
            }
        };

        let snapshot = snapshot.unwrap_or_else(|| {
            let fallback = (candidate.source_price
                * self.calculator.config().exchange_rate
                * self.config.fallback_price_multiplier) as i64;
            MarketSnapshot {
                competitor_count: 0,
                price_min: 0,
                price_avg: 0,
                price_max: 0,
                recommended_price: fallback,
            }
        });

        let category = infer_category(&candidate.keyword);
        let result = self.calculator.calculate(&CostInput {
            unit_price: candidate.source_price,
            weight_kg: self.config.assumed_weight_kg,
            box_cm: self.config.assumed_box_cm,
            category,
            target_price: snapshot.recommended_price,
            marketplace: &self.config.marketplace,
            shipping: ShippingMethod::Air,
            include_advertising: true,
        });

        candidate.localized_title = localized_title(candidate);
        candidate.landed_cost = result.total_cost;
        candidate.recommended_price = snapshot.recommended_price;
        candidate.breakeven_price = result.breakeven_price;
        candidate.competitor_min_price = snapshot.price_min;
        candidate.competitor_avg_price = snapshot.price_avg;
        candidate.competitor_max_price = snapshot.price_max;
        candidate.competitor_count = snapshot.competitor_count;
        // A margin of exactly 0.0 would read as "not yet enriched";
        // nudge it so the idempotency guard holds.
        candidate.margin_rate = if result.margin_rate == 0.0 {
            f64::EPSILON
        } else {
            result.margin_rate
        };
        // Compliance tier from discovery can only be escalated, never
        // cleared, by a bad margin.
        if result.risk_tier > candidate.risk_tier {
            candidate.risk_tier = result.risk_tier;
            candidate
                .risk_reasons
                .push("low margin at recommended price".to_string());
        }

        self.repository.update_candidate(candidate).await?;

        stats.candidates_enriched += 1;
        if candidate.margin_rate >= self.config.min_margin_rate {
            stats.candidates_qualified += 1;
        } else {
            stats.candidates_rejected += 1;
        }
        info!(
            id = %candidate.id,
            margin = format!("{:.3}", candidate.margin_rate),
            recommended = candidate.recommended_price,
            tier = ?candidate.risk_tier,
            "Candidate enriched"
        );
        Ok(true)
    }
}

/// Deterministic destination-language title: keyword plus a suffix picked
/// by the candidate id. Real localization belongs to the review UI; this
/// is a working default.
fn localized_title(candidate: &SourcingCandidate) -> String {
    let idx = candidate.id.as_bytes()[0] as usize % TITLE_SUFFIXES.len();
    format!("{} {}", candidate.keyword, TITLE_SUFFIXES[idx])
}

/// Maps keyword text onto the tariff category table. Unknown keywords get
/// a category the cost model will warn about and price at the default
/// tariff rate.
fn infer_category(keyword: &str) -> &'static str {
    let k = keyword.to_lowercase();
    if k.contains("camping") || k.contains("outdoor") {
        "camping"
    } else if k.contains("chair") || k.contains("table") || k.contains("shelf") {
        "furniture"
    } else if k.contains("stand") || k.contains("desk") || k.contains("monitor") {
        "office"
    } else if k.contains("organizer") || k.contains("storage") || k.contains("drawer") {
        "household"
    } else if k.contains("humidifier") || k.contains("lamp") || k.contains("fan") {
        "electronics"
    } else {
        "general"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use crate::research::{FailingMarketResearch, MockMarketResearch};
    use marginscout_common::{
        config::CostConfig, RawListing, RiskTier, SourcingKeyword,
    };

    fn pending_candidate() -> SourcingCandidate {
        let keyword = SourcingKeyword::new("foldable storage box", "household", 2);
        let listing = RawListing {
            source_url: "https://detail.example.com/offer/77.html".into(),
            title: "foldable storage box large".into(),
            unit_price: 12.0,
            sales_count: 900,
            seller_rating: 4.6,
            image_urls: vec![],
            seller_name: "factory".into(),
        };
        SourcingCandidate::from_listing(&listing, &keyword, RiskTier::Safe, vec![])
    }

    fn stage(research: Arc<dyn MarketResearch>, repo: Arc<MemoryRepository>) -> EnrichmentStage {
        EnrichmentStage::new(
            research,
            repo,
            LandedCostCalculator::new(CostConfig::default()),
            EnrichmentConfig::default(),
        )
    }

    #[tokio::test]
    async fn enrichment_populates_every_scored_field() {
        let repo = Arc::new(MemoryRepository::new());
        let stage = stage(Arc::new(MockMarketResearch), repo.clone());
        let mut candidate = pending_candidate();
        repo.add_candidate(&candidate).await.unwrap();
        let mut stats = RunStats::default();

        let did = stage.enrich(&mut candidate, &mut stats).await.unwrap();

        assert!(did);
        assert!(candidate.is_enriched());
        assert_eq!(candidate.recommended_price, 34_650);
        assert_eq!(candidate.competitor_count, 3);
        assert_eq!(candidate.competitor_min_price, 35_000);
        assert!(candidate.landed_cost > 0);
        assert!(candidate.breakeven_price > 0);
        assert!(!candidate.localized_title.is_empty());
        assert_eq!(stats.candidates_enriched, 1);

        // And the scored copy was persisted.
        let stored = repo.get_candidate(candidate.id).await.unwrap().unwrap();
        assert!(stored.is_enriched());
        assert_eq!(stored.recommended_price, 34_650);
    }

    #[tokio::test]
    async fn already_enriched_candidate_is_a_no_op() {
        let repo = Arc::new(MemoryRepository::new());
        let stage = stage(Arc::new(MockMarketResearch), repo.clone());
        let mut candidate = pending_candidate();
        candidate.margin_rate = 0.42;
        candidate.recommended_price = 50_000;
        let mut stats = RunStats::default();

        let did = stage.enrich(&mut candidate, &mut stats).await.unwrap();

        assert!(!did);
        assert_eq!(candidate.recommended_price, 50_000);
        assert_eq!(stats.candidates_enriched, 0);
    }

    #[tokio::test]
    async fn research_failure_falls_back_and_still_fully_scores() {
        let repo = Arc::new(MemoryRepository::new());
        let stage = stage(Arc::new(FailingMarketResearch), repo.clone());
        let mut candidate = pending_candidate();
        repo.add_candidate(&candidate).await.unwrap();
        let mut stats = RunStats::default();

        let did = stage.enrich(&mut candidate, &mut stats).await.unwrap();

        assert!(did);
        assert!(candidate.is_enriched());
        // 12.0 × 195 × 3.0
        assert_eq!(candidate.recommended_price, 7020);
        assert_eq!(candidate.competitor_count, 0);
        assert_eq!(candidate.competitor_avg_price, 0);
        assert!(candidate.landed_cost > 0);
        assert_eq!(stats.errors.len(), 1);
    }

    #[tokio::test]
    async fn bad_margin_escalates_but_never_clears_risk_tier() {
        let repo = Arc::new(MemoryRepository::new());
        // Fallback price of a cheap item is far below landed cost, so the
        // margin tier comes out Danger.
        let stage = stage(Arc::new(FailingMarketResearch), repo.clone());
        let mut candidate = pending_candidate();
        repo.add_candidate(&candidate).await.unwrap();
        let mut stats = RunStats::default();
        stage.enrich(&mut candidate, &mut stats).await.unwrap();

        assert_eq!(candidate.risk_tier, RiskTier::Danger);
        assert!(candidate
            .risk_reasons
            .contains(&"low margin at recommended price".to_string()));
    }

    #[test]
    fn category_inference_maps_keyword_families() {
        assert_eq!(infer_category("camping chair"), "camping");
        assert_eq!(infer_category("desk organizer"), "office");
        assert_eq!(infer_category("drawer divider"), "household");
        assert_eq!(infer_category("mystery gadget"), "general");
    }
}
