use std::sync::Arc;

use marginscout_common::{config::DiscoveryConfig, RiskTier, SourcingCandidate, SourcingKeyword};
use tracing::{debug, info};

use crate::filter::BasicFilter;
use crate::repository::CandidateRepository;
use crate::risk::RiskClassifier;
use crate::search::SearchProvider;
use crate::stats::RunStats;

/// The cheap stage: one provider search per keyword, numeric filtering,
/// a title-only risk pass, exact-URL dedup, then insertion as pending
/// candidates with zeroed enrichment fields.
pub struct DiscoveryStage {
    search: Arc<dyn SearchProvider>,
    repository: Arc<dyn CandidateRepository>,
    filter: BasicFilter,
    classifier: RiskClassifier,
    config: DiscoveryConfig,
}

impl DiscoveryStage {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        repository: Arc<dyn CandidateRepository>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            search,
            repository,
            filter: BasicFilter::new(config.clone()),
            classifier: RiskClassifier::new(),
            config,
        }
    }

    /// Run discovery for one keyword. Returns how many new candidates
    /// were stored. Provider failure propagates; the orchestrator
    /// decides whether the run continues.
    pub async fn discover(
        &self,
        keyword: &SourcingKeyword,
        stats: &mut RunStats,
    ) -> anyhow::Result<u32> {
        let listings = self
            .search
            .search(&keyword.keyword, self.config.search_max_results)
            .await?;
        stats.listings_found += listings.len() as u32;
        debug!(keyword = %keyword.keyword, found = listings.len(), "Search complete");

        let found = listings.len();
        let survivors = self.filter.filter(listings);
        stats.listings_filtered += (found - survivors.len()) as u32;

        let mut discovered = 0u32;
        for listing in survivors.into_iter().take(self.config.max_listings_per_keyword) {
            // Title-only risk pass. Danger is dropped outright; warning
            // is kept with its reasons so a reviewer sees the flags.
            let (tier, reasons) = self.classifier.classify(&listing.title);
            if tier == RiskTier::Danger {
                debug!(url = %listing.source_url, ?reasons, "High-risk listing dropped");
                stats.high_risk_dropped += 1;
                continue;
            }

            if self.repository.exists_by_url(&listing.source_url).await? {
                stats.duplicates_skipped += 1;
                continue;
            }

            let candidate = SourcingCandidate::from_listing(&listing, keyword, tier, reasons);
            self.repository.add_candidate(&candidate).await?;
            discovered += 1;
        }

        stats.candidates_discovered += discovered;
        info!(keyword = %keyword.keyword, discovered, "Keyword discovery finished");
        Ok(discovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{CandidateFilter, MemoryRepository};
    use crate::search::MockSearchProvider;
    use marginscout_common::CandidateStatus;

    fn stage(repository: Arc<MemoryRepository>) -> DiscoveryStage {
        DiscoveryStage::new(
            Arc::new(MockSearchProvider),
            repository,
            DiscoveryConfig::default(),
        )
    }

    #[tokio::test]
    async fn discovery_filters_screens_and_stores_pending_candidates() {
        let repository = Arc::new(MemoryRepository::new());
        let stage = stage(repository.clone());
        let keyword = SourcingKeyword::new("desk organizer", "office", 1);
        let mut stats = RunStats::default();

        let discovered = stage.discover(&keyword, &mut stats).await.unwrap();

        // Mock emits 5: two pass, one too cheap, one low sales, one brand-term.
        assert_eq!(discovered, 2);
        assert_eq!(stats.listings_found, 5);
        assert_eq!(stats.listings_filtered, 2);
        assert_eq!(stats.high_risk_dropped, 1);
        assert_eq!(stats.duplicates_skipped, 0);

        let stored = repository.get_candidates(&CandidateFilter::default()).await.unwrap();
        assert_eq!(stored.len(), 2);
        for candidate in &stored {
            assert_eq!(candidate.status, CandidateStatus::Pending);
            assert!(!candidate.is_enriched());
            assert_eq!(candidate.keyword_id, keyword.id);
        }
    }

    #[tokio::test]
    async fn rerun_skips_already_known_urls() {
        let repository = Arc::new(MemoryRepository::new());
        let stage = stage(repository.clone());
        let keyword = SourcingKeyword::new("desk organizer", "office", 1);

        let mut first = RunStats::default();
        stage.discover(&keyword, &mut first).await.unwrap();
        let mut second = RunStats::default();
        let discovered = stage.discover(&keyword, &mut second).await.unwrap();

        assert_eq!(discovered, 0);
        assert_eq!(second.duplicates_skipped, 2);
        let stored = repository.get_candidates(&CandidateFilter::default()).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn per_keyword_candidate_cap_is_enforced() {
        let repository = Arc::new(MemoryRepository::new());
        let config = DiscoveryConfig {
            max_listings_per_keyword: 1,
            ..DiscoveryConfig::default()
        };
        let stage = DiscoveryStage::new(Arc::new(MockSearchProvider), repository.clone(), config);
        let keyword = SourcingKeyword::new("cable organizer", "office", 2);

        let mut stats = RunStats::default();
        let discovered = stage.discover(&keyword, &mut stats).await.unwrap();
        assert_eq!(discovered, 1);
    }
}
