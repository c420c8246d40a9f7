use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use marginscout_common::{
    config::{DiscoveryConfig, EnrichmentConfig, SchedulerConfig},
    CandidateStatus, SourcingKeyword,
};
use tracing::{error, info, warn};

use crate::delay::{DelayContext, DelayPolicy};
use crate::discovery::DiscoveryStage;
use crate::enrichment::EnrichmentStage;
use crate::repository::{CandidateFilter, CandidateRepository};
use crate::scheduling::{budget::OperationCost, KeywordScheduler, RunBudget};
use crate::stats::RunStats;

/// Drives one full run: schedule keywords, discover, then enrich the
/// pending backlog. Holds the shared stop flag and budget; stages stay
/// unaware of both.
pub struct Pipeline {
    discovery: DiscoveryStage,
    enrichment: EnrichmentStage,
    scheduler: KeywordScheduler,
    repository: Arc<dyn CandidateRepository>,
    delay: Arc<dyn DelayPolicy>,
    budget: Arc<RunBudget>,
    stop: Arc<AtomicBool>,
    discovery_config: DiscoveryConfig,
    enrichment_config: EnrichmentConfig,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        discovery: DiscoveryStage,
        enrichment: EnrichmentStage,
        repository: Arc<dyn CandidateRepository>,
        delay: Arc<dyn DelayPolicy>,
        budget: Arc<RunBudget>,
        stop: Arc<AtomicBool>,
        discovery_config: DiscoveryConfig,
        enrichment_config: EnrichmentConfig,
    ) -> Self {
        Self {
            discovery,
            enrichment,
            scheduler: KeywordScheduler::new(SchedulerConfig::default()),
            repository,
            delay,
            budget,
            stop,
            discovery_config,
            enrichment_config,
        }
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Active keywords, seeding the bootstrap set on an empty repository.
    async fn keywords_for_run(&self) -> anyhow::Result<Vec<SourcingKeyword>> {
        let existing = self.repository.get_keywords(true).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }
        info!("No active keywords, seeding bootstrap set");
        let seeds = KeywordScheduler::seed_keywords();
        for keyword in &seeds {
            self.repository.add_keyword(keyword).await?;
        }
        Ok(seeds)
    }

    pub async fn run_discovery(&self, stats: &mut RunStats) -> anyhow::Result<()> {
        stats.discovery_started_at = Some(Utc::now());

        let keywords = self.keywords_for_run().await?;
        let selected = self.scheduler.select(
            &keywords,
            self.discovery_config.max_keywords_per_run,
            Utc::now(),
        );
        info!(selected = selected.len(), "Discovery starting");

        for (i, mut keyword) in selected.into_iter().enumerate() {
            if self.stopped() {
                info!("Stop requested, ending discovery early");
                stats.aborted = true;
                break;
            }
            if !self.budget.has_budget(OperationCost::SEARCH_CALL) {
                info!("Search budget exhausted, ending discovery early");
                stats.record_error("search budget exhausted".to_string());
                break;
            }
            if i > 0 {
                tokio::time::sleep(self.delay.delay(DelayContext::BetweenKeywords)).await;
            }

            self.budget.spend(OperationCost::SEARCH_CALL);
            match self.discovery.discover(&keyword, stats).await {
                Ok(_) => {
                    // Only a successful attempt consumes staleness; a
                    // failed keyword stays stale and is retried first
                    // next run. The stamp itself is a per-item write,
                    // so its failure is recorded, not fatal.
                    keyword.last_attempted_at = Some(Utc::now());
                    if let Err(e) = self.repository.update_keyword(&keyword).await {
                        warn!(keyword = %keyword.keyword, error = %e, "Failed to stamp keyword, continuing");
                        stats.record_error(format!("keyword stamp '{}': {e}", keyword.keyword));
                    }
                }
                Err(e) => {
                    warn!(keyword = %keyword.keyword, error = %e, "Keyword discovery failed, continuing");
                    stats.record_error(format!("discovery '{}': {e}", keyword.keyword));
                }
            }
            stats.keywords_processed += 1;
        }

        stats.discovery_finished_at = Some(Utc::now());
        Ok(())
    }

    pub async fn run_enrichment(&self, stats: &mut RunStats) -> anyhow::Result<()> {
        stats.enrichment_started_at = Some(Utc::now());

        let pending = self
            .repository
            .get_candidates(&CandidateFilter {
                status: Some(CandidateStatus::Pending),
                ..Default::default()
            })
            .await?;
        let backlog: Vec<_> = pending
            .into_iter()
            .filter(|c| !c.is_enriched())
            .take(self.enrichment_config.max_candidates_per_run)
            .collect();
        info!(backlog = backlog.len(), "Enrichment starting");

        for (i, mut candidate) in backlog.into_iter().enumerate() {
            if self.stopped() {
                info!("Stop requested, ending enrichment early");
                stats.aborted = true;
                break;
            }
            if !self.budget.has_budget(OperationCost::RESEARCH_CALL) {
                info!("Research budget exhausted, ending enrichment early");
                stats.record_error("research budget exhausted".to_string());
                break;
            }
            if i > 0 {
                tokio::time::sleep(self.delay.delay(DelayContext::BetweenCandidates)).await;
            }

            self.budget.spend(OperationCost::RESEARCH_CALL);
            if let Err(e) = self.enrichment.enrich(&mut candidate, stats).await {
                warn!(id = %candidate.id, error = %e, "Enrichment failed, continuing");
                stats.record_error(format!("enrichment {}: {e}", candidate.id));
            }
        }

        stats.enrichment_finished_at = Some(Utc::now());
        Ok(())
    }

    /// One full discovery-then-enrichment run. Stage-level repository
    /// failures abort the run but still return the stats accumulated so
    /// far.
    pub async fn run(&self) -> RunStats {
        let mut stats = RunStats::default();

        if let Err(e) = self.run_discovery(&mut stats).await {
            error!(error = %e, "Discovery aborted");
            stats.record_error(format!("discovery aborted: {e}"));
            stats.aborted = true;
        }
        if !stats.aborted {
            if let Err(e) = self.run_enrichment(&mut stats).await {
                error!(error = %e, "Enrichment aborted");
                stats.record_error(format!("enrichment aborted: {e}"));
                stats.aborted = true;
            }
        }

        stats.budget_spent = self.budget.total_spent();
        info!(%stats, "Run finished");
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::LandedCostCalculator;
    use crate::delay::NoDelay;
    use crate::repository::MemoryRepository;
    use crate::research::MockMarketResearch;
    use crate::repository::{CandidateFilter, RepositoryStats};
    use crate::search::{MockSearchProvider, SearchProvider};
    use async_trait::async_trait;
    use marginscout_common::{config::CostConfig, RawListing, SourcingCandidate};
    use uuid::Uuid;

    fn pipeline(
        repository: Arc<MemoryRepository>,
        budget: Arc<RunBudget>,
        stop: Arc<AtomicBool>,
    ) -> Pipeline {
        pipeline_with(Arc::new(MockSearchProvider), repository, budget, stop)
    }

    fn pipeline_with(
        search: Arc<dyn SearchProvider>,
        repository: Arc<dyn CandidateRepository>,
        budget: Arc<RunBudget>,
        stop: Arc<AtomicBool>,
    ) -> Pipeline {
        let discovery_config = DiscoveryConfig::default();
        let enrichment_config = EnrichmentConfig::default();
        Pipeline::new(
            DiscoveryStage::new(search, repository.clone(), discovery_config.clone()),
            EnrichmentStage::new(
                Arc::new(MockMarketResearch),
                repository.clone(),
                LandedCostCalculator::new(CostConfig::default()),
                enrichment_config.clone(),
            ),
            repository,
            Arc::new(NoDelay),
            budget,
            stop,
            discovery_config,
            enrichment_config,
        )
    }

    #[tokio::test]
    async fn full_run_seeds_discovers_and_enriches() {
        let repository = Arc::new(MemoryRepository::new());
        let pipeline = pipeline(
            repository.clone(),
            Arc::new(RunBudget::unlimited()),
            Arc::new(AtomicBool::new(false)),
        );

        let stats = pipeline.run().await;

        // 8 seed keywords, mock provider yields 2 keepers each.
        assert_eq!(stats.keywords_processed, 8);
        assert_eq!(stats.candidates_discovered, 16);
        assert_eq!(stats.candidates_enriched, 16);
        assert!(!stats.aborted);
        assert_eq!(stats.budget_spent, 8 + 16);

        let repo_stats = repository.stats().await.unwrap();
        assert_eq!(repo_stats.total_candidates, 16);
        assert_eq!(repo_stats.keywords, 8);

        let all = repository.get_candidates(&CandidateFilter::default()).await.unwrap();
        assert!(all.iter().all(|c| c.is_enriched()));

        let keywords = repository.get_keywords(true).await.unwrap();
        assert!(keywords.iter().all(|k| k.last_attempted_at.is_some()));
    }

    #[tokio::test]
    async fn second_run_skips_duplicates_and_enriched_candidates() {
        let repository = Arc::new(MemoryRepository::new());
        let pipeline = pipeline(
            repository.clone(),
            Arc::new(RunBudget::unlimited()),
            Arc::new(AtomicBool::new(false)),
        );

        pipeline.run().await;
        // Rebuild with a fresh budget; keywords are now fresh but still
        // schedule (all equally fresh).
        let pipeline = self::pipeline(
            repository.clone(),
            Arc::new(RunBudget::unlimited()),
            Arc::new(AtomicBool::new(false)),
        );
        let stats = pipeline.run().await;

        assert_eq!(stats.candidates_discovered, 0);
        assert_eq!(stats.duplicates_skipped, 16);
        assert_eq!(stats.candidates_enriched, 0);
        let repo_stats = repository.stats().await.unwrap();
        assert_eq!(repo_stats.total_candidates, 16);
    }

    #[tokio::test]
    async fn stop_flag_aborts_between_items() {
        let repository = Arc::new(MemoryRepository::new());
        let stop = Arc::new(AtomicBool::new(true));
        let pipeline = pipeline(repository.clone(), Arc::new(RunBudget::unlimited()), stop);

        let stats = pipeline.run().await;

        assert!(stats.aborted);
        assert_eq!(stats.keywords_processed, 0);
        assert_eq!(stats.candidates_enriched, 0);
    }

    #[tokio::test]
    async fn budget_exhaustion_stops_spending_without_failing_the_run() {
        let repository = Arc::new(MemoryRepository::new());
        // 3 search calls, then nothing left for enrichment.
        let pipeline = pipeline(
            repository.clone(),
            Arc::new(RunBudget::new(3)),
            Arc::new(AtomicBool::new(false)),
        );

        let stats = pipeline.run().await;

        assert!(!stats.aborted);
        assert_eq!(stats.keywords_processed, 3);
        assert_eq!(stats.candidates_discovered, 6);
        assert_eq!(stats.candidates_enriched, 0);
        assert_eq!(stats.budget_spent, 3);
        assert!(stats.errors.iter().any(|e| e.contains("budget exhausted")));
    }

    struct DownSearchProvider;

    #[async_trait]
    impl SearchProvider for DownSearchProvider {
        async fn search(&self, _: &str, _: u32) -> anyhow::Result<Vec<RawListing>> {
            anyhow::bail!("upstream actor unavailable")
        }
        fn name(&self) -> &str {
            "down"
        }
    }

    #[tokio::test]
    async fn failed_keyword_stays_stale_and_is_retried_next_run() {
        let repository = Arc::new(MemoryRepository::new());
        let pipeline = pipeline_with(
            Arc::new(DownSearchProvider),
            repository.clone(),
            Arc::new(RunBudget::unlimited()),
            Arc::new(AtomicBool::new(false)),
        );

        let stats = pipeline.run().await;

        assert!(!stats.aborted);
        assert_eq!(stats.keywords_processed, 8);
        assert_eq!(stats.errors.len(), 8);
        // No attempt succeeded, so no keyword was stamped: all stay
        // stale and the scheduler picks every one of them up again.
        let keywords = repository.get_keywords(true).await.unwrap();
        assert!(keywords.iter().all(|k| k.last_attempted_at.is_none()));

        let retry = pipeline_with(
            Arc::new(DownSearchProvider),
            repository.clone(),
            Arc::new(RunBudget::unlimited()),
            Arc::new(AtomicBool::new(false)),
        );
        let stats = retry.run().await;
        assert_eq!(stats.keywords_processed, 8);
    }

    /// Repository double whose keyword stamp always fails while every
    /// other operation behaves.
    struct StampFailRepository {
        inner: MemoryRepository,
    }

    #[async_trait]
    impl CandidateRepository for StampFailRepository {
        async fn add_keyword(&self, keyword: &SourcingKeyword) -> anyhow::Result<()> {
            self.inner.add_keyword(keyword).await
        }
        async fn update_keyword(&self, _: &SourcingKeyword) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        async fn get_keywords(&self, active_only: bool) -> anyhow::Result<Vec<SourcingKeyword>> {
            self.inner.get_keywords(active_only).await
        }
        async fn add_candidate(&self, candidate: &SourcingCandidate) -> anyhow::Result<()> {
            self.inner.add_candidate(candidate).await
        }
        async fn update_candidate(&self, candidate: &SourcingCandidate) -> anyhow::Result<()> {
            self.inner.update_candidate(candidate).await
        }
        async fn get_candidate(&self, id: Uuid) -> anyhow::Result<Option<SourcingCandidate>> {
            self.inner.get_candidate(id).await
        }
        async fn get_candidates(
            &self,
            filter: &CandidateFilter,
        ) -> anyhow::Result<Vec<SourcingCandidate>> {
            self.inner.get_candidates(filter).await
        }
        async fn exists_by_url(&self, source_url: &str) -> anyhow::Result<bool> {
            self.inner.exists_by_url(source_url).await
        }
        async fn stats(&self) -> anyhow::Result<RepositoryStats> {
            self.inner.stats().await
        }
    }

    #[tokio::test]
    async fn keyword_stamp_failure_is_recorded_not_fatal() {
        let repository = Arc::new(StampFailRepository {
            inner: MemoryRepository::new(),
        });
        let pipeline = pipeline_with(
            Arc::new(MockSearchProvider),
            repository.clone(),
            Arc::new(RunBudget::unlimited()),
            Arc::new(AtomicBool::new(false)),
        );

        let stats = pipeline.run().await;

        // Every keyword still ran and every candidate was still stored.
        assert!(!stats.aborted);
        assert_eq!(stats.keywords_processed, 8);
        assert_eq!(stats.candidates_discovered, 16);
        assert_eq!(stats.candidates_enriched, 16);
        assert_eq!(
            stats.errors.iter().filter(|e| e.contains("keyword stamp")).count(),
            8
        );
    }
}
