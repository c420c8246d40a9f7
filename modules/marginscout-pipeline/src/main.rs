use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use apify_client::ApifyClient;
use tracing::info;

use marginscout_common::{
    config::{CostConfig, DiscoveryConfig, EnrichmentConfig},
    telemetry, Config,
};
use marginscout_pipeline::{
    delay::JitteredDelay,
    discovery::DiscoveryStage,
    enrichment::EnrichmentStage,
    repository::{CandidateRepository, JsonRepository},
    research::{ApifyMarketResearch, MarketResearch, MockMarketResearch},
    scheduling::RunBudget,
    search::{
        MockSearchProvider, ProviderChain, RetailSearchProvider, SearchProvider,
        WholesaleSearchProvider,
    },
    LandedCostCalculator, Pipeline,
};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();
    info!("Margin scout starting...");

    let config = Config::from_env();
    let repository: Arc<dyn CandidateRepository> =
        Arc::new(JsonRepository::open(&config.data_dir)?);

    // Without a token the run is fully offline against the mocks, which
    // is the supported dry-run mode.
    let (search, research): (Arc<dyn SearchProvider>, Arc<dyn MarketResearch>) =
        match &config.apify_token {
            Some(token) => {
                let client = Arc::new(ApifyClient::new(token.clone()));
                let chain = ProviderChain::new(vec![
                    Arc::new(WholesaleSearchProvider::new(
                        client.clone(),
                        env_or("MARGINSCOUT_WHOLESALE_ACTOR", "marketplace/wholesale-search"),
                    )),
                    Arc::new(RetailSearchProvider::new(
                        client.clone(),
                        env_or("MARGINSCOUT_RETAIL_ACTOR", "marketplace/retail-search"),
                    )),
                ]);
                let research = ApifyMarketResearch::new(
                    client,
                    env_or("MARGINSCOUT_RESEARCH_ACTOR", "marketplace/market-search"),
                );
                (Arc::new(chain), Arc::new(research))
            }
            None => {
                info!("No Apify token configured, running offline with mock providers");
                (Arc::new(MockSearchProvider), Arc::new(MockMarketResearch))
            }
        };

    let budget_limit = std::env::var("MARGINSCOUT_BUDGET")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);
    let budget = Arc::new(RunBudget::new(budget_limit));

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping after current item");
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    let discovery_config = DiscoveryConfig::default();
    let enrichment_config = EnrichmentConfig::default();
    let pipeline = Pipeline::new(
        DiscoveryStage::new(search, repository.clone(), discovery_config.clone()),
        EnrichmentStage::new(
            research,
            repository.clone(),
            LandedCostCalculator::new(CostConfig::default()),
            enrichment_config.clone(),
        ),
        repository.clone(),
        Arc::new(JitteredDelay::new(
            discovery_config.keyword_delay_secs,
            enrichment_config.candidate_delay_secs,
        )),
        budget,
        stop,
        discovery_config,
        enrichment_config,
    );

    let stats = pipeline.run().await;
    let repo_stats = repository.stats().await?;
    info!(
        total = repo_stats.total_candidates,
        pending = repo_stats.pending,
        avg_margin = format!("{:.3}", repo_stats.avg_pending_margin),
        "Repository after run"
    );
    println!("{stats}");
    Ok(())
}
