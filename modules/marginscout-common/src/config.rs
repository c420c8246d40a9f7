use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Credentials and paths loaded from environment variables. Everything
/// tunable (rates, thresholds, caps) lives in the explicit config structs
/// below and is passed into components, never read ambiently.
#[derive(Debug, Clone)]
pub struct Config {
    /// Apify API token. When absent the pipeline degrades to the
    /// deterministic mock providers.
    pub apify_token: Option<String>,
    /// Directory for the JSON-file repository.
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            apify_token: env::var("APIFY_API_TOKEN").ok().filter(|t| !t.is_empty()),
            data_dir: env::var("MARGINSCOUT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
        }
    }
}

/// Fee schedule and exchange assumptions for the landed-cost model.
/// All monetary fields are in local currency units unless noted.
#[derive(Debug, Clone)]
pub struct CostConfig {
    /// Local currency units per origin currency unit.
    pub exchange_rate: f64,
    pub vat_rate: f64,

    /// Sourcing-agent commission on (origin cost + origin-side shipping).
    pub agent_fee_rate: f64,
    /// Flat domestic-leg shipping on the origin side, per unit.
    pub origin_shipping: i64,

    /// Air freight, per billable kg.
    pub air_rate_per_kg: i64,
    /// Sea freight, per cubic meter.
    pub sea_rate_per_cbm: i64,
    /// Minimum sea freight charge per unit.
    pub sea_minimum_fee: i64,
    /// Final-mile carrier fee per unit.
    pub final_mile_shipping: i64,

    /// Volumetric weight divisor: (L×W×H in cm) / divisor = kg.
    /// 5000 is the conservative forwarder convention; 6000 is the
    /// lenient air-cargo standard.
    pub volumetric_divisor: f64,

    pub return_reserve_rate: f64,
    pub advertising_reserve_rate: f64,
    pub packaging_fee: i64,

    /// Margin below this is danger tier.
    pub danger_margin: f64,
    /// Margin below this (but at or above danger) is warning tier.
    pub warning_margin: f64,

    /// Breakeven/target prices round up to this granularity.
    pub price_granularity: i64,

    /// Category → tariff rate. Unknown categories use `default_tariff_rate`.
    pub tariff_rates: HashMap<String, f64>,
    pub default_tariff_rate: f64,

    /// Marketplace identifier → commission rate on sale price.
    pub commission_rates: HashMap<String, f64>,
    pub default_commission_rate: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        let tariff_rates = HashMap::from([
            ("furniture".to_string(), 0.08),
            ("camping".to_string(), 0.08),
            ("apparel".to_string(), 0.13),
            ("electronics".to_string(), 0.08),
            ("household".to_string(), 0.08),
            ("office".to_string(), 0.08),
        ]);
        let commission_rates = HashMap::from([
            ("smartstore".to_string(), 0.055),
            ("coupang".to_string(), 0.108),
            ("amazon".to_string(), 0.15),
        ]);
        Self {
            exchange_rate: 195.0,
            vat_rate: 0.10,
            agent_fee_rate: 0.10,
            origin_shipping: 3000,
            air_rate_per_kg: 8000,
            sea_rate_per_cbm: 75_000,
            sea_minimum_fee: 6000,
            final_mile_shipping: 3500,
            volumetric_divisor: 5000.0,
            return_reserve_rate: 0.05,
            advertising_reserve_rate: 0.10,
            packaging_fee: 500,
            danger_margin: 0.15,
            warning_margin: 0.30,
            price_granularity: 1000,
            tariff_rates,
            default_tariff_rate: 0.10,
            commission_rates,
            default_commission_rate: 0.055,
        }
    }
}

impl CostConfig {
    /// Tariff rate for a category, falling back to the default for
    /// unknown categories (surfaced by callers as a config warning).
    pub fn tariff_rate(&self, category: &str) -> Option<f64> {
        self.tariff_rates.get(category).copied()
    }

    pub fn commission_rate(&self, marketplace: &str) -> Option<f64> {
        self.commission_rates.get(marketplace).copied()
    }
}

/// Knobs for the cheap discovery stage.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Price band in origin currency. Too cheap implies quality risk,
    /// too expensive implies high order minimums.
    pub min_price: f64,
    pub max_price: f64,
    pub min_sales_count: u32,
    pub min_seller_rating: f64,

    pub max_listings_per_keyword: usize,
    pub max_keywords_per_run: usize,
    /// Base delay between keyword attempts, jittered by the delay policy.
    pub keyword_delay_secs: u64,
    /// Results requested from each provider per search.
    pub search_max_results: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            min_price: 5.0,
            max_price: 200.0,
            min_sales_count: 100,
            min_seller_rating: 4.0,
            max_listings_per_keyword: 30,
            max_keywords_per_run: 10,
            keyword_delay_secs: 5,
            search_max_results: 30,
        }
    }
}

/// Knobs for the expensive enrichment stage.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// Margin rate at or above which a candidate counts as qualified
    /// in run stats. Does not change candidate status.
    pub min_margin_rate: f64,
    pub max_candidates_per_run: usize,
    /// Base delay between candidate enrichments, jittered.
    pub candidate_delay_secs: u64,
    pub research_max_results: u32,
    /// Deterministic fallback when market research fails:
    /// recommended price = origin price × exchange rate × multiplier.
    pub fallback_price_multiplier: f64,
    /// Marketplace the cost model prices against.
    pub marketplace: String,
    /// Physical-spec assumptions for listings without dimensions.
    pub assumed_weight_kg: f64,
    pub assumed_box_cm: (f64, f64, f64),
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            min_margin_rate: 0.25,
            max_candidates_per_run: 20,
            candidate_delay_secs: 3,
            research_max_results: 10,
            fallback_price_multiplier: 3.0,
            marketplace: "smartstore".to_string(),
            assumed_weight_kg: 0.5,
            assumed_box_cm: (30.0, 20.0, 15.0),
        }
    }
}

/// Keyword scheduling policy.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Keywords attempted within this window are "fresh" and yield to
    /// stale ones regardless of priority.
    pub freshness_window_hours: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            freshness_window_hours: 24,
        }
    }
}
