use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters accumulated across one pipeline run, logged as a summary at
/// the end and serializable for operational records.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub discovery_started_at: Option<DateTime<Utc>>,
    pub discovery_finished_at: Option<DateTime<Utc>>,
    pub keywords_processed: u32,
    pub listings_found: u32,
    pub listings_filtered: u32,
    pub high_risk_dropped: u32,
    pub duplicates_skipped: u32,
    pub candidates_discovered: u32,

    pub enrichment_started_at: Option<DateTime<Utc>>,
    pub enrichment_finished_at: Option<DateTime<Utc>>,
    pub candidates_enriched: u32,
    /// Enriched candidates at or above the qualifying margin. Stats
    /// only: qualification never changes candidate status.
    pub candidates_qualified: u32,
    pub candidates_rejected: u32,

    pub budget_spent: u64,
    /// The run stopped early (stop flag or fatal repository failure).
    pub aborted: bool,
    pub errors: Vec<String>,
}

impl RunStats {
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "keywords={} found={} filtered={} high_risk={} dupes={} discovered={} \
             enriched={} qualified={} rejected={} budget={} errors={}{}",
            self.keywords_processed,
            self.listings_found,
            self.listings_filtered,
            self.high_risk_dropped,
            self.duplicates_skipped,
            self.candidates_discovered,
            self.candidates_enriched,
            self.candidates_qualified,
            self.candidates_rejected,
            self.budget_spent,
            self.errors.len(),
            if self.aborted { " (aborted)" } else { "" },
        )
    }
}
