use chrono::{DateTime, Duration, Utc};
use marginscout_common::{config::SchedulerConfig, SourcingKeyword};
use tracing::debug;

/// Picks which keywords a discovery run attempts, and in what order.
///
/// Policy: stale keywords (never attempted, or last attempted outside the
/// freshness window) always come before fresh ones; within each group,
/// priority ascending (1 is most important). Sorting is stable, so equal
/// priorities keep their input order.
#[derive(Debug, Clone)]
pub struct KeywordScheduler {
    config: SchedulerConfig,
}

impl KeywordScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn select(
        &self,
        keywords: &[SourcingKeyword],
        max_n: usize,
        now: DateTime<Utc>,
    ) -> Vec<SourcingKeyword> {
        let cutoff = now - Duration::hours(self.config.freshness_window_hours);

        let mut stale: Vec<SourcingKeyword> = Vec::new();
        let mut fresh: Vec<SourcingKeyword> = Vec::new();
        for keyword in keywords.iter().filter(|k| k.active) {
            match keyword.last_attempted_at {
                Some(at) if at >= cutoff => fresh.push(keyword.clone()),
                _ => stale.push(keyword.clone()),
            }
        }

        stale.sort_by_key(|k| k.priority);
        fresh.sort_by_key(|k| k.priority);

        let mut selected = stale;
        selected.extend(fresh);
        selected.truncate(max_n);
        debug!(selected = selected.len(), max_n, "Keywords scheduled");
        selected
    }

    /// Bootstrap set used when the repository holds no active keywords.
    /// Small, low-competition home/office items that ship compactly.
    pub fn seed_keywords() -> Vec<SourcingKeyword> {
        vec![
            SourcingKeyword::new("desk organizer", "office", 1),
            SourcingKeyword::new("monitor stand with drawer", "office", 1),
            SourcingKeyword::new("cable organizer box", "office", 2),
            SourcingKeyword::new("drawer divider", "household", 2),
            SourcingKeyword::new("foldable storage box", "household", 3),
            SourcingKeyword::new("bathroom shelf", "household", 3),
            SourcingKeyword::new("laptop stand", "office", 4),
            SourcingKeyword::new("shoe storage rack", "household", 5),
        ]
    }
}
