use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use marginscout_common::{CandidateStatus, SourcingCandidate, SourcingError, SourcingKeyword};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Query shape for candidate listings. All fields optional and ANDed.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub status: Option<CandidateStatus>,
    pub keyword_id: Option<Uuid>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Aggregate counts surfaced to run logs and the review dashboard.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepositoryStats {
    pub total_candidates: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub uploaded: usize,
    pub failed: usize,
    /// Mean margin rate over enriched pending candidates.
    pub avg_pending_margin: f64,
    pub keywords: usize,
}

/// Persistence seam for keywords and candidates. Both implementations
/// upsert by id; candidate listings come back sorted by margin rate
/// descending so reviewers see the best prospects first.
#[async_trait]
pub trait CandidateRepository: Send + Sync {
    async fn add_keyword(&self, keyword: &SourcingKeyword) -> anyhow::Result<()>;
    async fn update_keyword(&self, keyword: &SourcingKeyword) -> anyhow::Result<()>;
    async fn get_keywords(&self, active_only: bool) -> anyhow::Result<Vec<SourcingKeyword>>;

    async fn add_candidate(&self, candidate: &SourcingCandidate) -> anyhow::Result<()>;
    /// Stamps `updated_at` on the stored copy.
    async fn update_candidate(&self, candidate: &SourcingCandidate) -> anyhow::Result<()>;
    async fn get_candidate(&self, id: Uuid) -> anyhow::Result<Option<SourcingCandidate>>;
    async fn get_candidates(&self, filter: &CandidateFilter)
        -> anyhow::Result<Vec<SourcingCandidate>>;
    /// Exact-URL dedup check used by discovery before inserting.
    async fn exists_by_url(&self, source_url: &str) -> anyhow::Result<bool>;

    async fn stats(&self) -> anyhow::Result<RepositoryStats>;
}

fn apply_filter(
    mut candidates: Vec<SourcingCandidate>,
    filter: &CandidateFilter,
) -> Vec<SourcingCandidate> {
    if let Some(status) = filter.status {
        candidates.retain(|c| c.status == status);
    }
    if let Some(keyword_id) = filter.keyword_id {
        candidates.retain(|c| c.keyword_id == keyword_id);
    }
    candidates.sort_by(|a, b| {
        b.margin_rate
            .partial_cmp(&a.margin_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let offset = filter.offset.unwrap_or(0);
    let candidates: Vec<_> = candidates.into_iter().skip(offset).collect();
    match filter.limit {
        Some(limit) => candidates.into_iter().take(limit).collect(),
        None => candidates,
    }
}

fn compute_stats(
    keywords: &HashMap<Uuid, SourcingKeyword>,
    candidates: &HashMap<Uuid, SourcingCandidate>,
) -> RepositoryStats {
    let mut stats = RepositoryStats {
        total_candidates: candidates.len(),
        keywords: keywords.len(),
        ..Default::default()
    };
    let mut margin_sum = 0.0;
    let mut enriched_pending = 0usize;
    for candidate in candidates.values() {
        match candidate.status {
            CandidateStatus::Pending => {
                stats.pending += 1;
                if candidate.is_enriched() {
                    margin_sum += candidate.margin_rate;
                    enriched_pending += 1;
                }
            }
            CandidateStatus::Approved => stats.approved += 1,
            CandidateStatus::Rejected => stats.rejected += 1,
            CandidateStatus::Uploaded => stats.uploaded += 1,
            CandidateStatus::Failed => stats.failed += 1,
        }
    }
    if enriched_pending > 0 {
        stats.avg_pending_margin = margin_sum / enriched_pending as f64;
    }
    stats
}

// --- In-memory ---

/// Map-backed repository for tests and dry runs.
#[derive(Default)]
pub struct MemoryRepository {
    keywords: RwLock<HashMap<Uuid, SourcingKeyword>>,
    candidates: RwLock<HashMap<Uuid, SourcingCandidate>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CandidateRepository for MemoryRepository {
    async fn add_keyword(&self, keyword: &SourcingKeyword) -> anyhow::Result<()> {
        self.keywords.write().await.insert(keyword.id, keyword.clone());
        Ok(())
    }

    async fn update_keyword(&self, keyword: &SourcingKeyword) -> anyhow::Result<()> {
        self.keywords.write().await.insert(keyword.id, keyword.clone());
        Ok(())
    }

    async fn get_keywords(&self, active_only: bool) -> anyhow::Result<Vec<SourcingKeyword>> {
        let keywords = self.keywords.read().await;
        let mut out: Vec<_> = keywords
            .values()
            .filter(|k| !active_only || k.active)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn add_candidate(&self, candidate: &SourcingCandidate) -> anyhow::Result<()> {
        self.candidates
            .write()
            .await
            .insert(candidate.id, candidate.clone());
        Ok(())
    }

    async fn update_candidate(&self, candidate: &SourcingCandidate) -> anyhow::Result<()> {
        let mut stored = candidate.clone();
        stored.updated_at = Utc::now();
        self.candidates.write().await.insert(stored.id, stored);
        Ok(())
    }

    async fn get_candidate(&self, id: Uuid) -> anyhow::Result<Option<SourcingCandidate>> {
        Ok(self.candidates.read().await.get(&id).cloned())
    }

    async fn get_candidates(
        &self,
        filter: &CandidateFilter,
    ) -> anyhow::Result<Vec<SourcingCandidate>> {
        let candidates = self.candidates.read().await.values().cloned().collect();
        Ok(apply_filter(candidates, filter))
    }

    async fn exists_by_url(&self, source_url: &str) -> anyhow::Result<bool> {
        Ok(self
            .candidates
            .read()
            .await
            .values()
            .any(|c| c.source_url == source_url))
    }

    async fn stats(&self) -> anyhow::Result<RepositoryStats> {
        let keywords = self.keywords.read().await;
        let candidates = self.candidates.read().await;
        Ok(compute_stats(&keywords, &candidates))
    }
}

// --- JSON files ---

/// File-backed repository: one JSON file each for keywords and
/// candidates, rewritten whole on every mutation. Fine at review-queue
/// scale (hundreds of candidates); the trait is the seam to swap in a
/// real database when that stops being true.
///
/// Dedup is exact-URL only — the same product relisted under a different
/// URL is not caught here.
pub struct JsonRepository {
    keywords_path: PathBuf,
    candidates_path: PathBuf,
    keywords: RwLock<HashMap<Uuid, SourcingKeyword>>,
    candidates: RwLock<HashMap<Uuid, SourcingCandidate>>,
}

impl JsonRepository {
    pub fn open(data_dir: &Path) -> Result<Self, SourcingError> {
        std::fs::create_dir_all(data_dir).map_err(|e| {
            SourcingError::Repository(format!("cannot create {}: {e}", data_dir.display()))
        })?;
        let keywords_path = data_dir.join("keywords.json");
        let candidates_path = data_dir.join("candidates.json");

        let keywords: Vec<SourcingKeyword> = Self::load(&keywords_path);
        let candidates: Vec<SourcingCandidate> = Self::load(&candidates_path);
        debug!(
            keywords = keywords.len(),
            candidates = candidates.len(),
            dir = %data_dir.display(),
            "Repository loaded"
        );

        Ok(Self {
            keywords_path,
            candidates_path,
            keywords: RwLock::new(keywords.into_iter().map(|k| (k.id, k)).collect()),
            candidates: RwLock::new(candidates.into_iter().map(|c| (c.id, c)).collect()),
        })
    }

    /// Missing or corrupt files load as empty rather than failing the
    /// run; a corrupt file is logged and will be overwritten on the next
    /// mutation.
    fn load<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Corrupt repository file, starting empty");
                Vec::new()
            }),
            Err(_) => Vec::new(),
        }
    }

    fn persist<T: Serialize>(path: &Path, values: Vec<&T>) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(&values)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    async fn persist_keywords(&self) -> anyhow::Result<()> {
        let keywords = self.keywords.read().await;
        Self::persist(&self.keywords_path, keywords.values().collect())
    }

    async fn persist_candidates(&self) -> anyhow::Result<()> {
        let candidates = self.candidates.read().await;
        Self::persist(&self.candidates_path, candidates.values().collect())
    }
}

#[async_trait]
impl CandidateRepository for JsonRepository {
    async fn add_keyword(&self, keyword: &SourcingKeyword) -> anyhow::Result<()> {
        self.keywords.write().await.insert(keyword.id, keyword.clone());
        self.persist_keywords().await
    }

    async fn update_keyword(&self, keyword: &SourcingKeyword) -> anyhow::Result<()> {
        self.keywords.write().await.insert(keyword.id, keyword.clone());
        self.persist_keywords().await
    }

    async fn get_keywords(&self, active_only: bool) -> anyhow::Result<Vec<SourcingKeyword>> {
        let keywords = self.keywords.read().await;
        let mut out: Vec<_> = keywords
            .values()
            .filter(|k| !active_only || k.active)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn add_candidate(&self, candidate: &SourcingCandidate) -> anyhow::Result<()> {
        self.candidates
            .write()
            .await
            .insert(candidate.id, candidate.clone());
        self.persist_candidates().await
    }

    async fn update_candidate(&self, candidate: &SourcingCandidate) -> anyhow::Result<()> {
        let mut stored = candidate.clone();
        stored.updated_at = Utc::now();
        self.candidates.write().await.insert(stored.id, stored);
        self.persist_candidates().await
    }

    async fn get_candidate(&self, id: Uuid) -> anyhow::Result<Option<SourcingCandidate>> {
        Ok(self.candidates.read().await.get(&id).cloned())
    }

    async fn get_candidates(
        &self,
        filter: &CandidateFilter,
    ) -> anyhow::Result<Vec<SourcingCandidate>> {
        let candidates = self.candidates.read().await.values().cloned().collect();
        Ok(apply_filter(candidates, filter))
    }

    async fn exists_by_url(&self, source_url: &str) -> anyhow::Result<bool> {
        Ok(self
            .candidates
            .read()
            .await
            .values()
            .any(|c| c.source_url == source_url))
    }

    async fn stats(&self) -> anyhow::Result<RepositoryStats> {
        let keywords = self.keywords.read().await;
        let candidates = self.candidates.read().await;
        Ok(compute_stats(&keywords, &candidates))
    }
}
