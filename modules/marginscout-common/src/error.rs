use thiserror::Error;

/// The two failure classes the pipeline actually distinguishes:
/// provider errors degrade (fallback chain, empty result, fallback
/// pricing) while repository errors are per-item failures except when
/// the store is unreachable outright.
#[derive(Error, Debug)]
pub enum SourcingError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Repository error: {0}")]
    Repository(String),
}
