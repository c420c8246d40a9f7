use std::time::Duration;

use rand::Rng;

/// Where in the run a pause is being taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayContext {
    BetweenKeywords,
    BetweenCandidates,
}

/// Pacing policy between provider-bound operations. A trait so tests can
/// run at full speed while production runs stay polite to the actors'
/// upstream sites.
pub trait DelayPolicy: Send + Sync {
    fn delay(&self, context: DelayContext) -> Duration;
}

/// Base delay per context plus uniform random jitter, so request timing
/// does not look mechanical.
pub struct JitteredDelay {
    pub keyword_base_secs: u64,
    pub candidate_base_secs: u64,
    pub jitter_ms: u64,
}

impl JitteredDelay {
    pub fn new(keyword_base_secs: u64, candidate_base_secs: u64) -> Self {
        Self {
            keyword_base_secs,
            candidate_base_secs,
            jitter_ms: 2000,
        }
    }
}

impl DelayPolicy for JitteredDelay {
    fn delay(&self, context: DelayContext) -> Duration {
        let base_secs = match context {
            DelayContext::BetweenKeywords => self.keyword_base_secs,
            DelayContext::BetweenCandidates => self.candidate_base_secs,
        };
        let jitter = if self.jitter_ms > 0 {
            rand::rng().random_range(0..self.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(base_secs * 1000 + jitter)
    }
}

/// Zero delay everywhere, for tests.
pub struct NoDelay;

impl DelayPolicy for NoDelay {
    fn delay(&self, _context: DelayContext) -> Duration {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jittered_delay_stays_within_bounds() {
        let policy = JitteredDelay::new(5, 3);
        for _ in 0..50 {
            let d = policy.delay(DelayContext::BetweenKeywords);
            assert!(d >= Duration::from_secs(5));
            assert!(d < Duration::from_secs(7));

            let d = policy.delay(DelayContext::BetweenCandidates);
            assert!(d >= Duration::from_secs(3));
            assert!(d < Duration::from_secs(5));
        }
    }

    #[test]
    fn no_delay_is_zero() {
        assert_eq!(NoDelay.delay(DelayContext::BetweenKeywords), Duration::ZERO);
    }
}
