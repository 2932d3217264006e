//! Inter-page pacing to stay under exchange rate limits.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Spaces consecutive page fetches by a minimum gap.
///
/// The first acquisition passes immediately; later ones wait out the
/// remainder of the gap.
pub struct PagePacer {
    limiter: DirectRateLimiter,
}

impl PagePacer {
    /// Returns `None` for a zero gap (pacing disabled).
    pub fn new(gap: Duration) -> Option<Self> {
        if gap.is_zero() {
            return None;
        }

        let quota = Quota::with_period(gap)
            .expect("pacing gap is non-zero")
            .allow_burst(NonZeroU32::new(1).expect("burst of one is non-zero"));

        Some(Self {
            limiter: RateLimiter::direct(quota),
        })
    }

    /// Waits until the next page fetch is allowed.
    pub async fn pause(&self) {
        self.limiter.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn zero_gap_disables_pacing() {
        assert!(PagePacer::new(Duration::ZERO).is_none());
    }

    #[tokio::test]
    async fn consecutive_pauses_are_spaced_by_the_gap() {
        let pacer = PagePacer::new(Duration::from_millis(30)).expect("pacer");

        let started = Instant::now();
        pacer.pause().await;
        pacer.pause().await;

        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
