//! Ping/inject handshake between the host and the page runtime

use crate::config::RetryPolicy;
use crate::error::{ChunkError, Result};

/// Something the host can ping and (re)inject a content runtime into
pub trait ContentTarget {
    fn ping(&self) -> Result<()>;
    fn inject(&self) -> Result<()>;
}

/// Ping the target, injecting the runtime after each failed ping.
///
/// Returns the number of attempts used. Attempt `k` that fails waits
/// `policy.delay_after(k)` before the next one.
pub fn ensure_reachable<T: ContentTarget + ?Sized>(target: &T, policy: &RetryPolicy) -> Result<u32> {
    let mut last_error = String::from("no attempts made");

    for attempt in 1..=policy.max_attempts {
        match target.ping() {
            Ok(()) => {
                if attempt > 1 {
                    log::debug!("Content runtime reachable after {} attempts", attempt);
                }
                return Ok(attempt);
            }
            Err(e) => {
                log::debug!("Ping attempt {} failed: {}", attempt, e);
                last_error = e.to_string();
            }
        }

        if let Err(e) = target.inject() {
            log::debug!("Injection attempt {} failed: {}", attempt, e);
            last_error = e.to_string();
        }

        if attempt < policy.max_attempts {
            std::thread::sleep(policy.delay_after(attempt));
        }
    }

    Err(ChunkError::Unreachable {
        attempts: policy.max_attempts,
        reason: last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Becomes reachable once injected `needed` times
    struct FlakyTarget {
        needed: u32,
        injected: Cell<u32>,
        pings: Cell<u32>,
    }

    impl FlakyTarget {
        fn new(needed: u32) -> Self {
            Self {
                needed,
                injected: Cell::new(0),
                pings: Cell::new(0),
            }
        }
    }

    impl ContentTarget for FlakyTarget {
        fn ping(&self) -> Result<()> {
            self.pings.set(self.pings.get() + 1);
            if self.injected.get() >= self.needed {
                Ok(())
            } else {
                Err(ChunkError::EvaluationFailed("runtime missing".to_string()))
            }
        }

        fn inject(&self) -> Result<()> {
            self.injected.set(self.injected.get() + 1);
            Ok(())
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
        }
    }

    #[test]
    fn test_reachable_first_try() {
        let target = FlakyTarget::new(0);
        assert_eq!(ensure_reachable(&target, &fast_policy()).unwrap(), 1);
        assert_eq!(target.injected.get(), 0);
    }

    #[test]
    fn test_reinjection_recovers() {
        let target = FlakyTarget::new(1);
        assert_eq!(ensure_reachable(&target, &fast_policy()).unwrap(), 2);
        assert_eq!(target.injected.get(), 1);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let target = FlakyTarget::new(10);
        let err = ensure_reachable(&target, &fast_policy()).unwrap_err();

        assert!(matches!(err, ChunkError::Unreachable { attempts: 3, .. }));
        assert_eq!(target.pings.get(), 3);
        assert!(err.to_string().contains("runtime missing"));
    }
}
