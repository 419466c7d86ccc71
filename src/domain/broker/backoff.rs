//! Reconnect backoff for broker supervisors.

use std::time::Duration;

/// Doubling backoff with an abandon threshold.
///
/// Attempt `n` (starting at 1) waits `initial * 2^(n-1)`. Once that delay
/// would exceed `cap` the broker is considered permanently unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    initial: Duration,
    cap: Duration,
}

impl BackoffPolicy {
    pub fn new(initial: Duration, cap: Duration) -> Self {
        Self { initial, cap }
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }

    pub fn cap(&self) -> Duration {
        self.cap
    }

    /// Delay before reconnect attempt `attempt`, or `None` to abandon.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent)?;
        let delay = self.initial.checked_mul(factor)?;
        (delay <= self.cap).then_some(delay)
    }

    /// Every delay this policy yields before abandoning.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..)
            .map(|attempt| self.delay_for(attempt))
            .take_while(Option::is_some)
            .flatten()
            .collect()
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_doubles_up_to_cap() {
        let secs: Vec<u64> = BackoffPolicy::default()
            .schedule()
            .iter()
            .map(Duration::as_secs)
            .collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16, 32, 64, 128, 256]);
    }

    #[test]
    fn tenth_failure_abandons() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(9), Some(Duration::from_secs(256)));
        assert_eq!(policy.delay_for(10), None);
    }

    #[test]
    fn delay_equal_to_cap_is_allowed() {
        let policy = BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(8));
        assert_eq!(policy.delay_for(4), Some(Duration::from_secs(8)));
        assert_eq!(policy.delay_for(5), None);
    }

    #[test]
    fn huge_attempts_do_not_overflow() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(40), None);
        assert_eq!(policy.delay_for(u32::MAX), None);
    }

    #[test]
    fn millisecond_policies_scale_the_same() {
        let policy = BackoffPolicy::new(Duration::from_millis(5), Duration::from_millis(20));
        assert_eq!(policy.schedule().len(), 3);
    }
}
