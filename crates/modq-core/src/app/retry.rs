//! Retry policy: budget and cooldown between attempts.

use std::time::Duration;

/// Retry policy for failed moderation requests.
///
/// The initial attempt counts as the first slot of the budget, so with
/// `max_attempts = 3` the worker tries once, retries twice, and dead-letters
/// with `retry_count == 3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the initial one (N).
    pub max_attempts: u32,

    /// Fixed pause before every retry. Throttles load on the scoring backend.
    pub cooldown: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// `max_attempts` is raised to 1: the initial attempt always runs.
    pub fn new(max_attempts: u32, cooldown: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            cooldown,
        }
    }

    /// Whether another retry may run after `retry_count` attempts.
    pub fn has_budget(&self, retry_count: u32) -> bool {
        retry_count < self.max_attempts
    }

    /// Delay before the next attempt. Fixed, not a backoff.
    pub fn next_delay(&self, _retry_count: u32) -> Duration {
        self.cooldown
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_policy_matches_budget_of_three() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.cooldown, Duration::ZERO);
    }

    #[rstest]
    #[case::after_initial_failure(1, true)]
    #[case::after_first_retry(2, true)]
    #[case::exhausted(3, false)]
    #[case::past_budget(4, false)]
    fn budget_allows_n_minus_one_retries(#[case] retry_count: u32, #[case] expected: bool) {
        assert_eq!(RetryPolicy::default().has_budget(retry_count), expected);
    }

    #[test]
    fn zero_budget_is_raised_to_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
        assert!(!policy.has_budget(1));
    }

    #[test]
    fn cooldown_is_fixed() {
        let policy = RetryPolicy::new(5, Duration::from_millis(250));
        assert_eq!(policy.next_delay(1), Duration::from_millis(250));
        assert_eq!(policy.next_delay(4), Duration::from_millis(250));
    }
}
