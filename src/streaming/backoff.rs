use std::time::Duration;

/// Linear retry delay: `step * consecutive_failures`, optionally capped
#[derive(Debug, Clone)]
pub struct Backoff {
    step: Duration,
    max: Option<Duration>,
    failures: u32,
}

impl Backoff {
    pub fn linear(step: Duration) -> Self {
        Self {
            step,
            max: None,
            failures: 0,
        }
    }

    /// Cap the delay; `None` lets it grow without bound
    pub fn with_max(mut self, max: Option<Duration>) -> Self {
        self.max = max;
        self
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Delay for the current failure count (zero after a reset)
    pub fn current_delay(&self) -> Duration {
        let delay = self.step.saturating_mul(self.failures);
        match self.max {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    /// Count one more failure and return the delay to wait before retrying
    pub fn record_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.current_delay()
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn grows_one_step_per_failure() {
        let mut backoff = Backoff::linear(Duration::from_secs(1));

        let delays: Vec<_> = (0..3).map(|_| backoff.record_failure()).collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3)
            ]
        );
        assert_eq!(backoff.failures(), 3);
    }

    #[test]
    fn reset_returns_to_zero() {
        let mut backoff = Backoff::linear(Duration::from_secs(1));
        backoff.record_failure();
        backoff.record_failure();

        backoff.reset();

        assert_eq!(backoff.current_delay(), Duration::ZERO);
        assert_eq!(backoff.record_failure(), Duration::from_secs(1));
    }

    #[test]
    fn cap_limits_delay() {
        let mut backoff =
            Backoff::linear(Duration::from_secs(1)).with_max(Some(Duration::from_secs(2)));

        for _ in 0..10 {
            backoff.record_failure();
        }

        assert_eq!(backoff.current_delay(), Duration::from_secs(2));
    }

    #[test]
    fn uncapped_keeps_growing() {
        let mut backoff = Backoff::linear(Duration::from_secs(1)).with_max(None);

        for _ in 0..120 {
            backoff.record_failure();
        }

        assert_eq!(backoff.current_delay(), Duration::from_secs(120));
    }

    proptest! {
        #[test]
        fn delay_never_decreases_between_resets(failures in 1u32..200, cap in proptest::option::of(1u64..60)) {
            let mut backoff = Backoff::linear(Duration::from_millis(1000))
                .with_max(cap.map(Duration::from_secs));

            let mut previous = Duration::ZERO;
            for _ in 0..failures {
                let delay = backoff.record_failure();
                prop_assert!(delay >= previous);
                previous = delay;
            }

            backoff.reset();
            prop_assert_eq!(backoff.current_delay(), Duration::ZERO);
        }
    }
}
