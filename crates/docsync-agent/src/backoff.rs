//! Exponential backoff for transient delivery failures.

use std::time::Duration;

/// Doubling delay between `floor` and `max`. The first failure waits
/// `floor`; each further failure doubles it; success resets.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(floor: Duration, max: Duration) -> Self {
        Self {
            floor,
            max: max.max(floor),
            current: None,
        }
    }

    /// Delay before the next attempt after a failure. A server hint is
    /// preferred over the computed delay, capped at `max`.
    pub fn next_delay(&mut self, hint: Option<Duration>) -> Duration {
        let computed = match self.current {
            None => self.floor,
            Some(previous) => previous.saturating_mul(2).min(self.max),
        };
        self.current = Some(computed);
        match hint {
            Some(hint) => hint.min(self.max),
            None => computed,
        }
    }

    pub fn reset(&mut self) {
        self.current = None;
    }

    /// The delay last handed out, if currently backing off.
    pub fn current(&self) -> Option<Duration> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn doubles_up_to_cap_and_resets() {
        let mut backoff = Backoff::new(ms(1000), ms(5000));
        let delays: Vec<Duration> = (0..5).map(|_| backoff.next_delay(None)).collect();
        assert_eq!(delays, vec![ms(1000), ms(2000), ms(4000), ms(5000), ms(5000)]);

        backoff.reset();
        assert!(backoff.current().is_none());
        assert_eq!(backoff.next_delay(None), ms(1000));
    }

    #[test]
    fn server_hint_wins_but_is_capped() {
        let mut backoff = Backoff::new(ms(1000), ms(60_000));
        assert_eq!(backoff.next_delay(Some(ms(30_000))), ms(30_000));
        assert_eq!(backoff.next_delay(Some(ms(600_000))), ms(60_000));
        // The computed sequence still advanced underneath.
        assert_eq!(backoff.next_delay(None), ms(4000));
    }
}
