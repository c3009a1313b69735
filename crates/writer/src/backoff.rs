use std::time::Duration;

/// Delays before each retry: `base`, `2 * base`, `4 * base`, ... for at most
/// `retries` entries.
#[derive(Clone, Debug)]
pub struct Backoff {
    next: Duration,
    remaining: u32,
}

impl Backoff {
    pub const fn new(base: Duration, retries: u32) -> Self {
        Self {
            next: base,
            remaining: retries,
        }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }

        self.remaining -= 1;
        let delay = self.next;
        self.next = self.next.saturating_mul(2);
        Some(delay)
    }
}
