use std::time::Duration;

use jiff::Timestamp;

/// One attempt at a fetch, scheduled no earlier than `not_before`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub retry: u8,
    pub not_before: Timestamp,
}

impl Attempt {
    pub fn first() -> Self {
        Attempt {
            retry: 0,
            not_before: Timestamp::now(),
        }
    }

    /// Schedules the following attempt `base_delay_ms * 2^retry` from now.
    pub fn next(&self, base_delay_ms: u64) -> Self {
        let retry = self.retry.saturating_add(1);
        let wait = Duration::from_millis(base_delay_ms.saturating_mul(2u64.saturating_pow(retry as u32)));
        let now = Timestamp::now();
        Attempt {
            retry,
            not_before: now.checked_add(wait).unwrap_or(now),
        }
    }

    pub fn get_delay(&self) -> Option<Duration> {
        match Duration::try_from(self.not_before.duration_since(Timestamp::now())) {
            Ok(wait_dur) if wait_dur > Duration::from_millis(0) => Some(wait_dur),
            _ => None,
        }
    }
}
