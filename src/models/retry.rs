#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
}

impl RetryPolicy {
    /// Delay before the next attempt, growing linearly with the number of
    /// retries already spent: `base * 1` after the first failure,
    /// `base * 2` after the second, and so on.
    pub fn backoff_ms(&self, retries_left: u32) -> u64 {
        let attempt = self.max_retries.saturating_sub(retries_left) + 1;
        self.base_backoff_ms * u64::from(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 200,
        }
    }
}
