use std::path::PathBuf;
use std::time::Duration;

/// Shared document collection every peer reads and writes.
pub const DEFAULT_DB_ADDRESS: &str = "/orbitdb/bafyreifhynz6quosu65iszr46b6jw3qlfdpgbvqwincnqc72hvhwkan3bm/event";

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub db_address: String,
    /// Secret shared by all peers, keys the citizen id derivation.
    pub identity_secret: String,
    /// Backing file for the document log; `None` keeps documents in memory.
    pub store_path: Option<PathBuf>,
    pub notification_ttl: Duration,
    pub retry: RetryConfig,
    pub command_buffer: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            db_address: DEFAULT_DB_ADDRESS.to_string(),
            identity_secret: "mysecretpassword".to_string(),
            store_path: None,
            notification_ttl: Duration::from_secs(5),
            retry: RetryConfig::default(),
            command_buffer: 256,
        }
    }
}

/// Bounded exponential backoff for store and transport calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}
