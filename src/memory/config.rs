//! Memory backend configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Memory database configuration options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Upper bound on connections handed out at once.
    pub max_connections: usize,
    /// How often a blocked checkout re-checks its cancellation signal.
    pub checkout_poll_ms: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            checkout_poll_ms: 5,
        }
    }
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max_connections. Zero is treated as one.
    pub fn max_connections(mut self, value: usize) -> Self {
        self.max_connections = value;
        self
    }

    /// Set checkout_poll_ms.
    pub fn checkout_poll_ms(mut self, value: u64) -> Self {
        self.checkout_poll_ms = value;
        self
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.checkout_poll_ms.max(1))
    }
}
