//! Savepoint name generation.

use std::sync::atomic::{AtomicU64, Ordering};

use ulid::Ulid;

/// Generates a fresh savepoint name for every nesting attempt.
///
/// Names look like `sp_01j9z3k6m1q8v0w2x4y6z8a0b2_7`: the prefix, a ULID
/// and a per-generator sequence number, so two nested calls inside the same
/// outer transaction never collide.
#[derive(Debug)]
pub struct SavepointNames {
    prefix: String,
    seq: AtomicU64,
}

impl SavepointNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!(
            "{}_{}_{}",
            self.prefix,
            Ulid::new().to_string().to_lowercase(),
            seq
        )
    }
}
