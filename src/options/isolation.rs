//! Transaction isolation levels.
//!
//! The level is a hint forwarded to the session when a transaction begins;
//! whether and how it is honored is up to the database.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::options::error::OptionError;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IsolationLevel {
    /// Reads may observe uncommitted writes of other transactions.
    ReadUncommitted,

    /// Each read sees the most recently committed data at the time of the read.
    ReadCommitted,

    /// All reads see a consistent snapshot taken when the transaction started.
    RepeatableRead,

    /// Transactions behave as if executed one after another.
    Serializable,
}

impl IsolationLevel {
    /// Check if this isolation level reads from a snapshot.
    pub fn uses_snapshot(&self) -> bool {
        matches!(
            self,
            IsolationLevel::RepeatableRead | IsolationLevel::Serializable
        )
    }

    /// Get a human-readable description of this isolation level.
    pub fn description(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "Reads may see uncommitted data",
            IsolationLevel::ReadCommitted => "Each read sees the latest committed data",
            IsolationLevel::RepeatableRead => {
                "All reads see a consistent snapshot from transaction start"
            }
            IsolationLevel::Serializable => "Transactions appear to run one at a time",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationLevel::ReadUncommitted => write!(f, "READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => write!(f, "READ COMMITTED"),
            IsolationLevel::RepeatableRead => write!(f, "REPEATABLE READ"),
            IsolationLevel::Serializable => write!(f, "SERIALIZABLE"),
        }
    }
}

/// Parse isolation level from string (SQL syntax).
impl std::str::FromStr for IsolationLevel {
    type Err = OptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "READ UNCOMMITTED" | "READ_UNCOMMITTED" | "READUNCOMMITTED" => {
                Ok(IsolationLevel::ReadUncommitted)
            }
            "READ COMMITTED" | "READ_COMMITTED" | "READCOMMITTED" => {
                Ok(IsolationLevel::ReadCommitted)
            }
            "REPEATABLE READ" | "REPEATABLE_READ" | "REPEATABLEREAD" | "SNAPSHOT" => {
                Ok(IsolationLevel::RepeatableRead)
            }
            "SERIALIZABLE" => Ok(IsolationLevel::Serializable),
            _ => Err(OptionError::InvalidIsolation(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uses_snapshot() {
        assert!(!IsolationLevel::ReadCommitted.uses_snapshot());
        assert!(IsolationLevel::RepeatableRead.uses_snapshot());
        assert!(IsolationLevel::Serializable.uses_snapshot());
    }

    #[test]
    fn test_parse_isolation() {
        assert_eq!(
            "READ COMMITTED".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::ReadCommitted
        );
        assert_eq!(
            "snapshot".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::RepeatableRead
        );
        assert_eq!(
            "serializable".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::Serializable
        );
        assert!(matches!(
            "chaos".parse::<IsolationLevel>(),
            Err(OptionError::InvalidIsolation(_))
        ));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&IsolationLevel::RepeatableRead).unwrap();
        assert_eq!(json, "\"REPEATABLE_READ\"");
    }
}
