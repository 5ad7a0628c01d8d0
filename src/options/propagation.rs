//! Propagation modes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::options::error::OptionError;

/// How a unit of work relates to an ambient transaction.
///
/// When no mode is requested the engine uses [`Propagation::Required`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Propagation {
    /// Join the active transaction, or begin one.
    #[default]
    Required,
    /// Always begin a new transaction on an independent session, suspending
    /// any active one.
    RequiresNew,
    /// Run inside a savepoint of the active transaction, or begin one.
    Nested,
    /// Join the active transaction, or run without one.
    Supports,
    /// Always run without a transaction, suspending any active one.
    NotSupported,
    /// Join the active transaction; fail if there is none.
    Mandatory,
    /// Run without a transaction; fail if one is active.
    Never,
}

impl Propagation {
    pub const ALL: [Propagation; 7] = [
        Propagation::Required,
        Propagation::RequiresNew,
        Propagation::Nested,
        Propagation::Supports,
        Propagation::NotSupported,
        Propagation::Mandatory,
        Propagation::Never,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Propagation::Required => "REQUIRED",
            Propagation::RequiresNew => "REQUIRES_NEW",
            Propagation::Nested => "NESTED",
            Propagation::Supports => "SUPPORTS",
            Propagation::NotSupported => "NOT_SUPPORTED",
            Propagation::Mandatory => "MANDATORY",
            Propagation::Never => "NEVER",
        }
    }
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Propagation {
    type Err = OptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        Propagation::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| OptionError::InvalidPropagation(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_required() {
        assert_eq!(Propagation::default(), Propagation::Required);
    }

    #[test]
    fn test_display() {
        assert_eq!(Propagation::RequiresNew.to_string(), "REQUIRES_NEW");
        assert_eq!(Propagation::NotSupported.to_string(), "NOT_SUPPORTED");
        assert_eq!(Propagation::Never.to_string(), "NEVER");
    }

    #[test]
    fn test_parse_round_trips_every_mode() {
        for mode in Propagation::ALL {
            assert_eq!(mode.as_str().parse::<Propagation>().unwrap(), mode);
        }
        assert_eq!(
            "requires-new".parse::<Propagation>().unwrap(),
            Propagation::RequiresNew
        );
    }

    #[test]
    fn test_parse_unknown() {
        let err = "SOMETIMES".parse::<Propagation>().unwrap_err();
        assert!(matches!(err, OptionError::InvalidPropagation(ref s) if s == "SOMETIMES"));
    }
}
