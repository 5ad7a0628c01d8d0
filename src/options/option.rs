//! Partial transaction options and their merge.

use serde::{Deserialize, Serialize};

use crate::options::error::{OptionError, OptionResult};
use crate::options::isolation::IsolationLevel;
use crate::options::propagation::Propagation;

/// A partial set of transaction options.
///
/// Every field is optional; several `TxOptions` are merged into one
/// [`ResolvedOptions`] per call.
///
/// ```
/// use txflow::options::{IsolationLevel, Propagation, TxOptions};
///
/// let options = TxOptions::propagation(Propagation::RequiresNew)
///     .with_isolation(IsolationLevel::Serializable)
///     .with_read_only(true);
/// assert_eq!(options.read_only, Some(true));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxOptions {
    pub propagation: Option<Propagation>,
    pub isolation: Option<IsolationLevel>,
    pub read_only: Option<bool>,
}

impl TxOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options requesting only a propagation mode.
    pub fn propagation(propagation: Propagation) -> Self {
        Self::new().with_propagation(propagation)
    }

    /// Options requesting only an isolation level.
    pub fn isolation(isolation: IsolationLevel) -> Self {
        Self::new().with_isolation(isolation)
    }

    /// Options requesting only a read-only flag.
    pub fn read_only(read_only: bool) -> Self {
        Self::new().with_read_only(read_only)
    }

    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = Some(propagation);
        self
    }

    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = Some(isolation);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    /// Merge several partial options into one. See [`merge`].
    pub fn merge(options: &[TxOptions]) -> OptionResult<ResolvedOptions> {
        merge(options)
    }
}

/// The effective options of one propagation request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOptions {
    pub propagation: Propagation,
    pub isolation: Option<IsolationLevel>,
    pub read_only: Option<bool>,
}

/// Merge partial options field by field.
///
/// The first option setting a field establishes its value. A later option
/// setting the same field to a different value is an error specific to that
/// field; repeating the same value is fine. An unset propagation resolves to
/// [`Propagation::Required`].
pub fn merge(options: &[TxOptions]) -> OptionResult<ResolvedOptions> {
    let mut propagation = None;
    let mut isolation = None;
    let mut read_only = None;

    for option in options {
        propagation = merge_field(propagation, option.propagation, |first, second| {
            OptionError::ConflictingPropagation { first, second }
        })?;
        isolation = merge_field(isolation, option.isolation, |first, second| {
            OptionError::ConflictingIsolation { first, second }
        })?;
        read_only = merge_field(read_only, option.read_only, |first, second| {
            OptionError::ConflictingReadOnly { first, second }
        })?;
    }

    Ok(ResolvedOptions {
        propagation: propagation.unwrap_or_default(),
        isolation,
        read_only,
    })
}

fn merge_field<T, F>(current: Option<T>, next: Option<T>, conflict: F) -> OptionResult<Option<T>>
where
    T: Copy + PartialEq,
    F: FnOnce(T, T) -> OptionError,
{
    match (current, next) {
        (Some(first), Some(second)) if first != second => Err(conflict(first, second)),
        (Some(first), _) => Ok(Some(first)),
        (None, next) => Ok(next),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_options_yields_defaults() {
        let resolved = merge(&[]).unwrap();
        assert_eq!(resolved.propagation, Propagation::Required);
        assert_eq!(resolved.isolation, None);
        assert_eq!(resolved.read_only, None);
    }

    #[test]
    fn test_non_conflicting_combine() {
        let resolved = merge(&[
            TxOptions::propagation(Propagation::Nested),
            TxOptions::isolation(IsolationLevel::Serializable),
            TxOptions::read_only(false),
        ])
        .unwrap();
        assert_eq!(resolved.propagation, Propagation::Nested);
        assert_eq!(resolved.isolation, Some(IsolationLevel::Serializable));
        assert_eq!(resolved.read_only, Some(false));
    }

    #[test]
    fn test_conflicting_propagation() {
        let err = merge(&[
            TxOptions::propagation(Propagation::Required),
            TxOptions::propagation(Propagation::Never),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            OptionError::ConflictingPropagation {
                first: Propagation::Required,
                second: Propagation::Never,
            }
        );
    }

    #[test]
    fn test_conflicting_isolation() {
        let err = merge(&[
            TxOptions::isolation(IsolationLevel::ReadCommitted),
            TxOptions::new(),
            TxOptions::isolation(IsolationLevel::Serializable),
        ])
        .unwrap_err();
        assert!(matches!(err, OptionError::ConflictingIsolation { .. }));
    }

    #[test]
    fn test_conflicting_read_only() {
        let err = merge(&[TxOptions::read_only(true), TxOptions::read_only(false)]).unwrap_err();
        assert_eq!(
            err,
            OptionError::ConflictingReadOnly {
                first: true,
                second: false
            }
        );
    }

    #[test]
    fn test_same_values_repeated() {
        let resolved = merge(&[
            TxOptions::propagation(Propagation::Required).with_read_only(true),
            TxOptions::propagation(Propagation::Required),
            TxOptions::read_only(true).with_isolation(IsolationLevel::RepeatableRead),
            TxOptions::isolation(IsolationLevel::RepeatableRead),
        ])
        .unwrap();
        assert_eq!(resolved.propagation, Propagation::Required);
        assert_eq!(resolved.read_only, Some(true));
        assert_eq!(resolved.isolation, Some(IsolationLevel::RepeatableRead));
    }

    #[test]
    fn test_unset_fields_do_not_clear() {
        let resolved = merge(&[TxOptions::read_only(false), TxOptions::new()]).unwrap();
        assert_eq!(resolved.read_only, Some(false));
    }

    #[test]
    fn test_deserialize_partial() {
        let options: TxOptions =
            serde_json::from_str(r#"{"propagation": "REQUIRES_NEW", "read_only": true}"#).unwrap();
        assert_eq!(options.propagation, Some(Propagation::RequiresNew));
        assert_eq!(options.isolation, None);
        assert_eq!(options.read_only, Some(true));

        let bad = serde_json::from_str::<TxOptions>(r#"{"propagation": "SOMETIMES"}"#);
        assert!(bad.is_err());
    }
}
