//! Explicit status for asynchronous operations.
//!
//! Replaces a single shared "last message" slot with a typed status per
//! operation, so a failed request stays visible instead of silently never
//! finishing.

use smol_str::SmolStr;

/// Lifecycle of one asynchronous operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OperationStatus<T> {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// Request in flight.
    Pending,
    /// Request completed.
    Succeeded(T),
    /// Request failed or was rejected.
    Failed { reason: SmolStr },
}

impl<T> OperationStatus<T> {
    pub fn failed(reason: impl Into<SmolStr>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns the failure reason if failed.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { reason } => Some(reason.as_str()),
            _ => None,
        }
    }

    /// Returns the result if succeeded.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Succeeded(value) => Some(value),
            _ => None,
        }
    }
}

/// The hover-translation slot: the phrase under the pointer and the state
/// of its translation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PhraseDetail {
    pub phrase: SmolStr,
    pub status: OperationStatus<SmolStr>,
}

impl PhraseDetail {
    pub fn translated_phrase(&self) -> Option<&str> {
        self.status.value().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_default() {
        assert_eq!(OperationStatus::<()>::default(), OperationStatus::Idle);
    }

    #[test]
    fn test_status_accessors() {
        let ok: OperationStatus<u32> = OperationStatus::Succeeded(3);
        assert_eq!(ok.value(), Some(&3));
        assert!(!ok.is_failed());

        let err: OperationStatus<u32> = OperationStatus::failed("boom");
        assert!(err.is_failed());
        assert_eq!(err.error_message(), Some("boom"));
        assert_eq!(err.value(), None);

        assert!(OperationStatus::<u32>::Pending.is_pending());
    }

    #[test]
    fn test_phrase_detail() {
        let detail = PhraseDetail {
            phrase: "hello world".into(),
            status: OperationStatus::Succeeded("こんにちは世界".into()),
        };
        assert_eq!(detail.translated_phrase(), Some("こんにちは世界"));
        assert_eq!(PhraseDetail::default().translated_phrase(), None);
    }
}
