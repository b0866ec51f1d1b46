/// An error raised by the in-memory document store
///
/// Every operational failure falls into one of four kinds. Validation and
/// unsupported-feature errors never mutate state; a failed condition on a
/// single operation mutates nothing; a failed transaction rolls back every
/// mutation it performed before failing.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A parameter or method outside the supported surface was used
    #[error("{method} does not support {path}: {reason}")]
    NotSupported {
        /// The operation that rejected the request
        method: &'static str,
        /// The parameter or feature path that is outside the surface
        path: String,
        /// Why the feature is rejected
        reason: &'static str,
    },

    /// The request was malformed
    #[error("{message}")]
    Validation {
        /// A message matching the hosted service where callers depend on it
        message: String,
    },

    /// A condition expression evaluated to false
    #[error("The conditional request failed")]
    ConditionalCheckFailed,

    /// A transactional write was canceled and rolled back
    #[error("Transaction cancelled, please refer cancellation reasons for specific reasons {reasons}")]
    TransactionCanceled {
        /// The per-entry cancellation reason mirror, e.g. `[None, ConditionalCheckFailed]`
        reasons: String,
    },
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(
        method: &'static str,
        path: impl Into<String>,
        reason: &'static str,
    ) -> Self {
        Self::NotSupported {
            method,
            path: path.into(),
            reason,
        }
    }

    pub(crate) fn missing_param(key: &str) -> Self {
        Self::validation(format!("Missing required key '{key}' in params"))
    }

    pub(crate) fn invalid_key_shape() -> Self {
        Self::validation("The provided key element does not match the schema")
    }

    /// Returns true if the error is a failed condition expression
    pub fn is_conditional_check_failed(&self) -> bool {
        matches!(self, Self::ConditionalCheckFailed)
    }

    /// Returns true if the error canceled a transactional write
    pub fn is_transaction_canceled(&self) -> bool {
        matches!(self, Self::TransactionCanceled { .. })
    }

    /// The cancellation reason mirror of a canceled transaction, if any
    pub fn cancellation_reasons(&self) -> Option<&str> {
        match self {
            Self::TransactionCanceled { reasons } => Some(reasons),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_canceled_message_carries_reason_mirror() {
        let err = Error::TransactionCanceled {
            reasons: "[None, ConditionalCheckFailed]".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "Transaction cancelled, please refer cancellation reasons for specific reasons \
             [None, ConditionalCheckFailed]",
        );
        assert!(err.is_transaction_canceled());
        assert_eq!(
            err.cancellation_reasons(),
            Some("[None, ConditionalCheckFailed]")
        );
    }

    #[test]
    fn conditional_check_failed_message_matches_service() {
        assert_eq!(
            Error::ConditionalCheckFailed.to_string(),
            "The conditional request failed"
        );
    }
}
