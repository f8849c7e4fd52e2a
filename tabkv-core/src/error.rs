use thiserror::Error;

use crate::status::Status;

/// Whole-operation failures surfaced by the cluster and the client.
///
/// Per-item outcomes inside a batch never use this type; they are reported
/// as [`Status`] values in the corresponding result slot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Object does not exist")]
    ObjectDoesntExist,

    #[error("Object already exists")]
    ObjectExists,

    #[error("Version precondition failed")]
    WrongVersion,

    #[error("Table does not exist: {0}")]
    TableDoesntExist(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Iteration exhausted")]
    IterationExhausted,

    #[error("Systemic failure: {0}")]
    SystemicFailure(String),
}

impl Error {
    /// Returns a stable error code for this error variant.
    /// These codes are stable and can be used by clients for error classification.
    pub fn code(&self) -> &'static str {
        match self {
            Error::ObjectDoesntExist => "OBJECT_DOESNT_EXIST",
            Error::ObjectExists => "OBJECT_EXISTS",
            Error::WrongVersion => "WRONG_VERSION",
            Error::TableDoesntExist(_) => "TABLE_DOESNT_EXIST",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::Corruption(_) => "CORRUPTION",
            Error::IterationExhausted => "ITERATION_EXHAUSTED",
            Error::SystemicFailure(_) => "SYSTEMIC_FAILURE",
        }
    }

    /// Returns true if this error is potentially retryable.
    ///
    /// Only connectivity and collaborator-internal failures qualify. Rule
    /// rejections and corruption are permanent for the given request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::SystemicFailure(_))
    }

    /// Returns true if a conditional rule (or plain absence) rejected the operation.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::ObjectDoesntExist | Error::ObjectExists | Error::WrongVersion
        )
    }

    /// The per-item status equivalent of this error.
    pub fn status(&self) -> Status {
        match self {
            Error::ObjectDoesntExist => Status::ObjectDoesntExist,
            Error::ObjectExists => Status::ObjectExists,
            Error::WrongVersion => Status::WrongVersion,
            Error::TableDoesntExist(_) => Status::TableDoesntExist,
            Error::InvalidArgument(_) => Status::InvalidArgument,
            Error::Corruption(_) | Error::IterationExhausted | Error::SystemicFailure(_) => {
                Status::SystemicFailure
            }
        }
    }

    /// Adds context to an error.
    ///
    /// Context is only attached to variants that carry a message; unit
    /// variants are returned unchanged so callers can keep matching on them.
    pub fn with_context(self, context: &str) -> Error {
        match self {
            Error::TableDoesntExist(msg) => Error::TableDoesntExist(format!("{}: {}", context, msg)),
            Error::InvalidArgument(msg) => Error::InvalidArgument(format!("{}: {}", context, msg)),
            Error::Corruption(msg) => Error::Corruption(format!("{}: {}", context, msg)),
            Error::SystemicFailure(msg) => Error::SystemicFailure(format!("{}: {}", context, msg)),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            Error::ObjectDoesntExist,
            Error::ObjectExists,
            Error::WrongVersion,
            Error::TableDoesntExist("t".into()),
            Error::InvalidArgument("a".into()),
            Error::Corruption("c".into()),
            Error::IterationExhausted,
            Error::SystemicFailure("s".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_retryable() {
        assert!(Error::SystemicFailure("connection reset".into()).is_retryable());
        assert!(!Error::WrongVersion.is_retryable());
        assert!(!Error::Corruption("bad page".into()).is_retryable());
    }

    #[test]
    fn test_rejection_maps_to_status() {
        assert!(Error::ObjectExists.is_rejection());
        assert_eq!(Error::ObjectExists.status(), Status::ObjectExists);
        assert_eq!(Error::WrongVersion.status(), Status::WrongVersion);
        assert!(!Error::TableDoesntExist("x".into()).is_rejection());
    }

    #[test]
    fn test_with_context() {
        let err = Error::SystemicFailure("timeout".into()).with_context("multi_op");
        assert_eq!(err, Error::SystemicFailure("multi_op: timeout".into()));

        assert_eq!(Error::WrongVersion.with_context("write"), Error::WrongVersion);
    }
}
