//! Error types for mongkol operations.
//!
//! Provides rich error context for library consumers.

use std::fmt;

/// Main error type for mongkol operations.
///
/// Covers phone-number validation, matrix dimension mismatches,
/// convergence issues, thin training partitions, and artifact I/O.
///
/// # Examples
///
/// ```
/// use mongkol::error::MongkolError;
///
/// let err = MongkolError::DimensionMismatch {
///     expected: "100x250".to_string(),
///     actual: "100x10".to_string(),
/// };
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Debug)]
pub enum MongkolError {
    /// Matrix/vector dimensions don't match for the operation.
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Input string is not a valid Thai mobile number.
    InvalidPhoneNumber {
        /// The raw input as received
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// Optimization failed to converge within iteration limit.
    ConvergenceFailure {
        /// Number of iterations attempted
        iterations: usize,
        /// Final loss value
        final_loss: f64,
    },

    /// Invalid hyperparameter value provided.
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Not enough data to fit the requested component.
    DataInsufficiency {
        /// What was being fitted
        context: String,
        /// Rows available
        available: usize,
        /// Rows required
        required: usize,
    },

    /// I/O error (file not found, permission denied, etc.).
    Io(std::io::Error),

    /// Serialization/deserialization error.
    Serialization(String),

    /// Invalid or corrupt artifact format.
    FormatError {
        /// Error description
        message: String,
    },

    /// Unsupported artifact format version.
    UnsupportedVersion {
        /// Version found
        found: u16,
        /// Maximum supported version
        supported: u16,
    },

    /// Input validation failed (missing column, malformed row).
    ValidationError {
        /// Validation failure message
        message: String,
    },

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for MongkolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MongkolError::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "Matrix dimension mismatch: expected {expected}, got {actual}"
                )
            }
            MongkolError::InvalidPhoneNumber { input, reason } => {
                write!(f, "Invalid phone number {input:?}: {reason}")
            }
            MongkolError::ConvergenceFailure {
                iterations,
                final_loss,
            } => {
                write!(
                    f,
                    "Convergence failure after {iterations} iterations, loss = {final_loss}"
                )
            }
            MongkolError::InvalidHyperparameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid hyperparameter: {param} = {value}, expected {constraint}"
                )
            }
            MongkolError::DataInsufficiency {
                context,
                available,
                required,
            } => {
                write!(
                    f,
                    "Insufficient data for {context}: {available} rows available, {required} required"
                )
            }
            MongkolError::Io(e) => write!(f, "I/O error: {e}"),
            MongkolError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            MongkolError::FormatError { message } => {
                write!(f, "Invalid artifact format: {message}")
            }
            MongkolError::UnsupportedVersion { found, supported } => {
                write!(
                    f,
                    "Unsupported artifact version: found {found}, max supported {supported}"
                )
            }
            MongkolError::ValidationError { message } => {
                write!(f, "Validation failed: {message}")
            }
            MongkolError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for MongkolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MongkolError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MongkolError {
    fn from(err: std::io::Error) -> Self {
        MongkolError::Io(err)
    }
}

impl From<&str> for MongkolError {
    fn from(msg: &str) -> Self {
        MongkolError::Other(msg.to_string())
    }
}

impl From<String> for MongkolError {
    fn from(msg: String) -> Self {
        MongkolError::Other(msg)
    }
}

impl MongkolError {
    /// Create a dimension mismatch error from expected/actual descriptions
    #[must_use]
    pub fn dimension_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an empty input error
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::Other(format!("empty input: {context}"))
    }
}

#[allow(clippy::cmp_owned)]
impl PartialEq<&str> for MongkolError {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

#[allow(clippy::cmp_owned)]
impl PartialEq<MongkolError> for &str {
    fn eq(&self, other: &MongkolError) -> bool {
        *self == other.to_string()
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, MongkolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_display() {
        let err = MongkolError::DimensionMismatch {
            expected: "100x250".to_string(),
            actual: "100x10".to_string(),
        };
        assert!(err.to_string().contains("dimension mismatch"));
        assert!(err.to_string().contains("100x250"));
        assert!(err.to_string().contains("100x10"));
    }

    #[test]
    fn test_invalid_phone_display() {
        let err = MongkolError::InvalidPhoneNumber {
            input: "12ab".to_string(),
            reason: "non-digit characters".to_string(),
        };
        assert!(err.to_string().contains("12ab"));
        assert!(err.to_string().contains("non-digit"));
    }

    #[test]
    fn test_convergence_failure_display() {
        let err = MongkolError::ConvergenceFailure {
            iterations: 100,
            final_loss: 0.42,
        };
        assert!(err.to_string().contains("Convergence failure"));
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("0.42"));
    }

    #[test]
    fn test_invalid_hyperparameter_display() {
        let err = MongkolError::InvalidHyperparameter {
            param: "learning_rate".to_string(),
            value: "-0.1".to_string(),
            constraint: ">0".to_string(),
        };
        assert!(err.to_string().contains("Invalid hyperparameter"));
        assert!(err.to_string().contains("learning_rate"));
        assert!(err.to_string().contains("-0.1"));
    }

    #[test]
    fn test_data_insufficiency_display() {
        let err = MongkolError::DataInsufficiency {
            context: "luxury tier".to_string(),
            available: 3,
            required: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("luxury tier"));
        assert!(msg.contains("3"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn test_from_str() {
        let err: MongkolError = "test error".into();
        assert!(matches!(err, MongkolError::Other(_)));
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_from_string() {
        let err: MongkolError = "test error".to_string().into();
        assert!(matches!(err, MongkolError::Other(_)));
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: MongkolError = io_err.into();
        assert!(matches!(err, MongkolError::Io(_)));
    }

    #[test]
    fn test_format_error_display() {
        let err = MongkolError::FormatError {
            message: "corrupt header".to_string(),
        };
        assert!(err.to_string().contains("Invalid artifact format"));
        assert!(err.to_string().contains("corrupt header"));
    }

    #[test]
    fn test_unsupported_version_display() {
        let err = MongkolError::UnsupportedVersion {
            found: 3,
            supported: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("Unsupported"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_validation_error_display() {
        let err = MongkolError::ValidationError {
            message: "price column missing".to_string(),
        };
        assert!(err.to_string().contains("Validation failed"));
    }

    #[test]
    fn test_error_eq_str() {
        let err = MongkolError::Other("test error".to_string());
        assert!(err == "test error");
        assert!("test error" == err);
    }

    #[test]
    fn test_error_source_io() {
        use std::error::Error;
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = MongkolError::Io(io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_source_other() {
        use std::error::Error;
        let err = MongkolError::Other("test".to_string());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_dimension_mismatch_helper() {
        let err = MongkolError::dimension_mismatch("100 rows", "50 rows");
        let msg = err.to_string();
        assert!(msg.contains("100 rows"));
        assert!(msg.contains("50 rows"));
    }

    #[test]
    fn test_empty_input_helper() {
        let err = MongkolError::empty_input("training data");
        let msg = err.to_string();
        assert!(msg.contains("empty input"));
        assert!(msg.contains("training data"));
    }
}
