use chrono::NaiveDate;

/// Failures surfaced by the per-station pipeline.
///
/// Every variant is returned to the caller unmodified; nothing in the core
/// retries or substitutes a fallback value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RidershipError {
    #[error("malformed date {value:?} in record {index} (expected format {format})")]
    MalformedDate {
        index: usize,
        value: String,
        format: String,
    },

    #[error("no records supplied for station {station:?}")]
    EmptyInput { station: String },

    #[error("no complete days remain for station {station:?} after removing {removed} missing rows")]
    InsufficientData { station: String, removed: usize },

    #[error("data ends on {actual}, but the model expects an extract ending on {expected}")]
    DataVersionMismatch {
        expected: NaiveDate,
        actual: NaiveDate,
    },

    #[error("insufficient history to forecast: {actual} observed days (need at least {required})")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("model did not converge after {iterations} iterations: {reason}")]
    ModelConvergence { iterations: usize, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RidershipError {
    /// Process exit code used by the `ridership` binary.
    ///
    /// - 2: bad input or configuration
    /// - 3: not enough (or the wrong) data
    /// - 4: fitting failure
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MalformedDate { .. } | Self::InvalidConfig(_) => 2,
            Self::EmptyInput { .. }
            | Self::InsufficientData { .. }
            | Self::DataVersionMismatch { .. }
            | Self::InsufficientHistory { .. } => 3,
            Self::ModelConvergence { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<RidershipError> for AppError {
    fn from(err: RidershipError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        let d = NaiveDate::from_ymd_opt(2019, 12, 31).unwrap();
        assert_eq!(RidershipError::InvalidConfig("x".into()).exit_code(), 2);
        assert_eq!(
            RidershipError::DataVersionMismatch { expected: d, actual: d }.exit_code(),
            3
        );
        assert_eq!(
            RidershipError::ModelConvergence { iterations: 3, reason: "singular".into() }.exit_code(),
            4
        );
    }

    #[test]
    fn app_error_keeps_message_and_code() {
        let err: AppError = RidershipError::InsufficientHistory { required: 730, actual: 12 }.into();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("730"));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync + std::error::Error>() {}
        assert_impl::<RidershipError>();
    }
}
