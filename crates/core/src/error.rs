use crate::types::Field;
use std::fmt;
use thiserror::Error;

pub type MixResult<T> = Result<T, MixError>;

#[derive(Error, Debug)]
pub enum MixError {
    #[error("Schema error: missing required fields: {}", join_fields(.missing))]
    Schema { missing: Vec<Field> },

    #[error("Invalid record at row {row}: field `{field}` {reason}")]
    InvalidRecord {
        row: usize,
        field: Field,
        reason: String,
    },

    #[error("Singular design matrix: {0}")]
    SingularMatrix(SingularReason),

    #[error("Unknown channel(s) in spend scenario: {}", .channels.join(", "))]
    UnknownChannel { channels: Vec<String> },

    #[error("Invalid spend scenario for channel `{channel}`: {reason}")]
    InvalidScenario { channel: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ingestion error: {0}")]
    Ingest(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why an attribution fit has no unique solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingularReason {
    /// Fewer distinct periods than fitted parameters (channels + intercept).
    InsufficientPeriods { periods: usize, parameters: usize },
    /// The channel's spend is a linear combination of the intercept and the
    /// channels fitted before it.
    CollinearChannel { channel: String },
}

impl fmt::Display for SingularReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingularReason::InsufficientPeriods {
                periods,
                parameters,
            } => write!(
                f,
                "fewer periods than channels + 1 ({periods} periods for {parameters} parameters)"
            ),
            SingularReason::CollinearChannel { channel } => write!(
                f,
                "spend for channel `{channel}` is collinear with the intercept or earlier channels"
            ),
        }
    }
}

impl From<config::ConfigError> for MixError {
    fn from(err: config::ConfigError) -> Self {
        MixError::Config(err.to_string())
    }
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(Field::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
