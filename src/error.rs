use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeeScheduleError {
    /// A source does not have the row/field layout its reader expects.
    #[error("{source_name}: unexpected shape: {reason}")]
    Shape { source_name: String, reason: String },

    #[error("{source_name}: missing required column {column:?}")]
    MissingColumn { source_name: String, column: String },

    #[error("{source_name}: column {column:?} is not a recognized rate column")]
    UnexpectedColumn { source_name: String, column: String },

    #[error("unknown rate type {0:?}; expected physician (1) or facility (2)")]
    UnknownRateType(String),

    #[error("locality {locality:02} is not valid for {state}; available: {available:?}")]
    UnknownLocality {
        state: String,
        locality: u32,
        available: Vec<u32>,
    },

    #[error("no physician or DME rates found for state {0}")]
    UnknownState(String),

    #[error("invalid state abbreviation {0:?}")]
    InvalidState(String),

    #[error("invalid locality {0:?}")]
    InvalidLocality(String),

    #[error("invalid fee schedule percentage {0:?}")]
    InvalidPercentage(String),

    #[error("invalid fee schedule number {0:?}")]
    InvalidScheduleNumber(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl FeeScheduleError {
    pub(crate) fn shape(source_name: &str, reason: impl Into<String>) -> Self {
        Self::Shape {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeeScheduleError>;
