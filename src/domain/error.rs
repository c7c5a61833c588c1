//! Domain error types.

/// Top-level error type for orobt.
#[derive(Debug, thiserror::Error)]
pub enum OrobtError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("candle data error: {reason}")]
    CandleData { reason: String },

    #[error("insufficient data: have {bars} candles, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("report write error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&OrobtError> for std::process::ExitCode {
    fn from(err: &OrobtError) -> Self {
        let code: u8 = match err {
            OrobtError::Io(_) | OrobtError::Report { .. } => 1,
            OrobtError::ConfigParse { .. }
            | OrobtError::ConfigMissing { .. }
            | OrobtError::ConfigInvalid { .. } => 2,
            OrobtError::CandleData { .. } => 3,
            OrobtError::InvalidParameter { .. } => 4,
            OrobtError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
