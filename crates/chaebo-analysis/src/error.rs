//! Error types for audio analysis.

use thiserror::Error;

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors that can occur while decoding or analyzing audio.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No decoder recognized the input.
    #[error("unsupported or unrecognized audio format: {message}")]
    UnsupportedFormat {
        /// Decoder message.
        message: String,
    },

    /// The container has no decodable audio track.
    #[error("no decodable audio track found")]
    NoAudioTrack,

    /// The decoder failed mid-stream.
    #[error("audio decode failed: {message}")]
    Decode {
        /// Decoder message.
        message: String,
    },

    /// Decoding produced no samples.
    #[error("audio contains no samples")]
    EmptyAudio,

    /// Invalid analysis parameter.
    #[error("invalid analysis parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// I/O error while reading the input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// Creates an invalid parameter error.
    pub fn invalid_param(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::UnsupportedFormat { .. } => "ANALYSIS_001",
            AnalysisError::NoAudioTrack => "ANALYSIS_002",
            AnalysisError::Decode { .. } => "ANALYSIS_003",
            AnalysisError::EmptyAudio => "ANALYSIS_004",
            AnalysisError::InvalidParameter { .. } => "ANALYSIS_005",
            AnalysisError::Io(_) => "ANALYSIS_006",
        }
    }

    /// Returns true for failures to turn the input into samples.
    pub fn is_decode_failure(&self) -> bool {
        !matches!(self, AnalysisError::InvalidParameter { .. })
    }
}
