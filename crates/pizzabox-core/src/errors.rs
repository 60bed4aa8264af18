//! Error types for PizzaBox

use thiserror::Error;

/// Core errors that can occur in PizzaBox
#[derive(Debug, Error)]
pub enum Error {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Cell error: {0}")]
    Cell(#[from] CellError),
}

/// Remote indexing API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Get-method {method} failed with exit code {exit_code}")]
    ExitCode { method: String, exit_code: i32 },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Protocol-specific errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid `firstUnlockPercent`: {value} (must be between 0 and 100)")]
    InvalidPercent { value: f64 },

    #[error("Vesting details missed!")]
    MissingVesting,

    #[error("Invalid lock schedule: {message}")]
    InvalidSchedule { message: String },

    #[error("Invalid jetton metadata: {message}")]
    InvalidMetadata { message: String },

    #[error("Failed to decode get-method stack: {message}")]
    StackDecode { message: String },
}

/// Cell building, parsing and BOC errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CellError {
    #[error("Cell overflow: need {needed} bits, {available} available")]
    BitOverflow { needed: usize, available: usize },

    #[error("Cell overflow: no room for another reference")]
    RefOverflow,

    #[error("Cell underflow: requested {requested} bits, {remaining} remaining")]
    NotEnoughBits { requested: usize, remaining: usize },

    #[error("Cell underflow: no more references")]
    NotEnoughRefs,

    #[error("Cell depth {depth} exceeds the maximum of {max}")]
    DepthOverflow { depth: u16, max: u16 },

    #[error("Value does not fit in {bits} bits")]
    ValueTooLarge { bits: usize },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid BOC: {0}")]
    InvalidBoc(String),

    #[error("Invalid dictionary: {0}")]
    InvalidDict(String),
}

/// Result type alias for PizzaBox operations
pub type Result<T> = std::result::Result<T, Error>;

impl ProtocolError {
    /// Get a stable, machine-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPercent { .. } => "invalid_percent",
            Self::MissingVesting => "missing_vesting",
            Self::InvalidSchedule { .. } => "invalid_schedule",
            Self::InvalidMetadata { .. } => "invalid_metadata",
            Self::StackDecode { .. } => "stack_decode",
        }
    }

    /// Whether the error was raised by local input validation
    /// (before any network call was made)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidPercent { .. } | Self::MissingVesting | Self::InvalidSchedule { .. }
        )
    }
}
