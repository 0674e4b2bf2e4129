//! Error types for the Horizon Bind runtime.

/// Errors raised by the runtime.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A timer operation failed.
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),
}

/// Timer queue errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    /// The timer already fired, was stopped, or never existed.
    #[error("Timer is not pending")]
    NotPending,
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, CoreError>;
