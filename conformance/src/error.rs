//! Error type for failed conformance checks.

/// A failed assertion or a store error raised while running a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformanceError {
    message: String,
}

impl ConformanceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Prefixes the message with where the failure happened.
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        Self {
            message: format!("{}: {}", context, self.message),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::error::Error for ConformanceError {}

impl std::fmt::Display for ConformanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<fannypack::Error> for ConformanceError {
    fn from(err: fannypack::Error) -> Self {
        ConformanceError::new(format!("store error: {}", err))
    }
}

impl From<serde_json::Error> for ConformanceError {
    fn from(err: serde_json::Error) -> Self {
        ConformanceError::new(format!("invalid fixture: {}", err))
    }
}

/// Result type alias for conformance checks.
pub type Result<T> = std::result::Result<T, ConformanceError>;
