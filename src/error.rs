use thiserror::Error;

/// Custom error type for narrascope operations.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// A required collection was empty or a count/index was out of range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The corpus is missing a field the operation depends on.
    #[error("Schema error: corpus is missing required field '{field}'")]
    Schema { field: String },

    /// A model response fragment was not valid structured output.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The embedding or generation capability failed.
    #[error("Provider error: {message}")]
    Provider {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration could not be loaded or names an unknown backend.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A corpus file could not be read or has an unsupported format.
    #[error("Ingestion error: {0}")]
    Ingestion(String),
}

impl ScopeError {
    /// Provider failure without an underlying source error.
    pub fn provider(message: impl Into<String>) -> Self {
        ScopeError::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Provider failure wrapping the error that caused it.
    pub fn provider_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ScopeError::Provider {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        ScopeError::Schema {
            field: field.into(),
        }
    }
}

impl From<serde_json::Error> for ScopeError {
    fn from(err: serde_json::Error) -> Self {
        ScopeError::Parse(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for ScopeError {
    fn from(err: std::io::Error) -> Self {
        ScopeError::Ingestion(format!("I/O error: {}", err))
    }
}

impl From<csv::Error> for ScopeError {
    fn from(err: csv::Error) -> Self {
        ScopeError::Ingestion(format!("CSV error: {}", err))
    }
}
