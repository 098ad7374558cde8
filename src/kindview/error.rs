use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowseError {
    #[error("Unsupported type for property '{property}': {observed}")]
    UnsupportedType { property: String, observed: String },

    #[error("Malformed value for property '{property}': {reason}")]
    MalformedValue { property: String, reason: String },

    #[error("Nesting too deep at property '{property}' (limit is {limit})")]
    RecursionLimitExceeded { property: String, limit: usize },

    #[error("No kind selected")]
    NoKindSelected,

    #[error("Invalid page state: {0}")]
    InvalidPageState(String),

    #[error("Store query failed: {0}")]
    StoreQueryFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl BrowseError {
    pub fn store(message: impl Into<String>) -> Self {
        BrowseError::StoreQueryFailed(message.into())
    }

    pub fn unsupported(property: &str, observed: impl Into<String>) -> Self {
        BrowseError::UnsupportedType {
            property: property.to_string(),
            observed: observed.into(),
        }
    }

    pub fn malformed(property: &str, reason: impl Into<String>) -> Self {
        BrowseError::MalformedValue {
            property: property.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BrowseError>;
