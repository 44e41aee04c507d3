use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrendError {
    #[error("{window} window: {entity} has negative {field} count ({value})")]
    NegativeCount {
        window: String,
        entity: String,
        field: &'static str,
        value: i64,
    },

    #[error("{window} window: duplicate {granularity} entry {name:?}")]
    DuplicateEntity {
        window: String,
        granularity: &'static str,
        name: String,
    },

    #[error("run counts for {entity} exceed the supported range")]
    CountOverflow { entity: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrendError>;
