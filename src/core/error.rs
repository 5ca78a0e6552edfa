//! Error types for the expiration-return pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Schema error in {stage}: missing column(s) {}", .missing.join(", "))]
    Schema {
        stage: &'static str,
        missing: Vec<String>,
    },

    #[error("Input not found: {0}")]
    MissingInput(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

impl AnalysisError {
    pub fn schema(stage: &'static str, missing: Vec<String>) -> Self {
        Self::Schema { stage, missing }
    }

    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_message_names_columns() {
        let err = AnalysisError::schema(
            "expiration resolver",
            vec!["QUOTE_DATE".to_string(), "STRIKE".to_string()],
        );
        let msg = err.to_string();
        assert!(msg.contains("expiration resolver"));
        assert!(msg.contains("QUOTE_DATE, STRIKE"));
    }
}
