//! Error types for persistence diagram kernels

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdkError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid diagram{}: {reason}", index.map(|i| format!(" at index {i}")).unwrap_or_default())]
    InvalidDiagram {
        index: Option<usize>,
        reason: String,
    },

    #[error("Empty collection: at least one diagram is required")]
    EmptyCollection,

    #[error("Computation failed: {0}")]
    ComputationError(String),

    #[error("Worker pool unavailable: {0}")]
    ResourceError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PdkError {
    /// Diagram error without a collection position
    pub fn diagram(reason: impl Into<String>) -> Self {
        Self::InvalidDiagram {
            index: None,
            reason: reason.into(),
        }
    }

    /// Attach a collection position to a diagram error, leaving other errors untouched
    pub fn at_index(self, index: usize) -> Self {
        match self {
            Self::InvalidDiagram { reason, .. } => Self::InvalidDiagram {
                index: Some(index),
                reason,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, PdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagram_error_display() {
        let err = PdkError::diagram("diagram must be non-empty");
        assert_eq!(err.to_string(), "Invalid diagram: diagram must be non-empty");

        let err = err.at_index(3);
        assert_eq!(
            err.to_string(),
            "Invalid diagram at index 3: diagram must be non-empty"
        );
    }

    #[test]
    fn test_at_index_keeps_other_errors() {
        let err = PdkError::InvalidParameter("sigma".to_string()).at_index(2);
        assert!(matches!(err, PdkError::InvalidParameter(_)));
    }

    #[test]
    fn test_empty_collection_message() {
        assert!(PdkError::EmptyCollection
            .to_string()
            .contains("at least one diagram"));
    }
}
