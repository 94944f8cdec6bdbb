use thiserror::Error;

/// Errors surfaced by the recommendation pipeline.
///
/// Catalog outages, cache faults and empty result sets are absorbed inside
/// the pipeline, so the only failure a caller sees is a rejected request.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RecommendError {
    pub fn status_code(&self) -> u16 {
        match self {
            RecommendError::InvalidInput(_) => 400,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RecommendError::InvalidInput(_) => "invalid_input",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_maps_to_bad_request() {
        let err = RecommendError::InvalidInput("page must be at least 1".to_string());
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.kind(), "invalid_input");
        assert_eq!(err.to_string(), "Invalid input: page must be at least 1");
    }
}
