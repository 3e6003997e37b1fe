use thiserror::Error;

/// The only failure that crosses the pipeline boundary.
///
/// Unresolved dates, merchants and directions are completed with defaults,
/// and an unavailable classifier falls back to the default category; neither
/// is reported here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("could not understand the amount in: {details:?}")]
    InvalidAmount { details: String },
}

impl PipelineError {
    /// Rejection text for the person who sent the message
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::InvalidAmount { .. } => {
                "Não consegui entender o valor. Tente algo como: \"Gastei R$ 50 no mercado\"."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_amount_display() {
        let err = PipelineError::InvalidAmount {
            details: "comprei uma coisa".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "could not understand the amount in: \"comprei uma coisa\""
        );
        assert!(err.user_message().contains("valor"));
    }
}
