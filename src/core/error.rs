use thiserror::Error;

#[derive(Error, Debug)]
pub enum CombatError {
    #[error("Match already running: {0}")]
    AlreadyRunning(String),

    #[error("Match already completed: {0}")]
    MatchCompleted(String),

    #[error("Match already active: {0}")]
    MatchAlreadyActive(String),

    #[error("No active match with id: {0}")]
    MatchNotFound(String),

    #[error("Invalid placement: {0}")]
    InvalidPlacement(String),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CombatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_errors_convert() {
        let bad = serde_json::from_str::<u32>("not json").expect_err("parse");
        let err: CombatError = bad.into();
        assert!(matches!(err, CombatError::SerdeError(_)));
    }
}
