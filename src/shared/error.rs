use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote service error (status {status}): {detail}")]
    Remote {
        status: u16,
        code: Option<String>,
        detail: String,
        hint: Option<String>,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Transient failures are eligible for re-queue and a later retry;
    /// everything else needs user action before resubmission.
    pub fn is_retriable(&self) -> bool {
        match self {
            AppError::Network(_) => true,
            AppError::Remote { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn remote_hint(&self) -> Option<&str> {
        match self {
            AppError::Remote { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AppError::Remote { detail, hint: Some(hint), .. } => format!("{detail} ({hint})"),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Validation(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_5xx_is_retriable() {
        let err = AppError::Remote {
            status: 503,
            code: None,
            detail: "unavailable".into(),
            hint: None,
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn remote_4xx_is_not_retriable() {
        let err = AppError::Remote {
            status: 403,
            code: Some("GAIA_NO01".into()),
            detail: "permission denied".into(),
            hint: Some("use an update-capable token".into()),
        };
        assert!(!err.is_retriable());
        assert_eq!(err.remote_hint(), Some("use an update-capable token"));
    }

    #[test]
    fn network_errors_are_retriable() {
        assert!(AppError::Network("connection refused".into()).is_retriable());
        assert!(!AppError::Validation("missing plan id".into()).is_retriable());
    }
}
