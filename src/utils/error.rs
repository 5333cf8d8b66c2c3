use std::fmt;

/// Message shown when the users collection cannot be loaded
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load users. Please try again later.";

/// Message shown when a status write is rejected by the store
pub const UPDATE_FAILED_MESSAGE: &str = "Failed to update user status. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    DatabaseError(String),
    LoadFailed(String),
    UpdateFailed(String),
    NotFound(String),
    InvalidRequest(String),
    Unauthorized(String),
    ConfigError(String),
}

impl AppError {
    /// Message safe to show to the admin; store details stay in the logs
    pub fn public_message(&self) -> String {
        match self {
            AppError::LoadFailed(_) => LOAD_FAILED_MESSAGE.to_string(),
            AppError::UpdateFailed(_) => UPDATE_FAILED_MESSAGE.to_string(),
            AppError::DatabaseError(_) => "Database error".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::LoadFailed(msg) => write!(f, "Load failed: {}", msg),
            AppError::UpdateFailed(msg) => write!(f, "Update failed: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<mongodb::error::Error> for AppError {
    fn from(e: mongodb::error::Error) -> Self {
        AppError::DatabaseError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_message_hides_store_details() {
        let err = AppError::LoadFailed("connection reset by peer".into());
        assert_eq!(err.public_message(), LOAD_FAILED_MESSAGE);

        let err = AppError::UpdateFailed("write concern timeout".into());
        assert_eq!(err.public_message(), UPDATE_FAILED_MESSAGE);
    }

    #[test]
    fn not_found_keeps_its_detail() {
        let err = AppError::NotFound("user abc".into());
        assert_eq!(err.public_message(), "Not found: user abc");
    }
}
