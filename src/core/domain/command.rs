use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Entity already exists: {entity_type} - {details}")]
    AlreadyExists {
        entity_type: String,
        details: String
    },

    #[error("Entity not found: {entity_type} - {details}")]
    NotFound {
        entity_type: String,
        details: String
    },

    #[error("Concurrent modification detected: {entity_type}")]
    ConcurrencyError {
        entity_type: String,
    },

    #[error("{operation} operation failed: No rows were affected.")]
    NoRowsAffected {
        operation: &'static str,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl CommandError {
    pub fn user_not_found(id: i32) -> Self {
        CommandError::NotFound {
            entity_type: "User".to_string(),
            details: format!("id: {}", id),
        }
    }

    pub fn user_already_exists(id: i32) -> Self {
        CommandError::AlreadyExists {
            entity_type: "User".to_string(),
            details: format!("id: {}", id),
        }
    }
}

/// Fails when a write touched nothing. Backs the insert/update/delete
/// "or fail" repository helpers.
pub fn ensure_affected(operation: &'static str, rows: u64) -> Result<u64, CommandError> {
    if rows == 0 {
        return Err(CommandError::NoRowsAffected { operation });
    }
    Ok(rows)
}
