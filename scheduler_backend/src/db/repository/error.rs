//! Error types for request-store operations.
//!
//! Every variant carries an [`ErrorContext`] so log lines say which operation
//! failed, on which table row, and whether trying again can help.

use std::fmt;

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Structured context for repository errors.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "load_pending", "commit")
    pub operation: Option<String>,
    /// The entity type involved (e.g., "request_table", "row")
    pub entity: Option<String>,
    /// The entity ID if applicable
    pub entity_id: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
    /// Whether this error is retryable
    pub retryable: bool,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the entity type.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Set the entity ID.
    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Mark this error as retryable.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref entity) = self.entity {
            parts.push(format!("entity={}", entity));
        }
        if let Some(ref id) = self.entity_id {
            parts.push(format!("id={}", id));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        if self.retryable {
            parts.push("retryable=true".to_string());
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The backing table could not be read.
    /// Usually transient (file locked, share not mounted yet).
    #[error("Store unavailable: {message} {context}")]
    Unavailable {
        message: String,
        context: ErrorContext,
    },

    /// Writing the table back failed; the previous content is still in place.
    #[error("Store commit failed: {message} {context}")]
    CommitError {
        message: String,
        context: ErrorContext,
    },

    /// A row index outside the loaded table.
    #[error("Not found: {message} {context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// Table content is structurally wrong (bad header, short row on write-back).
    #[error("Data validation error: {message} {context}")]
    ValidationError {
        message: String,
        context: ErrorContext,
    },
}

impl RepositoryError {
    /// Create an unavailable error with context.
    pub fn unavailable(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Unavailable {
            message: message.into(),
            context: context.retryable(),
        }
    }

    /// Create a commit error with context.
    pub fn commit(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::CommitError {
            message: message.into(),
            context,
        }
    }

    /// Create a not found error with context.
    pub fn not_found(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::NotFound {
            message: message.into(),
            context,
        }
    }

    /// Create a validation error with context.
    pub fn validation(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ValidationError {
            message: message.into(),
            context,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.context().retryable
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Unavailable { context, .. } => context,
            Self::CommitError { context, .. } => context,
            Self::NotFound { context, .. } => context,
            Self::ValidationError { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        match &mut self {
            Self::Unavailable { context, .. }
            | Self::CommitError { context, .. }
            | Self::NotFound { context, .. }
            | Self::ValidationError { context, .. } => {
                context.operation = Some(operation.into());
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_display() {
        let ctx = ErrorContext::new("commit")
            .with_entity("row")
            .with_entity_id(4)
            .with_details("disk full")
            .retryable();
        assert_eq!(
            ctx.to_string(),
            "[operation=commit, entity=row, id=4, details=disk full, retryable=true]"
        );
    }

    #[test]
    fn test_unavailable_is_retryable() {
        let err = RepositoryError::unavailable("locked", ErrorContext::new("load_pending"));
        assert!(err.is_retryable());
        let err = RepositoryError::commit("rename failed", ErrorContext::new("commit"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_with_operation_overrides() {
        let err = RepositoryError::not_found("row 9", ErrorContext::default())
            .with_operation("mark_completed");
        assert_eq!(err.context().operation.as_deref(), Some("mark_completed"));
        assert!(err.to_string().starts_with("Not found: row 9"));
    }
}
