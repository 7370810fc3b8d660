use super::types::StatementKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BindError {
    #[error("Source read error: {0}")]
    SourceRead(String),

    #[error("Definition conflict for '{owner}': table '{existing}' != '{incoming}'")]
    DefinitionConflict {
        owner: String,
        existing: String,
        incoming: String,
    },

    #[error("Bad SQL template '{statement}': {message}")]
    TemplateSyntax { statement: String, message: String },

    #[error("No statements mapped to type '{0}'")]
    UnmappedType(String),

    #[error("'{0}' must have a field named db holding a database handle")]
    MissingHandle(String),

    #[error("No statement '{operation}' mapped for '{owner}'")]
    UnmappedOperation { owner: String, operation: String },

    #[error(
        "Operation '{operation}' takes {declared} argument(s) but its statement declares {defined}"
    )]
    ArityMismatch {
        operation: String,
        declared: usize,
        defined: usize,
    },

    #[error("Operation '{operation}' returns {shape}, which cannot carry a {kind} result")]
    ShapeMismatch {
        operation: String,
        shape: String,
        kind: StatementKind,
    },

    #[error("Cache field of '{type_name}' must be Option<Box<{type_name}>>, found {found}")]
    BadCacheField { type_name: String, found: String },

    #[error("'{0}' cannot use a cache because no cache backend is configured")]
    CacheUnavailable(String),

    #[error("Template execution error: {0}")]
    TemplateExecution(String),

    #[error("No rows in result set")]
    NoRows,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Operation {0} was never bound")]
    Unbound(String),

    #[error("Database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl BindError {
    /// Wrap a driver error so it can travel through an operation's result.
    pub fn database<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Database(err.into())
    }

    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRows)
    }
}

pub type Result<T> = std::result::Result<T, BindError>;

impl<T> From<std::sync::PoisonError<T>> for BindError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_message_names_both_counts() {
        let err = BindError::ArityMismatch {
            operation: "FindByName".into(),
            declared: 1,
            defined: 2,
        };
        let message = err.to_string();
        assert!(message.contains('1'));
        assert!(message.contains('2'));
        assert!(message.contains("FindByName"));
    }

    #[test]
    fn test_database_error_keeps_source() {
        let err = BindError::database("connection reset");
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "Database error: connection reset");
        assert!(!err.is_no_rows());
    }
}
