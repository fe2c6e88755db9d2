//! Error types for pgselect

use thiserror::Error;

/// Result type alias for pgselect operations
pub type Result<T> = std::result::Result<T, Error>;

/// Schema configuration errors.
///
/// These are raised once, while a [`Schema`](crate::Schema) is being built, and
/// never during query compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Walking a join's parent chain revisited a join before reaching the root.
    #[error("cyclic join dependency: {}", path.join(" -> "))]
    CyclicJoinDependency { join: String, path: Vec<String> },

    /// A join names a parent join that is not declared.
    #[error("join '{join}' depends on unknown parent join '{parent}'")]
    UnknownParent { join: String, parent: String },

    /// A column requires a join that is not declared.
    #[error("column '{column}' references unknown join '{join}'")]
    UnknownJoin { column: String, join: String },

    /// The same join id is declared twice.
    #[error("join '{0}' is declared more than once")]
    DuplicateJoin(String),

    /// A generated alias (`<join>_join`, `<join>_<step>`) collides with
    /// another alias.
    #[error("generated alias '{0}' collides with another join or alias")]
    DuplicateAlias(String),

    /// A join id collides with a reserved alias.
    #[error("'{0}' is reserved and cannot be used as a join id")]
    ReservedAlias(String),

    /// A generated CTE name collides with a join id or table name.
    #[error("generated CTE name '{0}' collides with a declared join or table")]
    DuplicateCte(String),

    /// The configuration document could not be parsed.
    #[error("failed to parse schema configuration: {0}")]
    Parse(String),
}

/// Error types for compilation and execution.
#[derive(Debug, Error)]
pub enum Error {
    /// Schema configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A selector or predicate names a column that is not in the schema
    #[error("Unknown field '{field}' (known fields: {})", known.join(", "))]
    UnknownField { field: String, known: Vec<String> },

    /// A requested join id is not part of the schema's join graph
    #[error("Unknown join '{0}'")]
    UnknownJoin(String),

    /// Selector shape outside the supported grammar
    #[error("Unsupported selector: {0}")]
    UnsupportedSelector(String),

    /// Predicate shape outside the supported grammar
    #[error("Unsupported predicate: {0}")]
    UnsupportedPredicate(String),

    /// A dynamic name failed identifier validation
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// A literal could not be coerced to the column's type
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Query execution error (raised by the execution adapter only)
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// A single-row fetch returned no rows
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Create an unknown-field error listing the known fields.
    pub fn unknown_field<I, S>(field: impl Into<String>, known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::UnknownField {
            field: field.into(),
            known: known.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an invalid-value error for a specific field
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-identifier error
    pub fn invalid_identifier(name: impl Into<String>) -> Self {
        Self::InvalidIdentifier(name.into())
    }

    /// Check if this error was raised while building SQL ("bad query").
    pub fn is_compile_error(&self) -> bool {
        !self.is_query_error()
    }

    /// Check if this error was raised while executing ("bad connection").
    pub fn is_query_error(&self) -> bool {
        matches!(self, Self::Query(_) | Self::NotFound(_))
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
