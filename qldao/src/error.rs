/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    /// The attribute name is not declared by the entity's capability table.
    UnknownAttribute {
        entity: &'static str,
        attribute: String,
    },
    /// The supplied value cannot be coerced to the attribute's declared type.
    TypeMismatch {
        attribute: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
    /// The entity type carries no usable storage mapping (empty or malformed
    /// table name). Fatal configuration error, surfaced at first use.
    UnmappedType { entity: &'static str },
    /// An identifier (column, alias) failed validation.
    InvalidIdentifier { kind: &'static str, ident: String },
    /// A single-row lookup matched more than one row.
    AmbiguousResult { matched: usize },
    /// Placeholder count and parameter count disagree.
    ParameterCountMismatch { expected: usize, actual: usize },
    /// A sort direction was neither ascending nor descending.
    InvalidSortDirection(String),
    /// The operation requires a persisted entity but the primary key is absent.
    MissingPrimaryKey(&'static str),
    /// A keyed lookup found no row where one was required.
    NotFound(String),
    /// A failure originating in the persistence provider, passed through
    /// unmodified.
    Provider(Box<dyn std::error::Error + Send + Sync>),
}

impl DataError {
    /// Construct a `Provider` variant from any error type.
    ///
    /// Used by backend crates (e.g. `qldao-sqlx`) to wrap driver-specific
    /// errors.
    pub fn provider(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Provider(Box::new(err))
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::UnknownAttribute { entity, attribute } => {
                write!(f, "Unknown attribute `{attribute}` on entity `{entity}`")
            }
            DataError::TypeMismatch {
                attribute,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Type mismatch on attribute `{attribute}`: expected {expected}, got {actual}"
                )
            }
            DataError::UnmappedType { entity } => {
                write!(f, "Entity `{entity}` has no valid storage mapping")
            }
            DataError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            DataError::AmbiguousResult { matched } => {
                write!(f, "Expected at most one row, query matched {matched}")
            }
            DataError::ParameterCountMismatch { expected, actual } => {
                write!(
                    f,
                    "Parameter count mismatch: query has {expected} placeholders, {actual} parameters supplied"
                )
            }
            DataError::InvalidSortDirection(dir) => {
                write!(f, "Invalid sort direction: {dir}")
            }
            DataError::MissingPrimaryKey(entity) => {
                write!(f, "Entity `{entity}` has no primary key value")
            }
            DataError::NotFound(msg) => write!(f, "Not found: {msg}"),
            DataError::Provider(err) => write!(f, "Provider error: {err}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Provider(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
