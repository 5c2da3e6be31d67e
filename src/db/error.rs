use std::fmt;

/// Failure reported by a [`Store`](super::Store) implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The server could not be reached
    Connect(String),
    /// Malformed filter, update or pipeline
    InvalidQuery(String),
    /// Unsupported or malformed command
    InvalidCommand(String),
    /// The server refused the write
    WriteRejected(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connect(msg) => write!(f, "Connection failed: {msg}"),
            StoreError::InvalidQuery(msg) => write!(f, "Invalid query: {msg}"),
            StoreError::InvalidCommand(msg) => write!(f, "Invalid command: {msg}"),
            StoreError::WriteRejected(msg) => write!(f, "Write rejected: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Document mapper failure.
///
/// Write operations only return `Err` for configuration and connection
/// problems; a failed write is reported as `Ok(false)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapperError {
    /// Database, server or collection is not configured
    Configuration(String),
    /// The lazy connection could not be established
    Connection(StoreError),
    /// A read or command failed
    Store(StoreError),
    /// A date helper was asked for a field the record does not have
    UnknownProperty {
        /// Requested field
        property: String,
        /// Collection of the record
        source: String,
    },
}

impl fmt::Display for MapperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapperError::Configuration(msg) => write!(f, "Mapper configuration error: {msg}"),
            MapperError::Connection(err) => write!(f, "Store connection error: {err}"),
            MapperError::Store(err) => write!(f, "Store error: {err}"),
            MapperError::UnknownProperty { property, source } => {
                write!(f, "Property {property} does not exist in {source}")
            }
        }
    }
}

impl std::error::Error for MapperError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapperError::Connection(err) | MapperError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for MapperError {
    fn from(err: StoreError) -> Self {
        MapperError::Store(err)
    }
}
