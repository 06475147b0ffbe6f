use crate::db::DbError;
use crate::model::marker::{MarkerId, MarkerValidationError};
use crate::repo::marker_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Marker store failures surfaced to callers.
#[derive(Debug)]
pub enum StoreError {
    /// Referenced marker no longer exists.
    NotFound(MarkerId),
    /// Symbol content could not be read at creation.
    ResourceUnavailable { reference: String, reason: String },
    /// Persistence rejected a read or write.
    StorageWriteFailed(DbError),
    /// Rewrite to the new schema aborted; the previous store is still active.
    SchemaMigrationFailed { reason: String },
    Validation(MarkerValidationError),
    InvalidData(String),
    EditInProgress,
    NoOpenEdit,
    /// The store file could not be reopened after a swap.
    Detached { reason: String },
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl StoreError {
    pub(crate) fn from_open(err: DbError) -> Self {
        match err {
            DbError::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            },
            other => Self::StorageWriteFailed(other),
        }
    }

    pub(crate) fn migration(err: DbError) -> Self {
        match err {
            DbError::UnsupportedSchemaVersion { .. } => Self::from_open(err),
            other => Self::SchemaMigrationFailed {
                reason: other.to_string(),
            },
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "marker not found: {id}"),
            Self::ResourceUnavailable { reference, reason } => {
                write!(f, "symbol `{reference}` unavailable: {reason}")
            }
            Self::StorageWriteFailed(err) => write!(f, "marker storage failed: {err}"),
            Self::SchemaMigrationFailed { reason } => {
                write!(f, "marker schema migration failed: {reason}")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid marker data: {message}"),
            Self::EditInProgress => write!(f, "an edit transaction is already open"),
            Self::NoOpenEdit => write!(f, "no edit transaction is open"),
            Self::Detached { reason } => {
                write!(f, "marker store is detached after a failed reopen: {reason}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "marker store schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageWriteFailed(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::Db(err) => Self::from_open(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::InvalidData(message) => Self::InvalidData(message),
            other => Self::InvalidData(other.to_string()),
        }
    }
}

impl From<MarkerValidationError> for StoreError {
    fn from(value: MarkerValidationError) -> Self {
        Self::Validation(value)
    }
}
