//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors with context about which record was involved.

use clinicq_types::TicketId;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// No ticket row carries the given id.
    #[error("ticket {0} not found")]
    TicketNotFound(TicketId),

    /// A write collided with a uniqueness rule (e.g. a duplicate ticket
    /// number issued by a racing writer).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored row could not be mapped back into a domain record.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Map a `sqlx` error, classifying unique-constraint violations as
    /// [`DbError::Conflict`].
    pub fn from_write(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_owned())
            }
            other => Self::Postgres(other),
        }
    }
}
