use thiserror::Error;

/// Centralized error types for the application
///
/// Repositories, the auth helpers and the bot all return this enum; the HTTP
/// layer maps it onto status codes in one place.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors (already retried if they were transient)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Entity lookup came back empty
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A required request field is missing or malformed
    #[error("{0}")]
    Validation(String),

    /// Bad admin credentials or token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Password hashing or token signing failures
    #[error("Auth error: {0}")]
    Auth(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// A dependency (e.g. the Telegram bot) is not configured
    #[error("{0}")]
    Unavailable(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Shorthand for a missing required field.
    pub fn missing(field: &str) -> Self {
        AppError::Validation(format!("{} is required", field))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Auth(err.to_string())
    }
}

/// How a database failure should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Connection unreachable or pool exhausted; worth retrying
    Transient,
    /// Unique constraint violation
    UniqueViolation,
    /// Foreign key points at a missing row
    ForeignKeyViolation,
    /// Query references a column or table that does not exist
    SchemaMismatch,
    /// Query returned no row where one was required
    NotFound,
    /// Anything else
    Other,
}

/// SQLSTATE codes we act on.
///
/// See <https://www.postgresql.org/docs/current/errcodes-appendix.html>.
pub mod sqlstate {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const UNDEFINED_COLUMN: &str = "42703";
    pub const UNDEFINED_TABLE: &str = "42P01";
    pub const TOO_MANY_CONNECTIONS: &str = "53300";
    pub const ADMIN_SHUTDOWN: &str = "57P01";
    pub const CRASH_SHUTDOWN: &str = "57P02";
    pub const CANNOT_CONNECT_NOW: &str = "57P03";
    /// Class 08, connection exception
    pub const CONNECTION_EXCEPTION_CLASS: &str = "08";
}

/// Classifies a sqlx error using its structured SQLSTATE code.
pub fn classify(err: &sqlx::Error) -> DbErrorKind {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => DbErrorKind::Transient,
        // Handshake and certificate failures repeat on every attempt
        sqlx::Error::Tls(_) => DbErrorKind::Other,
        sqlx::Error::RowNotFound => DbErrorKind::NotFound,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(code) => classify_sqlstate(code),
            None => DbErrorKind::Other,
        },
        _ => DbErrorKind::Other,
    }
}

fn classify_sqlstate(code: &str) -> DbErrorKind {
    match code {
        sqlstate::UNIQUE_VIOLATION => DbErrorKind::UniqueViolation,
        sqlstate::FOREIGN_KEY_VIOLATION => DbErrorKind::ForeignKeyViolation,
        sqlstate::UNDEFINED_COLUMN | sqlstate::UNDEFINED_TABLE => DbErrorKind::SchemaMismatch,
        sqlstate::TOO_MANY_CONNECTIONS
        | sqlstate::ADMIN_SHUTDOWN
        | sqlstate::CRASH_SHUTDOWN
        | sqlstate::CANNOT_CONNECT_NOW => DbErrorKind::Transient,
        c if c.starts_with(sqlstate::CONNECTION_EXCEPTION_CLASS) => DbErrorKind::Transient,
        _ => DbErrorKind::Other,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::server_error;
    use super::*;

    #[test]
    fn test_pool_and_io_errors_are_transient() {
        assert_eq!(classify(&sqlx::Error::PoolTimedOut), DbErrorKind::Transient);
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(classify(&sqlx::Error::Io(io)), DbErrorKind::Transient);
    }

    #[test]
    fn test_closed_pool_is_not_transient() {
        assert_eq!(classify(&sqlx::Error::PoolClosed), DbErrorKind::Other);
    }

    #[test]
    fn test_row_not_found() {
        assert_eq!(classify(&sqlx::Error::RowNotFound), DbErrorKind::NotFound);
    }

    #[test]
    fn test_sqlstate_codes() {
        assert_eq!(classify_sqlstate("23505"), DbErrorKind::UniqueViolation);
        assert_eq!(classify_sqlstate("23503"), DbErrorKind::ForeignKeyViolation);
        assert_eq!(classify_sqlstate("42703"), DbErrorKind::SchemaMismatch);
        assert_eq!(classify_sqlstate("42P01"), DbErrorKind::SchemaMismatch);
        assert_eq!(classify_sqlstate("08006"), DbErrorKind::Transient);
        assert_eq!(classify_sqlstate("08001"), DbErrorKind::Transient);
        assert_eq!(classify_sqlstate("53300"), DbErrorKind::Transient);
        assert_eq!(classify_sqlstate("57P03"), DbErrorKind::Transient);
        assert_eq!(classify_sqlstate("22001"), DbErrorKind::Other);
    }

    #[test]
    fn test_tls_failure_is_not_transient() {
        let tls = sqlx::Error::Tls("invalid peer certificate: UnknownIssuer".into());
        assert_eq!(classify(&tls), DbErrorKind::Other);
    }

    #[test]
    fn test_server_errors_are_classified_by_code() {
        assert_eq!(classify(&server_error("23505")), DbErrorKind::UniqueViolation);
        assert_eq!(classify(&server_error("23503")), DbErrorKind::ForeignKeyViolation);
        assert_eq!(classify(&server_error("42703")), DbErrorKind::SchemaMismatch);
        assert_eq!(classify(&server_error("08006")), DbErrorKind::Transient);
        assert_eq!(classify(&server_error("57P03")), DbErrorKind::Transient);
        assert_eq!(classify(&server_error("22P02")), DbErrorKind::Other);
    }

    #[test]
    fn test_missing_field_message() {
        assert_eq!(AppError::missing("telegramId").to_string(), "telegramId is required");
    }
}
