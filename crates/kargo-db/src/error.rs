//! Backend error mapping
//!
//! The only place that inspects sea-orm errors. Everything above receives
//! one of the public error kinds.

use kargo_core::errors::CoreError;
use sea_orm::{DbErr, SqlErr};

/// Map a backend error into the public error vocabulary: unique violation
/// becomes `Conflict`, foreign-key violation `InvalidArgument`, connection
/// loss `Unavailable`; the rest is `Internal`.
pub fn map_db_err(err: DbErr) -> CoreError {
    if let Some(sql_err) = err.sql_err() {
        return match sql_err {
            SqlErr::UniqueConstraintViolation(message) => {
                CoreError::conflict(format!("unique constraint violated: {}", message))
            }
            SqlErr::ForeignKeyConstraintViolation(message) => {
                CoreError::invalid_argument(format!("foreign key violated: {}", message))
            }
            _ => CoreError::internal(sql_err.to_string()),
        };
    }

    match err {
        DbErr::ConnectionAcquire(source) => {
            CoreError::unavailable(format!("failed to acquire connection: {:?}", source))
        }
        DbErr::Conn(source) => CoreError::unavailable(format!("connection error: {}", source)),
        DbErr::RecordNotFound(message) => CoreError::not_found("record", &message),
        other => CoreError::internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kargo_core::errors::ErrorKind;
    use sea_orm::RuntimeErr;

    #[test]
    fn test_connection_errors_map_to_unavailable() {
        let err = DbErr::Conn(RuntimeErr::Internal("refused".to_string()));
        assert_eq!(map_db_err(err).kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn test_unknown_errors_map_to_internal() {
        let err = DbErr::Custom("odd".to_string());
        assert_eq!(map_db_err(err).kind(), ErrorKind::Internal);
    }
}
