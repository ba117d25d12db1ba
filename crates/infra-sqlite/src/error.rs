// sqlx::Error -> TaskError
//
// Lives here rather than as a From impl in core: core has no sqlx dependency
// and the orphan rule rules out implementing it in this crate.

use taskpad_core::error::TaskError;

/// Convert sqlx::Error to TaskError::Storage with the SQLite result code
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> TaskError {
    match &err {
        sqlx::Error::Database(db_err) => {
            // SQLite result codes: https://www.sqlite.org/rescode.html
            match db_err.code().as_deref() {
                Some("2067") | Some("1555") => TaskError::Storage(format!(
                    "Unique constraint violation: {}",
                    db_err.message()
                )),
                Some("5") => TaskError::Storage(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                Some("13") => TaskError::Storage(format!("Database full: {}", db_err.message())),
                Some(code) => TaskError::Storage(format!(
                    "Database error [{}]: {}",
                    code,
                    db_err.message()
                )),
                None => TaskError::Storage(format!("Database error: {}", db_err.message())),
            }
        }
        sqlx::Error::ColumnNotFound(col) => {
            TaskError::Storage(format!("Column not found: {}", col))
        }
        _ => TaskError::Storage(err.to_string()),
    }
}
