//! Connection plumbing shared by the SQLite-backed stores

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::StorageError;
use crate::storage::run_blocking;

pub(crate) type SharedConnection = Arc<Mutex<Connection>>;

// The queue and table stores open the same database file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn open(db_path: &Path) -> Result<Connection, StorageError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

pub(crate) fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StorageError> {
    conn.lock()
        .map_err(|_| StorageError::backend("database lock poisoned"))
}

/// Runs `f` against the connection on the blocking thread pool
pub(crate) async fn with_connection<T, F>(conn: &SharedConnection, f: F) -> Result<T, StorageError>
where
    F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    let conn = Arc::clone(conn);
    run_blocking(move || {
        let mut guard = lock(&conn)?;
        f(&mut guard)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn test_with_connection_runs_off_the_executor() {
        let conn: SharedConnection = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
        let answer = with_connection(&conn, |c| Ok(c.query_row("SELECT 40 + 2", [], |row| row.get::<_, i64>(0))?))
            .await
            .unwrap();
        assert_eq!(answer, 42);

        let failed: Result<(), StorageError> =
            with_connection(&conn, |c| Ok(c.execute_batch("NOT SQL")?)).await;
        assert!(matches!(failed, Err(StorageError::Backend(_))));
    }
}
