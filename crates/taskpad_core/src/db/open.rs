//! Connection bootstrap for the task database.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and a busy timeout.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Location reported for in-memory databases.
pub const MEMORY_LOCATION: &str = ":memory:";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the task database file and applies all pending migrations.
///
/// # Side effects
/// - Creates the file when missing.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    open_with(path.to_path_buf(), || Connection::open(path))
}

/// Opens an in-memory task database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with(PathBuf::from(MEMORY_LOCATION), Connection::open_in_memory)
}

fn open_with(
    path: PathBuf,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    let in_memory = path.as_os_str() == MEMORY_LOCATION;
    info!("event=db_open module=db status=start in_memory={in_memory}");

    let outcome = connect()
        .map_err(|source| DbError::Open { path, source })
        .and_then(|mut conn| bootstrap_connection(&mut conn).map(|applied| (conn, applied)));

    match outcome {
        Ok((conn, applied)) => {
            info!(
                "event=db_open module=db status=ok in_memory={in_memory} migrations_applied={applied} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error in_memory={in_memory} duration_ms={} error_code={} error={err}",
                started_at.elapsed().as_millis(),
                error_code(&err)
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<u32> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)
}

fn error_code(err: &DbError) -> &'static str {
    match err {
        DbError::Open { .. } => "db_open_failed",
        DbError::Sqlite(_) => "db_bootstrap_failed",
        DbError::Migration { .. } => "db_migration_failed",
        DbError::SchemaTooNew { .. } => "db_schema_too_new",
    }
}
