//! Task schema scripts and the runner that applies them.
//!
//! Script `n` in [`SCHEMA_SCRIPTS`] upgrades the schema from version `n - 1`
//! to `n`. Scripts are append-only.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;
use std::cmp::Ordering;

const SCHEMA_SCRIPTS: &[&str] = &[include_str!("0001_tasks.sql")];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    SCHEMA_SCRIPTS.len() as u32
}

/// Reads the schema version stamped on `conn`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Brings `conn` up to [`latest_version`] in one transaction.
///
/// Returns how many scripts ran.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<u32> {
    let found = schema_version(conn)?;
    let supported = latest_version();
    match found.cmp(&supported) {
        Ordering::Greater => return Err(DbError::SchemaTooNew { found, supported }),
        Ordering::Equal => {
            debug!("event=db_migrate module=db status=skip version={found}");
            return Ok(0);
        }
        Ordering::Less => {}
    }

    let tx = conn.transaction()?;
    for (version, script) in pending_scripts(found) {
        tx.execute_batch(script)
            .and_then(|()| tx.pragma_update(None, "user_version", version))
            .map_err(|source| DbError::Migration { version, source })?;
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from={found} to={supported}");
    Ok(supported - found)
}

fn pending_scripts(after: u32) -> impl Iterator<Item = (u32, &'static str)> {
    (1_u32..)
        .zip(SCHEMA_SCRIPTS.iter().copied())
        .filter(move |(version, _)| *version > after)
}
