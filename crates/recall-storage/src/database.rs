// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;

use recall_core::RecallError;
use tracing::debug;

use crate::migrations::run_migrations;

/// Handle to the SQLite database backing the local stores.
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
}

/// Maps a tokio-rusqlite error into the storage variant.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> RecallError {
    RecallError::Storage {
        source: Box::new(e),
    }
}

fn storage_err(e: rusqlite::Error) -> RecallError {
    RecallError::Storage {
        source: Box::new(e),
    }
}

impl Database {
    /// Opens (creating if needed) the database at `path` in WAL mode.
    pub async fn open(path: &str) -> Result<Self, RecallError> {
        Self::open_with(path, true).await
    }

    /// Opens the database, applying pragmas and pending migrations first.
    ///
    /// Migrations run on a plain blocking connection inside `spawn_blocking`,
    /// then the long-lived async connection is opened.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, RecallError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| RecallError::Storage {
                source: Box::new(e),
            })?;
        }

        let owned = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), RecallError> {
            let mut conn = rusqlite::Connection::open(&owned).map_err(storage_err)?;
            if wal_mode {
                let mode: String = conn
                    .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
                    .map_err(storage_err)?;
                debug!(journal_mode = %mode, "journal mode set");
            }
            run_migrations(&mut conn)
        })
        .await
        .map_err(|e| RecallError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| RecallError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Runs a trivial query to prove the connection thread is alive.
    pub async fn ping(&self) -> Result<(), RecallError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoints and truncates the WAL so the main file is self-contained.
    pub async fn close(&self) -> Result<(), RecallError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(path = %self.path, "WAL checkpoint complete");
        Ok(())
    }
}
