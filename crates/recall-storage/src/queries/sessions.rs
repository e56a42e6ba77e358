// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relational session registry.

use std::str::FromStr;

use recall_core::types::now_timestamp;
use recall_core::{BackendKind, RecallError, Session, SessionPolicy};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;

const SESSION_COLUMNS: &str = "id, user_id, backend, created_at, last_activity_at";

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<Session, rusqlite::Error> {
    let backend: String = row.get(2)?;
    let backend = BackendKind::from_str(&backend).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Session {
        id: row.get(0)?,
        user_id: row.get(1)?,
        backend,
        created_at: row.get(3)?,
        last_activity_at: row.get(4)?,
    })
}

fn find(conn: &rusqlite::Connection, id: &str) -> Result<Option<Session>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
        params![id],
        row_to_session,
    )
    .optional()
}

fn insert(conn: &rusqlite::Connection, session: &Session) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO sessions (id, user_id, backend, created_at, last_activity_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            session.id,
            session.user_id,
            session.backend.as_str(),
            session.created_at,
            session.last_activity_at,
        ],
    )?;
    Ok(())
}

fn touch(conn: &rusqlite::Connection, mut session: Session) -> Result<Session, rusqlite::Error> {
    session.last_activity_at = now_timestamp();
    conn.execute(
        "UPDATE sessions SET last_activity_at = ?1 WHERE id = ?2",
        params![session.last_activity_at, session.id],
    )?;
    Ok(session)
}

/// Resolves the session for `(user_id, backend)` in a single transaction.
///
/// A requested id owned by the same user and backend is resumed, an unknown
/// one is adopted, and one owned by anyone else is ignored in favour of a
/// fresh id. Without a requested id the most recently created session is
/// resumed when `policy` allows it.
pub async fn get_or_create(
    db: &Database,
    user_id: &str,
    backend: BackendKind,
    requested: Option<&str>,
    policy: SessionPolicy,
) -> Result<Session, RecallError> {
    let user_id = user_id.to_string();
    let requested = requested.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let session = match requested {
                Some(id) => match find(&tx, &id)? {
                    Some(existing)
                        if existing.user_id == user_id && existing.backend == backend =>
                    {
                        touch(&tx, existing)?
                    }
                    Some(_) => {
                        let fresh = Session::generate(&user_id, backend);
                        insert(&tx, &fresh)?;
                        fresh
                    }
                    None => {
                        let adopted = Session::new(id, &user_id, backend);
                        insert(&tx, &adopted)?;
                        adopted
                    }
                },
                None => {
                    let latest = tx
                        .query_row(
                            &format!(
                                "SELECT {SESSION_COLUMNS} FROM sessions
                                 WHERE user_id = ?1 AND backend = ?2
                                 ORDER BY created_at DESC, rowid DESC LIMIT 1"
                            ),
                            params![user_id, backend.as_str()],
                            row_to_session,
                        )
                        .optional()?;
                    match latest {
                        Some(s) if policy.allows_reuse(&s, chrono::Utc::now()) => touch(&tx, s)?,
                        _ => {
                            let fresh = Session::generate(&user_id, backend);
                            insert(&tx, &fresh)?;
                            fresh
                        }
                    }
                }
            };
            tx.commit()?;
            Ok(session)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_session(db: &Database, id: &str) -> Result<Option<Session>, RecallError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| find(conn, &id))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Bumps `last_activity_at`. Unknown ids are ignored.
pub async fn touch_session(db: &Database, id: &str) -> Result<(), RecallError> {
    let id = id.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sessions SET last_activity_at = ?1 WHERE id = ?2",
                params![now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Sessions of a user on one backend, most recently created first.
pub async fn sessions_for_user(
    db: &Database,
    user_id: &str,
    backend: BackendKind,
) -> Result<Vec<Session>, RecallError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE user_id = ?1 AND backend = ?2
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map(params![user_id, backend.as_str()], row_to_session)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Marks the session committed. Returns `false` when it was already committed
/// or does not exist.
pub async fn mark_committed(db: &Database, id: &str) -> Result<bool, RecallError> {
    let id = id.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE sessions SET committed_at = ?1
                 WHERE id = ?2 AND (committed_at IS NULL OR committed_at < last_activity_at)",
                params![now, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
