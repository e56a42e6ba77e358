// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fact store: one row per (user, key), latest write wins.

use recall_core::types::now_timestamp;
use recall_core::{Fact, RecallError};
use rusqlite::params;

use crate::database::Database;

/// Inserts the fact, replacing any row with the same `(user_id, key)`.
///
/// The replacement gets a fresh id, so writes within the same millisecond
/// still order correctly.
pub async fn upsert_fact(
    db: &Database,
    user_id: &str,
    session_id: &str,
    key: &str,
    value: &str,
) -> Result<(), RecallError> {
    let fact = Fact {
        user_id: user_id.to_string(),
        session_id: session_id.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        timestamp: now_timestamp(),
    };
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO user_facts (user_id, session_id, key, value, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![fact.user_id, fact.session_id, fact.key, fact.value, fact.timestamp],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All facts for a user, most recently written first.
pub async fn facts_for_user(db: &Database, user_id: &str) -> Result<Vec<Fact>, RecallError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, session_id, key, value, timestamp
                 FROM user_facts WHERE user_id = ?1
                 ORDER BY timestamp DESC, id DESC",
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                Ok(Fact {
                    user_id: row.get(0)?,
                    session_id: row.get(1)?,
                    key: row.get(2)?,
                    value: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn count_facts(db: &Database, user_id: &str) -> Result<usize, RecallError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM user_facts WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, i64>(0),
            )
        })
        .await
        .map(|n| usize::try_from(n).unwrap_or(0))
        .map_err(crate::database::map_tr_err)
}
