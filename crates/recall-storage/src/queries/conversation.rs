// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation log: append-only record of every user and agent turn.

use recall_core::types::now_timestamp;
use recall_core::{ConversationTurn, RecallError, Role};
use rusqlite::params;

use crate::database::Database;
use crate::queries::sql_limit;

/// Appends a turn stamped with the current time and returns the stored row.
pub async fn log_turn(
    db: &Database,
    user_id: &str,
    session_id: &str,
    role: Role,
    content: &str,
) -> Result<ConversationTurn, RecallError> {
    let mut turn = ConversationTurn {
        id: 0,
        user_id: user_id.to_string(),
        session_id: session_id.to_string(),
        role,
        content: content.to_string(),
        timestamp: now_timestamp(),
    };
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversation_log (user_id, session_id, role, content, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    turn.user_id,
                    turn.session_id,
                    turn.role.as_str(),
                    turn.content,
                    turn.timestamp,
                ],
            )?;
            turn.id = conn.last_insert_rowid();
            Ok(turn)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recent turns for a user across all sessions, newest first.
///
/// Rows sharing a timestamp keep insertion order through the autoincrement id.
pub async fn recent_turns(
    db: &Database,
    user_id: &str,
    limit: usize,
) -> Result<Vec<ConversationTurn>, RecallError> {
    let user_id = user_id.to_string();
    let limit = sql_limit(limit);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, session_id, role, content, timestamp
                 FROM conversation_log WHERE user_id = ?1
                 ORDER BY timestamp DESC, id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id, limit], |row| {
                let role: String = row.get(3)?;
                Ok(ConversationTurn {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    session_id: row.get(2)?,
                    role: Role::from_str_value(&role),
                    content: row.get(4)?,
                    timestamp: row.get(5)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of turns logged for a user.
pub async fn count_turns(db: &Database, user_id: &str) -> Result<usize, RecallError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM conversation_log WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, i64>(0),
            )
        })
        .await
        .map(|n| usize::try_from(n).unwrap_or(0))
        .map_err(crate::database::map_tr_err)
}

/// Number of turns logged for one session.
pub async fn count_session_turns(db: &Database, session_id: &str) -> Result<usize, RecallError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM conversation_log WHERE session_id = ?1",
                params![session_id],
                |row| row.get::<_, i64>(0),
            )
        })
        .await
        .map(|n| usize::try_from(n).unwrap_or(0))
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn recent_turns_are_newest_first_without_gaps() {
        let (db, _dir) = setup_db().await;
        for i in 0..6 {
            let role = if i % 2 == 0 { Role::User } else { Role::Agent };
            log_turn(&db, "u1", "s1", role, &format!("turn {i}"))
                .await
                .unwrap();
        }

        let turns = recent_turns(&db, "u1", 4).await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["turn 5", "turn 4", "turn 3", "turn 2"]);
        assert_eq!(turns[0].role, Role::Agent);
        assert!(turns.windows(2).all(|w| w[0].id > w[1].id));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recent_turns_are_scoped_to_user() {
        let (db, _dir) = setup_db().await;
        log_turn(&db, "u1", "s1", Role::User, "mine").await.unwrap();
        log_turn(&db, "u2", "s2", Role::User, "theirs").await.unwrap();

        let turns = recent_turns(&db, "u1", 10).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "mine");
        assert_eq!(count_turns(&db, "u2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn log_turn_returns_stored_row() {
        let (db, _dir) = setup_db().await;
        let first = log_turn(&db, "u1", "s1", Role::User, "hola").await.unwrap();
        let second = log_turn(&db, "u1", "s1", Role::Agent, "¡hola!").await.unwrap();
        assert!(second.id > first.id);
        assert_eq!(second.role, Role::Agent);
        assert_eq!(count_session_turns(&db, "s1").await.unwrap(), 2);
        assert_eq!(count_session_turns(&db, "other").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_log_returns_nothing() {
        let (db, _dir) = setup_db().await;
        assert!(recent_turns(&db, "nobody", 5).await.unwrap().is_empty());
        assert_eq!(count_turns(&db, "nobody").await.unwrap(), 0);
    }
}
