// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic context index: weighted snippets searched by keyword.

use recall_core::types::now_timestamp;
use recall_core::{ContextType, KeywordQuery, RecallError, SemanticContextEntry};
use rusqlite::params;

use crate::database::Database;

pub async fn index_context(
    db: &Database,
    user_id: &str,
    session_id: &str,
    context_type: ContextType,
    content: &str,
    relevance_score: f64,
) -> Result<(), RecallError> {
    let user_id = user_id.to_string();
    let session_id = session_id.to_string();
    let content = content.to_string();
    let timestamp = now_timestamp();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO semantic_context
                     (user_id, session_id, context_type, content, relevance_score, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user_id,
                    session_id,
                    context_type.as_str(),
                    content,
                    relevance_score,
                    timestamp,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Entries whose content contains every token of `query`, best first.
///
/// Rows are walked in (score, recency) order and matched with the shared
/// case-insensitive matcher; the scan stops once `limit` matches are found.
pub async fn search_context(
    db: &Database,
    user_id: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<SemanticContextEntry>, RecallError> {
    let query = KeywordQuery::parse(query);
    if query.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, session_id, context_type, content, relevance_score, timestamp
                 FROM semantic_context WHERE user_id = ?1
                 ORDER BY relevance_score DESC, timestamp DESC, id DESC",
            )?;
            let mut rows = stmt.query(params![user_id])?;
            let mut matches = Vec::new();
            while let Some(row) = rows.next()? {
                let content: String = row.get(4)?;
                if !query.matches(&content) {
                    continue;
                }
                let context_type: String = row.get(3)?;
                matches.push(SemanticContextEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    session_id: row.get(2)?,
                    context_type: ContextType::from_str_value(&context_type),
                    content,
                    relevance_score: row.get(5)?,
                    timestamp: row.get(6)?,
                });
                if matches.len() >= limit {
                    break;
                }
            }
            Ok(matches)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn count_entries(db: &Database, user_id: &str) -> Result<usize, RecallError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM semantic_context WHERE user_id = ?1",
                params![user_id],
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

    async fn index(db: &Database, context_type: ContextType, content: &str) {
        index_context(
            db,
            "u1",
            "s1",
            context_type,
            content,
            context_type.default_relevance(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn search_requires_every_token() {
        let (db, _dir) = setup_db().await;
        index(&db, ContextType::UserMessage, "I like green tea").await;
        index(&db, ContextType::UserMessage, "I like coffee").await;

        let hits = search_context(&db, "u1", "LIKE tea", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "I like green tea");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn user_content_outranks_agent_content() {
        let (db, _dir) = setup_db().await;
        index(&db, ContextType::AgentResponse, "tea is great").await;
        index(&db, ContextType::UserMessage, "tea please").await;
        index(&db, ContextType::AgentResponse, "more tea").await;

        let hits = search_context(&db, "u1", "tea", 5).await.unwrap();
        let scores: Vec<f64> = hits.iter().map(|h| h.relevance_score).collect();
        assert_eq!(scores, vec![1.0, 0.8, 0.8]);
        assert_eq!(hits[0].context_type, ContextType::UserMessage);
        // Same score: newer first.
        assert_eq!(hits[1].content, "more tea");
    }

    #[tokio::test]
    async fn search_is_bounded_by_limit() {
        let (db, _dir) = setup_db().await;
        for i in 0..8 {
            index(&db, ContextType::UserMessage, &format!("note {i}")).await;
        }
        let hits = search_context(&db, "u1", "note", 5).await.unwrap();
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].content, "note 7");
        assert_eq!(count_entries(&db, "u1").await.unwrap(), 8);
    }

    #[tokio::test]
    async fn blank_query_returns_nothing() {
        let (db, _dir) = setup_db().await;
        index(&db, ContextType::UserMessage, "anything at all").await;
        assert!(search_context(&db, "u1", "  ", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_is_scoped_to_user() {
        let (db, _dir) = setup_db().await;
        index(&db, ContextType::UserMessage, "secret plans").await;
        assert!(search_context(&db, "u2", "secret", 5).await.unwrap().is_empty());
    }
}
