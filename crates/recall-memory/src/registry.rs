// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process session registry for backends without a relational store.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use recall_core::types::now_timestamp;
use recall_core::{BackendKind, Session, SessionPolicy};

/// Sessions of one backend scope, keyed by user.
///
/// Resolution for a user happens under that user's map entry, so concurrent
/// first turns of the same user end up on the same session.
pub struct SessionRegistry {
    scope: BackendKind,
    policy: SessionPolicy,
    /// user id -> sessions, oldest first
    by_user: DashMap<String, Vec<Session>>,
    /// session id -> owning user id
    owners: DashMap<String, String>,
}

impl SessionRegistry {
    pub fn new(scope: BackendKind, policy: SessionPolicy) -> Self {
        Self {
            scope,
            policy,
            by_user: DashMap::new(),
            owners: DashMap::new(),
        }
    }

    /// Resumes or creates the session for `user_id`.
    ///
    /// A `requested` id already owned by this user is resumed, an unknown one
    /// is adopted, and one owned by another user is ignored.
    pub fn get_or_create(&self, user_id: &str, requested: Option<&str>) -> Session {
        // Lock order: user entry, then owners.
        let mut sessions = self.by_user.entry(user_id.to_string()).or_default();

        if let Some(id) = requested {
            if let Some(existing) = sessions.iter_mut().find(|s| s.id == id) {
                existing.last_activity_at = now_timestamp();
                return existing.clone();
            }
            if let Entry::Vacant(slot) = self.owners.entry(id.to_string()) {
                slot.insert(user_id.to_string());
                let adopted = Session::new(id.to_string(), user_id, self.scope);
                sessions.push(adopted.clone());
                return adopted;
            }
            tracing::warn!(user_id, requested = id, "session id owned by another user, issuing a new one");
        } else if let Some(latest) = sessions.last_mut()
            && self.policy.allows_reuse(latest, chrono::Utc::now())
        {
            latest.last_activity_at = now_timestamp();
            return latest.clone();
        }

        let fresh = Session::generate(user_id, self.scope);
        self.owners.insert(fresh.id.clone(), user_id.to_string());
        sessions.push(fresh.clone());
        fresh
    }

    /// Bumps `last_activity_at` of a known session.
    pub fn touch(&self, session: &Session) {
        if let Some(mut sessions) = self.by_user.get_mut(&session.user_id)
            && let Some(s) = sessions.iter_mut().find(|s| s.id == session.id)
        {
            s.last_activity_at = now_timestamp();
        }
    }

    /// The user's sessions, most recently created first.
    pub fn sessions_for(&self, user_id: &str) -> Vec<Session> {
        self.by_user
            .get(user_id)
            .map(|sessions| sessions.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
