// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions, one module per table.

pub mod conversation;
pub mod facts;
pub mod semantic;
pub mod sessions;

/// Converts a `usize` limit into the `i64` SQLite expects, saturating.
pub(crate) fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
