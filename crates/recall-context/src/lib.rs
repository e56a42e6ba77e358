// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context assembly for the Recall memory layer.
//!
//! For every chat turn the [`ContextAssembler`]:
//! 1. resolves the session on the active backend,
//! 2. gathers facts, recent turns, keyword matches and (when the backend
//!    offers it) long-term memory into ordered [`Fragment`]s,
//! 3. asks the completion provider for a reply, falling back to a canned one,
//! 4. extracts facts from the user's message and logs and indexes both turns,
//! 5. commits the session to long-term memory in the background.

pub mod assembler;
pub mod fallback;
pub mod fragments;
pub mod state;

pub use assembler::{AssemblerSettings, ContextAssembler, TurnOutcome, TurnRequest};
pub use fallback::fallback_response;
pub use fragments::{render_prompt, Fragment};
pub use state::{TurnMachine, TurnState};
