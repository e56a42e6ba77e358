// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Recall.
//!
//! Exposes the context assembler over a small REST surface. Every route is
//! stateless apart from the shared [`GatewayState`]; sessions, facts and
//! history live in the configured memory backend.

pub mod handlers;
pub mod server;

pub use server::{router, start_server, GatewayState, ServerConfig};
