// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Recall integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - completion provider with pre-configured responses
//! - [`FailingProvider`] - completion provider that always errors
//! - [`MockMemoryBank`] - local stand-in for the cloud memory bank
//! - [`TestHarness`] - full stack over a temp database

pub mod harness;
pub mod mock_memory_bank;
pub mod mock_provider;

pub use harness::TestHarness;
pub use mock_memory_bank::MockMemoryBank;
pub use mock_provider::{FailingProvider, MockProvider};
