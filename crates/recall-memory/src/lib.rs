// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory backends for the Recall memory layer.
//!
//! ## Architecture
//!
//! - **extract_facts**: pattern-based fact extraction (English and Spanish)
//! - **SessionRegistry**: in-process sessions for backends without SQL
//! - **LocalRelationalBackend**: everything in the SQLite file
//! - **InMemorySessionBackend**: process-local sessions and long-term store
//! - **CloudSemanticBackend**: managed memory bank plus a local mirror
//! - **build_backend**: picks one of the three from configuration

pub mod cloud;
pub mod extractor;
pub mod factory;
pub mod in_memory;
pub mod local;
pub mod registry;

pub use cloud::{CloudSemanticBackend, MemoryBankClient};
pub use extractor::{extract_facts, ExtractedFact};
pub use factory::build_backend;
pub use in_memory::{InMemorySessionBackend, InMemoryStore};
pub use local::LocalRelationalBackend;
pub use registry::SessionRegistry;
