//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! rental system test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data and a ready-made service environment
//! - `builders`: Builder patterns for test data construction
//! - `memory`: In-memory rental store with transactional semantics
//! - `mocks`: Mock gateway, notifier, and object-storage collaborators
//! - `assertions`: Custom assertion helpers for domain errors

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod memory;
pub mod mocks;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use memory::*;
pub use mocks::*;
