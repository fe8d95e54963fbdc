//! Integration tests for the publication checks
//!
//! These tests drive the checks and the publication scenario against
//! scripted HTTP backends and an in-memory object store.

pub mod backend_failures;
pub mod helpers;
pub mod publication_flow;
pub mod settings_loading;
