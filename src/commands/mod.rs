//! Command implementations behind the `spectrum` binary.

pub mod api;
pub mod check;
pub mod journal;
pub mod publish;
pub mod scenario;
pub mod upload;

mod context;

pub use context::Environment;
