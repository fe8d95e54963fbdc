pub mod article;
pub mod checks;
pub mod commands;
pub mod config;
pub mod error;
pub mod fakes;
pub mod http;
pub mod input;
pub mod logging;
pub mod poll;
pub mod scenario;
pub mod storage;
pub mod validation;

pub use article::{Article, KeyParams};
pub use error::{CheckError, TimeoutFailure, TransportError, UnrecoverableFailure};
pub use poll::{poll, PollConfig, PollRequest, PollResult};
