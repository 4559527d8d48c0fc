#![forbid(unsafe_code)]

pub mod atomic;
pub mod backup;
pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod platform;
pub mod retry;

pub use config::EngineConfig;
pub use engine::{ApplyReport, MutationEngine, RevertReport};
pub use error::EngineError;
pub use outcome::{Outcome, OutcomeTag};
