//! Shared types, error taxonomy, and configuration for the marketing-mix
//! attribution engine.

pub mod config;
pub mod error;
pub mod types;

pub use config::MixConfig;
pub use error::{MixError, MixResult, SingularReason};
pub use types::{Cell, Field, Metric, Period, RawRecord, RawTable};
