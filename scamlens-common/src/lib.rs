//! # scamlens common library
//!
//! Shared plumbing for the scamlens services:
//! - Error types
//! - Configuration loading (TOML with compiled defaults)
//! - Bounded in-memory report store

pub mod config;
pub mod error;
pub mod store;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use store::{MemoryReportStore, ReportStore, ScamReport};
