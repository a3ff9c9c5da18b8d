//! FDP Common Library
//!
//! Shared utilities for the FDP workspace:
//!
//! - **Logging**: tracing subscriber configuration for console and file output
//! - **Seasons**: football season code generation and date-range helpers
//!
//! # Example
//!
//! ```no_run
//! use fdp_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     Ok(())
//! }
//! ```

pub mod logging;
pub mod season;
