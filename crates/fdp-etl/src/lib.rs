//! FDP ETL Library
//!
//! Generic extract-transform-load core for tabular and JSON sports datasets,
//! plus the dataset drivers built on top of it.
//!
//! The core is a set of small capability traits wired together by the
//! [`process::Etl`] orchestrator:
//!
//! - [`strategy::FetchStrategy`]: decides whether a work item needs a
//!   network fetch or can be served from its cached payload
//! - [`fetch::Fetcher`]: retrieves raw bytes from a remote source
//! - [`store::CacheStore`]: durable cache for fetched payloads
//! - [`parse::Parser`]: raw bytes to a [`table::DataTable`]
//! - [`validate::Validator`]: declarative shape checks before transforming
//! - [`transform::TransformPipeline`]: ordered, branchable reshaping steps
//! - [`load::SqlSink`]: constraint-based upsert into a relational store
//!
//! One bad source never aborts a batch: remote "does not exist" statuses are
//! skipped, and drivers conventionally skip parse/validation failures too.
//!
//! # Example
//!
//! ```no_run
//! use fdp_etl::process::Etl;
//! use fdp_etl::strategy::AppendStrategy;
//! use std::time::Duration;
//!
//! # async fn run(items: Vec<fdp_etl::item::WorkItem>) -> anyhow::Result<()> {
//! let client = reqwest::Client::new();
//! let mut etl = Etl::new(Duration::from_secs(3));
//! etl.seed(items, false, None);
//! while let Some(item) = etl.next_item() {
//!     let Some(_payload) = etl.extract(&item, &AppendStrategy, &client, None).await? else {
//!         continue;
//!     };
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod datasets;
pub mod error;
pub mod fetch;
pub mod item;
pub mod load;
pub mod ops;
pub mod parse;
pub mod process;
pub mod store;
pub mod strategy;
pub mod table;
pub mod transform;
pub mod validate;

pub use error::{EtlError, FetchError, ParseError, ValidationError};
pub use table::{Cell, DataTable};
