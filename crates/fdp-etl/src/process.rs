//! The ETL orchestrator
//!
//! [`Etl`] owns the work queue and drives each item through extract,
//! transform, and load. Processing is pull-based: the caller drains the
//! queue with [`Etl::next_item`] and decides per item which parser,
//! validator, and pipeline to apply, so one orchestrator serves datasets of
//! any shape. Everything runs sequentially on one task; the only pause is
//! the courtesy delay after a successful fetch.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::EtlError;
use crate::fetch::Fetcher as _;
use crate::item::WorkItem;
use crate::load::{build_upsert, SqlSink};
use crate::parse::Parser;
use crate::store::CacheStore as _;
use crate::strategy::FetchStrategy;
use crate::table::DataTable;
use crate::transform::TransformPipeline;
use crate::validate::Validator;

/// What the transform phase produced
///
/// Items without a configured parser pass their cached bytes through
/// untouched; only parsed items carry a table onward to load.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Raw(Vec<u8>),
    Table(DataTable),
}

impl Payload {
    pub fn as_table(&self) -> Option<&DataTable> {
        match self {
            Payload::Table(table) => Some(table),
            Payload::Raw(_) => None,
        }
    }
}

/// Fan-out callback: inspect a fresh payload, synthesize follow-up items
pub type FanOutFn = dyn Fn(&[u8]) -> anyhow::Result<Vec<WorkItem>> + Send + Sync;

/// Sequential ETL orchestrator owning a mutable work queue
pub struct Etl {
    queue: VecDeque<WorkItem>,
    delay: Duration,
    reverse: bool,
    limit: Option<usize>,
    yielded: usize,
}

impl Etl {
    /// `delay` is the courtesy pause applied after each successful fetch
    pub fn new(delay: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            delay,
            reverse: false,
            limit: None,
            yielded: 0,
        }
    }

    /// Seed the queue for one processing session
    ///
    /// `reverse` pops the tail instead of the head; `limit` caps how many
    /// items this session yields, leaving the rest queued for a future run
    /// against rate-limited sources.
    pub fn seed(&mut self, items: Vec<WorkItem>, reverse: bool, limit: Option<usize>) {
        self.queue = items.into();
        self.reverse = reverse;
        self.limit = limit;
        self.yielded = 0;
    }

    /// Items still waiting in the queue
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Pop the next item to process, or `None` when the session is done
    pub fn next_item(&mut self) -> Option<WorkItem> {
        if self.limit.is_some_and(|limit| self.yielded >= limit) {
            return None;
        }
        let item = if self.reverse {
            self.queue.pop_back()
        } else {
            self.queue.pop_front()
        }?;
        self.yielded += 1;
        Some(item)
    }

    /// Extract phase: make the item's raw payload available in cache
    ///
    /// Returns `Ok(None)` when the remote reports the data does not exist
    /// (the one recoverable case; the batch continues without this item).
    /// The fan-out callback sees the payload whether it was fetched or read
    /// from cache, and its items are appended to the queue tail.
    pub async fn extract(
        &mut self,
        item: &WorkItem,
        strategy: &dyn FetchStrategy,
        client: &reqwest::Client,
        callback: Option<&FanOutFn>,
    ) -> Result<Option<Vec<u8>>, EtlError> {
        let payload = if strategy.is_fetch_required(item) {
            info!(item = %item.label(), url = %item.fetcher.url(), "Fetching");
            match item.fetcher.fetch(client).await {
                Ok(bytes) => {
                    item.store.save(&bytes)?;
                    if !self.delay.is_zero() {
                        sleep(self.delay).await;
                    }
                    bytes
                },
                Err(err) if err.is_recoverable() => {
                    warn!(item = %item.label(), error = %err, "Remote data does not exist, skipping item");
                    return Ok(None);
                },
                Err(err) => return Err(err.into()),
            }
        } else {
            item.store.read()?
        };

        if let Some(callback) = callback {
            let new_items = callback(&payload).map_err(EtlError::Callback)?;
            if !new_items.is_empty() {
                info!(item = %item.label(), enqueued = new_items.len(), "Fan-out enqueued follow-up items");
            }
            self.queue.extend(new_items);
        }

        Ok(Some(payload))
    }

    /// Transform phase: cached bytes to a load-ready table
    ///
    /// Operates on cache storage only, so it can be re-run without network
    /// cost. Validation failures propagate; the caller decides whether to
    /// skip the item or abort the batch.
    pub fn transform(
        &self,
        item: &WorkItem,
        parser: Option<&dyn Parser>,
        validator: Option<&Validator>,
        pipeline: Option<&TransformPipeline>,
    ) -> Result<Payload, EtlError> {
        let raw = item.store.read()?;
        let Some(parser) = parser else {
            return Ok(Payload::Raw(raw));
        };

        let data = parser.parse(&raw)?;
        if let Some(validator) = validator {
            validator.validate(&data)?;
        }
        let data = match pipeline {
            Some(pipeline) => pipeline.apply(data)?,
            None => data,
        };
        Ok(Payload::Table(data))
    }

    /// Load phase: upsert the table's rows into the item's destination
    ///
    /// Runs against the caller's sink; transaction boundaries (commit,
    /// rollback) stay with the caller.
    pub async fn load(
        &self,
        item: &WorkItem,
        data: &DataTable,
        sink: &mut dyn SqlSink,
    ) -> Result<u64, EtlError> {
        let destination = item.destination.as_ref().ok_or(EtlError::NoDestination)?;
        if data.is_empty() {
            info!(item = %item.label(), destination = %destination, "No rows to load");
            return Ok(0);
        }

        info!(
            item = %item.label(),
            destination = %destination,
            rows = data.n_rows(),
            "Uploading"
        );
        let statement = build_upsert(destination, data);
        sink.execute(&statement).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetch::Fetcher;
    use crate::item::Destination;
    use crate::load::LoadStatement;
    use crate::ops;
    use crate::parse::DelimitedTextParser;
    use crate::store::CacheStore;
    use crate::strategy::{AppendStrategy, ReplaceStrategy};
    use crate::table::Cell;
    use async_trait::async_trait;
    use serde_json::json;
    use std::io;
    use std::sync::{Arc, Mutex};

    struct StaticFetcher {
        body: Vec<u8>,
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, _client: &reqwest::Client) -> Result<Vec<u8>, FetchError> {
            Ok(self.body.clone())
        }

        fn url(&self) -> &str {
            "static://test"
        }
    }

    struct FailingFetcher {
        status: reqwest::StatusCode,
    }

    #[async_trait]
    impl Fetcher for FailingFetcher {
        async fn fetch(&self, _client: &reqwest::Client) -> Result<Vec<u8>, FetchError> {
            Err(FetchError::Status {
                status: self.status,
                url: "static://failing".into(),
            })
        }

        fn url(&self) -> &str {
            "static://failing"
        }
    }

    #[derive(Clone, Default)]
    struct MemStore {
        key: String,
        data: Arc<Mutex<Option<Vec<u8>>>>,
    }

    impl MemStore {
        fn named(key: &str) -> Self {
            Self {
                key: key.to_string(),
                data: Arc::new(Mutex::new(None)),
            }
        }

        fn filled(key: &str, content: &[u8]) -> Self {
            let store = Self::named(key);
            *store.data.lock().unwrap() = Some(content.to_vec());
            store
        }
    }

    impl CacheStore for MemStore {
        fn exists(&self) -> bool {
            self.data.lock().unwrap().is_some()
        }

        fn read(&self) -> io::Result<Vec<u8>> {
            self.data
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no cached payload"))
        }

        fn save(&self, content: &[u8]) -> io::Result<()> {
            *self.data.lock().unwrap() = Some(content.to_vec());
            Ok(())
        }

        fn key(&self) -> String {
            self.key.clone()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        statements: Vec<LoadStatement>,
    }

    #[async_trait]
    impl SqlSink for RecordingSink {
        async fn execute(&mut self, statement: &LoadStatement) -> Result<u64, EtlError> {
            self.statements.push(statement.clone());
            Ok(statement.rows.len() as u64)
        }
    }

    fn static_item(key: &str, body: &[u8]) -> WorkItem {
        WorkItem::new(
            Box::new(StaticFetcher { body: body.to_vec() }),
            Box::new(MemStore::named(key)),
        )
    }

    #[test]
    fn test_queue_pops_head_by_default() {
        let mut etl = Etl::new(Duration::ZERO);
        etl.seed(
            vec![static_item("first", b""), static_item("second", b"")],
            false,
            None,
        );
        assert_eq!(etl.next_item().unwrap().label(), "first");
        assert_eq!(etl.next_item().unwrap().label(), "second");
        assert!(etl.next_item().is_none());
    }

    #[test]
    fn test_queue_reverse_pops_tail() {
        let mut etl = Etl::new(Duration::ZERO);
        etl.seed(
            vec![static_item("first", b""), static_item("second", b"")],
            true,
            None,
        );
        assert_eq!(etl.next_item().unwrap().label(), "second");
    }

    #[test]
    fn test_queue_limit_leaves_items_for_next_run() {
        let mut etl = Etl::new(Duration::ZERO);
        etl.seed(
            vec![
                static_item("a", b""),
                static_item("b", b""),
                static_item("c", b""),
            ],
            false,
            Some(2),
        );
        assert!(etl.next_item().is_some());
        assert!(etl.next_item().is_some());
        assert!(etl.next_item().is_none());
        assert_eq!(etl.queued(), 1);
    }

    #[tokio::test]
    async fn test_extract_fetches_and_caches() {
        let store = MemStore::named("mem://schedule");
        let item = WorkItem::new(
            Box::new(StaticFetcher { body: b"payload".to_vec() }),
            Box::new(store.clone()),
        );
        let mut etl = Etl::new(Duration::ZERO);
        let client = reqwest::Client::new();

        let payload = etl
            .extract(&item, &AppendStrategy, &client, None)
            .await
            .unwrap();
        assert_eq!(payload, Some(b"payload".to_vec()));
        assert_eq!(store.read().unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_extract_reads_cache_when_not_required() {
        let store = MemStore::filled("mem://cached", b"cached bytes");
        let item = WorkItem::new(
            Box::new(FailingFetcher {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            }),
            Box::new(store),
        );
        let mut etl = Etl::new(Duration::ZERO);
        let client = reqwest::Client::new();

        // AppendStrategy sees the cache, so the failing fetcher is never hit
        let payload = etl
            .extract(&item, &AppendStrategy, &client, None)
            .await
            .unwrap();
        assert_eq!(payload, Some(b"cached bytes".to_vec()));
    }

    #[tokio::test]
    async fn test_extract_skips_on_recoverable_status() {
        let item = WorkItem::new(
            Box::new(FailingFetcher {
                status: reqwest::StatusCode::NOT_FOUND,
            }),
            Box::new(MemStore::named("mem://missing")),
        );
        let mut etl = Etl::new(Duration::ZERO);
        let client = reqwest::Client::new();

        let payload = etl
            .extract(&item, &ReplaceStrategy, &client, None)
            .await
            .unwrap();
        assert!(payload.is_none());
    }

    #[tokio::test]
    async fn test_extract_propagates_fatal_status() {
        let item = WorkItem::new(
            Box::new(FailingFetcher {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            }),
            Box::new(MemStore::named("mem://broken")),
        );
        let mut etl = Etl::new(Duration::ZERO);
        let client = reqwest::Client::new();

        let err = etl
            .extract(&item, &ReplaceStrategy, &client, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_fan_out_yields_every_item_once() {
        let mut etl = Etl::new(Duration::ZERO);
        etl.seed(vec![static_item("schedule", b"schedule payload")], false, None);
        let client = reqwest::Client::new();

        let callback: Box<FanOutFn> = Box::new(|payload| {
            if payload == b"schedule payload" {
                Ok(vec![
                    static_item("fixture-1", b"one"),
                    static_item("fixture-2", b"two"),
                ])
            } else {
                Ok(Vec::new())
            }
        });

        let mut labels = Vec::new();
        while let Some(item) = etl.next_item() {
            etl.extract(&item, &ReplaceStrategy, &client, Some(callback.as_ref()))
                .await
                .unwrap();
            labels.push(item.label());
        }

        assert_eq!(labels, ["schedule", "fixture-1", "fixture-2"]);
    }

    #[tokio::test]
    async fn test_transform_without_parser_passes_bytes_through() {
        let item = WorkItem::new(
            Box::new(StaticFetcher { body: Vec::new() }),
            Box::new(MemStore::filled("mem://raw", b"raw bytes")),
        );
        let etl = Etl::new(Duration::ZERO);
        let payload = etl.transform(&item, None, None, None).unwrap();
        assert_eq!(payload, Payload::Raw(b"raw bytes".to_vec()));
    }

    #[tokio::test]
    async fn test_validation_failure_stops_before_pipeline() {
        let item = WorkItem::new(
            Box::new(StaticFetcher { body: Vec::new() }),
            Box::new(MemStore::filled("mem://empty", b"col1,col2\n")),
        );
        let etl = Etl::new(Duration::ZERO);

        let parser = DelimitedTextParser::new();
        let validator = Validator::new().add_rule("has rows", true, |t| !t.is_empty());
        let pipeline = TransformPipeline::new()
            .add_operation("never reached", |_| panic!("pipeline ran after failed validation"));

        let err = etl
            .transform(&item, Some(&parser), Some(&validator), Some(&pipeline))
            .unwrap_err();
        assert!(matches!(err, EtlError::Validation(_)));
    }

    #[tokio::test]
    async fn test_transform_applies_pipeline() {
        let item = WorkItem::new(
            Box::new(StaticFetcher { body: Vec::new() }),
            Box::new(MemStore::filled("mem://table", b"col1,col2\n1,4\n2,5")),
        );
        let etl = Etl::new(Duration::ZERO);

        let parser = DelimitedTextParser::new();
        let pipeline = TransformPipeline::new().add_operation("rename", |t| {
            ops::rename_columns(t, &[("col1".into(), "c1".into())])
        });

        let payload = etl
            .transform(&item, Some(&parser), None, Some(&pipeline))
            .unwrap();
        let table = payload.as_table().unwrap();
        assert_eq!(table.columns(), ["c1", "col2"]);
        assert_eq!(table.n_rows(), 2);
    }

    #[tokio::test]
    async fn test_load_without_destination_fails() {
        let item = static_item("mem://nodest", b"");
        let etl = Etl::new(Duration::ZERO);
        let mut sink = RecordingSink::default();
        let data = DataTable::new(vec!["a".into()]).unwrap();

        let err = etl.load(&item, &data, &mut sink).await.unwrap_err();
        assert!(matches!(err, EtlError::NoDestination));
    }

    #[tokio::test]
    async fn test_load_skips_empty_table() {
        let item = static_item("mem://empty", b"")
            .with_destination(Destination::new("football_data", "match"));
        let etl = Etl::new(Duration::ZERO);
        let mut sink = RecordingSink::default();
        let data = DataTable::new(vec!["a".into()]).unwrap();

        let affected = etl.load(&item, &data, &mut sink).await.unwrap();
        assert_eq!(affected, 0);
        assert!(sink.statements.is_empty());
    }

    #[tokio::test]
    async fn test_load_executes_one_statement_with_all_rows() {
        let item = static_item("mem://load", b"")
            .with_destination(Destination::new("football_data", "match"))
            .with_meta("season", json!("9900"));
        let etl = Etl::new(Duration::ZERO);
        let mut sink = RecordingSink::default();

        let mut data = DataTable::new(vec!["c1".into()]).unwrap();
        data.push_row(vec![Cell::Int(1)]);
        data.push_row(vec![Cell::Int(2)]);

        let affected = etl.load(&item, &data, &mut sink).await.unwrap();
        assert_eq!(affected, 2);
        assert_eq!(sink.statements.len(), 1);
        assert_eq!(sink.statements[0].rows.len(), 2);
    }
}
