//! Fixtures API driver
//!
//! Two item kinds flow through one queue. Schedule items cover a sliding
//! day window around today; the current day is flagged for replacement so
//! in-play score changes are picked up. A fan-out callback inspects each
//! schedule payload and enqueues one statistics item per fixture played in
//! a league of interest. The API is rate-limited, so runs are capped by a
//! session limit and drain the queue tail-first, statistics before the next
//! schedule day.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, warn};

use fdp_common::season::days_between;

use crate::config::FixturesConfig;
use crate::error::{EtlError, Result};
use crate::fetch::HttpFetcher;
use crate::item::{meta, Conflict, Destination, WorkItem};
use crate::load::SqlSink;
use crate::parse::JsonRecordParser;
use crate::process::{Etl, FanOutFn, Payload};
use crate::store::FileStore;
use crate::strategy::ReplaceOnFlagStrategy;

/// Pause between API calls, per the provider's fair-use terms
const COURTESY_DELAY: Duration = Duration::from_secs(5);

/// Items processed per run; the rest stay queued for the next run
const SESSION_LIMIT: usize = 10;

/// Days before today covered by the schedule window
const WINDOW_BACK_DAYS: u64 = 1;

/// Days after today covered by the schedule window
const WINDOW_AHEAD_DAYS: u64 = 3;

const KIND_SCHEDULE: &str = "schedule";
const KIND_FIXTURE: &str = "fixture";

/// API credentials read from `FDP_FIXTURES_API_KEY` / `FDP_FIXTURES_API_HOST`
fn api_headers() -> Vec<(String, String)> {
    let mut headers = Vec::new();
    if let Ok(key) = env::var("FDP_FIXTURES_API_KEY") {
        headers.push(("x-rapidapi-key".to_string(), key));
    }
    if let Ok(host) = env::var("FDP_FIXTURES_API_HOST") {
        headers.push(("x-rapidapi-host".to_string(), host));
    }
    headers
}

fn with_api_headers(mut fetcher: HttpFetcher) -> HttpFetcher {
    for (name, value) in api_headers() {
        fetcher = fetcher.with_header(name, value);
    }
    fetcher
}

/// One schedule item per day in the window around `today`
pub fn build_items(config: &FixturesConfig, data_dir: &Path, today: NaiveDate) -> Vec<WorkItem> {
    let start = today - chrono::Days::new(WINDOW_BACK_DAYS);
    let end = today + chrono::Days::new(WINDOW_AHEAD_DAYS);

    days_between(start, end)
        .map(|date| {
            let date_str = date.format("%Y-%m-%d").to_string();
            let fetcher = with_api_headers(
                HttpFetcher::get(format!("{}/fixtures", config.download.base_url))
                    .with_query("date", &date_str),
            );
            let path = data_dir
                .join("Football_API")
                .join(&date_str)
                .join("schedule.json");
            let destination = &config.schedule_destination;
            WorkItem::new(Box::new(fetcher), Box::new(FileStore::new(path)))
                .with_destination(
                    Destination::new(&destination.schema, &destination.table)
                        .with_conflict(Conflict::update(&destination.constraint)),
                )
                .with_meta(meta::KIND, KIND_SCHEDULE.into())
                .with_meta(meta::REPLACE, (date == today).into())
        })
        .collect()
}

/// Fan-out for schedule payloads: one statistics item per fixture in a
/// configured league
pub fn fan_out_callback(config: &FixturesConfig, data_dir: &Path) -> Box<FanOutFn> {
    let base_url = config.download.base_url.clone();
    let leagues = config.download.leagues.clone();
    let destination = config.fixture_destination.clone();
    let stats_dir: PathBuf = data_dir.join("Football_API").join("fixtures");

    Box::new(move |payload| {
        let schedule: serde_json::Value = serde_json::from_slice(payload)?;
        let matches = schedule
            .get("response")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| anyhow::anyhow!("schedule payload has no 'response' array"))?;

        let mut items = Vec::new();
        for entry in matches {
            let league_id = entry
                .pointer("/league/id")
                .and_then(serde_json::Value::as_i64);
            if !league_id.is_some_and(|id| leagues.contains(&id)) {
                continue;
            }
            let fixture_id = entry
                .pointer("/fixture/id")
                .and_then(serde_json::Value::as_i64)
                .ok_or_else(|| anyhow::anyhow!("schedule entry has no fixture id"))?;

            let fetcher = with_api_headers(
                HttpFetcher::get(format!("{base_url}/fixtures/statistics"))
                    .with_query("fixture", fixture_id.to_string()),
            );
            let item = WorkItem::new(
                Box::new(fetcher),
                Box::new(FileStore::new(stats_dir.join(format!("{fixture_id}.json")))),
            )
            .with_destination(
                Destination::new(&destination.schema, &destination.table)
                    .with_conflict(Conflict::update(&destination.constraint)),
            )
            .with_meta(meta::KIND, KIND_FIXTURE.into());
            items.push(item);
        }
        Ok(items)
    })
}

/// Process one rate-limited session against the given sink
pub async fn run(
    config: &FixturesConfig,
    data_dir: &Path,
    today: NaiveDate,
    client: &reqwest::Client,
    sink: &mut dyn SqlSink,
) -> Result<super::RunSummary> {
    let callback = fan_out_callback(config, data_dir);
    let parser = JsonRecordParser::new("response");

    let mut etl = Etl::new(COURTESY_DELAY);
    etl.seed(
        build_items(config, data_dir, today),
        true,
        Some(SESSION_LIMIT),
    );

    let mut summary = super::RunSummary::default();
    while let Some(item) = etl.next_item() {
        // Only schedule payloads fan out
        let fan_out = (item.kind() == Some(KIND_SCHEDULE)).then_some(callback.as_ref());
        let payload = etl
            .extract(&item, &ReplaceOnFlagStrategy, client, fan_out)
            .await?;
        if payload.is_none() {
            summary.skipped += 1;
            continue;
        }

        match etl.transform(&item, Some(&parser), None, None) {
            Ok(Payload::Table(data)) => {
                summary.rows_loaded += etl.load(&item, &data, sink).await?;
                summary.processed += 1;
            },
            Ok(Payload::Raw(_)) => unreachable!("parser configured"),
            Err(EtlError::Parse(err)) => {
                warn!(item = %item.label(), error = %err, "Unparseable payload, skipping item");
                summary.skipped += 1;
            },
            Err(err) => return Err(err),
        }
    }

    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        rows = summary.rows_loaded,
        remaining = etl.queued(),
        "Fixtures session finished"
    );
    Ok(summary)
}
