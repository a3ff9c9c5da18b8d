//! football-data.co.uk seasonal CSV driver
//!
//! One CSV per league per season, keyed by the four-digit season code in the
//! URL. Older seasons never change, so the fetch strategy only re-downloads
//! the seasons flagged for replacement (the most recent ones, still being
//! played). Rows carry a `season` column stamped from item metadata; a
//! validation failure skips the item because the source serves the odd
//! malformed file for leagues it no longer maintains.

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, warn};

use fdp_common::season::seasons_between;

use crate::config::{FootballDataConfig, Preprocessing, Validation};
use crate::error::{EtlError, Result};
use crate::fetch::HttpFetcher;
use crate::item::{meta, Conflict, Destination, WorkItem};
use crate::load::SqlSink;
use crate::ops;
use crate::parse::{DelimitedTextParser, TextEncoding};
use crate::process::{Etl, Payload};
use crate::store::FileStore;
use crate::strategy::ReplaceOnFlagStrategy;
use crate::table::Cell;
use crate::transform::TransformPipeline;
use crate::validate::Validator;

/// Pause between downloads; the source throttles aggressive clients
const COURTESY_DELAY: Duration = Duration::from_secs(3);

/// Recent seasons re-downloaded even when already cached
const BACKTRACK_SEASONS: usize = 2;

/// One work item per league per season in the window
///
/// The last [`BACKTRACK_SEASONS`] seasons are flagged for replacement so
/// results added since the previous run are picked up.
pub fn build_items(
    config: &FootballDataConfig,
    data_dir: &Path,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<WorkItem> {
    let seasons: Vec<_> = seasons_between(start, end).collect();
    let first_replaced = seasons.len().saturating_sub(BACKTRACK_SEASONS);

    let mut items = Vec::new();
    for (i, season) in seasons.iter().enumerate() {
        let replace = i >= first_replaced;
        for league in &config.seasonal_dataset.leagues {
            let code = season.code();
            let url = format!("{}/{}/{}.csv", config.seasonal_dataset.base_url, code, league);
            let path = data_dir
                .join("FootballDataCoUK")
                .join(&code)
                .join(format!("{league}.csv"));
            let destination = &config.seasonal_dataset.destination;
            let item = WorkItem::new(
                Box::new(HttpFetcher::get(url)),
                Box::new(FileStore::new(path)),
            )
            .with_destination(
                Destination::new(&destination.schema, &destination.table)
                    .with_conflict(Conflict::update(&destination.constraint)),
            )
            .with_meta(meta::SEASON, code.into())
            .with_meta(meta::REPLACE, replace.into());
            items.push(item);
        }
    }
    items
}

/// Transform steps shared by every item; the season stamp is branched on
/// per item, leaving this pipeline untouched
pub fn base_pipeline(pre: &Preprocessing) -> TransformPipeline {
    let mut pipeline = TransformPipeline::new();

    if !pre.rename.is_empty() {
        let renames: Vec<(String, String)> = pre
            .rename
            .iter()
            .map(|pair| (pair.from.clone(), pair.to.clone()))
            .collect();
        pipeline = pipeline.add_operation("rename columns", move |t| {
            ops::rename_columns(t, &renames)
        });
    }
    if !pre.columns_select.is_empty() {
        let keep = pre.columns_select.clone();
        pipeline = pipeline.add_operation("select columns", move |t| ops::select_columns(t, &keep));
    }
    for date_column in &pre.parse_dates {
        let column = date_column.column.clone();
        let formats = date_column.formats.clone();
        pipeline = pipeline.add_operation(format!("parse dates in {column}"), move |t| {
            ops::parse_date_column(t, &column, &formats)
        });
    }
    if !pre.replace.is_empty() {
        let replacements: Vec<(String, String)> = pre
            .replace
            .iter()
            .map(|pair| (pair.from.clone(), pair.to.clone()))
            .collect();
        pipeline = pipeline.add_operation("replace values", move |t| {
            ops::replace_values(t, &replacements)
        });
    }
    if !pre.dropna_subset.is_empty() {
        let subset = pre.dropna_subset.clone();
        pipeline = pipeline.add_operation("drop incomplete rows", move |t| {
            ops::drop_null_rows(t, &subset)
        });
    }
    if !pre.columns_to_numeric.is_empty() {
        let numeric = pre.columns_to_numeric.clone();
        pipeline = pipeline.add_operation("coerce numeric columns", move |t| {
            ops::to_numeric(t, &numeric)
        });
    }
    pipeline.add_operation("normalize dtypes", ops::normalize_dtypes)
}

pub fn seasonal_validator(validation: &Validation) -> Validator {
    Validator::new().require_columns(&validation.columns_required)
}

/// Process the whole seasonal window against the given sink
pub async fn run(
    config: &FootballDataConfig,
    data_dir: &Path,
    start: NaiveDate,
    end: NaiveDate,
    client: &reqwest::Client,
    sink: &mut dyn SqlSink,
) -> Result<super::RunSummary> {
    let base = base_pipeline(&config.preprocessing);
    let validator = seasonal_validator(&config.seasonal_dataset.validation);
    // Legacy seasons contain raw latin-1 bytes in club names
    let parser = DelimitedTextParser::new().with_encoding(TextEncoding::Latin1);

    let mut etl = Etl::new(COURTESY_DELAY);
    etl.seed(build_items(config, data_dir, start, end), false, None);

    let mut summary = super::RunSummary::default();
    while let Some(item) = etl.next_item() {
        let payload = etl
            .extract(&item, &ReplaceOnFlagStrategy, client, None)
            .await?;
        if payload.is_none() {
            summary.skipped += 1;
            continue;
        }

        let season = item.season().unwrap_or_default().to_string();
        let pipeline = base.clone().add_operation("stamp season", move |t| {
            ops::assign_column(t, "season", Cell::Text(season.clone()))
        });

        match etl.transform(&item, Some(&parser), Some(&validator), Some(&pipeline)) {
            Ok(Payload::Table(data)) => {
                summary.rows_loaded += etl.load(&item, &data, sink).await?;
                summary.processed += 1;
            },
            Ok(Payload::Raw(_)) => unreachable!("parser configured"),
            Err(EtlError::Validation(err)) => {
                warn!(item = %item.label(), error = %err, "Validation failed, skipping item");
                summary.skipped += 1;
            },
            Err(err) => return Err(err),
        }
    }

    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        rows = summary.rows_loaded,
        "Seasonal dataset run finished"
    );
    Ok(summary)
}
