//! Dataset configuration
//!
//! Dataset drivers are configured from YAML files so the column mappings,
//! validation rules, and source URLs can change without a rebuild. The
//! structs here mirror the configuration file layout one to one.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

// ============================================================================
// football-data.co.uk seasonal CSV dataset
// ============================================================================

/// Top-level configuration for the seasonal CSV dataset
#[derive(Debug, Clone, Deserialize)]
pub struct FootballDataConfig {
    pub seasonal_dataset: SeasonalDataset,
    pub preprocessing: Preprocessing,
}

impl FootballDataConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonalDataset {
    /// Base URL; season code and league file name are appended per item
    pub base_url: String,

    /// League file stems, e.g. `E0`, `D1`
    pub leagues: Vec<String>,

    pub destination: DestinationConfig,
    pub validation: Validation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DestinationConfig {
    pub schema: String,
    pub table: String,
    /// Unique constraint name for conflict resolution
    pub constraint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Validation {
    /// Columns that must be present after parsing
    pub columns_required: Vec<String>,
}

/// Column-level cleanup applied to every parsed table
#[derive(Debug, Clone, Deserialize)]
pub struct Preprocessing {
    /// Source column name to destination column name
    #[serde(default)]
    pub rename: Vec<RenamePair>,

    /// Columns kept after renaming; everything else is dropped
    #[serde(default)]
    pub columns_select: Vec<String>,

    #[serde(default)]
    pub parse_dates: Vec<DateColumn>,

    /// Exact text substitutions, applied table-wide
    #[serde(default)]
    pub replace: Vec<ReplacePair>,

    /// Rows with nulls in any of these columns are dropped
    #[serde(default)]
    pub dropna_subset: Vec<String>,

    #[serde(default)]
    pub columns_to_numeric: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenamePair {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateColumn {
    pub column: String,
    /// Formats tried in order; the first that fits every value wins
    pub formats: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplacePair {
    pub from: String,
    pub to: String,
}

// ============================================================================
// Fixtures API dataset
// ============================================================================

/// Configuration for the fixtures API schedule and statistics dataset
#[derive(Debug, Clone, Deserialize)]
pub struct FixturesConfig {
    pub download: FixturesDownload,
    pub schedule_destination: DestinationConfig,
    pub fixture_destination: DestinationConfig,
}

impl FixturesConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixturesDownload {
    pub base_url: String,

    /// League ids whose fixtures get a statistics follow-up item
    pub leagues: Vec<i64>,
}
