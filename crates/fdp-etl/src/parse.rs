//! Payload parsers
//!
//! Parsers turn raw cached bytes into a [`DataTable`]. Two formats are
//! supported: delimited text (CSV-style feeds, including the ragged rows
//! some upstream files ship with) and JSON documents flattened along a
//! record path. Empty or single-byte content is rejected before any
//! format-specific logic runs.

use crate::error::ParseError;
use crate::table::{Cell, DataTable};

/// Supported text encodings for delimited sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// ISO 8859-1, used by some older seasonal files
    Latin1,
}

impl TextEncoding {
    fn decode(self, raw: &[u8]) -> Result<String, ParseError> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(raw)
                .map(str::to_owned)
                .map_err(|_| ParseError::Encoding { encoding: "utf-8" }),
            // Latin-1 maps every byte to the code point of the same value.
            TextEncoding::Latin1 => Ok(raw.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Turns raw bytes into structured tabular data
pub trait Parser: Send + Sync {
    fn parse(&self, raw: &[u8]) -> Result<DataTable, ParseError>;
}

fn ensure_parsable(raw: &[u8]) -> Result<(), ParseError> {
    if raw.len() < 2 {
        return Err(ParseError::TooShort(raw.len()));
    }
    Ok(())
}

/// Parser for delimited text feeds
///
/// Rows wider than the header are truncated to the header's column count,
/// which tolerates the stray trailing delimiters some seasonal files carry.
/// Short rows are never padded at parse level; their missing trailing
/// columns become nulls when the table is assembled. Rows consisting only of
/// delimiters are dropped entirely.
#[derive(Debug, Clone)]
pub struct DelimitedTextParser {
    has_header: bool,
    delimiter: u8,
    encoding: TextEncoding,
}

impl Default for DelimitedTextParser {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            encoding: TextEncoding::Utf8,
        }
    }
}

impl DelimitedTextParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_header(mut self) -> Self {
        self.has_header = false;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

impl Parser for DelimitedTextParser {
    fn parse(&self, raw: &[u8]) -> Result<DataTable, ParseError> {
        ensure_parsable(raw)?;
        let text = self.encoding.decode(raw)?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(text.as_bytes());

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            records.push(record);
        }

        let Some(first) = records.first() else {
            return Ok(DataTable::default());
        };

        let (columns, data_records) = if self.has_header {
            let columns: Vec<String> = first.iter().map(str::to_owned).collect();
            (columns, &records[1..])
        } else {
            let columns = (0..first.len()).map(|i| format!("column_{i}")).collect();
            (columns, &records[..])
        };

        let width = columns.len();
        let mut table =
            DataTable::new(columns).map_err(|err| ParseError::Header(err.to_string()))?;

        for record in data_records {
            let mut row: Vec<Cell> = record
                .iter()
                .take(width)
                .map(|field| Cell::Text(field.to_string()))
                .collect();
            row.resize(width, Cell::Null);
            table.push_row(row);
        }

        Ok(table)
    }
}

/// Parser for JSON documents holding an array of records
///
/// The configured record path (dot-separated keys) is followed into the
/// document; each element of the array found there is flattened into one
/// row, with nested object keys joined by dots. Keys appear as columns in
/// first-seen order (serde_json's `preserve_order` feature keeps object keys
/// as written); records missing a key get a null in that column.
#[derive(Debug, Clone, Default)]
pub struct JsonRecordParser {
    record_path: Vec<String>,
}

impl JsonRecordParser {
    /// `record_path` is a dot-separated key path; empty means the document
    /// root is the record array
    pub fn new(record_path: &str) -> Self {
        let record_path = if record_path.is_empty() {
            Vec::new()
        } else {
            record_path.split('.').map(str::to_owned).collect()
        };
        Self { record_path }
    }

    fn path_label(&self) -> String {
        self.record_path.join(".")
    }
}

fn flatten_into(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, Cell)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, nested) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(&key, nested, out);
            }
        },
        other => out.push((prefix.to_string(), Cell::from_json(other))),
    }
}

impl Parser for JsonRecordParser {
    fn parse(&self, raw: &[u8]) -> Result<DataTable, ParseError> {
        ensure_parsable(raw)?;
        let text = TextEncoding::Utf8.decode(raw)?;
        let document: serde_json::Value = serde_json::from_str(&text)?;

        let mut node = &document;
        for key in &self.record_path {
            node = node
                .get(key)
                .ok_or_else(|| ParseError::RecordPathMissing(self.path_label()))?;
        }
        let records = node
            .as_array()
            .ok_or_else(|| ParseError::RecordPathNotArray(self.path_label()))?;

        let mut columns: Vec<String> = Vec::new();
        let mut flat: Vec<Vec<(String, Cell)>> = Vec::with_capacity(records.len());
        for record in records {
            if !record.is_object() {
                return Err(ParseError::RecordPathNotArray(self.path_label()));
            }
            let mut pairs = Vec::new();
            flatten_into("", record, &mut pairs);
            for (key, _) in &pairs {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
            flat.push(pairs);
        }

        let mut table =
            DataTable::new(columns.clone()).map_err(|err| ParseError::Header(err.to_string()))?;
        for pairs in flat {
            let row = columns
                .iter()
                .map(|column| {
                    pairs
                        .iter()
                        .find(|(key, _)| key == column)
                        .map(|(_, cell)| cell.clone())
                        .unwrap_or(Cell::Null)
                })
                .collect();
            table.push_row(row);
        }

        Ok(table)
    }
}
