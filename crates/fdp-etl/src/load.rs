//! Load phase: constraint-based upserts
//!
//! The core builds one parameterized insert per destination and binds one
//! parameter set per table row. Conflict handling is always keyed by a named
//! uniqueness constraint, which is what makes re-runs idempotent: identical
//! rows either update in place or are ignored, never duplicated. The core
//! never opens a transaction; statements run against whatever connection or
//! transaction the caller provides.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgConnection;

use crate::error::EtlError;
use crate::item::{Conflict, ConflictAction, Destination};
use crate::table::{Cell, DataTable};

/// A built insert statement plus its per-row parameter sets
#[derive(Debug, Clone, PartialEq)]
pub struct LoadStatement {
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Quote an identifier for Postgres, doubling embedded quotes
///
/// Column names can come from remote payloads (JSON-flattened columns carry
/// dots), so they are never spliced bare.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build the upsert for a destination and table
///
/// Schema, table, and constraint identifiers are spliced as-is; they come
/// from trusted dataset configuration. Column names are quoted, and this is
/// the only place that splices identifiers at all.
pub fn build_upsert(destination: &Destination, data: &DataTable) -> LoadStatement {
    let columns = data.columns();
    let column_list = columns
        .iter()
        .map(|col| quote_ident(col))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "INSERT INTO {}.{} ({}) VALUES ({})",
        destination.schema, destination.table, column_list, placeholders
    );

    match &destination.conflict {
        Some(Conflict {
            constraint,
            action: ConflictAction::Update,
        }) => {
            let assignments = columns
                .iter()
                .map(|col| {
                    let col = quote_ident(col);
                    format!("{col} = EXCLUDED.{col}")
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(
                " ON CONFLICT ON CONSTRAINT {constraint} DO UPDATE SET {assignments}"
            ));
        },
        Some(Conflict {
            constraint,
            action: ConflictAction::Nothing,
        }) => {
            sql.push_str(&format!(" ON CONFLICT ON CONSTRAINT {constraint} DO NOTHING"));
        },
        None => {},
    }

    LoadStatement {
        sql,
        columns: columns.to_vec(),
        rows: data.rows().to_vec(),
    }
}

/// Executes a built statement against a relational store
///
/// The seam that keeps the core independent of connection management and lets
/// tests record statements instead of talking to a database.
#[async_trait]
pub trait SqlSink: Send {
    /// Execute the statement once per parameter row, returning affected rows
    async fn execute(&mut self, statement: &LoadStatement) -> Result<u64, EtlError>;
}

/// Sink over a live Postgres connection or open transaction
pub struct PgSink<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgSink<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

/// Postgres parameter type for one column's binds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindType {
    Bool,
    Int,
    Float,
    Text,
    Date,
}

/// Infer each column's bind type from its first non-null cell
///
/// Nulls must be bound with the column's type, not a default one; a text
/// null in an integer column fails the insert. All-null columns fall back
/// to text, which Postgres accepts for a null of any type it can cast.
fn column_bind_types(statement: &LoadStatement) -> Vec<BindType> {
    (0..statement.columns.len())
        .map(|i| {
            statement
                .rows
                .iter()
                .find_map(|row| match &row[i] {
                    Cell::Null => None,
                    Cell::Bool(_) => Some(BindType::Bool),
                    Cell::Int(_) => Some(BindType::Int),
                    Cell::Float(_) => Some(BindType::Float),
                    Cell::Text(_) => Some(BindType::Text),
                    Cell::Date(_) => Some(BindType::Date),
                })
                .unwrap_or(BindType::Text)
        })
        .collect()
}

#[async_trait]
impl SqlSink for PgSink<'_> {
    async fn execute(&mut self, statement: &LoadStatement) -> Result<u64, EtlError> {
        let bind_types = column_bind_types(statement);
        let mut affected = 0;
        for row in &statement.rows {
            let mut query = sqlx::query(&statement.sql);
            for (cell, bind_type) in row.iter().zip(&bind_types) {
                query = match cell {
                    Cell::Null => match bind_type {
                        BindType::Bool => query.bind(None::<bool>),
                        BindType::Int => query.bind(None::<i64>),
                        BindType::Float => query.bind(None::<f64>),
                        BindType::Text => query.bind(None::<String>),
                        BindType::Date => query.bind(None::<NaiveDate>),
                    },
                    Cell::Bool(b) => query.bind(*b),
                    Cell::Int(i) => query.bind(*i),
                    Cell::Float(f) => query.bind(*f),
                    Cell::Text(s) => query.bind(s.clone()),
                    Cell::Date(d) => query.bind(*d),
                };
            }
            affected += query.execute(&mut *self.conn).await?.rows_affected();
        }
        Ok(affected)
    }
}
