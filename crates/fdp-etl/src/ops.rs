//! Standard table operations for transform pipelines
//!
//! Each operation is a pure function from [`DataTable`] to [`DataTable`],
//! meant to be bound with its arguments inside a
//! [`TransformPipeline`](crate::transform::TransformPipeline) step. The
//! vocabulary covers what dataset configurations need: renaming, column
//! subsetting, date parsing, value replacement, null dropping, numeric
//! coercion, dtype normalization, and constant-column stamping.

use chrono::NaiveDate;

use crate::error::{EtlError, ParseError};
use crate::table::{Cell, DataTable};

/// Rename columns per `(from, to)` pairs; names without a match are left
/// alone
pub fn rename_columns(table: DataTable, renames: &[(String, String)]) -> Result<DataTable, EtlError> {
    let (columns, rows) = table.into_parts();
    let columns = columns
        .into_iter()
        .map(|name| {
            renames
                .iter()
                .find(|(from, _)| *from == name)
                .map(|(_, to)| to.clone())
                .unwrap_or(name)
        })
        .collect::<Vec<_>>();
    // renaming onto an existing name would silently merge columns
    let mut table = DataTable::new(columns)?;
    for row in rows {
        table.push_row(row);
    }
    Ok(table)
}

/// Keep only the listed columns, preserving the table's column order
///
/// Listed names missing from the table are ignored, so one select list can
/// serve source files of varying vintage.
pub fn select_columns(table: DataTable, keep: &[String]) -> Result<DataTable, EtlError> {
    let indices: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, name)| keep.contains(name))
        .map(|(i, _)| i)
        .collect();

    let (columns, rows) = table.into_parts();
    let mut out = DataTable::new(indices.iter().map(|&i| columns[i].clone()).collect())?;
    for row in rows {
        out.push_row(indices.iter().map(|&i| row[i].clone()).collect());
    }
    Ok(out)
}

/// Parse a text column into dates, trying each format in turn
///
/// A format must fit every non-null value in the column; the first one that
/// does wins. No format fitting is a parse error, not a silent coercion.
pub fn parse_date_column(
    table: DataTable,
    column: &str,
    formats: &[String],
) -> Result<DataTable, EtlError> {
    let idx = table.column_index(column)?;

    // A format wins only if it fits every value in the column.
    let dates = formats
        .iter()
        .find_map(|format| {
            table
                .rows()
                .iter()
                .map(|row| match &row[idx] {
                    Cell::Null => Some(None),
                    Cell::Text(s) if s.is_empty() => Some(None),
                    Cell::Text(s) => NaiveDate::parse_from_str(s, format).ok().map(Some),
                    Cell::Date(d) => Some(Some(*d)),
                    _ => None,
                })
                .collect::<Option<Vec<Option<NaiveDate>>>>()
        })
        .ok_or_else(|| ParseError::DateFormat {
            column: column.to_string(),
            formats: formats.join(", "),
        })?;

    let (names, mut rows) = table.into_parts();
    for (row, date) in rows.iter_mut().zip(dates) {
        row[idx] = match date {
            Some(d) => Cell::Date(d),
            None => Cell::Null,
        };
    }
    Ok(DataTable::from_parts(names, rows))
}

/// Replace exact text values everywhere in the table
pub fn replace_values(
    table: DataTable,
    replacements: &[(String, String)],
) -> Result<DataTable, EtlError> {
    let (columns, mut rows) = table.into_parts();
    for row in &mut rows {
        for cell in row.iter_mut() {
            if let Cell::Text(s) = cell {
                if let Some((_, to)) = replacements.iter().find(|(from, _)| from == s) {
                    *cell = Cell::Text(to.clone());
                }
            }
        }
    }
    Ok(DataTable::from_parts(columns, rows))
}

/// Drop rows holding a null in any of the listed columns
pub fn drop_null_rows(table: DataTable, columns: &[String]) -> Result<DataTable, EtlError> {
    let indices: Vec<usize> = columns
        .iter()
        .map(|name| table.column_index(name))
        .collect::<Result<_, _>>()?;

    let (names, rows) = table.into_parts();
    let rows = rows
        .into_iter()
        .filter(|row| indices.iter().all(|&i| !row[i].is_null()))
        .collect();
    Ok(DataTable::from_parts(names, rows))
}

/// Coerce the listed columns to numbers; unparseable values become null
///
/// Columns in the list that the table lacks are skipped, mirroring
/// [`select_columns`]' tolerance of varying source vintages.
pub fn to_numeric(table: DataTable, columns: &[String]) -> Result<DataTable, EtlError> {
    let indices: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, name)| columns.contains(name))
        .map(|(i, _)| i)
        .collect();

    let (names, mut rows) = table.into_parts();
    for row in &mut rows {
        for &i in &indices {
            row[i] = coerce_numeric(&row[i]);
        }
    }
    Ok(DataTable::from_parts(names, rows))
}

fn coerce_numeric(cell: &Cell) -> Cell {
    match cell {
        Cell::Int(_) | Cell::Float(_) | Cell::Null => cell.clone(),
        Cell::Bool(b) => Cell::Int(i64::from(*b)),
        Cell::Text(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Cell::Int(i)
            } else if let Ok(f) = trimmed.parse::<f64>() {
                Cell::Float(f)
            } else {
                Cell::Null
            }
        },
        Cell::Date(_) => Cell::Null,
    }
}

/// Infer better types for text columns
///
/// A column whose non-null values all parse as integers becomes an integer
/// column; failing that, floats. Mixed columns are left as text.
pub fn normalize_dtypes(table: DataTable) -> Result<DataTable, EtlError> {
    let n_columns = table.n_columns();
    let (names, mut rows) = table.into_parts();

    for i in 0..n_columns {
        let all_int = rows.iter().all(|row| match &row[i] {
            Cell::Null | Cell::Int(_) => true,
            Cell::Text(s) => s.trim().parse::<i64>().is_ok(),
            _ => false,
        });
        let all_float = all_int
            || rows.iter().all(|row| match &row[i] {
                Cell::Null | Cell::Int(_) | Cell::Float(_) => true,
                Cell::Text(s) => s.trim().parse::<f64>().is_ok(),
                _ => false,
            });

        if !all_float {
            continue;
        }
        for row in &mut rows {
            if let Cell::Text(s) = &row[i] {
                let trimmed = s.trim();
                row[i] = if all_int {
                    trimmed.parse::<i64>().map(Cell::Int).unwrap_or(Cell::Null)
                } else {
                    trimmed.parse::<f64>().map(Cell::Float).unwrap_or(Cell::Null)
                };
            }
        }
    }

    Ok(DataTable::from_parts(names, rows))
}

/// Set every row's value in `column` to `value`, appending the column if the
/// table lacks it
pub fn assign_column(table: DataTable, column: &str, value: Cell) -> Result<DataTable, EtlError> {
    let existing = table.columns().iter().position(|c| c == column);
    let (mut names, mut rows) = table.into_parts();

    match existing {
        Some(i) => {
            for row in &mut rows {
                row[i] = value.clone();
            }
        },
        None => {
            names.push(column.to_string());
            for row in &mut rows {
                row.push(value.clone());
            }
        },
    }
    Ok(DataTable::from_parts(names, rows))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn matches_table() -> DataTable {
        let mut table = DataTable::new(vec![
            "Date".into(),
            "HomeTeam".into(),
            "FTHG".into(),
        ])
        .unwrap();
        table.push_row(vec!["28/08/26".into(), "Leeds".into(), "3".into()]);
        table.push_row(vec!["29/08/26".into(), "Derby".into(), "".into()]);
        table
    }

    #[test]
    fn test_rename_columns() {
        let out = rename_columns(
            matches_table(),
            &[("Date".into(), "match_date".into()), ("FTHG".into(), "home_goals".into())],
        )
        .unwrap();
        assert_eq!(out.columns(), ["match_date", "HomeTeam", "home_goals"]);
    }

    #[test]
    fn test_rename_onto_existing_column_fails() {
        let err = rename_columns(matches_table(), &[("Date".into(), "FTHG".into())]).unwrap_err();
        assert!(matches!(err, EtlError::DuplicateColumn(_)));
    }

    #[test]
    fn test_select_ignores_missing_names() {
        let out = select_columns(
            matches_table(),
            &["HomeTeam".into(), "Date".into(), "Referee".into()],
        )
        .unwrap();
        // table order preserved, absent name skipped
        assert_eq!(out.columns(), ["Date", "HomeTeam"]);
    }

    #[test]
    fn test_parse_date_column_format_fallback() {
        let formats = vec!["%Y-%m-%d".into(), "%d/%m/%y".into()];
        let out = parse_date_column(matches_table(), "Date", &formats).unwrap();
        assert_eq!(
            out.cell(0, "Date").unwrap(),
            &Cell::Date(NaiveDate::from_ymd_opt(2026, 8, 28).unwrap())
        );
    }

    #[test]
    fn test_parse_date_column_no_format_matches() {
        let err =
            parse_date_column(matches_table(), "Date", &["%Y-%m-%d".into()]).unwrap_err();
        assert!(matches!(
            err,
            EtlError::Parse(ParseError::DateFormat { column, .. }) if column == "Date"
        ));
    }

    #[test]
    fn test_replace_values() {
        let out = replace_values(matches_table(), &[("Leeds".into(), "Leeds United".into())])
            .unwrap();
        assert_eq!(out.cell(0, "HomeTeam").unwrap().as_str(), Some("Leeds United"));
        assert_eq!(out.cell(1, "HomeTeam").unwrap().as_str(), Some("Derby"));
    }

    #[test]
    fn test_to_numeric_coerces_and_nulls() {
        let out = to_numeric(matches_table(), &["FTHG".into()]).unwrap();
        assert_eq!(out.cell(0, "FTHG").unwrap(), &Cell::Int(3));
        // empty text cannot be a number
        assert!(out.cell(1, "FTHG").unwrap().is_null());
        // text columns outside the list untouched
        assert_eq!(out.cell(0, "HomeTeam").unwrap().as_str(), Some("Leeds"));
    }

    #[test]
    fn test_drop_null_rows() {
        let numeric = to_numeric(matches_table(), &["FTHG".into()]).unwrap();
        let out = drop_null_rows(numeric, &["FTHG".into()]).unwrap();
        assert_eq!(out.n_rows(), 1);
        assert_eq!(out.cell(0, "HomeTeam").unwrap().as_str(), Some("Leeds"));
    }

    #[test]
    fn test_drop_null_rows_unknown_column() {
        let err = drop_null_rows(matches_table(), &["Referee".into()]).unwrap_err();
        assert!(matches!(err, EtlError::UnknownColumn(name) if name == "Referee"));
    }

    #[test]
    fn test_normalize_dtypes_infers_ints_and_floats() {
        let mut table = DataTable::new(vec!["odds".into(), "goals".into(), "team".into()]).unwrap();
        table.push_row(vec!["1.5".into(), "2".into(), "Leeds".into()]);
        table.push_row(vec!["2".into(), Cell::Null, "Derby".into()]);

        let out = normalize_dtypes(table).unwrap();
        assert_eq!(out.cell(0, "odds").unwrap(), &Cell::Float(1.5));
        assert_eq!(out.cell(1, "odds").unwrap(), &Cell::Float(2.0));
        assert_eq!(out.cell(0, "goals").unwrap(), &Cell::Int(2));
        assert_eq!(out.cell(0, "team").unwrap().as_str(), Some("Leeds"));
    }

    #[test]
    fn test_assign_column_appends_and_overwrites() {
        let stamped = assign_column(matches_table(), "season", Cell::Text("2627".into())).unwrap();
        assert_eq!(stamped.cell(1, "season").unwrap().as_str(), Some("2627"));

        let restamped = assign_column(stamped, "season", Cell::Text("9900".into())).unwrap();
        assert_eq!(restamped.n_columns(), 4);
        assert_eq!(restamped.cell(0, "season").unwrap().as_str(), Some("9900"));
    }
}
