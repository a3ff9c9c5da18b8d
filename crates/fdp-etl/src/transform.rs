//! Transform pipelines
//!
//! An ordered sequence of named, pure reshaping operations applied to a
//! [`DataTable`]. The pipeline holds steps, never data, so one base pipeline
//! can be cloned and branched per item (a season-stamp step appended on the
//! branch only) without interfering with the original or sibling branches.
//! Application is fail-fast: the first failing step propagates immediately.

use std::sync::Arc;

use tracing::trace;

use crate::error::EtlError;
use crate::table::DataTable;

type OpFn = Arc<dyn Fn(DataTable) -> Result<DataTable, EtlError> + Send + Sync>;

#[derive(Clone)]
struct Step {
    name: String,
    op: OpFn,
}

/// Ordered, branchable sequence of table operations
#[derive(Clone, Default)]
pub struct TransformPipeline {
    steps: Vec<Step>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named operation
    pub fn add_operation(
        mut self,
        name: impl Into<String>,
        op: impl Fn(DataTable) -> Result<DataTable, EtlError> + Send + Sync + 'static,
    ) -> Self {
        self.steps.push(Step {
            name: name.into(),
            op: Arc::new(op),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every operation in insertion order, threading the table through
    pub fn apply(&self, mut data: DataTable) -> Result<DataTable, EtlError> {
        for step in &self.steps {
            trace!(step = %step.name, rows = data.n_rows(), "Applying transform step");
            data = (step.op)(data)?;
        }
        Ok(data)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ops;
    use crate::table::{Cell, DataTable};

    fn table() -> DataTable {
        let mut table = DataTable::new(vec!["col1".into(), "col2".into()]).unwrap();
        table.push_row(vec!["1".into(), "4".into()]);
        table.push_row(vec!["2".into(), "5".into()]);
        table
    }

    #[test]
    fn test_operations_run_in_insertion_order() {
        let pipeline = TransformPipeline::new()
            .add_operation("rename col1", |t| {
                ops::rename_columns(t, &[("col1".into(), "c1".into())])
            })
            .add_operation("select c1", |t| ops::select_columns(t, &["c1".into()]));

        let out = pipeline.apply(table()).unwrap();
        assert_eq!(out.columns(), ["c1"]);
        assert_eq!(out.n_rows(), 2);
    }

    #[test]
    fn test_branch_isolation() {
        let base = TransformPipeline::new().add_operation("rename col1", |t| {
            ops::rename_columns(t, &[("col1".into(), "c1".into())])
        });

        let branch = base
            .clone()
            .add_operation("stamp season", |t| ops::assign_column(t, "season", Cell::Text("9900".into())));

        assert_eq!(base.len(), 1);
        assert_eq!(branch.len(), 2);

        let base_out = base.apply(table()).unwrap();
        let branch_out = branch.apply(table()).unwrap();
        assert!(!base_out.has_column("season"));
        assert_eq!(branch_out.cell(0, "season").unwrap().as_str(), Some("9900"));
    }

    #[test]
    fn test_failing_step_propagates() {
        let pipeline = TransformPipeline::new()
            .add_operation("parse missing date column", |t| {
                ops::parse_date_column(t, "no_such_column", &["%Y-%m-%d".into()])
            })
            .add_operation("never reached", |_| panic!("step after failure ran"));

        let err = pipeline.apply(table()).unwrap_err();
        assert!(matches!(err, EtlError::UnknownColumn(_)));
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let out = TransformPipeline::new().apply(table()).unwrap();
        assert_eq!(out, table());
    }
}
