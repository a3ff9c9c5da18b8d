//! Declarative data validation
//!
//! A [`Validator`] holds an ordered list of named rules, each a predicate
//! over the parsed table with an expected result. Validation stops at the
//! first rule whose outcome differs from its expectation, so cheap structural
//! checks can reject incompatible payloads before any transform work runs.

use crate::error::ValidationError;
use crate::table::DataTable;

type RuleFn = Box<dyn Fn(&DataTable) -> bool + Send + Sync>;

struct Rule {
    name: String,
    expected: bool,
    check: RuleFn,
}

/// Ordered rule set evaluated against a [`DataTable`]
#[derive(Default)]
pub struct Validator {
    rules: Vec<Rule>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named rule expecting `expected` from the predicate
    pub fn add_rule(
        mut self,
        name: impl Into<String>,
        expected: bool,
        check: impl Fn(&DataTable) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.rules.push(Rule {
            name: name.into(),
            expected,
            check: Box::new(check),
        });
        self
    }

    /// Convenience rule: all of `columns` are present in the table
    pub fn require_columns(self, columns: &[String]) -> Self {
        let required: Vec<String> = columns.to_vec();
        self.add_rule("required columns present", true, move |table| {
            table.has_columns(required.iter().map(String::as_str))
        })
    }

    /// Check every rule in insertion order, failing on the first mismatch
    pub fn validate(&self, data: &DataTable) -> Result<(), ValidationError> {
        for rule in &self.rules {
            let actual = (rule.check)(data);
            if actual != rule.expected {
                return Err(ValidationError {
                    rule: rule.name.clone(),
                    expected: rule.expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}
