//! In-memory filtering.
//!
//! Inventories listed from the control plane (the account's physical ports)
//! are filtered locally instead of through the search index. Only `=` and
//! `IN` are supported here, and field names are matched case-insensitively.

use serde_json::Value;

use crate::error::FilterError;
use crate::filter::{FilterDirective, FilterOperator};

/// Exposes the filterable fields of an inventory item.
pub trait LocalFields {
    /// String form of the field called `name` (lower-case), or `None` when
    /// the item has no such field.
    fn field(&self, name: &str) -> Option<String>;
}

impl LocalFields for Value {
    fn field(&self, name: &str) -> Option<String> {
        let (_, value) = self
            .as_object()?
            .iter()
            .find(|(key, _)| key.to_lowercase() == name)?;
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalOperator {
    Equal,
    In,
}

/// A validated directive ready to be evaluated against items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFilter {
    name: String,
    operator: LocalOperator,
    values: Vec<String>,
}

impl LocalFilter {
    /// Validate a directive for local evaluation.
    pub fn parse(directive: &FilterDirective) -> Result<Self, FilterError> {
        let operator = match directive.operator()? {
            FilterOperator::Equal if directive.values.len() == 1 => LocalOperator::Equal,
            FilterOperator::Equal => {
                return Err(FilterError::OnlyOneValue {
                    name: directive.name.clone(),
                    got: directive.values.len(),
                })
            },
            FilterOperator::In => LocalOperator::In,
            _ => {
                return Err(FilterError::WrongOperator {
                    name: directive.name.clone(),
                    operator: directive.operator.clone(),
                })
            },
        };

        Ok(Self {
            name: directive.name.to_lowercase(),
            operator,
            values: directive.values.clone(),
        })
    }

    /// Whether `item` satisfies this filter. Fields the item does not expose
    /// never exclude it.
    pub fn matches<T: LocalFields + ?Sized>(&self, item: &T) -> bool {
        let Some(actual) = item.field(&self.name) else {
            return true;
        };
        match self.operator {
            LocalOperator::Equal => self.values.first() == Some(&actual),
            LocalOperator::In => self.values.contains(&actual),
        }
    }
}

/// Keep the items matching every directive, in their original order.
///
/// All directives are validated before any item is examined.
pub fn apply_local_filters<T: LocalFields>(
    items: Vec<T>,
    directives: &[FilterDirective],
) -> Result<Vec<T>, FilterError> {
    let filters = directives
        .iter()
        .map(LocalFilter::parse)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(items
        .into_iter()
        .filter(|item| filters.iter().all(|filter| filter.matches(item)))
        .collect())
}
