//! Sort directives.

use serde::{Deserialize, Serialize};

use crate::filter::null_as_default;

/// A `(name, direction)` sort key.
///
/// The direction is forwarded verbatim; the search index understands `asc`
/// and `desc`. In data-source configuration the direction is written under
/// `value`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortDirective {
    /// Field to sort on.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Sort direction.
    #[serde(
        rename = "value",
        alias = "direction",
        default,
        deserialize_with = "null_as_default"
    )]
    pub direction: String,
}

impl SortDirective {
    /// Create a sort key.
    pub fn new(name: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: direction.into(),
        }
    }

    /// Ascending sort on `name`.
    pub fn asc(name: impl Into<String>) -> Self {
        Self::new(name, "asc")
    }

    /// Descending sort on `name`.
    pub fn desc(name: impl Into<String>) -> Self {
        Self::new(name, "desc")
    }

    /// Render as `name:direction`.
    pub fn clause(&self) -> String {
        format!("{}:{}", self.name, self.direction)
    }
}

/// Render sort keys, first entry highest priority. Never fails.
pub fn compile_sort(directives: &[SortDirective]) -> Vec<String> {
    directives.iter().map(SortDirective::clause).collect()
}
