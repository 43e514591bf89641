//! Error types for the catalog.
//!
//! [`FilterError`] covers client-side validation of filter directives and is
//! never retried. [`CatalogError`] is what data-source reads return.

use thiserror::Error;

use crate::filter::FilterOperator;
use crate::schema::Diagnostic;

/// A filter directive could not be turned into a clause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The operator is not one of the supported comparison operators.
    #[error(
        "wrong operator {operator:?} on filter {name:?}, try: {expected}",
        expected = FilterOperator::expected()
    )]
    WrongOperator {
        /// Field the directive applies to.
        name: String,
        /// The operator as written by the caller.
        operator: String,
    },

    /// A single-value operator received zero or several values.
    #[error("errors values: filter {name:?} must contain one value, got {got}")]
    OnlyOneValue {
        /// Field the directive applies to.
        name: String,
        /// Number of values supplied.
        got: usize,
    },

    /// A `TO` range did not receive exactly two values.
    #[error("errors values: filter {name:?} must contain two values, got {got}")]
    OnlyTwoValues {
        /// Field the directive applies to.
        name: String,
        /// Number of values supplied.
        got: usize,
    },
}

impl FilterError {
    /// Name of the filter that failed validation.
    pub fn name(&self) -> &str {
        match self {
            Self::WrongOperator { name, .. } => name,
            Self::OnlyOneValue { name, .. } => name,
            Self::OnlyTwoValues { name, .. } => name,
        }
    }

    /// The directive attribute at fault, relative to the directive itself.
    pub fn attribute(&self) -> &'static str {
        match self {
            Self::WrongOperator { .. } => "operator",
            Self::OnlyOneValue { .. } | Self::OnlyTwoValues { .. } => "values",
        }
    }
}

/// Errors returned by catalog data sources.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A filter directive was rejected before any backend call.
    #[error("error getting filters: {0}")]
    Filter(#[from] FilterError),

    /// Data-source configuration did not match its schema.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested data source type is not registered.
    #[error("Unknown data source type: {0}")]
    UnknownDataSource(String),

    /// The query matched nothing.
    #[error("Not hit found: {0}")]
    NotFound(String),

    /// The query matched several entries where exactly one was expected.
    #[error("Request got {count} hits, please set {flag}=true")]
    AmbiguousHits {
        /// Number of entries matched.
        count: usize,
        /// The attribute that selects a single entry.
        flag: &'static str,
    },

    /// The search index or inventory call failed.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The backend call did not finish within the configured timeout.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CatalogError {
    /// Short summary used as the diagnostic headline.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Filter(_) => "error getting filters",
            Self::Validation(_) => "Invalid data source configuration",
            Self::Configuration(_) => "Invalid provider configuration",
            Self::UnknownDataSource(_) => "Unknown data source",
            Self::NotFound(_) => "Not hit found",
            Self::AmbiguousHits { .. } => "Request got more than one hit",
            Self::Backend(_) => "Unable to read Autonomi catalog",
            Self::DeadlineExceeded(_) => "Catalog request timed out",
            Self::Serialization(_) => "Unable to decode catalog response",
        }
    }

    /// Convert into an error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.summary()).with_detail(self.to_string());
        match self {
            Self::AmbiguousHits { flag, .. } => diagnostic.with_attribute(*flag),
            _ => diagnostic,
        }
    }
}
