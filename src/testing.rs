//! Testing utilities for code built on the catalog.
//!
//! [`RecordingBackend`] and [`StaticInventory`] stand in for the search index
//! and the control plane, and [`CatalogTester`] turns diagnostics into
//! test-friendly errors.
//!
//! # Example
//!
//! ```
//! use fabric_catalog::testing::{product, CatalogTester, RecordingBackend, StaticInventory};
//! use fabric_catalog::{Catalog, CatalogConfig};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let tester = CatalogTester::new(Catalog::new(
//!     RecordingBackend::with_hits(vec![product(1, "EQUINIX FR5", 10)]),
//!     StaticInventory::default(),
//!     CatalogConfig::new("https://catalog.example", "pat"),
//! ));
//!
//! let state = tester
//!     .read("autonomi_physical_port_product", json!({"cheapest": true}))
//!     .await
//!     .unwrap();
//! assert_eq!(state["hit"]["location"], "EQUINIX FR5");
//! # });
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::ports::{PhysicalPort, PortInventory, PortProduct};
use crate::product::Product;
use crate::schema::{Diagnostic, DiagnosticSeverity};
use crate::search::{SearchBackend, SearchRequest, SearchResponse};

/// A search backend answering every query with the same response and
/// recording the queries it receives.
///
/// Clones share their recordings.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    response: SearchResponse,
    failure: Option<String>,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<(String, SearchRequest)>>>,
}

impl RecordingBackend {
    /// Answer with `response`.
    pub fn with_response(response: SearchResponse) -> Self {
        Self {
            response,
            ..Self::default()
        }
    }

    /// Answer with `hits` and no facet counts.
    pub fn with_hits(hits: Vec<Product>) -> Self {
        Self::with_response(SearchResponse {
            hits,
            ..SearchResponse::default()
        })
    }

    /// Fail every query with [`CatalogError::Backend`].
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Wait `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every `(index, request)` received so far.
    pub fn requests(&self) -> Vec<(String, SearchRequest)> {
        self.recorded().clone()
    }

    /// The most recent `(index, request)`.
    pub fn last_request(&self) -> Option<(String, SearchRequest)> {
        self.recorded().last().cloned()
    }

    fn recorded(&self) -> MutexGuard<'_, Vec<(String, SearchRequest)>> {
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl SearchBackend for RecordingBackend {
    async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchResponse, CatalogError> {
        self.recorded().push((index.to_string(), request.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(CatalogError::Backend(message.clone())),
            None => Ok(self.response.clone()),
        }
    }
}

/// A port inventory listing a fixed set of ports.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    ports: Vec<PhysicalPort>,
    failure: Option<String>,
}

impl StaticInventory {
    /// List `ports`.
    pub fn new(ports: Vec<PhysicalPort>) -> Self {
        Self { ports, failure: None }
    }

    /// Fail every listing with [`CatalogError::Backend`].
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            ports: Vec::new(),
            failure: Some(message.into()),
        }
    }
}

#[async_trait::async_trait]
impl PortInventory for StaticInventory {
    async fn list_ports(&self) -> Result<Vec<PhysicalPort>, CatalogError> {
        match &self.failure {
            Some(message) => Err(CatalogError::Backend(message.clone())),
            None => Ok(self.ports.clone()),
        }
    }
}

/// A product at `location` priced `price_mrc` per month.
pub fn product(id: i64, location: &str, price_mrc: i64) -> Product {
    Product {
        id,
        provider: "EQUINIX".to_string(),
        duration: 12,
        location: location.to_string(),
        bandwidth: 1000,
        price_mrc,
        sku: format!("SKU-{}", id),
        ..Product::default()
    }
}

/// A deployed 1 Gbps port created at `created_at` (RFC 3339).
///
/// # Panics
///
/// Panics if `created_at` is not a valid RFC 3339 timestamp.
pub fn port(id: &str, name: &str, location: &str, created_at: &str) -> PhysicalPort {
    let created_at = DateTime::parse_from_rfc3339(created_at)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|err| panic!("invalid timestamp {:?}: {}", created_at, err));

    PhysicalPort {
        id: id.to_string(),
        name: name.to_string(),
        account_id: "account".to_string(),
        state: "deployed".to_string(),
        used_vlans: Vec::new(),
        created_at,
        product: PortProduct {
            provider: "EQUINIX".to_string(),
            duration: 12,
            location: location.to_string(),
            bandwidth: 1000,
            ..PortProduct::default()
        },
    }
}

/// Drives a [`Catalog`] and reports failures as [`TestError`].
pub struct CatalogTester<B, I> {
    catalog: Catalog<B, I>,
}

impl<B: SearchBackend, I: PortInventory> CatalogTester<B, I> {
    /// Wrap `catalog`.
    pub fn new(catalog: Catalog<B, I>) -> Self {
        Self { catalog }
    }

    /// The wrapped catalog.
    pub fn catalog(&self) -> &Catalog<B, I> {
        &self.catalog
    }

    /// Registered data-source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.catalog.metadata().data_sources
    }

    /// Validate a data-source configuration; error diagnostics become
    /// [`TestError::Diagnostics`].
    pub fn validate(&self, type_name: &str, config: Value) -> Result<(), TestError> {
        let diagnostics = self.catalog.validate_data_source_config(type_name, &config)?;
        check_diagnostics(diagnostics)
    }

    /// Read a data source.
    pub async fn read(&self, type_name: &str, config: Value) -> Result<Value, TestError> {
        Ok(self.catalog.read_data_source(type_name, &config).await?)
    }
}

/// Failure of a [`CatalogTester`] operation.
#[derive(Debug)]
pub enum TestError {
    /// Validation produced error diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The catalog returned an error.
    Catalog(CatalogError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "{} error diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  {}", diag.summary)?;
                    if let Some(attr) = &diag.attribute {
                        write!(f, " at {}", attr)?;
                    }
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Catalog(e) => write!(f, "Catalog error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<CatalogError> for TestError {
    fn from(e: CatalogError) -> Self {
        TestError::Catalog(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
    assert!(
        errors.is_empty(),
        "Expected no errors, but got {}: {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that some error diagnostic points at `attribute`.
///
/// # Panics
///
/// Panics if no error diagnostic carries that attribute path.
pub fn assert_error_at(diagnostics: &[Diagnostic], attribute: &str) {
    let found = diagnostics.iter().any(|d| {
        matches!(d.severity, DiagnosticSeverity::Error) && d.attribute.as_deref() == Some(attribute)
    });
    assert!(
        found,
        "Expected an error at '{}', got errors at {:?}",
        attribute,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.attribute)
            .collect::<Vec<_>>()
    );
}
