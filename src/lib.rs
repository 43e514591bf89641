//! Fabric Catalog
//!
//! The catalog side of a network-fabric provider. It compiles user-supplied
//! filter and sort directives into search-index queries, runs them through a
//! pluggable [`SearchBackend`], and maps the hits into data-source state.
//!
//! # Overview
//!
//! - **Filter compiler**: [`compile_filters`] turns `(name, operator, values)`
//!   directives into clauses, merging `location`/`locationTo` into one
//!   symmetric junction so a route matches in both directions
//! - **Sort compiler**: [`compile_sort`] produces `name:direction` keys
//! - **Local matcher**: [`apply_local_filters`] filters inventories that do
//!   not go through the index
//! - **Data sources**: product lists, single products and the account's
//!   physical port, each with a schema and validation
//! - **Catalog**: [`Catalog`] binds the data sources to a backend, a port
//!   inventory and a [`CatalogConfig`]
//! - **Logging**: structured logging through `tracing`
//!
//! # Quick Start
//!
//! ```
//! use fabric_catalog::{compile_filters, FilterDirective};
//!
//! let clauses = compile_filters(&[
//!     FilterDirective::new("location", "=", ["EQUINIX FR5"]),
//!     FilterDirective::new("locationTo", "=", ["EQUINIX LD5"]),
//!     FilterDirective::new("bandwidth", "TO", ["100", "1000"]),
//! ])
//! .unwrap();
//!
//! assert_eq!(
//!     clauses,
//!     vec![
//!         r#"(location = "EQUINIX FR5" AND locationTo = "EQUINIX LD5") OR (locationTo = "EQUINIX FR5" AND location = "EQUINIX LD5")"#,
//!         r#"bandwidth "100" TO "1000""#,
//!     ]
//! );
//! ```
//!
//! # Data Sources
//!
//! | Type name | Returns |
//! |---|---|
//! | `autonomi_<kind>_products` | every matching hit and the facet distribution |
//! | `autonomi_<kind>_product` | one hit; `cheapest = true` picks the lowest monthly price |
//! | `autonomi_physical_port` | one port; `most_recent = true` picks the newest |
//!
//! where `<kind>` is one of `cloud`, `transport`, `physical_port`, `access`
//! and `virtual_access`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod config;
pub mod datasource;
pub mod error;
pub mod filter;
pub mod local;
pub mod logging;
pub mod ports;
pub mod product;
pub mod schema;
pub mod search;
pub mod sort;
pub mod testing;
pub mod validation;

// Re-export main types at crate root
pub use catalog::{Catalog, ProviderMetadata};
pub use config::CatalogConfig;
pub use datasource::{DataSource, PROVIDER_NAME};
pub use error::{CatalogError, FilterError};
pub use filter::{combine_location_pairs, compile_filters, FilterDirective, FilterOperator, FilterSet};
pub use local::{apply_local_filters, LocalFields};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use ports::{PhysicalPort, PortInventory};
pub use product::{FacetDistribution, Product, ProductKind};
pub use schema::{Diagnostic, ProviderSchema};
pub use search::{build_search_request, SearchBackend, SearchRequest, SearchResponse};
pub use sort::{compile_sort, SortDirective};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for backend implementations
pub use async_trait::async_trait;

pub use serde_json;
pub use tracing;
