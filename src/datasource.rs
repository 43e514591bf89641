//! Catalog data sources.
//!
//! Three shapes exist: a product list per [`ProductKind`]
//! (`autonomi_transport_products`), a single product per kind
//! (`autonomi_transport_product`) and the account's physical port
//! (`autonomi_physical_port`). Product data sources query the search index;
//! the physical port comes from the control plane and is filtered locally.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::CatalogError;
use crate::filter::{null_as_default, FilterDirective, FilterOperator};
use crate::local::{apply_local_filters, LocalFilter};
use crate::ports::PortInventory;
use crate::product::{Product, ProductKind};
use crate::schema::{
    facet_distribution_block, filters_block, product_block, sort_block, Attribute,
    AttributeFlags, AttributeType, Block, Diagnostic, NestedBlock, Schema,
};
use crate::search::{build_search_request, SearchBackend};
use crate::sort::SortDirective;
use crate::validation::{compiled_filter_diagnostics, filter_diagnostics, validate};

/// Prefix of every data-source type name.
pub const PROVIDER_NAME: &str = "autonomi";

/// Fields a physical port can be filtered on.
pub const PORT_FILTER_FIELDS: [&str; 6] =
    ["id", "name", "location", "bandwidth", "priceMrc", "priceNrc"];

const PRICE_FIELDS: [&str; 4] = ["priceNrc", "priceMrc", "costNrc", "costMrc"];

/// Configuration shared by every data source. Attributes a data source does
/// not declare decode to their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryConfig {
    #[serde(deserialize_with = "null_as_default")]
    filters: Vec<FilterDirective>,
    #[serde(deserialize_with = "null_as_default")]
    sort: Vec<SortDirective>,
    #[serde(deserialize_with = "null_as_default")]
    cheapest: bool,
    #[serde(deserialize_with = "null_as_default")]
    most_recent: bool,
}

impl QueryConfig {
    fn decode(config: &Value) -> Result<Self, CatalogError> {
        match config {
            Value::Null => Ok(Self::default()),
            _ => Ok(serde_json::from_value(config.clone())?),
        }
    }
}

/// A data source exposed by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// Every product of a kind matching the filters.
    Products(ProductKind),
    /// Exactly one product of a kind.
    Product(ProductKind),
    /// Exactly one physical port of the account.
    PhysicalPort,
}

impl DataSource {
    /// Every data source, list and single per kind, then the physical port.
    pub fn all() -> Vec<DataSource> {
        ProductKind::ALL
            .iter()
            .flat_map(|kind| [Self::Products(*kind), Self::Product(*kind)])
            .chain(std::iter::once(Self::PhysicalPort))
            .collect()
    }

    /// Look a data source up by its type name.
    pub fn from_type_name(type_name: &str) -> Option<DataSource> {
        Self::all()
            .into_iter()
            .find(|source| source.type_name() == type_name)
    }

    /// Type name, e.g. `autonomi_cloud_products`.
    pub fn type_name(&self) -> String {
        match self {
            Self::Products(kind) => format!("{}_{}s", PROVIDER_NAME, kind.stem()),
            Self::Product(kind) => format!("{}_{}", PROVIDER_NAME, kind.stem()),
            Self::PhysicalPort => format!("{}_physical_port", PROVIDER_NAME),
        }
    }

    /// Configuration and state schema.
    pub fn schema(&self) -> Schema {
        match self {
            Self::Products(kind) => Schema::v0()
                .with_description(format!(
                    "Datasource to retrieve a list of {} products by filters.",
                    kind
                ))
                .with_block("filters", filters_block(kind.facets(), &FilterOperator::ALL))
                .with_block("sort", sort_block(&sort_fields(*kind)))
                .with_block("hits", NestedBlock::list(product_block(*kind)).computed())
                .with_block("facet_distribution", facet_distribution_block(*kind)),
            Self::Product(kind) => Schema::v0()
                .with_description(format!(
                    "Datasource to retrieve a single {} product by filters.",
                    kind
                ))
                .with_attribute(
                    "cheapest",
                    Attribute::optional_bool()
                        .with_description("To ensure only one hit is returned we advise to set at true"),
                )
                .with_block("filters", filters_block(kind.facets(), &FilterOperator::ALL))
                .with_block("hit", NestedBlock::single(product_block(*kind)).computed())
                .with_block("facet_distribution", facet_distribution_block(*kind)),
            Self::PhysicalPort => Schema::v0()
                .with_description("Datasource to retrieve a physical port of the account by filters.")
                .with_attribute(
                    "most_recent",
                    Attribute::optional_bool()
                        .with_description("To ensure only one hit is returned we advise to set at true"),
                )
                .with_block(
                    "filters",
                    filters_block(&PORT_FILTER_FIELDS, &[FilterOperator::Equal, FilterOperator::In]),
                )
                .with_block("port", NestedBlock::single(port_block()).computed()),
        }
    }

    /// Check `config` against the schema, then the filter directives: every
    /// directive for the physical port, the ones surviving compilation for
    /// product searches.
    pub fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let diagnostics = validate(&self.schema(), config);
        if !diagnostics.is_empty() {
            return diagnostics;
        }

        let query = match QueryConfig::decode(config) {
            Ok(query) => query,
            Err(err) => return vec![err.to_diagnostic()],
        };

        match self {
            Self::PhysicalPort => {
                filter_diagnostics(&query.filters, |d| LocalFilter::parse(d).map(|_| ()))
            },
            _ => compiled_filter_diagnostics(&query.filters),
        }
    }

    /// Run the data source and return its state.
    pub async fn read(
        &self,
        backend: &dyn SearchBackend,
        inventory: &dyn PortInventory,
        config: &Value,
    ) -> Result<Value, CatalogError> {
        let query = QueryConfig::decode(config)?;
        let type_name = self.type_name();

        match self {
            Self::Products(kind) => {
                let request = build_search_request(*kind, &query.filters, &query.sort)?;
                debug!(data_source = %type_name, filter = ?request.filter, sort = ?request.sort, "Searching catalog");
                let response = backend.search(kind.index(), &request).await?;
                info!(data_source = %type_name, hits = response.hits.len(), "Catalog search complete");

                Ok(json!({
                    "filters": query.filters,
                    "sort": query.sort,
                    "hits": response.hits,
                    "facet_distribution": response.facet_distribution.to_state(*kind),
                }))
            },
            Self::Product(kind) => {
                let request = build_search_request(*kind, &query.filters, &[])?;
                debug!(data_source = %type_name, filter = ?request.filter, "Searching catalog");
                let response = backend.search(kind.index(), &request).await?;
                info!(data_source = %type_name, hits = response.hits.len(), "Catalog search complete");

                let hit = select_one(response.hits, query.cheapest, "cheapest", &type_name, cheapest_first)?;
                Ok(json!({
                    "filters": query.filters,
                    "cheapest": query.cheapest,
                    "hit": hit,
                    "facet_distribution": response.facet_distribution.to_state(*kind),
                }))
            },
            Self::PhysicalPort => {
                let ports = inventory.list_ports().await?;
                let listed = ports.len();
                let ports = apply_local_filters(ports, &query.filters)?;
                info!(data_source = %type_name, listed, matched = ports.len(), "Physical ports filtered");

                let port = select_one(ports, query.most_recent, "most_recent", &type_name, |ports| {
                    ports.sort_by(|a, b| b.created_at.cmp(&a.created_at))
                })?;
                Ok(json!({
                    "filters": query.filters,
                    "most_recent": query.most_recent,
                    "port": port.to_state(),
                }))
            },
        }
    }
}

// Stable, so equal prices keep the index order.
fn cheapest_first(hits: &mut Vec<Product>) {
    hits.sort_by_key(|hit| hit.price_mrc);
}

/// Reduce `hits` to one entry. Several hits are only resolved when `flag`
/// is set, by taking the first entry after `order`.
fn select_one<T>(
    mut hits: Vec<T>,
    enabled: bool,
    flag: &'static str,
    type_name: &str,
    order: impl FnOnce(&mut Vec<T>),
) -> Result<T, CatalogError> {
    match hits.len() {
        0 => Err(CatalogError::NotFound(type_name.to_string())),
        1 => Ok(hits.remove(0)),
        count if !enabled => Err(CatalogError::AmbiguousHits { count, flag }),
        _ => {
            order(&mut hits);
            Ok(hits.remove(0))
        },
    }
}

fn sort_fields(kind: ProductKind) -> Vec<&'static str> {
    kind.facets().iter().chain(PRICE_FIELDS.iter()).copied().collect()
}

fn port_block() -> Block {
    let product = Block::new()
        .with_attribute("provider", Attribute::computed_string())
        .with_attribute("duration", Attribute::computed_int64())
        .with_attribute("location", Attribute::computed_string())
        .with_attribute("bandwidth", Attribute::computed_int64())
        .with_attribute("price_nrc", Attribute::computed_int64())
        .with_attribute("price_mrc", Attribute::computed_int64())
        .with_attribute("cost_nrc", Attribute::computed_int64())
        .with_attribute("cost_mrc", Attribute::computed_int64())
        .with_attribute("sku", Attribute::computed_string());

    Block::new()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("name", Attribute::computed_string())
        .with_attribute("account_id", Attribute::computed_string())
        .with_attribute("available_bandwidth", Attribute::computed_int64())
        .with_attribute("administrative_state", Attribute::computed_string())
        .with_attribute(
            "used_vlans",
            Attribute::new(AttributeType::list(AttributeType::Int64), AttributeFlags::computed()),
        )
        .with_block("product", NestedBlock::single(product).computed())
        .with_description("The physical port matching the filters.")
}
