//! The catalog: registered data sources bound to a search backend and a port
//! inventory.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::CatalogConfig;
use crate::datasource::{DataSource, PROVIDER_NAME};
use crate::error::CatalogError;
use crate::ports::PortInventory;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::search::SearchBackend;

/// Names of everything the catalog serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Provider type name, the prefix of every data source.
    pub provider: String,
    /// Data source type names, in registration order.
    pub data_sources: Vec<String>,
}

/// Catalog data sources served through `B` and `I`.
///
/// # Example
///
/// ```
/// use fabric_catalog::testing::{RecordingBackend, StaticInventory};
/// use fabric_catalog::{Catalog, CatalogConfig};
///
/// let catalog = Catalog::new(
///     RecordingBackend::default(),
///     StaticInventory::default(),
///     CatalogConfig::new("https://catalog.example", "pat"),
/// );
/// assert!(catalog
///     .metadata()
///     .data_sources
///     .contains(&"autonomi_transport_products".to_string()));
/// ```
pub struct Catalog<B, I> {
    backend: B,
    inventory: I,
    config: CatalogConfig,
    data_sources: Vec<DataSource>,
}

impl<B: SearchBackend, I: PortInventory> Catalog<B, I> {
    /// Create a catalog serving every data source.
    pub fn new(backend: B, inventory: I, config: CatalogConfig) -> Self {
        Self {
            backend,
            inventory,
            config,
            data_sources: DataSource::all(),
        }
    }

    /// Resolve the provider block and create the catalog.
    pub fn configure(backend: B, inventory: I, provider_config: &Value) -> Result<Self, Vec<Diagnostic>> {
        let config = CatalogConfig::from_value(provider_config)?;
        debug!(catalog_url = %config.catalog_url, timeout = ?config.timeout, "Catalog configured");
        Ok(Self::new(backend, inventory, config))
    }

    /// Resolved configuration.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// The search backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The port inventory.
    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// Provider and data-source type names.
    pub fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            provider: PROVIDER_NAME.to_string(),
            data_sources: self.data_sources.iter().map(DataSource::type_name).collect(),
        }
    }

    /// Provider block schema and every data-source schema.
    pub fn schema(&self) -> ProviderSchema {
        self.data_sources.iter().fold(
            ProviderSchema::new().with_provider_config(CatalogConfig::schema()),
            |schema, source| schema.with_data_source(source.type_name(), source.schema()),
        )
    }

    fn data_source(&self, type_name: &str) -> Result<DataSource, CatalogError> {
        self.data_sources
            .iter()
            .copied()
            .find(|source| source.type_name() == type_name)
            .ok_or_else(|| CatalogError::UnknownDataSource(type_name.to_string()))
    }

    /// Validate a data source configuration without running it.
    pub fn validate_data_source_config(
        &self,
        type_name: &str,
        config: &Value,
    ) -> Result<Vec<Diagnostic>, CatalogError> {
        Ok(self.data_source(type_name)?.validate(config))
    }

    /// Validate and run a data source, bounded by the configured timeout.
    pub async fn read_data_source(&self, type_name: &str, config: &Value) -> Result<Value, CatalogError> {
        let source = self.data_source(type_name)?;

        let errors: Vec<String> = source
            .validate(config)
            .into_iter()
            .filter(Diagnostic::is_error)
            .map(|d| match (d.attribute, d.detail) {
                (Some(attribute), Some(detail)) => format!("{}: {}", attribute, detail),
                (_, Some(detail)) => detail,
                (_, None) => d.summary,
            })
            .collect();
        if !errors.is_empty() {
            return Err(CatalogError::Validation(errors.join("; ")));
        }

        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, source.read(&self.backend, &self.inventory, config)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(data_source = %type_name, ?timeout, "Catalog read timed out");
                Err(CatalogError::DeadlineExceeded(format!(
                    "{} did not complete within {:?}",
                    type_name, timeout
                )))
            },
        }
    }
}
