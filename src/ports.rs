//! Physical ports owned by the account.
//!
//! Ports come from the control-plane API rather than the search index, so
//! they are filtered in memory with [`apply_local_filters`](crate::local::apply_local_filters).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::local::LocalFields;

/// Product a physical port was ordered from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase", serialize = "snake_case"))]
pub struct PortProduct {
    /// Operator of the port.
    #[serde(default)]
    pub provider: String,
    /// Commitment duration in months.
    #[serde(default)]
    pub duration: i64,
    /// Location of the port.
    #[serde(default)]
    pub location: String,
    /// Bandwidth in Mbps.
    #[serde(default)]
    pub bandwidth: i64,
    /// Non-recurring price.
    #[serde(default)]
    pub price_nrc: i64,
    /// Monthly recurring price.
    #[serde(default)]
    pub price_mrc: i64,
    /// Non-recurring cost.
    #[serde(default)]
    pub cost_nrc: i64,
    /// Monthly recurring cost.
    #[serde(default)]
    pub cost_mrc: i64,
    /// Stock keeping unit.
    #[serde(default)]
    pub sku: String,
}

/// A physical port as listed by the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase", serialize = "snake_case"))]
pub struct PhysicalPort {
    /// Port identifier.
    pub id: String,
    /// Name given at order time.
    pub name: String,
    /// Owning account.
    #[serde(default)]
    pub account_id: String,
    /// Deployment state.
    #[serde(default)]
    pub state: String,
    /// VLANs already allocated on the port.
    #[serde(default, rename(deserialize = "usedVLANs", serialize = "used_vlans"))]
    pub used_vlans: Vec<i64>,
    /// Creation time; the most recent port wins when several match.
    pub created_at: DateTime<Utc>,
    /// Product the port was ordered from.
    #[serde(default)]
    pub product: PortProduct,
}

impl PhysicalPort {
    /// State representation used by the `physical_port` data source.
    pub fn to_state(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "account_id": self.account_id,
            "available_bandwidth": self.product.bandwidth,
            "administrative_state": self.state,
            "used_vlans": self.used_vlans,
            "product": self.product,
        })
    }
}

// Field names are already lower-cased by the caller.
impl LocalFields for PhysicalPort {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.clone()),
            "name" => Some(self.name.clone()),
            "location" => Some(self.product.location.clone()),
            "bandwidth" => Some(self.product.bandwidth.to_string()),
            "pricemrc" => Some(self.product.price_mrc.to_string()),
            "pricenrc" => Some(self.product.price_nrc.to_string()),
            _ => None,
        }
    }
}

/// Source of the ports available on the account.
#[async_trait::async_trait]
pub trait PortInventory: Send + Sync + 'static {
    /// List ports in the `created` administrative state.
    async fn list_ports(&self) -> Result<Vec<PhysicalPort>, CatalogError>;
}
