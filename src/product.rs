//! Product catalog model.
//!
//! Every kind of product lives in its own search index with its own facets.
//! Some data sources also pin base filters (access products are always
//! InterCloud physical accesses, for example).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::filter::FilterDirective;

/// Product provider operating the InterCloud backbone.
pub const INTERCLOUD: &str = "InterCloud";

/// A kind of product exposed by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProductKind {
    /// Cloud service provider on-ramps.
    Cloud,
    /// Point-to-point transports between two locations.
    Transport,
    /// Physical ports in a location.
    PhysicalPort,
    /// Physical accesses operated by InterCloud.
    Access,
    /// Virtual accesses.
    VirtualAccess,
}

impl ProductKind {
    /// Every kind, in registration order.
    pub const ALL: [ProductKind; 5] = [
        Self::Cloud,
        Self::Transport,
        Self::PhysicalPort,
        Self::Access,
        Self::VirtualAccess,
    ];

    /// Name of the search index holding this kind.
    pub fn index(&self) -> &'static str {
        match self {
            Self::Cloud => "cloudproduct",
            Self::Transport => "transportproduct",
            Self::PhysicalPort => "portproduct",
            Self::Access | Self::VirtualAccess => "accessproduct",
        }
    }

    /// Facets requested alongside the hits.
    pub fn facets(&self) -> &'static [&'static str] {
        match self {
            Self::Cloud => &[
                "cspName",
                "cspRegion",
                "cspCity",
                "location",
                "bandwidth",
                "provider",
            ],
            Self::Transport => &["location", "locationTo", "bandwidth", "provider"],
            Self::PhysicalPort => &["location", "bandwidth", "provider", "duration"],
            Self::Access | Self::VirtualAccess => &["location", "bandwidth", "provider", "type"],
        }
    }

    /// Filters always applied ahead of the user's.
    pub fn base_filters(&self) -> Vec<FilterDirective> {
        match self {
            Self::Access => vec![
                FilterDirective::new("provider", "=", [INTERCLOUD]),
                FilterDirective::new("type", "=", ["PHYSICAL"]),
            ],
            Self::VirtualAccess => vec![FilterDirective::new("type", "=", ["VIRTUAL"])],
            _ => Vec::new(),
        }
    }

    /// Stem of the data-source type name, e.g. `transport_product`.
    pub fn stem(&self) -> &'static str {
        match self {
            Self::Cloud => "cloud_product",
            Self::Transport => "transport_product",
            Self::PhysicalPort => "physical_port_product",
            Self::Access => "access_product",
            Self::VirtualAccess => "virtual_access_product",
        }
    }

    /// Human readable label used in diagnostics and descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::Transport => "transport",
            Self::PhysicalPort => "physical port",
            Self::Access => "access",
            Self::VirtualAccess => "virtual access",
        }
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A product hit returned by the search index.
///
/// Read from the index in camelCase, written to state in snake_case.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase", serialize = "snake_case"))]
pub struct Product {
    /// Catalog identifier.
    #[serde(default)]
    pub id: i64,
    /// Operator of the product.
    #[serde(default)]
    pub provider: String,
    /// Commitment duration in months.
    #[serde(default)]
    pub duration: i64,
    /// Location, or route origin for transports.
    #[serde(default)]
    pub location: String,
    /// Underlay location behind `location`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_underlay: Option<String>,
    /// Bandwidth in Mbps.
    #[serde(default)]
    pub bandwidth: i64,
    /// Price list date.
    #[serde(default)]
    pub date: String,
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
    /// Cloud service provider (cloud products).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csp_name: Option<String>,
    /// Cloud region (cloud products).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csp_region: Option<String>,
    /// Cloud city (cloud products).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csp_city: Option<String>,
    /// Route destination (transports).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_to: Option<String>,
    /// Underlay location behind `location_to`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_to_underlay: Option<String>,
    /// `PHYSICAL` or `VIRTUAL` (accesses).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
}

/// Facet name to (facet value to hit count).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacetDistribution(pub BTreeMap<String, BTreeMap<String, i64>>);

impl FacetDistribution {
    /// Counts for one facet.
    pub fn get(&self, facet: &str) -> Option<&BTreeMap<String, i64>> {
        self.0.get(facet)
    }

    /// State representation: facet names in snake_case, every facet of
    /// `kind` present even when the index returned nothing for it.
    pub fn to_state(&self, kind: ProductKind) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        for facet in kind.facets() {
            let counts = self.0.get(*facet).cloned().unwrap_or_default();
            out.insert(snake_case(facet), serde_json::json!(counts));
        }
        serde_json::Value::Object(out)
    }
}

/// `locationTo` -> `location_to`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_indexes() {
        assert_eq!(ProductKind::Transport.index(), "transportproduct");
        assert_eq!(ProductKind::PhysicalPort.index(), "portproduct");
        assert_eq!(
            ProductKind::Access.index(),
            ProductKind::VirtualAccess.index()
        );
    }

    #[test]
    fn test_base_filters() {
        assert!(ProductKind::Cloud.base_filters().is_empty());
        let access = ProductKind::Access.base_filters();
        assert_eq!(access.len(), 2);
        assert_eq!(access[0].clause().unwrap(), r#"provider = "InterCloud""#);
        assert_eq!(access[1].clause().unwrap(), r#"type = "PHYSICAL""#);
        assert_eq!(
            ProductKind::VirtualAccess.base_filters()[0].clause().unwrap(),
            r#"type = "VIRTUAL""#
        );
    }

    #[test]
    fn test_product_decodes_camel_case_and_encodes_snake_case() {
        let product: Product = serde_json::from_value(json!({
            "id": 7,
            "provider": "EQUINIX",
            "location": "EQUINIX FR5",
            "locationTo": "EQUINIX LD5",
            "bandwidth": 100,
            "priceMrc": 120,
            "sku": "TR-100",
        }))
        .unwrap();
        assert_eq!(product.location_to.as_deref(), Some("EQUINIX LD5"));
        assert_eq!(product.price_mrc, 120);

        let state = serde_json::to_value(&product).unwrap();
        assert_eq!(state["location_to"], "EQUINIX LD5");
        assert_eq!(state["price_mrc"], 120);
        assert!(state.get("csp_name").is_none());
        assert!(state.get("locationTo").is_none());
    }

    #[test]
    fn test_facet_distribution_state() {
        let facets: FacetDistribution = serde_json::from_value(json!({
            "locationTo": {"EQUINIX LD5": 3},
            "bandwidth": {"100": 2, "1000": 1},
        }))
        .unwrap();
        assert_eq!(facets.get("bandwidth").unwrap()["100"], 2);

        let state = facets.to_state(ProductKind::Transport);
        assert_eq!(state["location_to"]["EQUINIX LD5"], 3);
        assert_eq!(state["location"], json!({}));
        assert_eq!(state.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("cspRegion"), "csp_region");
        assert_eq!(snake_case("location"), "location");
    }
}
