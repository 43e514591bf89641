//! Search requests and the search-index seam.
//!
//! [`build_search_request`] is the only place filter and sort directives are
//! compiled; data sources hand its output to a [`SearchBackend`] untouched.

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, FilterError};
use crate::filter::{compile_filters, FilterDirective};
use crate::product::{FacetDistribution, Product, ProductKind};
use crate::sort::{compile_sort, SortDirective};

/// A query against one product index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Independent filter clauses, ANDed by the index.
    #[serde(default)]
    pub filter: Vec<String>,
    /// `field:direction` sort keys, highest priority first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<String>,
    /// Facets whose distribution should be returned.
    #[serde(default)]
    pub facets: Vec<String>,
}

/// Hits and facet counts returned by the index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Matching products.
    #[serde(default)]
    pub hits: Vec<Product>,
    /// Distribution of the requested facets over all matches.
    #[serde(default)]
    pub facet_distribution: FacetDistribution,
}

/// A product search index.
///
/// Implementations wrap the HTTP client of the index; the catalog only relies
/// on this trait.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    /// Run `request` against the index named `index`.
    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, CatalogError>;
}

/// Compile directives into the request for `kind`.
///
/// The kind's base filters come first. Any invalid directive aborts before a
/// request exists.
pub fn build_search_request(
    kind: ProductKind,
    filters: &[FilterDirective],
    sorts: &[SortDirective],
) -> Result<SearchRequest, FilterError> {
    let mut filter = compile_filters(&kind.base_filters())?;
    filter.extend(compile_filters(filters)?);

    Ok(SearchRequest {
        filter,
        sort: compile_sort(sorts),
        facets: kind.facets().iter().map(|f| f.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_transport_request() {
        let request = build_search_request(
            ProductKind::Transport,
            &[
                FilterDirective::new("location", "=", ["EQUINIX FR5"]),
                FilterDirective::new("locationTo", "=", ["EQUINIX LD5"]),
                FilterDirective::new("bandwidth", "TO", ["100", "1000"]),
            ],
            &[SortDirective::asc("priceMrc")],
        )
        .unwrap();

        assert_eq!(
            request.filter,
            vec![
                r#"(location = "EQUINIX FR5" AND locationTo = "EQUINIX LD5") OR (locationTo = "EQUINIX FR5" AND location = "EQUINIX LD5")"#,
                r#"bandwidth "100" TO "1000""#,
            ]
        );
        assert_eq!(request.sort, vec!["priceMrc:asc"]);
        assert_eq!(
            request.facets,
            vec!["location", "locationTo", "bandwidth", "provider"]
        );
    }

    #[test]
    fn test_base_filters_come_first() {
        let request = build_search_request(
            ProductKind::Access,
            &[FilterDirective::new("location", "IN", ["EQUINIX PA3"])],
            &[],
        )
        .unwrap();
        assert_eq!(
            request.filter,
            vec![
                r#"provider = "InterCloud""#,
                r#"type = "PHYSICAL""#,
                r#"location IN ["EQUINIX PA3"]"#,
            ]
        );
    }

    #[test]
    fn test_invalid_filter_yields_no_request() {
        let err = build_search_request(
            ProductKind::Cloud,
            &[FilterDirective::new("cspName", "LIKE", ["AWS"])],
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::WrongOperator { .. }));
    }

    #[test]
    fn test_request_wire_format() {
        let request = build_search_request(
            ProductKind::PhysicalPort,
            &[FilterDirective::new("bandwidth", "=", ["1000"])],
            &[],
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "filter": ["bandwidth = \"1000\""],
                "facets": ["location", "bandwidth", "provider", "duration"],
            })
        );
    }

    #[test]
    fn test_response_decode() {
        let response: SearchResponse = serde_json::from_value(json!({
            "hits": [{"id": 1, "provider": "EQUINIX", "priceMrc": 10}],
            "facetDistribution": {"provider": {"EQUINIX": 1}},
            "processingTimeMs": 2,
        }))
        .unwrap();
        assert_eq!(response.hits.len(), 1);
        assert_eq!(response.facet_distribution.get("provider").unwrap()["EQUINIX"], 1);
    }
}
