//! Per-store taxonomy fetch and two-level flattening.
//!
//! The API returns a tree of arbitrary depth per taxonomy root. Only two
//! levels survive flattening: each root itself, with its product count forced
//! to the [`ROOT_PRODUCTS_COUNT`] sentinel, followed by its direct children
//! with their own counts. Deeper descendants are discarded. The flattened
//! nodes from all roots are sorted ascending by id.

use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::errorlog::{ErrorLog, ErrorScope};
use crate::types::ExportError;

use super::FetchOutcome;

/// Sentinel product count for root nodes, whose true count the API does not
/// report. Deliberately left unknown rather than computed.
pub const ROOT_PRODUCTS_COUNT: i64 = -1;

const FIELD_PLACEHOLDER: &str = "-";

pub(crate) fn taxons_path(store_id: i64) -> String {
    format!("sprinkles/taxonomies/{store_id}/taxons")
}

/// A flattened taxonomy entry: a root or one of its direct children.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxonomyNode {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub products_count: i64,
}

#[derive(Debug, Deserialize)]
struct TaxonsResponse {
    #[serde(default)]
    taxons: Vec<WireTaxon>,
}

#[derive(Debug, Deserialize)]
struct WireTaxon {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    products_count: i64,
    #[serde(default)]
    taxons: Vec<WireTaxon>,
}

/// Absent and empty strings both collapse to the `"-"` placeholder.
fn or_placeholder(value: Option<String>) -> String {
    match value {
        Some(value) if !value.is_empty() => value,
        _ => FIELD_PLACEHOLDER.to_string(),
    }
}

fn flatten_taxons(roots: Vec<WireTaxon>) -> Vec<TaxonomyNode> {
    let mut nodes = Vec::new();
    for root in roots {
        nodes.push(TaxonomyNode {
            id: root.id,
            name: or_placeholder(root.name),
            description: or_placeholder(root.description),
            products_count: ROOT_PRODUCTS_COUNT,
        });
        for child in root.taxons {
            nodes.push(TaxonomyNode {
                id: child.id,
                name: or_placeholder(child.name),
                description: or_placeholder(child.description),
                products_count: child.products_count,
            });
        }
    }
    nodes.sort_by_key(|node| node.id);
    nodes
}

/// Fetches and flattens the taxonomy tree for one store.
///
/// Failure policy matches [`super::fetch_stores`]: log and report
/// [`FetchOutcome::Failed`], never propagate.
pub async fn fetch_taxonomies(
    client: &ApiClient,
    store_id: i64,
    errors: &ErrorLog,
) -> FetchOutcome<TaxonomyNode> {
    match fetch_taxonomies_inner(client, store_id).await {
        Ok(nodes) => FetchOutcome::Fetched(nodes),
        Err(error) => {
            tracing::warn!(store_id, error = %error, "taxonomy fetch failed");
            errors
                .record(ErrorScope::Taxonomies { store_id }, &error)
                .await;
            FetchOutcome::Failed
        }
    }
}

async fn fetch_taxonomies_inner(
    client: &ApiClient,
    store_id: i64,
) -> Result<Vec<TaxonomyNode>, ExportError> {
    let response: TaxonsResponse = client
        .get(
            &taxons_path(store_id),
            &[("stock_location_id", store_id.to_string())],
        )
        .await?;
    Ok(flatten_taxons(response.taxons))
}
