//! Product fetch and variant expansion into flat display rows.
//!
//! The products endpoint is queried once per (store, taxon) pair for up to
//! `PRODUCTS_PER_PAGE` results on page 1. No further pagination is
//! attempted; a taxon with more products than the cap silently loses the
//! excess.
//!
//! Expansion rules:
//! * more than one variant: a parent row carrying the commercial fields
//!   (`sku = "-"`, no images), then one row per variant carrying identity
//!   fields only;
//! * exactly one variant: a single row merging the product's commercial
//!   fields with that variant's identity fields.

use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::errorlog::{ErrorLog, ErrorScope};
use crate::types::ExportError;

use super::FetchOutcome;

pub(crate) const PRODUCTS_PER_PAGE: u32 = 5000;

const SKU_PLACEHOLDER: &str = "-";

pub(crate) fn products_path(store_id: i64, taxon_id: i64) -> String {
    format!("catalog/stock_locations/{store_id}/taxons/{taxon_id}/products")
}

/// One product image reference.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageRef {
    pub id: i64,
    pub position: i64,
    pub alt: String,
    pub small_url: String,
    pub original_url: String,
}

/// The commercial fields shared by a product and absent on variant rows.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Commercial {
    pub supermarket_unit_cost_price: Option<f64>,
    pub display_supermarket_unit_cost_price: Option<String>,
    pub normal_price: Option<String>,
    pub display_normal_price: Option<String>,
    pub price: Option<String>,
    pub display_price: Option<String>,
    pub unit_price: Option<String>,
    pub display_unit_price: Option<String>,
    pub display_promo_price_percentage: Option<String>,
    pub display_promotion_actions_combination_text: Option<String>,
    pub display_unit: Option<String>,
    pub supermarket_unit: Option<String>,
    pub natural_average_weight: Option<f64>,
    pub display_average_weight: Option<String>,
}

/// A flattened, display-ready product row.
///
/// `commercial` is `None` on the per-variant rows of an expanded
/// multi-variant product; `images` is `None` on the parent row.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub sku: String,
    pub images: Option<Vec<ImageRef>>,
    pub commercial: Option<Commercial>,
}

#[derive(Debug, Deserialize)]
struct ProductsResponse {
    #[serde(default)]
    products: Vec<WireProduct>,
}

#[derive(Debug, Deserialize)]
struct WireProduct {
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(flatten)]
    commercial: Commercial,
    #[serde(default)]
    variants: Vec<WireVariant>,
}

#[derive(Debug, Deserialize)]
struct WireVariant {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    images: Vec<WireImage>,
}

#[derive(Debug, Deserialize)]
struct WireImage {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    position: i64,
    #[serde(default)]
    alt: Option<String>,
    #[serde(default)]
    small_url: Option<String>,
    #[serde(default)]
    original_url: Option<String>,
}

impl From<WireImage> for ImageRef {
    fn from(wire: WireImage) -> Self {
        Self {
            id: wire.id,
            position: wire.position,
            alt: wire.alt.unwrap_or_default(),
            small_url: wire.small_url.unwrap_or_default(),
            original_url: wire.original_url.unwrap_or_default(),
        }
    }
}

fn variant_images(images: Vec<WireImage>) -> Vec<ImageRef> {
    images.into_iter().map(ImageRef::from).collect()
}

/// Expands wire products into flat records, preserving arrival order and
/// variant order. A product with zero variants violates the expected
/// response shape and fails the whole batch.
fn flatten_products(products: Vec<WireProduct>) -> Result<Vec<ProductRecord>, ExportError> {
    let mut records = Vec::new();
    for product in products {
        if product.variants.len() > 1 {
            records.push(ProductRecord {
                id: product.id,
                name: product.name,
                description: product.description,
                sku: SKU_PLACEHOLDER.to_string(),
                images: None,
                commercial: Some(product.commercial),
            });
            for variant in product.variants {
                records.push(ProductRecord {
                    id: variant.id,
                    name: variant.name.unwrap_or_default(),
                    description: variant.description.unwrap_or_default(),
                    sku: variant.sku.unwrap_or_default(),
                    images: Some(variant_images(variant.images)),
                    commercial: None,
                });
            }
        } else {
            let variant = product.variants.into_iter().next().ok_or_else(|| {
                ExportError::Shape(format!("product {} has no variants", product.id))
            })?;
            records.push(ProductRecord {
                id: variant.id,
                name: variant.name.unwrap_or_default(),
                description: variant.description.unwrap_or_default(),
                sku: variant.sku.unwrap_or_default(),
                images: Some(variant_images(variant.images)),
                commercial: Some(product.commercial),
            });
        }
    }
    Ok(records)
}

/// Fetches one page of products for a (store, taxon) pair and expands them.
///
/// Failure policy matches the other fetchers: log and report
/// [`FetchOutcome::Failed`], never propagate.
pub async fn fetch_products(
    client: &ApiClient,
    store_id: i64,
    taxon_id: i64,
    errors: &ErrorLog,
) -> FetchOutcome<ProductRecord> {
    match fetch_products_inner(client, store_id, taxon_id).await {
        Ok(records) => FetchOutcome::Fetched(records),
        Err(error) => {
            tracing::warn!(store_id, taxon_id, error = %error, "product fetch failed");
            errors
                .record(ErrorScope::Products { store_id, taxon_id }, &error)
                .await;
            FetchOutcome::Failed
        }
    }
}

async fn fetch_products_inner(
    client: &ApiClient,
    store_id: i64,
    taxon_id: i64,
) -> Result<Vec<ProductRecord>, ExportError> {
    let response: ProductsResponse = client
        .get(
            &products_path(store_id, taxon_id),
            &[
                ("popular", "true".to_string()),
                ("page", "1".to_string()),
                ("taxon_id", taxon_id.to_string()),
                ("per_page", PRODUCTS_PER_PAGE.to_string()),
            ],
        )
        .await?;
    flatten_products(response.products)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_products(value: serde_json::Value) -> Vec<WireProduct> {
        let response: ProductsResponse = serde_json::from_value(value).unwrap();
        response.products
    }

    fn two_variant_product() -> serde_json::Value {
        json!({
            "products": [
                {
                    "id": 500,
                    "name": "Orange Juice",
                    "description": "Freshly squeezed",
                    "price": "12.90",
                    "display_price": "RM12.90",
                    "unit_price": "12.90",
                    "display_unit": "btl",
                    "supermarket_unit_cost_price": 9.5,
                    "variants": [
                        {
                            "id": 501,
                            "name": "Orange Juice 350ml",
                            "description": "Small bottle",
                            "sku": "OJ-350",
                            "images": [
                                {"id": 1, "position": 1, "alt": "bottle",
                                 "small_url": "https://cdn.example.com/oj-s.jpg",
                                 "original_url": "https://cdn.example.com/oj.jpg"}
                            ]
                        },
                        {"id": 502, "name": "Orange Juice 1L", "sku": "OJ-1000", "images": []}
                    ]
                }
            ]
        })
    }

    #[test]
    fn multi_variant_product_expands_to_parent_plus_variants() {
        let records = flatten_products(parse_products(two_variant_product())).unwrap();
        assert_eq!(records.len(), 3);

        let parent = &records[0];
        assert_eq!(parent.id, 500);
        assert_eq!(parent.sku, "-");
        assert_eq!(parent.images, None);
        let commercial = parent.commercial.as_ref().unwrap();
        assert_eq!(commercial.price.as_deref(), Some("12.90"));
        assert_eq!(commercial.supermarket_unit_cost_price, Some(9.5));

        let first = &records[1];
        assert_eq!(first.id, 501);
        assert_eq!(first.sku, "OJ-350");
        assert_eq!(first.commercial, None);
        let images = first.images.as_ref().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].original_url, "https://cdn.example.com/oj.jpg");

        let second = &records[2];
        assert_eq!(second.id, 502);
        assert_eq!(second.sku, "OJ-1000");
        assert_eq!(second.commercial, None);
        assert_eq!(second.images.as_ref().unwrap().len(), 0);
    }

    #[test]
    fn single_variant_product_collapses_to_one_merged_row() {
        let records = flatten_products(parse_products(json!({
            "products": [
                {
                    "id": 600,
                    "name": "Whole Milk",
                    "description": "Product-level description",
                    "price": "6.50",
                    "display_price": "RM6.50",
                    "variants": [
                        {"id": 601, "name": "Whole Milk 1L", "description": "Carton",
                         "sku": "MILK-1L", "images": []}
                    ]
                }
            ]
        })))
        .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        // Identity comes from the variant, commercial fields from the product.
        assert_eq!(record.id, 601);
        assert_eq!(record.name, "Whole Milk 1L");
        assert_eq!(record.description, "Carton");
        assert_eq!(record.sku, "MILK-1L");
        assert!(record.images.is_some());
        let commercial = record.commercial.as_ref().unwrap();
        assert_eq!(commercial.display_price.as_deref(), Some("RM6.50"));
    }

    #[test]
    fn emission_preserves_arrival_and_variant_order() {
        let records = flatten_products(parse_products(json!({
            "products": [
                {"id": 1, "variants": [{"id": 10}]},
                {"id": 2, "variants": [{"id": 21}, {"id": 20}, {"id": 22}]},
                {"id": 3, "variants": [{"id": 30}]}
            ]
        })))
        .unwrap();

        let ids: Vec<i64> = records.iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![10, 2, 21, 20, 22, 30]);
    }

    #[test]
    fn zero_variant_product_fails_the_batch() {
        let result = flatten_products(parse_products(json!({
            "products": [{"id": 700, "variants": []}]
        })));
        assert!(matches!(result, Err(ExportError::Shape(_))));
    }

    #[test]
    fn flattening_is_deterministic() {
        let first = flatten_products(parse_products(two_variant_product())).unwrap();
        let second = flatten_products(parse_products(two_variant_product())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_products_array_yields_no_records() {
        let records = flatten_products(parse_products(json!({"products": []}))).unwrap();
        assert!(records.is_empty());
    }
}
