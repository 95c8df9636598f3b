//! Delimited output sink for export rows.
//!
//! One line per product record: 28 named columns (store, taxon, product),
//! each terminated by the `"@ "` delimiter, newline-terminated. Embedded
//! newlines inside a rendered row are replaced with a literal `<br />` so
//! every record stays on one line. Rows are written incrementally as they
//! are produced, never buffered as a whole.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::catalog::{ProductRecord, Store, TaxonomyNode};
use crate::types::ExportError;

pub const OUTPUT_DELIMITER: &str = "@ ";
pub const NEWLINE_MARKER: &str = "<br />";

const ABSENT: &str = "-";

pub const HEADER_COLUMNS: [&str; 28] = [
    "Store Id",
    "Store Name",
    "Store Address",
    "Store Phone",
    "Store Lat",
    "Store Long",
    "Store Photo",
    "Taxon Id",
    "Taxon Name",
    "Taxon Description",
    "Product Id",
    "Product Name",
    "Product description",
    "Product supermarket_unit_cost_price",
    "Product display_supermarket_unit_cost_price",
    "Product normal_price",
    "Product display_normal_price",
    "Product price",
    "Product display_price",
    "Product unit_price",
    "Product display_unit_price",
    "Product display_promo_price_percentage",
    "Product display_promotion_actions_combination_text",
    "Product display_unit",
    "Product supermarket_unit",
    "Product natural_average_weight",
    "Product display_average_weight",
    "Product sku",
];

/// Replaces embedded `\r\n` / `\n` with [`NEWLINE_MARKER`].
///
/// ```
/// use shelfgrab::export::writer::escape_newlines;
///
/// assert_eq!(escape_newlines("line1\nline2"), "line1<br />line2");
/// assert_eq!(escape_newlines("a\r\nb"), "a<br />b");
/// ```
pub fn escape_newlines(input: &str) -> String {
    input
        .replace("\r\n", NEWLINE_MARKER)
        .replace('\n', NEWLINE_MARKER)
}

/// Derives the output file path from a label and extension, the same way for
/// every run: trimmed, spaces to dashes, lowercased.
///
/// ```
/// use std::path::Path;
/// use shelfgrab::export::writer::output_path;
///
/// let path = output_path(Path::new("data"), "Products Full", "csv");
/// assert_eq!(path, Path::new("data/products-full.csv").to_path_buf());
/// ```
pub fn output_path(dir: &Path, label: &str, extension: &str) -> PathBuf {
    let stem = label.trim().replace(' ', "-").to_lowercase();
    dir.join(format!("{stem}.{extension}"))
}

/// A store/taxon/product triple ready to be rendered as one output line.
#[derive(Clone, Copy, Debug)]
pub struct ExportRow<'a> {
    pub store: &'a Store,
    pub taxon: &'a TaxonomyNode,
    pub product: &'a ProductRecord,
}

impl ExportRow<'_> {
    /// Renders the row: every column followed by the delimiter, newlines
    /// escaped, no trailing line terminator.
    pub fn render(&self) -> String {
        let commercial = self.product.commercial.as_ref();
        let opt_text = |value: Option<&String>| match value {
            Some(text) => text.clone(),
            None => ABSENT.to_string(),
        };
        let opt_number = |value: Option<f64>| match value {
            Some(number) => number.to_string(),
            None => ABSENT.to_string(),
        };

        let columns = [
            self.store.id.to_string(),
            self.store.name.clone(),
            self.store.address.clone(),
            self.store.phone.clone(),
            self.store.location.lat.to_string(),
            self.store.location.lon.to_string(),
            self.store.photo_url.clone(),
            self.taxon.id.to_string(),
            self.taxon.name.clone(),
            self.taxon.description.clone(),
            self.product.id.to_string(),
            self.product.name.clone(),
            self.product.description.clone(),
            opt_number(commercial.and_then(|c| c.supermarket_unit_cost_price)),
            opt_text(commercial.and_then(|c| c.display_supermarket_unit_cost_price.as_ref())),
            opt_text(commercial.and_then(|c| c.normal_price.as_ref())),
            opt_text(commercial.and_then(|c| c.display_normal_price.as_ref())),
            opt_text(commercial.and_then(|c| c.price.as_ref())),
            opt_text(commercial.and_then(|c| c.display_price.as_ref())),
            opt_text(commercial.and_then(|c| c.unit_price.as_ref())),
            opt_text(commercial.and_then(|c| c.display_unit_price.as_ref())),
            opt_text(commercial.and_then(|c| c.display_promo_price_percentage.as_ref())),
            opt_text(
                commercial.and_then(|c| c.display_promotion_actions_combination_text.as_ref()),
            ),
            opt_text(commercial.and_then(|c| c.display_unit.as_ref())),
            opt_text(commercial.and_then(|c| c.supermarket_unit.as_ref())),
            opt_number(commercial.and_then(|c| c.natural_average_weight)),
            opt_text(commercial.and_then(|c| c.display_average_weight.as_ref())),
            self.product.sku.clone(),
        ];

        escape_newlines(&join_delimited(&columns))
    }
}

fn join_delimited<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = String::new();
    for field in fields {
        line.push_str(field.as_ref());
        line.push_str(OUTPUT_DELIMITER);
    }
    line
}

pub(crate) fn header_line() -> String {
    join_delimited(&HEADER_COLUMNS)
}

/// Append-only output sink, opened once and written row by row.
#[derive(Debug)]
pub struct CatalogWriter {
    file: File,
    rows_written: usize,
}

impl CatalogWriter {
    /// Creates the output file (and parent directories) at `path`.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let file = File::create(path).await?;
        Ok(Self {
            file,
            rows_written: 0,
        })
    }

    /// Writes the fixed header line.
    pub async fn write_header(&mut self) -> Result<(), ExportError> {
        self.write_line(&header_line()).await
    }

    /// Renders and writes one product row.
    pub async fn write_row(&mut self, row: &ExportRow<'_>) -> Result<(), ExportError> {
        self.write_line(&row.render()).await?;
        self.rows_written += 1;
        Ok(())
    }

    /// Product rows written so far (the header is not counted).
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub async fn flush(&mut self) -> Result<(), ExportError> {
        self.file.flush().await?;
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<(), ExportError> {
        self.file.write_all(line.as_bytes()).await?;
        self.file.write_all(b"\n").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Commercial, GeoPoint};
    use tempfile::tempdir;

    fn sample_store() -> Store {
        Store {
            id: 7,
            name: "Riverside".to_string(),
            address: "1 Quay Lane, Unit 4, Subang Jaya, Malaysia, 47500".to_string(),
            phone: "+60 3 1234".to_string(),
            location: GeoPoint { lat: 3.05, lon: 101.59 },
            photo_url: "https://cdn.example.com/riverside.jpg".to_string(),
        }
    }

    fn sample_taxon() -> TaxonomyNode {
        TaxonomyNode {
            id: 31,
            name: "Fruit".to_string(),
            description: "-".to_string(),
            products_count: 41,
        }
    }

    fn variant_row_product() -> ProductRecord {
        ProductRecord {
            id: 501,
            name: "Orange Juice 350ml".to_string(),
            description: "line1\nline2".to_string(),
            sku: "OJ-350".to_string(),
            images: Some(vec![]),
            commercial: None,
        }
    }

    #[test]
    fn header_has_trailing_delimiter_per_column() {
        let header = header_line();
        assert!(header.starts_with("Store Id@ Store Name@ "));
        assert!(header.ends_with("Product sku@ "));
        assert_eq!(header.matches(OUTPUT_DELIMITER).count(), 28);
    }

    #[test]
    fn row_escapes_embedded_newlines() {
        let store = sample_store();
        let taxon = sample_taxon();
        let product = variant_row_product();
        let row = ExportRow {
            store: &store,
            taxon: &taxon,
            product: &product,
        };

        let line = row.render();
        assert!(!line.contains('\n'));
        assert!(line.contains("line1<br />line2"));
    }

    #[test]
    fn variant_row_renders_absent_commercial_fields_as_placeholder() {
        let store = sample_store();
        let taxon = sample_taxon();
        let product = variant_row_product();
        let row = ExportRow {
            store: &store,
            taxon: &taxon,
            product: &product,
        };

        let rendered = row.render();
        let fields: Vec<&str> = rendered.split(OUTPUT_DELIMITER).collect();
        // 28 columns plus the empty fragment after the trailing delimiter.
        assert_eq!(fields.len(), 29);
        assert_eq!(fields[0], "7");
        assert_eq!(fields[7], "31");
        assert_eq!(fields[10], "501");
        // All 14 commercial columns are placeholders on a variant row.
        for field in &fields[13..27] {
            assert_eq!(*field, ABSENT);
        }
        assert_eq!(fields[27], "OJ-350");
        assert_eq!(fields[28], "");
    }

    #[test]
    fn merged_row_renders_commercial_values() {
        let store = sample_store();
        let taxon = sample_taxon();
        let product = ProductRecord {
            id: 601,
            name: "Whole Milk 1L".to_string(),
            description: "Carton".to_string(),
            sku: "MILK-1L".to_string(),
            images: Some(vec![]),
            commercial: Some(Commercial {
                supermarket_unit_cost_price: Some(4.2),
                display_price: Some("RM6.50".to_string()),
                ..Commercial::default()
            }),
        };
        let row = ExportRow {
            store: &store,
            taxon: &taxon,
            product: &product,
        };

        let rendered = row.render();
        let fields: Vec<&str> = rendered.split(OUTPUT_DELIMITER).collect();
        assert_eq!(fields[13], "4.2");
        assert_eq!(fields[18], "RM6.50");
        assert_eq!(fields[14], ABSENT);
    }

    #[tokio::test]
    async fn writer_emits_header_then_rows() {
        let dir = tempdir().unwrap();
        let path = output_path(dir.path(), "Products", "csv");
        assert!(path.ends_with("products.csv"));

        let mut writer = CatalogWriter::create(&path).await.unwrap();
        writer.write_header().await.unwrap();

        let store = sample_store();
        let taxon = sample_taxon();
        let product = variant_row_product();
        writer
            .write_row(&ExportRow {
                store: &store,
                taxon: &taxon,
                product: &product,
            })
            .await
            .unwrap();
        writer.flush().await.unwrap();
        assert_eq!(writer.rows_written(), 1);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Store Id@ "));
        assert!(lines[1].starts_with("7@ Riverside@ "));
    }
}
