//! The export orchestrator: three strictly sequential phases.
//!
//! 1. fetch the nearby stores once;
//! 2. fetch each store's flattened taxonomy, building the in-memory
//!    [`StoreTaxonomyIndex`] in store-fetch order;
//! 3. open the output sink, write the header, then walk the index
//!    (insertion order, taxa in sorted order) fetching products and writing
//!    one line per record as it is produced.
//!
//! No phase starts before the previous one has fully completed and no two
//! remote calls are ever in flight at once. Fetch failures never abort the
//! run; only output-sink I/O errors propagate.

pub mod writer;

use std::path::Path;

use crate::catalog::{
    GeoPoint, Store, TaxonomyNode, fetch_products, fetch_stores, fetch_taxonomies,
};
use crate::client::ApiClient;
use crate::errorlog::ErrorLog;
use crate::progress::{Phase, PhaseStatus, ProgressEvent, ProgressSink};
use crate::types::ExportError;

pub use writer::{CatalogWriter, ExportRow, output_path};

/// One phase-2 index entry: a store and its flattened taxonomy.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreTaxonomies {
    pub store: Store,
    pub taxonomies: Vec<TaxonomyNode>,
}

/// Transient store → taxonomy map built during phase 2 and consumed by
/// phase 3. Entries iterate in insertion order; never persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoreTaxonomyIndex {
    entries: Vec<StoreTaxonomies>,
}

impl StoreTaxonomyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, store: Store, taxonomies: Vec<TaxonomyNode>) {
        self.entries.push(StoreTaxonomies { store, taxonomies });
    }

    pub fn entries(&self) -> &[StoreTaxonomies] {
        &self.entries
    }

    pub fn get(&self, store_id: i64) -> Option<&StoreTaxonomies> {
        self.entries.iter().find(|entry| entry.store.id == store_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total taxonomy nodes across all entries; the phase-3 step count.
    pub fn taxon_total(&self) -> usize {
        self.entries.iter().map(|entry| entry.taxonomies.len()).sum()
    }
}

/// Counts reported after a completed run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub stores: usize,
    pub taxonomies: usize,
    pub products_written: usize,
    /// Fetch operations that failed and were logged. Lets a caller tell a
    /// thin catalog from a partially failed run; the output is the same.
    pub failed_fetches: usize,
}

/// Drives the three phases against one client/error-log pair.
#[derive(Clone, Debug)]
pub struct ExportPipeline {
    client: ApiClient,
    errors: ErrorLog,
    origin: GeoPoint,
}

impl ExportPipeline {
    pub fn new(client: ApiClient, errors: ErrorLog, origin: GeoPoint) -> Self {
        Self {
            client,
            errors,
            origin,
        }
    }

    /// Runs the full export, writing the catalog to `output`.
    pub async fn run(
        &self,
        output: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<ExportSummary, ExportError> {
        let mut failed_fetches = 0usize;

        // Phase 1: stores.
        emit(progress, Phase::Stores, PhaseStatus::Started, 0, 1);
        let outcome = fetch_stores(&self.client, self.origin, &self.errors).await;
        let phase_status = if outcome.is_failed() {
            failed_fetches += 1;
            PhaseStatus::Error
        } else {
            PhaseStatus::Done
        };
        let stores = outcome.items();
        tracing::info!(count = stores.len(), "fetched nearby stores");
        emit(progress, Phase::Stores, phase_status, 1, 1);

        // Phase 2: taxonomy per store, in fetch order.
        let store_total = stores.len();
        emit(progress, Phase::Taxonomies, PhaseStatus::Started, 0, store_total);
        let mut index = StoreTaxonomyIndex::new();
        for (position, store) in stores.into_iter().enumerate() {
            let outcome = fetch_taxonomies(&self.client, store.id, &self.errors).await;
            if outcome.is_failed() {
                failed_fetches += 1;
            }
            let taxonomies = outcome.items();
            tracing::info!(
                store_id = store.id,
                store = %store.name,
                count = taxonomies.len(),
                "fetched store taxonomies"
            );
            emit(
                progress,
                Phase::Taxonomies,
                PhaseStatus::Started,
                position + 1,
                store_total,
            );
            index.insert(store, taxonomies);
        }
        emit(
            progress,
            Phase::Taxonomies,
            PhaseStatus::Done,
            store_total,
            store_total,
        );

        // Phase 3: products per (store, taxon), streamed to the sink.
        let mut writer = CatalogWriter::create(output).await?;
        writer.write_header().await?;

        let step_total = index.taxon_total();
        let mut step = 0usize;
        emit(progress, Phase::Products, PhaseStatus::Started, 0, step_total);
        for entry in index.entries() {
            for taxon in &entry.taxonomies {
                step += 1;
                emit(
                    progress,
                    Phase::Products,
                    PhaseStatus::Started,
                    step,
                    step_total,
                );
                let outcome =
                    fetch_products(&self.client, entry.store.id, taxon.id, &self.errors).await;
                if outcome.is_failed() {
                    failed_fetches += 1;
                }
                let records = outcome.items();
                tracing::info!(
                    store_id = entry.store.id,
                    taxon_id = taxon.id,
                    taxon = %taxon.name,
                    count = records.len(),
                    "fetched products"
                );
                for record in &records {
                    writer
                        .write_row(&ExportRow {
                            store: &entry.store,
                            taxon,
                            product: record,
                        })
                        .await?;
                }
            }
        }
        writer.flush().await?;
        emit(
            progress,
            Phase::Products,
            PhaseStatus::Done,
            step_total,
            step_total,
        );

        Ok(ExportSummary {
            stores: index.len(),
            taxonomies: index.taxon_total(),
            products_written: writer.rows_written(),
            failed_fetches,
        })
    }
}

/// Progress is presentational only; a broken sink must not abort the run.
fn emit(
    progress: &mut dyn ProgressSink,
    phase: Phase,
    status: PhaseStatus,
    current: usize,
    total: usize,
) {
    let _ = progress.handle(&ProgressEvent::new(phase, status, current, total));
}
