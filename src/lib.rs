//! # shelfgrab: grocery catalog export pipeline
//!
//! Queries a grocery-delivery REST API for the stores near a fixed
//! coordinate, fetches each store's product taxonomy, then fetches the
//! products under every taxonomy node and streams flattened rows to a
//! delimited text file.
//!
//! ```text
//! ApiClient ──► catalog::fetch_stores ───────────► Vec<Store>
//!                                                     │ per store
//!               catalog::fetch_taxonomies ──────► StoreTaxonomyIndex
//!                                                     │ per (store, taxon)
//!               catalog::fetch_products ────────► Vec<ProductRecord>
//!                                                     │ per record
//!               export::CatalogWriter ──────────► one delimited line
//!
//! side channels: errorlog::ErrorLog (failed fetches, append-only)
//!                progress::ProgressSink (observational status updates)
//! ```
//!
//! The run is strictly sequential: one remote call in flight at a time, no
//! phase overlap. Each fetch stage converts its own failures into an empty
//! batch plus one error-log record, so a partial outage shrinks the output
//! instead of aborting the run.
//!
//! ## Module Guide
//!
//! - [`client`] - Immutable authenticated HTTP client
//! - [`catalog`] - The three fetch stages and their record shaping
//! - [`export`] - Orchestrator, store/taxonomy index, and output sink
//! - [`errorlog`] - Append-only structured failure log
//! - [`progress`] - Structured progress events and sinks
//! - [`types`] - Shared error type

pub mod catalog;
pub mod client;
pub mod errorlog;
pub mod export;
pub mod progress;
pub mod types;

pub use catalog::{FetchOutcome, GeoPoint, ProductRecord, Store, TaxonomyNode};
pub use client::{ApiClient, ApiConfig};
pub use errorlog::ErrorLog;
pub use export::{ExportPipeline, ExportSummary};
pub use types::ExportError;
