//! Track library management.
//!
//! This module provides the persisted track catalog, managed storage
//! provisioning, and the import service that copies picked files into
//! managed storage.

pub mod catalog;
pub mod fs;
pub mod importer;
pub mod models;
pub mod picker;
pub mod storage;

pub use {
    catalog::{CatalogEvent, TrackCatalog},
    importer::{ImportConfig, TrackImporter, TrackRef},
    models::{CoverType, ImportResult, PlatformSource, Track, TrackPatch},
    storage::StorageProvisioner,
};
