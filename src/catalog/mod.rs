//! Job catalog model and the storage collaborators the scanner talks to

pub mod json_store;
pub mod memory;
pub mod model;
pub mod store;

pub use json_store::JsonFileStore;
pub use memory::{CatalogData, InMemoryCatalog};
pub use model::{Job, JobKey, JobStatus, ScanSettings, Site, SiteId, Source, SourceId};
pub use store::{CatalogStore, SettingsStore};
