//! Process-wide state stores
//!
//! These are the only mutable shared state in the engine: the source
//! registry, the target attribute catalog, the mapping store, the quality
//! issue store, and the job store. Each is a cheap-clone handle over an
//! `Arc<RwLock<..>>`; reads take snapshots, and the mutation paths that
//! the concurrency model requires to be serialized (per-mapping validation
//! writes, job state transitions) go through dedicated methods here.

pub mod attribute_catalog;
pub mod job_store;
pub mod mapping_store;
pub mod quality_store;
pub mod source_registry;

pub use attribute_catalog::{AttributeCatalog, CatalogError, NewTargetAttribute};
pub use job_store::{JobStore, JobStoreError};
pub use mapping_store::{MappingFilter, MappingStore, MappingStoreError, NewMapping};
pub use quality_store::{DetectedIssue, QualityIssueStore};
pub use source_registry::{RegistryError, SourceRegistry};
