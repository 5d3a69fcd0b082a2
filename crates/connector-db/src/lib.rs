//! Postgres-backed stores: the Registry Store (workflow state) and the
//! Mapping Store (destination lookup).

pub mod mapping;
pub mod registry;

pub use mapping::{MappingStore, PgMappingStore};
pub use registry::{PgRegistryStore, RegistryStore};
