//! Narrow collaborator interfaces onto systems the connector does not own:
//! the asset catalog, the thumbnail store, and the local scratch directory
//! used while a run is in flight.

pub mod asset_catalog;
pub mod local_sink;
pub mod thumbnail;

pub use asset_catalog::{AssetCatalog, HttpAssetCatalog};
pub use local_sink::LocalFileSink;
pub use thumbnail::{HttpThumbnailStore, ThumbnailStore};
