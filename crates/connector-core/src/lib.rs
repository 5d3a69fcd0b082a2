//! Core domain model, error types, and configuration shared across every
//! connector component: registry/mapping/video-descriptor types, the
//! `ConnectorError` taxonomy, and environment-driven configuration.

pub mod config;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{ConnectorError, ConnectorResult, LogLevel};
pub use models::{
    hash_title_and_description, AssetRecord, IntermediateState, MappingRecord, RegistryEntry,
    RegistryStatus, TargetPlatform, VideoDescriptor,
};
