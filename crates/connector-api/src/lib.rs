//! HTTP dispatch layer for the publishing connector.
//!
//! Thin by design: three routes map directly onto [`connector_engine::Engine`]
//! operations. All workflow semantics live in `connector-engine`; this crate
//! only bootstraps collaborators, wires the router, and translates
//! `ConnectorError` into the coarse `{status}` contract callers see.

pub mod error;
mod handlers;
mod mcn_credentials;
pub mod middleware;
pub mod setup;
pub mod state;

pub use mcn_credentials::ServiceAccountCredentialSource;
pub use state::AppState;
