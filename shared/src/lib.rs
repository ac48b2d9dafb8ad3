//! Shared types and models for the Weather Dashboard
//!
//! This crate contains the domain core shared between the backend and the
//! browser bridge (via WASM): locations, weather snapshots, forecasts,
//! notification rules and the persistence contract.

pub mod geo;
pub mod models;
pub mod storage;
pub mod types;
pub mod validation;

pub use models::*;
pub use storage::*;
pub use types::*;
pub use validation::*;
