// PMS reservation orchestrator
//
// Routes hotel reservation create, amend and cancel requests to the PMS that owns
// each property and keeps inventory, promo usage and the audit log consistent.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod inventory;
pub mod metrics;
pub mod promotions;
pub mod properties;
pub mod providers;
pub mod reservations;
pub mod transform;
pub mod validation;

pub use app::{assemble, build_state, create_router, ApiDoc, AppState, Repositories, SeedData, StartupError};
