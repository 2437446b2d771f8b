pub mod error;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod repository;
pub mod routing;
pub mod status_machine;

pub use error::*;
pub use models::*;
pub use orchestrator::*;
pub use repository::*;
pub use routing::*;
pub use status_machine::*;
