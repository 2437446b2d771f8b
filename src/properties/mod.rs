pub mod error;
pub mod models;
pub mod registry;
pub mod repository;

pub use error::*;
pub use models::*;
pub use registry::*;
pub use repository::*;
