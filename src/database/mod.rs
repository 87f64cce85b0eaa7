pub mod manager;
pub mod models;
pub mod query_builder;
pub mod resource;

pub use manager::{DatabaseError, DatabaseManager};
pub use resource::{Resource, ResourceSpec};
