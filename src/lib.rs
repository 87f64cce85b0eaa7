pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod ratelimit;
pub mod services;
pub mod types;
pub mod validation;

pub use app::{router, AppState};
pub use error::ApiError;
