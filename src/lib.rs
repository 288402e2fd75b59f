pub mod auth;
pub mod callback;
pub mod config;
pub mod error;
pub mod exporter;
pub mod items;

pub use error::AppError;
