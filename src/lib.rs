pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod services;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{DashboardError, DashboardResult};
pub use types::*;
