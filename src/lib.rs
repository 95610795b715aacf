pub mod api;
pub mod config;
pub mod error;
pub mod observability;
pub mod rate_infra;
pub mod snapshot;
pub mod types;
pub mod utils;

pub use error::{Error, Result};
