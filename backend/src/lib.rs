//! Backend library modules.

pub mod api;
pub mod config;
pub mod error;
pub mod password;
pub mod storage;

pub use error::{ApiError, ApiResult};
