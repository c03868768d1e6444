pub mod client;
pub mod error;

pub use client::{Client, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT, list_query};
pub use error::ApiError;
