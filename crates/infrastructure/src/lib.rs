//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod admin_api_dto;
mod http_admin_api_client;

pub use http_admin_api_client::HttpAdminApiClient;
