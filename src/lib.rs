//! geonames - Async client for the Geonames web services

pub mod api;
pub mod config;
pub mod domain;

pub use api::{Endpoint, GeonamesClient, GeonamesError, Query, RequestOptions};
pub use config::ClientConfig;
pub use domain::{Cities, Style};
