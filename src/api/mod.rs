pub mod client;
pub mod endpoint;
pub mod error;
pub mod options;
pub mod xml;

pub use client::GeonamesClient;
pub use endpoint::{Endpoint, Extract};
pub use error::GeonamesError;
pub use options::{Query, RequestOptions};
