use thiserror::Error;

/// Failures while talking to the Geonames service
///
/// Every variant is a transport-level problem. Error payloads that the
/// service embeds in a successful response body are returned as data.
#[derive(Debug, Error)]
pub enum GeonamesError {
    /// The underlying HTTP client could not be created
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Network failure while sending the request or reading the body
    #[error("Request to Geonames failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Geonames returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not valid JSON (or XML for the extended lookup)
    #[error("Failed to decode Geonames response: {0}")]
    Decode(String),
}
