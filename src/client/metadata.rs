//!
//! This module provides functionality for extracting metadata from inbound interaction requests.
//!
//! Functions:
//! - `RequestMetadata::from_request`: Reads an HTTP request into its metadata and body.
use hyper::{Body, Method, Request};

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Metadata describing an inbound interaction request.
///
/// Fields:
/// - `body`: The raw body of the request.
/// - `signature`: Hex-encoded ed25519 signature header, if present.
/// - `timestamp`: Signature timestamp header, if present.
/// - `ip`: The address of the connected peer.
/// - `client_ip`: The client's address, preferring `x-forwarded-for`.
/// - `method`: The HTTP method of the request.
/// - `path`: The request path.
///
pub struct RequestMetadata {
    pub body: Vec<u8>,
    pub signature: Option<String>,
    pub timestamp: Option<String>,
    pub ip: String,
    pub client_ip: String,
    pub method: Method,
    pub path: String,
}

impl RequestMetadata {
    /// Consumes an HTTP request and collects everything the interactions endpoint needs from it.
    ///
    /// The body is kept as raw bytes: signatures are computed over the exact bytes received.
    ///
    /// # Arguments
    ///
    /// * `req` - The HTTP request to extract metadata from.
    /// * `addr` - The address of the connected peer.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be read.
    pub async fn from_request(req: Request<Body>, addr: String) -> Result<Self, hyper::Error> {
        let (parts, body) = req.into_parts();
        let body_bytes = hyper::body::to_bytes(body).await?;

        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(String::from)
        };

        let client_ip = header("x-forwarded-for").unwrap_or_else(|| addr.clone());

        Ok(RequestMetadata {
            body: body_bytes.to_vec(),
            signature: header(SIGNATURE_HEADER),
            timestamp: header(TIMESTAMP_HEADER),
            ip: addr,
            client_ip,
            method: parts.method,
            path: parts.uri.path().to_string(),
        })
    }
}
