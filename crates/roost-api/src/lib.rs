//! Remote API access for the Roost registration client.
//!
//! This crate provides the mutually-authenticated HTTPS transport used for
//! every call to the Roost service, and the typed inventory and ingress
//! clients built on top of it. The transport is deliberately stateless: a
//! fresh TLS context and connection per call, no pooling, no reuse.

pub mod ingress;
pub mod inventory;
pub mod transport;

pub use ingress::{Ingress, UploadReceipt};
pub use inventory::{Host, Inventory};
pub use transport::SecureTransport;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Identity material is missing or invalid. Raised before any
    /// connection is attempted; never worth retrying.
    #[error("identity material error: {0}")]
    Identity(String),
    /// Connection, DNS, TLS handshake, or peer verification failure.
    #[error("connection error: {0}")]
    Connection(String),
    /// The service answered with a status the caller cannot act on.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    /// The service answered successfully but the payload did not parse.
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP verbs supported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        write!(f, "{name}")
    }
}

/// One complete HTTP exchange result.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as UTF-8, truncated for use in error messages.
    pub fn body_excerpt(&self) -> String {
        const LIMIT: usize = 500;
        let text = String::from_utf8_lossy(&self.body);
        let text = text.trim();
        if text.len() <= LIMIT {
            text.to_owned()
        } else {
            let mut end = LIMIT;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}…", &text[..end])
        }
    }
}

/// Seam between the API clients and the network.
///
/// `SecureTransport` is the production implementation; tests substitute an
/// in-memory one so the clients and the registration controller can be
/// exercised without sockets or identity material.
pub trait Transport {
    fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, ApiError> {
        (**self).request(method, endpoint, query, headers, body)
    }
}
