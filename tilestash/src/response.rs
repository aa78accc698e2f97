//! Responses exchanged with the fetch layer.

use std::time::SystemTime;

/// Why a fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorReason {
    NotFound,
    Server,
    Connection,
    RateLimit,
    Other,
}

/// Error attached to a failed response. Error responses are never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseError {
    pub reason: ErrorReason,
    pub message: String,
}

impl ResponseError {
    pub fn new(reason: ErrorReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// A fetched (or cached) response.
///
/// `data == None` together with `no_content == true` represents a cached
/// "no content" answer, which is distinct from a cache miss.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub etag: Option<String>,
    pub expires: Option<SystemTime>,
    pub modified: Option<SystemTime>,
    pub data: Option<Vec<u8>>,
    /// The server answered with no content (e.g. 204 or an empty tile).
    pub no_content: bool,
    /// Revalidation answer: the stored payload is still current.
    pub not_modified: bool,
    pub error: Option<ResponseError>,
}

impl Response {
    /// Successful response carrying a payload.
    pub fn with_data(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Some(data.into()),
            ..Default::default()
        }
    }

    /// Successful response without content.
    pub fn no_content() -> Self {
        Self {
            no_content: true,
            ..Default::default()
        }
    }

    /// Revalidation response with a refreshed expiry.
    pub fn not_modified(expires: Option<SystemTime>) -> Self {
        Self {
            expires,
            not_modified: true,
            ..Default::default()
        }
    }

    /// Failed response.
    pub fn error(reason: ErrorReason, message: impl Into<String>) -> Self {
        Self {
            error: Some(ResponseError::new(reason, message)),
            ..Default::default()
        }
    }

    pub fn etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn expires(mut self, expires: SystemTime) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Payload to persist: `None` for no-content and revalidation answers.
    pub(crate) fn stored_payload(&self) -> Option<&[u8]> {
        if self.no_content || self.not_modified {
            None
        } else {
            self.data.as_deref()
        }
    }
}
