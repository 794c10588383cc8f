use std::io::{self, Write};

use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::media::MediaType;

/// Response body buffer.
///
/// Counts writes and flushes so callers can assert how a converter used it.
#[derive(Debug, Default)]
pub struct ResponseBody {
    bytes: Vec<u8>,
    writes: usize,
    flushes: usize,
}

impl ResponseBody {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes
    }

    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}

impl Write for ResponseBody {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes += 1;
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// The outgoing response.
///
/// A response is *committed* once its body has been flushed; it is *finished*
/// only when the transport calls [`ServerResponse::finish`]. Converters never get
/// access to `finish`.
#[derive(Debug)]
pub struct ServerResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
    finished: bool,
}

impl Default for ServerResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerResponse {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: ResponseBody::default(),
            finished: false,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Parsed `Content-Type`, if one is set and valid.
    #[must_use]
    pub fn content_type(&self) -> Option<MediaType> {
        content_type_of(&self.headers)
    }

    pub fn set_content_type(&mut self, media_type: &MediaType) {
        set_content_type(&mut self.headers, media_type);
    }

    pub fn set_content_length(&mut self, length: usize) {
        self.headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }

    #[must_use]
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut ResponseBody {
        &mut self.body
    }

    #[must_use]
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_bytes()
    }

    pub(crate) fn split_mut(&mut self) -> (&mut HeaderMap, &mut ResponseBody) {
        (&mut self.headers, &mut self.body)
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.finished || self.body.flush_count() > 0
    }

    /// Called by the transport once the exchange is complete.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Write a `{"error": ..., "status": ...}` body unless the response is
    /// already committed.
    pub fn write_json_error(&mut self, status: StatusCode, message: &str) {
        if self.is_committed() {
            warn!(
                status = status.as_u16(),
                error = %message,
                "Response already committed, cannot write error body"
            );
            return;
        }
        let body: Value = json!({
            "error": message,
            "status": status.as_u16(),
        });
        let bytes = body.to_string().into_bytes();
        self.status = status;
        self.headers.clear();
        self.set_content_type(&MediaType::application_json());
        self.set_content_length(bytes.len());
        self.body = ResponseBody::default();
        self.body.bytes = bytes;
        debug!(status = status.as_u16(), "Error response written");
    }
}

pub(crate) fn content_type_of(headers: &HeaderMap) -> Option<MediaType> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| MediaType::parse(value).ok())
}

pub(crate) fn set_content_type(headers: &mut HeaderMap, media_type: &MediaType) {
    match HeaderValue::from_str(&media_type.to_string()) {
        Ok(value) => {
            headers.insert(CONTENT_TYPE, value);
        }
        Err(_) => warn!(content_type = %media_type, "Content-Type is not a valid header value"),
    }
}
