use std::io::{self, Read, Write};

use http::header::{HeaderValue, CONTENT_LENGTH};
use http::HeaderMap;

use super::response::{content_type_of, set_content_type, ResponseBody, ServerResponse};
use crate::media::MediaType;

/// What a converter may touch when writing: headers and a body writer.
///
/// Borrowing the response this way means a converter can flush but can never
/// finish the exchange; that stays with the transport.
pub struct OutputMessage<'a> {
    headers: &'a mut HeaderMap,
    body: &'a mut ResponseBody,
}

impl<'a> OutputMessage<'a> {
    pub fn new(response: &'a mut ServerResponse) -> Self {
        let (headers, body) = response.split_mut();
        Self { headers, body }
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &*self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.headers
    }

    #[must_use]
    pub fn content_type(&self) -> Option<MediaType> {
        content_type_of(&*self.headers)
    }

    pub fn set_content_type(&mut self, media_type: &MediaType) {
        set_content_type(self.headers, media_type);
    }

    pub fn set_content_length(&mut self, length: usize) {
        self.headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }

    pub fn body(&mut self) -> &mut dyn Write {
        &mut *self.body
    }

    /// Flush the body.
    ///
    /// # Errors
    ///
    /// Propagates the writer's I/O error.
    pub fn flush(&mut self) -> io::Result<()> {
        self.body.flush()
    }
}

/// What a converter sees when reading a request body.
pub struct InputMessage<'a> {
    headers: &'a HeaderMap,
    body: &'a [u8],
}

impl<'a> InputMessage<'a> {
    #[must_use]
    pub fn new(headers: &'a HeaderMap, body: &'a [u8]) -> Self {
        Self { headers, body }
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.headers
    }

    #[must_use]
    pub fn content_type(&self) -> Option<MediaType> {
        content_type_of(self.headers)
    }

    #[must_use]
    pub fn body(&self) -> impl Read + 'a {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_message_writes_through_to_response() {
        let mut res = ServerResponse::new();
        {
            let mut out = OutputMessage::new(&mut res);
            out.set_content_type(&MediaType::application_json());
            out.set_content_length(2);
            out.body().write_all(b"{}").unwrap();
            out.flush().unwrap();
        }
        assert_eq!(res.body_bytes(), b"{}");
        assert_eq!(res.content_type(), Some(MediaType::application_json()));
        assert!(res.is_committed());
        assert!(!res.is_finished());
    }

    #[test]
    fn test_input_message_reads_body() {
        let headers = HeaderMap::new();
        let input = InputMessage::new(&headers, b"hello");
        let mut text = String::new();
        input.body().read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello");
        assert!(input.content_type().is_none());
    }
}
