use std::fmt;
use std::sync::Arc;

use crate::error::NegotiationError;
use crate::handler::{ReturnType, ReturnValue, ValueKind};
use crate::media::{MediaType, ALL};
use crate::server::{InputMessage, OutputMessage};

use super::json::JsonConverter;

/// Converts values to and from a serialized representation.
///
/// `write` must flush the output when done and must not assume it owns the
/// transport: the [`OutputMessage`] it receives cannot finish the response.
pub trait MessageConverter: Send + Sync + fmt::Debug {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    fn supported_media_types(&self) -> &[MediaType];

    /// Media types this converter can emit for values of `value_kind`.
    fn supported_media_types_for(&self, _value_kind: Option<ValueKind>) -> Vec<MediaType> {
        self.supported_media_types().to_vec()
    }

    fn can_read(&self, target: &ReturnType, media_type: Option<&MediaType>) -> bool;

    /// Whether a value of `value_kind`, declared as `target`, can be written as
    /// `media_type`. `None` media type means "any".
    fn can_write(
        &self,
        target: &ReturnType,
        value_kind: Option<ValueKind>,
        media_type: Option<&MediaType>,
    ) -> bool;

    /// # Errors
    ///
    /// Returns [`NegotiationError::Conversion`] when the body does not decode into
    /// `target`, or an I/O error from the body stream.
    fn read(&self, target: &ReturnType, input: &InputMessage<'_>) -> Result<ReturnValue, NegotiationError>;

    /// # Errors
    ///
    /// Returns [`NegotiationError::Conversion`] when the value cannot be
    /// serialized, or an I/O error from the body stream.
    fn write(
        &self,
        value: &ReturnValue,
        target: &ReturnType,
        content_type: Option<&MediaType>,
        output: &mut OutputMessage<'_>,
    ) -> Result<(), NegotiationError>;
}

/// Write-side media type check: no media type or `*/*` is always accepted,
/// otherwise some supported type must be compatible with it.
#[must_use]
pub fn supports_for_write(supported: &[MediaType], media_type: Option<&MediaType>) -> bool {
    match media_type {
        None => true,
        Some(media_type) if *media_type == *ALL => true,
        Some(media_type) => supported.iter().any(|s| s.is_compatible_with(media_type)),
    }
}

/// Read-side media type check: no media type is accepted, otherwise some
/// supported type must include it.
#[must_use]
pub fn supports_for_read(supported: &[MediaType], media_type: Option<&MediaType>) -> bool {
    match media_type {
        None => true,
        Some(media_type) => supported.iter().any(|s| s.includes(media_type)),
    }
}

/// Set `Content-Type` and `Content-Length` unless already present.
///
/// A missing or wildcard content type falls back to `default_type`; a missing
/// charset falls back to `default_charset`.
pub fn add_default_headers(
    output: &mut OutputMessage<'_>,
    content_type: Option<&MediaType>,
    default_type: &MediaType,
    default_charset: Option<&str>,
    content_length: Option<usize>,
) {
    if output.content_type().is_none() {
        let mut to_use = match content_type {
            Some(media_type) if media_type.is_concrete() => media_type.remove_quality_value(),
            _ => default_type.clone(),
        };
        if to_use.charset().is_none() {
            if let Some(charset) = default_charset {
                to_use = to_use.with_charset(charset);
            }
        }
        output.set_content_type(&to_use);
    }
    if let Some(length) = content_length {
        if !output.headers().contains_key(http::header::CONTENT_LENGTH)
            && !output.headers().contains_key(http::header::TRANSFER_ENCODING)
        {
            output.set_content_length(length);
        }
    }
}

/// Ordered list of converters. Earlier converters win ties.
#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn MessageConverter>>,
}

impl ConverterRegistry {
    #[must_use]
    pub fn new(converters: Vec<Arc<dyn MessageConverter>>) -> Self {
        Self { converters }
    }

    /// The JSON converter alone.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(vec![Arc::new(JsonConverter::new())])
    }

    #[must_use]
    pub fn with(mut self, converter: Arc<dyn MessageConverter>) -> Self {
        self.converters.push(converter);
        self
    }

    #[must_use]
    pub fn converters(&self) -> &[Arc<dyn MessageConverter>] {
        &self.converters
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Every media type any converter supports, without duplicates.
    #[must_use]
    pub fn all_supported_media_types(&self) -> Vec<MediaType> {
        let mut all: Vec<MediaType> = Vec::new();
        for converter in &self.converters {
            for media_type in converter.supported_media_types() {
                if !all.contains(media_type) {
                    all.push(media_type.clone());
                }
            }
        }
        all
    }

    /// First converter able to read `target` from `media_type`.
    #[must_use]
    pub fn reader_for(
        &self,
        target: &ReturnType,
        media_type: Option<&MediaType>,
    ) -> Option<&Arc<dyn MessageConverter>> {
        self.converters
            .iter()
            .find(|converter| converter.can_read(target, media_type))
    }

    /// Read a request body with the first converter that accepts its content type.
    ///
    /// # Errors
    ///
    /// [`NegotiationError::InvalidMediaType`] when no converter reads the
    /// content type, otherwise whatever the converter reports.
    pub fn read(&self, target: &ReturnType, input: &InputMessage<'_>) -> Result<ReturnValue, NegotiationError> {
        let content_type = input.content_type();
        let converter = self
            .reader_for(target, content_type.as_ref())
            .ok_or_else(|| NegotiationError::InvalidMediaType {
                value: content_type
                    .as_ref()
                    .map_or_else(|| "<none>".to_string(), ToString::to_string),
                reason: format!("no converter reads [{target}] from this content type"),
            })?;
        converter.read(target, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerResponse;

    fn mt(s: &str) -> MediaType {
        MediaType::parse(s).unwrap()
    }

    #[test]
    fn test_supports_for_write() {
        let supported = [mt("application/json"), mt("application/*+json")];
        assert!(supports_for_write(&supported, None));
        assert!(supports_for_write(&supported, Some(&mt("*/*"))));
        assert!(supports_for_write(&supported, Some(&mt("application/*"))));
        assert!(supports_for_write(&supported, Some(&mt("application/hal+json"))));
        assert!(!supports_for_write(&supported, Some(&mt("text/plain"))));
    }

    #[test]
    fn test_supports_for_read() {
        let supported = [mt("application/json")];
        assert!(supports_for_read(&supported, None));
        assert!(supports_for_read(&supported, Some(&mt("application/json;charset=UTF-8"))));
        assert!(!supports_for_read(&supported, Some(&mt("application/*"))));
    }

    #[test]
    fn test_default_headers_respect_existing_values() {
        let mut res = ServerResponse::new();
        res.set_content_type(&mt("application/hal+json"));
        {
            let mut out = OutputMessage::new(&mut res);
            add_default_headers(&mut out, Some(&mt("application/json")), &mt("application/json"), None, Some(7));
        }
        assert_eq!(res.content_type(), Some(mt("application/hal+json")));
        assert_eq!(res.headers()["content-length"], "7");
    }

    #[test]
    fn test_default_headers_fill_wildcards_and_charset() {
        let mut res = ServerResponse::new();
        {
            let mut out = OutputMessage::new(&mut res);
            add_default_headers(&mut out, Some(&mt("application/*")), &mt("text/plain"), Some("UTF-8"), None);
        }
        assert_eq!(res.content_type(), Some(mt("text/plain;charset=UTF-8")));
        assert!(!res.headers().contains_key("content-length"));
    }
}
