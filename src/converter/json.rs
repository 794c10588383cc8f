use std::io::{Read, Write};

use base64::Engine as _;
use once_cell::sync::Lazy;
use tracing::{debug, trace};

use super::core::{add_default_headers, supports_for_read, supports_for_write, MessageConverter};
use crate::error::NegotiationError;
use crate::handler::{ReturnType, ReturnValue, ValueKind};
use crate::media::{MediaType, APPLICATION_JSON};
use crate::server::{InputMessage, OutputMessage};

static SUPPORTED: Lazy<Vec<MediaType>> = Lazy::new(|| {
    vec![
        APPLICATION_JSON.clone(),
        MediaType::new("application", "*+json").unwrap_or_else(|_| APPLICATION_JSON.clone()),
    ]
});

const NAME: &str = "json";

/// JSON converter backed by `serde_json`.
///
/// Text values are written as JSON strings and binary values as base64 JSON
/// strings. Only UTF-8 (and its US-ASCII subset) is supported; a US-ASCII
/// content type is rewritten to UTF-8 on output.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverter {
    pretty: bool,
}

impl JsonConverter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent output.
    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    fn charset_supported(media_type: Option<&MediaType>) -> bool {
        match media_type.and_then(MediaType::charset) {
            None => true,
            Some(charset) => {
                charset.eq_ignore_ascii_case("utf-8") || charset.eq_ignore_ascii_case("us-ascii")
            }
        }
    }

    fn conversion(message: impl Into<String>) -> NegotiationError {
        NegotiationError::Conversion {
            converter: NAME,
            message: message.into(),
        }
    }

    fn to_json(value: &ReturnValue) -> serde_json::Value {
        match value {
            ReturnValue::Json(json) => json.clone(),
            ReturnValue::Text(text) => serde_json::Value::String(text.clone()),
            ReturnValue::Binary(bytes) => serde_json::Value::String(
                base64::engine::general_purpose::STANDARD.encode(bytes),
            ),
        }
    }

    fn serialize(&self, value: &ReturnValue) -> Result<Vec<u8>, NegotiationError> {
        let json = Self::to_json(value);
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&json)
        } else {
            serde_json::to_vec(&json)
        };
        bytes.map_err(|err| Self::conversion(err.to_string()))
    }
}

impl MessageConverter for JsonConverter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supported_media_types(&self) -> &[MediaType] {
        &SUPPORTED
    }

    fn can_read(&self, target: &ReturnType, media_type: Option<&MediaType>) -> bool {
        !target.target().is_unit()
            && supports_for_read(&SUPPORTED, media_type)
            && Self::charset_supported(media_type)
    }

    fn can_write(
        &self,
        target: &ReturnType,
        value_kind: Option<ValueKind>,
        media_type: Option<&MediaType>,
    ) -> bool {
        if value_kind.is_none() && target.is_unit() {
            return false;
        }
        supports_for_write(&SUPPORTED, media_type) && Self::charset_supported(media_type)
    }

    fn read(&self, target: &ReturnType, input: &InputMessage<'_>) -> Result<ReturnValue, NegotiationError> {
        let content_type = input.content_type();
        if !Self::charset_supported(content_type.as_ref()) {
            return Err(Self::conversion(format!(
                "unsupported charset in '{}'",
                content_type.map(|m| m.to_string()).unwrap_or_default()
            )));
        }
        let mut bytes = Vec::new();
        input.body().read_to_end(&mut bytes)?;
        let json: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|err| Self::conversion(err.to_string()))?;
        trace!(target_type = %target, "Read JSON body");

        match target.kind() {
            Some(ValueKind::Json) => Ok(ReturnValue::Json(json)),
            Some(ValueKind::Text) => match json {
                serde_json::Value::String(text) => Ok(ReturnValue::Text(text)),
                other => Err(Self::conversion(format!(
                    "expected a JSON string for [{target}], found {other}"
                ))),
            },
            Some(ValueKind::Binary) => match json {
                serde_json::Value::String(encoded) => base64::engine::general_purpose::STANDARD
                    .decode(encoded.as_bytes())
                    .map(ReturnValue::Binary)
                    .map_err(|err| Self::conversion(err.to_string())),
                other => Err(Self::conversion(format!(
                    "expected a base64 JSON string for [{target}], found {other}"
                ))),
            },
            None => Err(Self::conversion(format!("cannot read into [{target}]"))),
        }
    }

    fn write(
        &self,
        value: &ReturnValue,
        target: &ReturnType,
        content_type: Option<&MediaType>,
        output: &mut OutputMessage<'_>,
    ) -> Result<(), NegotiationError> {
        let bytes = self.serialize(value)?;
        let content_type = content_type.map(|media_type| match media_type.charset() {
            Some(charset) if charset.eq_ignore_ascii_case("us-ascii") => {
                media_type.clone().with_charset("UTF-8")
            }
            _ => media_type.clone(),
        });
        add_default_headers(
            output,
            content_type.as_ref(),
            &APPLICATION_JSON,
            None,
            Some(bytes.len()),
        );
        output.body().write_all(&bytes)?;
        output.flush()?;
        debug!(
            target_type = %target,
            kind = %value.kind(),
            bytes = bytes.len(),
            "Wrote JSON body"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerResponse;
    use http::HeaderMap;
    use serde_json::json;

    fn mt(s: &str) -> MediaType {
        MediaType::parse(s).unwrap()
    }

    fn write(converter: JsonConverter, value: &ReturnValue, content_type: Option<&str>) -> ServerResponse {
        let mut res = ServerResponse::new();
        let content_type = content_type.map(mt);
        {
            let mut out = OutputMessage::new(&mut res);
            converter
                .write(value, &ReturnType::json("Object"), content_type.as_ref(), &mut out)
                .unwrap();
        }
        res
    }

    #[test]
    fn test_can_write() {
        let c = JsonConverter::new();
        let target = ReturnType::json("Pet");
        assert!(c.can_write(&target, Some(ValueKind::Json), None));
        assert!(c.can_write(&target, Some(ValueKind::Json), Some(&mt("*/*"))));
        assert!(c.can_write(&target, Some(ValueKind::Text), Some(&mt("application/json"))));
        assert!(c.can_write(&target, Some(ValueKind::Json), Some(&mt("application/vnd.pet+json"))));
        assert!(c.can_write(&target, Some(ValueKind::Json), Some(&mt("application/json;charset=US-ASCII"))));
        assert!(!c.can_write(&target, Some(ValueKind::Json), Some(&mt("application/json;charset=ISO-8859-1"))));
        assert!(!c.can_write(&target, Some(ValueKind::Json), Some(&mt("text/plain"))));
        assert!(!c.can_write(&ReturnType::Unit, None, None));
    }

    #[test]
    fn test_can_read() {
        let c = JsonConverter::new();
        assert!(c.can_read(&ReturnType::json("Pet"), None));
        assert!(c.can_read(&ReturnType::json("Pet"), Some(&mt("application/json;charset=utf-8"))));
        assert!(!c.can_read(&ReturnType::json("Pet"), Some(&mt("text/plain"))));
        assert!(!c.can_read(&ReturnType::Unit, None));
    }

    #[test]
    fn test_write_sets_headers_and_writes_once() {
        let res = write(JsonConverter::new(), &json!({"id": 1}).into(), Some("application/json"));
        assert_eq!(res.body_bytes(), br#"{"id":1}"#);
        assert_eq!(res.content_type(), Some(mt("application/json")));
        assert_eq!(res.headers()["content-length"], "8");
        assert_eq!(res.body().write_count(), 1);
        assert_eq!(res.body().flush_count(), 1);
        assert!(!res.is_finished());
    }

    #[test]
    fn test_write_wildcard_falls_back_to_application_json() {
        let res = write(JsonConverter::new(), &"hi".into(), Some("application/*"));
        assert_eq!(res.body_bytes(), br#""hi""#);
        assert_eq!(res.content_type(), Some(mt("application/json")));
    }

    #[test]
    fn test_write_rewrites_us_ascii() {
        let res = write(JsonConverter::new(), &json!([]).into(), Some("application/json;charset=US-ASCII"));
        assert_eq!(res.content_type(), Some(mt("application/json;charset=UTF-8")));
    }

    #[test]
    fn test_write_binary_as_base64_and_pretty() {
        let res = write(JsonConverter::new(), &ReturnValue::Binary(vec![1, 2, 3]), None);
        assert_eq!(res.body_bytes(), br#""AQID""#);

        let res = write(JsonConverter::new().pretty(true), &json!({"a": 1}).into(), None);
        assert_eq!(res.body_bytes(), b"{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_read_by_target_kind() {
        let headers = HeaderMap::new();
        let c = JsonConverter::new();

        let input = InputMessage::new(&headers, br#"{"name":"rex"}"#);
        assert_eq!(
            c.read(&ReturnType::json("Pet"), &input).unwrap(),
            ReturnValue::Json(json!({"name": "rex"}))
        );

        let input = InputMessage::new(&headers, br#""AQID""#);
        assert_eq!(c.read(&ReturnType::binary(), &input).unwrap(), ReturnValue::Binary(vec![1, 2, 3]));

        let input = InputMessage::new(&headers, b"42");
        let err = c.read(&ReturnType::text(), &input).unwrap_err();
        assert!(matches!(err, NegotiationError::Conversion { converter: "json", .. }));

        let input = InputMessage::new(&headers, b"{not json");
        assert!(c.read(&ReturnType::json("Pet"), &input).is_err());
    }
}
