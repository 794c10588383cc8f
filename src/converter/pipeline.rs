//! Chooses the response media type for a handler's return value and writes it.

use std::sync::Arc;

use tracing::{debug, trace};

use super::core::ConverterRegistry;
use crate::error::NegotiationError;
use crate::handler::{ReturnType, ReturnValue};
use crate::media::{sort_by_specificity_and_quality, MediaType};
use crate::negotiation::ContentNegotiationManager;
use crate::server::{OutputMessage, RequestContext, ServerRequest, ServerResponse};

/// Negotiates and writes handler return values.
#[derive(Debug, Clone)]
pub struct ReturnValueWriter {
    converters: Arc<ConverterRegistry>,
    negotiation: Arc<ContentNegotiationManager>,
}

impl ReturnValueWriter {
    #[must_use]
    pub fn new(converters: Arc<ConverterRegistry>, negotiation: Arc<ContentNegotiationManager>) -> Self {
        Self {
            converters,
            negotiation,
        }
    }

    #[must_use]
    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    #[must_use]
    pub fn negotiation(&self) -> &ContentNegotiationManager {
        &self.negotiation
    }

    /// Select a media type and write `value` with the first converter that accepts it.
    ///
    /// A concrete `Content-Type` already set on the response wins over
    /// negotiation. Otherwise the acceptable types (from the negotiation chain) are
    /// intersected with the producible types (the matched key's `produces`, or
    /// whatever the converters can write), sorted, and the first concrete entry
    /// is chosen; a bare `*/*` or `application/*` falls back to
    /// `application/octet-stream`.
    ///
    /// Returns the type written, or `None` when `value` is `None` (nothing is
    /// written in that case, and incompatibility is not an error).
    ///
    /// # Errors
    ///
    /// - [`NegotiationError::NotAcceptable`] when nothing producible is acceptable
    /// - [`NegotiationError::NoConverterForType`] when no converter handles the value
    /// - negotiation and converter errors as reported
    pub fn negotiate_and_write(
        &self,
        value: Option<&ReturnValue>,
        declared: &ReturnType,
        request: &ServerRequest,
        ctx: &RequestContext,
        response: &mut ServerResponse,
    ) -> Result<Option<MediaType>, NegotiationError> {
        let value_kind = value.map(ReturnValue::kind).or_else(|| declared.kind());
        let target = declared.target();

        let preset = response.content_type().filter(MediaType::is_concrete);
        let selected = match &preset {
            Some(content_type) => {
                debug!(content_type = %content_type, "Found 'Content-Type' already set on the response");
                content_type.clone()
            }
            None => {
                let acceptable = self
                    .negotiation
                    .resolve_media_types(request, ctx.lookup_path())?;
                let producible = self.producible_types(value, declared, ctx)?;

                let mut compatible: Vec<MediaType> = Vec::new();
                for accept in &acceptable {
                    for produce in &producible {
                        if accept.is_compatible_with(produce) {
                            compatible.push(MediaType::most_specific(accept, produce));
                        }
                    }
                }
                if compatible.is_empty() {
                    if value.is_some() {
                        debug!(
                            acceptable = ?display_all(&acceptable),
                            producible = ?display_all(&producible),
                            "No match for acceptable types"
                        );
                        return Err(NegotiationError::NotAcceptable { producible });
                    }
                    trace!("Null value with no compatible media type, nothing to write");
                    return Ok(None);
                }

                sort_by_specificity_and_quality(&mut compatible);
                let Some(selected) = select_media_type(&compatible) else {
                    if value.is_some() {
                        return Err(NegotiationError::NotAcceptable { producible });
                    }
                    return Ok(None);
                };
                debug!(
                    selected = %selected,
                    acceptable = ?display_all(&acceptable),
                    producible = ?display_all(&producible),
                    "Using negotiated media type"
                );
                selected
            }
        };

        let selected = selected.remove_quality_value();
        let Some(value) = value else {
            trace!(selected = %selected, "Nothing to write: null value");
            return Ok(None);
        };

        let converter = self
            .converters
            .converters()
            .iter()
            .find(|converter| converter.can_write(target, value_kind, Some(&selected)));
        match converter {
            Some(converter) => {
                debug!(
                    converter = converter.name(),
                    media_type = %selected,
                    value_type = %declared,
                    "Writing return value"
                );
                let mut output = OutputMessage::new(response);
                converter.write(value, target, Some(&selected), &mut output)?;
                Ok(Some(selected))
            }
            None if preset.is_some() => Err(NegotiationError::NoConverterForType {
                value_type: declared.to_string(),
                media_type: preset,
            }),
            None => Err(NegotiationError::NotAcceptable {
                producible: self.converters.all_supported_media_types(),
            }),
        }
    }

    /// The context hint if the matched key declared `produces`, otherwise every
    /// type some converter can write for this value.
    fn producible_types(
        &self,
        value: Option<&ReturnValue>,
        declared: &ReturnType,
        ctx: &RequestContext,
    ) -> Result<Vec<MediaType>, NegotiationError> {
        if let Some(hint) = ctx.producible_types().filter(|types| !types.is_empty()) {
            return Ok(hint.to_vec());
        }
        let value_kind = value.map(ReturnValue::kind).or_else(|| declared.kind());
        let target = declared.target();
        let mut producible: Vec<MediaType> = Vec::new();
        for converter in self.converters.converters() {
            if converter.can_write(target, value_kind, None) {
                for media_type in converter.supported_media_types_for(value_kind) {
                    if !producible.contains(&media_type) {
                        producible.push(media_type);
                    }
                }
            }
        }
        if producible.is_empty() {
            if value.is_some() {
                return Err(NegotiationError::NoConverterForType {
                    value_type: declared.to_string(),
                    media_type: None,
                });
            }
            return Ok(vec![MediaType::all()]);
        }
        Ok(producible)
    }
}

/// First concrete entry; a `*/*` or `application/*` reached before any concrete
/// entry selects `application/octet-stream`. Other wildcards are skipped.
fn select_media_type(sorted: &[MediaType]) -> Option<MediaType> {
    for media_type in sorted {
        if media_type.is_concrete() {
            return Some(media_type.clone());
        }
        if media_type.is_all_or_application_all() {
            return Some(MediaType::application_octet_stream());
        }
    }
    None
}

fn display_all(media_types: &[MediaType]) -> Vec<String> {
    media_types.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::JsonConverter;
    use crate::handler::ValueKind;
    use crate::ids::RequestId;
    use serde_json::json;

    fn mt(s: &str) -> MediaType {
        MediaType::parse(s).unwrap()
    }

    fn writer() -> ReturnValueWriter {
        ReturnValueWriter::new(
            Arc::new(ConverterRegistry::with_defaults()),
            Arc::new(ContentNegotiationManager::default()),
        )
    }

    fn ctx() -> RequestContext {
        RequestContext::new(RequestId::new())
    }

    #[test]
    fn test_select_media_type() {
        assert_eq!(select_media_type(&[mt("application/json")]), Some(mt("application/json")));
        assert_eq!(
            select_media_type(&[mt("*/*"), mt("application/json")]),
            Some(MediaType::application_octet_stream())
        );
        assert_eq!(
            select_media_type(&[mt("text/*"), mt("application/json")]),
            Some(mt("application/json"))
        );
        assert_eq!(select_media_type(&[mt("text/*")]), None);
    }

    #[test]
    fn test_writes_json_for_any_accept() {
        let request = ServerRequest::get("/beans");
        let mut res = ServerResponse::new();
        let written = writer()
            .negotiate_and_write(
                Some(&json!(["a"]).into()),
                &ReturnType::json("List<String>"),
                &request,
                &ctx(),
                &mut res,
            )
            .unwrap();
        assert_eq!(written, Some(mt("application/json")));
        assert_eq!(res.body_bytes(), br#"["a"]"#);
        assert_eq!(res.body().write_count(), 1);
    }

    #[test]
    fn test_hint_narrows_producible_types() {
        let request = ServerRequest::get("/beans").with_accept("text/plain");
        let mut context = ctx();
        context.set_producible_types(vec![mt("application/json")]);
        let err = writer()
            .negotiate_and_write(
                Some(&json!({}).into()),
                &ReturnType::json("Bean"),
                &request,
                &context,
                &mut ServerResponse::new(),
            )
            .unwrap_err();
        assert!(matches!(err, NegotiationError::NotAcceptable { producible } if producible == vec![mt("application/json")]));
    }

    #[test]
    fn test_null_value_never_fails_on_incompatibility() {
        let request = ServerRequest::get("/beans").with_accept("text/plain");
        let mut res = ServerResponse::new();
        let written = writer()
            .negotiate_and_write(None, &ReturnType::json("Bean"), &request, &ctx(), &mut res)
            .unwrap();
        assert_eq!(written, None);
        assert!(res.body_bytes().is_empty());
        assert!(res.content_type().is_none());
    }

    #[test]
    fn test_preset_content_type_without_converter() {
        let request = ServerRequest::get("/report");
        let mut res = ServerResponse::new();
        res.set_content_type(&mt("text/csv"));
        let err = writer()
            .negotiate_and_write(
                Some(&ReturnValue::Text("a,b".to_string())),
                &ReturnType::value("Report", ValueKind::Text),
                &request,
                &ctx(),
                &mut res,
            )
            .unwrap_err();
        match err {
            NegotiationError::NoConverterForType {
                value_type,
                media_type,
            } => {
                assert_eq!(value_type, "Report");
                assert_eq!(media_type, Some(mt("text/csv")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_converters_for_value() {
        let writer = ReturnValueWriter::new(
            Arc::new(ConverterRegistry::new(Vec::new())),
            Arc::new(ContentNegotiationManager::default()),
        );
        let err = writer
            .negotiate_and_write(
                Some(&"x".into()),
                &ReturnType::text(),
                &ServerRequest::get("/"),
                &ctx(),
                &mut ServerResponse::new(),
            )
            .unwrap_err();
        assert!(matches!(err, NegotiationError::NoConverterForType { media_type: None, .. }));
    }

    #[test]
    fn test_accept_quality_ordering_picks_json_suffix_type() {
        let writer = ReturnValueWriter::new(
            Arc::new(ConverterRegistry::new(vec![Arc::new(JsonConverter::new())])),
            Arc::new(ContentNegotiationManager::default()),
        );
        let request = ServerRequest::get("/pets")
            .with_accept("application/json;q=0.5, application/vnd.pet+json");
        let mut res = ServerResponse::new();
        let written = writer
            .negotiate_and_write(Some(&json!({}).into()), &ReturnType::json("Pet"), &request, &ctx(), &mut res)
            .unwrap();
        assert_eq!(written, Some(mt("application/vnd.pet+json")));
        assert_eq!(res.content_type(), Some(mt("application/vnd.pet+json")));
    }
}
