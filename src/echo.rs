use std::sync::Arc;

use serde_json::json;

use crate::handler::{HandlerDescriptor, ReturnType, ReturnValue, ValueKind};
use crate::registry::HandlerFn;
use crate::server::{RequestContext, ServerRequest, ServerResponse};

/// Echo back what resolution recorded for the request.
#[must_use]
pub fn echo_value(handler: &HandlerDescriptor, request: &ServerRequest, ctx: &RequestContext) -> serde_json::Value {
    let uri_variables: serde_json::Map<String, serde_json::Value> = ctx
        .uri_variables()
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
    let query: serde_json::Map<String, serde_json::Value> = request
        .query_params()
        .iter()
        .map(|(k, v)| (k.clone(), json!(v)))
        .collect();
    json!({
        "handler": handler.to_string(),
        "method": request.method().to_string(),
        "path": request.raw_path(),
        "lookup_path": ctx.lookup_path(),
        "best_pattern": ctx.best_pattern(),
        "uri_variables": uri_variables,
        "query": query,
        "request_id": ctx.request_id().to_string(),
    })
}

/// What an echo handler returns for `handler`: the echo document shaped by the
/// declared return type. Void handlers return nothing.
#[must_use]
pub fn echo_return_value(
    handler: &HandlerDescriptor,
    request: &ServerRequest,
    ctx: &RequestContext,
) -> Option<ReturnValue> {
    match handler.return_type().target() {
        ReturnType::Unit => None,
        ReturnType::Value {
            kind: ValueKind::Text,
            ..
        } => Some(ReturnValue::Text(format!(
            "{} {} -> {handler}",
            request.method(),
            request.raw_path()
        ))),
        ReturnType::Value {
            kind: ValueKind::Binary,
            ..
        } => Some(ReturnValue::Binary(
            echo_value(handler, request, ctx).to_string().into_bytes(),
        )),
        ReturnType::Value { .. } | ReturnType::Envelope(_) => {
            Some(ReturnValue::Json(echo_value(handler, request, ctx)))
        }
    }
}

/// A [`HandlerFn`] implementing `descriptor` with [`echo_return_value`].
#[must_use]
pub fn echo_handler(descriptor: &HandlerDescriptor) -> HandlerFn {
    let descriptor = descriptor.clone();
    Arc::new(
        move |request: &ServerRequest,
              ctx: &RequestContext,
              _response: &mut ServerResponse|
              -> anyhow::Result<Option<ReturnValue>> {
            Ok(echo_return_value(&descriptor, request, ctx))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_shapes_follow_return_type() {
        let request = ServerRequest::get("/beans?page=2");
        let ctx = RequestContext::for_request(&request);

        let json = HandlerDescriptor::named("BeanController", "beans", ReturnType::json("Object"));
        match echo_return_value(&json, &request, &ctx) {
            Some(ReturnValue::Json(value)) => {
                assert_eq!(value["handler"], "BeanController#beans");
                assert_eq!(value["query"]["page"], "2");
            }
            other => panic!("unexpected echo value: {other:?}"),
        }

        let text = HandlerDescriptor::named("BeanController", "name", ReturnType::text());
        assert_eq!(
            echo_return_value(&text, &request, &ctx),
            Some(ReturnValue::Text("GET /beans -> BeanController#name".to_string()))
        );

        let void = HandlerDescriptor::named("BeanController", "ping", ReturnType::Unit);
        assert_eq!(echo_return_value(&void, &request, &ctx), None);
    }
}
