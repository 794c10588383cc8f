use http::Method;

use super::{MatchOptions, Router, RoutingKey};
use crate::error::{MappingError, NegotiationError};
use crate::handler::{HandlerDescriptor, ReturnType};
use crate::media::MediaType;
use crate::server::{RequestContext, ServerRequest};

fn handler(method: &str) -> HandlerDescriptor {
    HandlerDescriptor::named("TestController", method, ReturnType::json("Object"))
}

fn register(router: &Router, key: RoutingKey, method: &str) {
    assert!(router.register_handler(key, handler(method)).unwrap());
}

fn resolve(router: &Router, request: &ServerRequest) -> Option<String> {
    let mut ctx = RequestContext::for_request(request);
    router
        .resolve(request, &mut ctx)
        .unwrap()
        .map(|resolved| resolved.handler.method_name().to_string())
}

#[test]
fn test_variable_beats_wildcard() {
    let router = Router::new();
    register(&router, router.mapping(["/users/*"]).build().unwrap(), "wildcard");
    register(&router, router.mapping(["/users/{id}"]).build().unwrap(), "variable");

    assert_eq!(resolve(&router, &ServerRequest::get("/users/42")).as_deref(), Some("variable"));
}

#[test]
fn test_literal_beats_variable() {
    let router = Router::new();
    register(&router, router.mapping(["/users/{id}"]).build().unwrap(), "variable");
    register(&router, router.mapping(["/users/me"]).build().unwrap(), "literal");

    assert_eq!(resolve(&router, &ServerRequest::get("/users/me")).as_deref(), Some("literal"));
    assert_eq!(resolve(&router, &ServerRequest::get("/users/7")).as_deref(), Some("variable"));
}

#[test]
fn test_direct_path_falls_back_to_scan() {
    let router = Router::new();
    register(
        &router,
        router.mapping(["/beans"]).method(Method::POST).build().unwrap(),
        "create",
    );
    register(&router, router.mapping(["/{segment}"]).build().unwrap(), "any");

    // The direct entry exists but does not match GET; the scan finds the pattern.
    assert_eq!(resolve(&router, &ServerRequest::get("/beans")).as_deref(), Some("any"));
    let post = ServerRequest::new(Method::POST, "/beans");
    assert_eq!(resolve(&router, &post).as_deref(), Some("create"));
}

#[test]
fn test_head_matches_get_mapping() {
    let router = Router::new();
    register(
        &router,
        router.mapping(["/beans"]).method(Method::GET).build().unwrap(),
        "beans",
    );

    let head = ServerRequest::new(Method::HEAD, "/beans");
    assert_eq!(resolve(&router, &head).as_deref(), Some("beans"));
    let delete = ServerRequest::new(Method::DELETE, "/beans");
    assert_eq!(resolve(&router, &delete), None);
}

#[test]
fn test_uri_variables_recorded_in_context() {
    let router = Router::new();
    register(
        &router,
        router.mapping(["/owners/{owner}/pets/{pet:\\d+}"]).build().unwrap(),
        "pet",
    );

    let request = ServerRequest::get("/owners/jo/pets/12");
    let mut ctx = RequestContext::for_request(&request);
    let resolved = router.resolve(&request, &mut ctx).unwrap().unwrap();
    assert_eq!(resolved.uri_variable("owner"), Some("jo"));
    assert_eq!(resolved.uri_variable("pet"), Some("12"));
    assert_eq!(ctx.uri_variable("pet"), Some("12"));
    assert_eq!(ctx.best_pattern(), Some("/owners/{owner}/pets/{pet:\\d+}"));
    assert_eq!(ctx.lookup_path(), Some("/owners/jo/pets/12"));

    assert_eq!(resolve(&router, &ServerRequest::get("/owners/jo/pets/rex")), None);
}

#[test]
fn test_produces_mismatch_is_not_acceptable() {
    let router = Router::new();
    register(
        &router,
        router.mapping(["/beans"]).produces(["application/json"]).build().unwrap(),
        "beans",
    );

    let request = ServerRequest::get("/beans").with_accept("text/plain");
    let mut ctx = RequestContext::for_request(&request);
    match router.resolve(&request, &mut ctx) {
        Err(NegotiationError::NotAcceptable { producible }) => {
            assert_eq!(producible, vec![MediaType::application_json()]);
        }
        other => panic!("expected NotAcceptable, got {other:?}"),
    }

    let request = ServerRequest::get("/beans").with_accept("application/*");
    assert_eq!(resolve(&router, &request).as_deref(), Some("beans"));
}

#[test]
fn test_produces_hint_set_from_matched_key() {
    let router = Router::new();
    register(
        &router,
        router
            .mapping(["/beans"])
            .produces(["application/json", "application/xml"])
            .build()
            .unwrap(),
        "beans",
    );

    let request = ServerRequest::get("/beans").with_accept("application/json");
    let mut ctx = RequestContext::for_request(&request);
    router.resolve(&request, &mut ctx).unwrap().unwrap();
    assert_eq!(ctx.producible_types(), Some(&[MediaType::application_json()][..]));
}

#[test]
fn test_equal_keys_earlier_registration_wins() {
    let router = Router::new();
    register(&router, router.mapping(["/beans"]).headers(["X-A"]).build().unwrap(), "first");
    register(&router, router.mapping(["/beans"]).headers(["X-B"]).build().unwrap(), "second");

    let request = ServerRequest::get("/beans")
        .with_header("X-A", "1")
        .with_header("X-B", "1");
    assert_eq!(resolve(&router, &request).as_deref(), Some("first"));

    let request = ServerRequest::get("/beans").with_header("X-B", "1");
    assert_eq!(resolve(&router, &request).as_deref(), Some("second"));
}

#[test]
fn test_ambiguous_mapping_rejected() {
    let router = Router::new();
    register(&router, router.mapping(["/beans"]).method(Method::GET).build().unwrap(), "beans");
    let duplicate = router.mapping(["/beans"]).method(Method::GET).build().unwrap();

    let err = router.register_handler(duplicate.clone(), handler("other")).unwrap_err();
    assert!(matches!(err, MappingError::AmbiguousMapping { .. }));
    // Same handler again is a no-op.
    assert!(!router.register_handler(duplicate, handler("beans")).unwrap());
}

#[test]
fn test_trailing_slash_and_suffix_options() {
    let router = Router::new().with_match_options(MatchOptions {
        use_suffix_pattern_match: true,
        ..MatchOptions::default()
    });
    register(&router, router.mapping(["/beans"]).build().unwrap(), "beans");

    assert_eq!(resolve(&router, &ServerRequest::get("/beans/")).as_deref(), Some("beans"));
    assert_eq!(resolve(&router, &ServerRequest::get("/beans.json")).as_deref(), Some("beans"));

    let strict = Router::new().with_match_options(MatchOptions {
        use_trailing_slash_match: false,
        ..MatchOptions::default()
    });
    register(&strict, strict.mapping(["/beans"]).build().unwrap(), "beans");
    assert_eq!(resolve(&strict, &ServerRequest::get("/beans/")), None);
    assert_eq!(resolve(&strict, &ServerRequest::get("/beans.json")), None);
}

#[test]
fn test_empty_path_mapping_matches_root() {
    let router = Router::new();
    register(&router, router.mapping(Vec::<String>::new()).build().unwrap(), "root");
    assert_eq!(resolve(&router, &ServerRequest::get("/")).as_deref(), Some("root"));
}

#[test]
fn test_context_path_removed_before_matching() {
    let router = Router::new();
    register(&router, router.mapping(["/beans"]).build().unwrap(), "beans");
    let request = ServerRequest::get("/app/beans").with_context_path("/app");
    assert_eq!(resolve(&router, &request).as_deref(), Some("beans"));
}

#[test]
fn test_combined_type_and_method_mapping() {
    let router = Router::new();
    let type_key = router.mapping(["/api"]).build().unwrap();
    let method_key = router.mapping(["/beans/{name}"]).method(Method::GET).build().unwrap();
    assert!(router
        .register_combined(&type_key, &method_key, handler("bean"))
        .unwrap());

    let request = ServerRequest::get("/api/beans/b1");
    let mut ctx = RequestContext::for_request(&request);
    let resolved = router.resolve(&request, &mut ctx).unwrap().unwrap();
    assert_eq!(resolved.best_pattern.as_deref(), Some("/api/beans/{name}"));
    assert_eq!(router.routes().len(), 1);
}

#[test]
fn test_registry_unregister_removes_direct_entry() {
    let router = Router::new();
    let key = router.mapping(["/beans"]).build().unwrap();
    register(&router, key.clone(), "beans");
    assert!(router.registry().unregister(&key).is_some());
    assert_eq!(resolve(&router, &ServerRequest::get("/beans")), None);
    assert!(router.registry().is_empty());
}

#[test]
fn test_capture_rest_variable_rejected_at_build() {
    let router = Router::new();
    let err = router.mapping(["/files/{*rest}"]).build().unwrap_err();
    assert!(matches!(err, MappingError::InvalidPattern { .. }));
    assert!(err.to_string().contains("*rest"));

    register(&router, router.mapping(["/files/**"]).build().unwrap(), "files");
    assert_eq!(resolve(&router, &ServerRequest::get("/files/a/b")).as_deref(), Some("files"));
}
