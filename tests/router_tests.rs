//! Resolution through routers built from route tables.
//!
//! # Key Test Cases
//!
//! - `test_bean_routes`: the `/api/beans` mapping with no verb restriction
//! - `test_wildcard_vs_variable_is_deterministic`: `/users/{id}` beats `/users/*`
//!   on every run
//! - `test_prefix_combines_with_every_route`: table prefix handling

mod common;

use common::fixtures::bean_router;
use http::Method;
use routeforge::config::{DispatchConfig, RouteTable};
use routeforge::router::Router;
use routeforge::server::{RequestContext, ServerRequest};

fn assert_route_match(router: &Router, method: Method, path: &str, expected_handler: &str) {
    let request = ServerRequest::new(method.clone(), path);
    let mut ctx = RequestContext::for_request(&request);
    match router.resolve(&request, &mut ctx).unwrap() {
        Some(resolved) => assert_eq!(
            resolved.handler.to_string(),
            expected_handler,
            "{method} {path} resolved to the wrong handler"
        ),
        None => panic!("{method} {path}: expected {expected_handler}, got no match"),
    }
}

fn assert_no_match(router: &Router, method: Method, path: &str) {
    let request = ServerRequest::new(method.clone(), path);
    let mut ctx = RequestContext::for_request(&request);
    let resolved = router.resolve(&request, &mut ctx).unwrap();
    assert!(resolved.is_none(), "{method} {path} unexpectedly matched");
}

#[test]
fn test_bean_routes() {
    let (router, _) = bean_router(&DispatchConfig::default());

    assert_route_match(&router, Method::GET, "/api/beans", "BeanController#beans");
    assert_route_match(&router, Method::POST, "/api/beans", "BeanController#beans");
    assert_route_match(&router, Method::GET, "/api/beans/", "BeanController#beans");
    assert_no_match(&router, Method::GET, "/api/unknown");
    assert_no_match(&router, Method::GET, "/beans");
}

#[test]
fn test_verb_restricted_routes() {
    let (router, _) = bean_router(&DispatchConfig::default());

    assert_route_match(&router, Method::GET, "/api/beans/b1", "BeanController#bean");
    assert_route_match(&router, Method::HEAD, "/api/beans/b1", "BeanController#bean");
    assert_route_match(&router, Method::DELETE, "/api/beans/b1", "BeanController#deleteBean");
    assert_no_match(&router, Method::PUT, "/api/beans/b1");
}

#[test]
fn test_literal_segment_beats_variable() {
    let (router, _) = bean_router(&DispatchConfig::default());
    assert_route_match(&router, Method::GET, "/api/beans/b1/text", "BeanController#beanText");
}

#[test]
fn test_wildcard_vs_variable_is_deterministic() {
    let (router, _) = bean_router(&DispatchConfig::default());
    for _ in 0..100 {
        assert_route_match(&router, Method::GET, "/api/users/42", "UserController#user");
    }
}

#[test]
fn test_uri_variables_are_decoded() {
    let (router, _) = bean_router(&DispatchConfig::default());
    let request = ServerRequest::get("/api/beans/green%20bean;v=1");
    let mut ctx = RequestContext::for_request(&request);
    let resolved = router.resolve(&request, &mut ctx).unwrap().unwrap();
    assert_eq!(resolved.uri_variable("name"), Some("green bean"));
    assert_eq!(ctx.lookup_path(), Some("/api/beans/green bean"));
}

#[test]
fn test_suffix_matching_from_config() {
    let config = DispatchConfig {
        use_suffix_pattern_match: true,
        ..DispatchConfig::default()
    };
    let (router, _) = bean_router(&config);
    assert_route_match(&router, Method::GET, "/api/beans.json", "BeanController#beans");

    let (strict, _) = bean_router(&DispatchConfig::default());
    assert_no_match(&strict, Method::GET, "/api/beans.json");
}

#[test]
fn test_prefix_combines_with_every_route() {
    let (router, _) = bean_router(&DispatchConfig::default());
    let routes = router.routes();
    assert_eq!(routes.len(), 6);
    for (key, _) in &routes {
        assert!(key.contains("/api/"), "route {key} is missing the prefix");
    }
}

#[test]
fn test_header_conditions_from_table() {
    let table = RouteTable::from_yaml_str(
        r#"
routes:
  - handler: ReportController#v1
    paths: [/report]
  - handler: ReportController#v2
    paths: [/report]
    headers: ["X-Version=2"]
"#,
    )
    .unwrap();
    let router = Router::new();
    table.register(&router).unwrap();

    assert_route_match(&router, Method::GET, "/report", "ReportController#v1");
    let request = ServerRequest::get("/report").with_header("X-Version", "2");
    let mut ctx = RequestContext::for_request(&request);
    let resolved = router.resolve(&request, &mut ctx).unwrap().unwrap();
    assert_eq!(resolved.handler.to_string(), "ReportController#v2");
}
