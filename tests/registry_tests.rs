//! Mapping registry behaviour under concurrent registration and resolution.

use std::sync::Arc;
use std::thread;

use http::Method;
use routeforge::error::MappingError;
use routeforge::handler::{HandlerDescriptor, ReturnType};
use routeforge::router::Router;
use routeforge::server::{RequestContext, ServerRequest};

fn descriptor(type_name: &str, method: &str) -> HandlerDescriptor {
    HandlerDescriptor::named(type_name, method, ReturnType::json("Object"))
}

#[test]
fn test_concurrent_registration_and_resolution() {
    let router = Arc::new(Router::new());
    let seed = router.mapping(["/seed"]).build().unwrap();
    router.register_handler(seed, descriptor("SeedController", "seed")).unwrap();

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let router = Arc::clone(&router);
            thread::spawn(move || {
                for i in 0..25 {
                    let key = router
                        .mapping([format!("/w{w}/items/{i}")])
                        .method(Method::GET)
                        .build()
                        .unwrap();
                    assert!(router
                        .register_handler(key, descriptor("ItemController", &format!("item{w}_{i}")))
                        .unwrap());
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let router = Arc::clone(&router);
            thread::spawn(move || {
                for _ in 0..200 {
                    let request = ServerRequest::get("/seed");
                    let mut ctx = RequestContext::for_request(&request);
                    let resolved = router.resolve(&request, &mut ctx).unwrap().unwrap();
                    assert_eq!(resolved.handler.method_name(), "seed");
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }

    assert_eq!(router.registry().len(), 101);
    let request = ServerRequest::get("/w3/items/24");
    let mut ctx = RequestContext::for_request(&request);
    let resolved = router.resolve(&request, &mut ctx).unwrap().unwrap();
    assert_eq!(resolved.handler.method_name(), "item3_24");
}

#[test]
fn test_concurrent_conflicting_registration_has_one_winner() {
    let router = Arc::new(Router::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let router = Arc::clone(&router);
            thread::spawn(move || {
                let key = router.mapping(["/contested"]).build().unwrap();
                router.register_handler(key, descriptor("Contender", &format!("c{i}")))
            })
        })
        .collect();

    let results: Vec<Result<bool, MappingError>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| matches!(r, Ok(true))).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(MappingError::AmbiguousMapping { .. })))
            .count(),
        7
    );
    assert_eq!(router.registry().len(), 1);
}

#[test]
fn test_snapshot_is_stable_while_registering() {
    let router = Router::new();
    let first = router.mapping(["/one"]).build().unwrap();
    router.register_handler(first, descriptor("A", "one")).unwrap();

    let snapshot = router.registry().snapshot();
    let second = router.mapping(["/two"]).build().unwrap();
    router.register_handler(second, descriptor("A", "two")).unwrap();

    assert_eq!(snapshot.len(), 1);
    assert_eq!(router.registry().len(), 2);
}

#[test]
fn test_direct_paths_and_names() {
    let router = Router::new();
    let key = router
        .mapping(["/beans", "/beans/{name}"])
        .build()
        .unwrap();
    let handler = descriptor("BeanController", "beans");
    router.register_handler(key.clone(), handler.clone()).unwrap();

    assert_eq!(router.registry().lookup_by_direct_path("/beans"), vec![key.clone()]);
    assert!(router.registry().lookup_by_direct_path("/beans/{name}").is_empty());
    assert_eq!(router.registry().name_of(&handler), vec!["BC#beans".to_string()]);
    assert_eq!(router.registry().handlers_for_name("BC#beans"), vec![handler]);

    let named = router.mapping(["/other"]).name("beanList").build().unwrap();
    router.register_handler(named, descriptor("BeanController", "other")).unwrap();
    assert_eq!(router.registry().handlers_for_name("beanList").len(), 1);
}

#[test]
fn test_ambiguous_registration_leaves_registry_unchanged() {
    let router = Router::new();
    let key = router.mapping(["/beans"]).method(Method::GET).build().unwrap();
    router.register_handler(key.clone(), descriptor("A", "a")).unwrap();

    let err = router.register_handler(key, descriptor("B", "b")).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Ambiguous mapping"));
    assert!(message.contains("B#b"));
    assert!(message.contains("A#a"));
    assert_eq!(router.registry().len(), 1);
}

#[test]
fn test_pattern_order_does_not_hide_ambiguity() {
    let router = Router::new();
    let first = router.mapping(["/a", "/b"]).build().unwrap();
    let reordered = router.mapping(["/b", "/a"]).build().unwrap();
    assert_eq!(first, reordered);

    router.register_handler(first, descriptor("A", "one")).unwrap();
    let err = router.register_handler(reordered, descriptor("B", "two")).unwrap_err();
    assert!(matches!(err, MappingError::AmbiguousMapping { .. }));
    assert_eq!(router.registry().len(), 1);
}

#[test]
fn test_produces_order_does_not_hide_ambiguity() {
    let router = Router::new();
    let first = router
        .mapping(["/beans"])
        .produces(["application/json", "application/xml"])
        .build()
        .unwrap();
    let reordered = router
        .mapping(["/beans"])
        .produces(["application/xml", "application/json"])
        .build()
        .unwrap();
    assert_eq!(first, reordered);

    router.register_handler(first, descriptor("A", "one")).unwrap();
    let err = router.register_handler(reordered, descriptor("B", "two")).unwrap_err();
    assert!(matches!(err, MappingError::AmbiguousMapping { .. }));
    assert_eq!(router.registry().len(), 1);
}
