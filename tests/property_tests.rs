//! Property tests for ordering and indexing invariants.

use std::cmp::Ordering;

use proptest::prelude::*;
use routeforge::converter::{JsonConverter, MessageConverter};
use routeforge::handler::{HandlerDescriptor, ReturnType, ReturnValue};
use routeforge::media::{sort_by_specificity_and_quality, MediaType};
use routeforge::router::{MatchContext, PatternComparator, Router};
use routeforge::server::{InputMessage, OutputMessage, RequestContext, ServerRequest, ServerResponse};
use serde_json::json;

fn segment() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("users"),
        Just("42"),
        Just("*"),
        Just("{id}"),
        Just("{id:\\d+}"),
        Just("**"),
        Just("u*"),
    ]
}

fn pattern() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..4).prop_map(|segments| format!("/{}", segments.join("/")))
}

fn media_type() -> impl Strategy<Value = MediaType> {
    let base = prop_oneof![
        Just("*/*"),
        Just("application/*"),
        Just("application/json"),
        Just("application/*+json"),
        Just("text/plain"),
        Just("text/*"),
        Just("text/plain;charset=UTF-8"),
    ];
    let quality = prop_oneof![Just(None), Just(Some("1")), Just(Some("0.5")), Just(Some("0.1"))];
    (base, quality).prop_map(|(base, q)| {
        let media = MediaType::parse(base).unwrap();
        match q {
            Some(q) => media.with_param("q", q).unwrap(),
            None => media,
        }
    })
}

proptest! {
    #[test]
    fn pattern_comparator_is_a_strict_weak_order(
        a in pattern(),
        b in pattern(),
        c in pattern(),
        path in prop_oneof![Just("/users/42"), Just("/users/42/x"), Just("/u/1")],
    ) {
        let comparator = PatternComparator::new(path);
        // Antisymmetry
        prop_assert_eq!(comparator.compare(&a, &b), comparator.compare(&b, &a).reverse());
        prop_assert_eq!(comparator.compare(&a, &a), Ordering::Equal);
        // Transitivity
        if comparator.compare(&a, &b) != Ordering::Greater && comparator.compare(&b, &c) != Ordering::Greater {
            prop_assert_ne!(comparator.compare(&a, &c), Ordering::Greater);
        }
    }

    #[test]
    fn media_type_sort_is_stable(mut types in prop::collection::vec(media_type(), 0..10)) {
        sort_by_specificity_and_quality(&mut types);
        let once = types.clone();
        sort_by_specificity_and_quality(&mut types);
        prop_assert_eq!(types, once);
    }

    #[test]
    fn direct_lookup_agrees_with_full_scan(
        literals in prop::collection::btree_set("[a-c]{1,2}(/[a-c]{1,2}){0,2}", 1..8),
    ) {
        let router = Router::new();
        let patterns = ["/{x}", "/a/{y}", "/*/b", "/**"];
        for (i, pattern) in patterns.iter().enumerate() {
            let key = router.mapping([*pattern]).build().unwrap();
            router
                .register_handler(key, HandlerDescriptor::named("P", &format!("p{i}"), ReturnType::Unit))
                .unwrap();
        }
        for literal in &literals {
            let key = router.mapping([format!("/{literal}")]).build().unwrap();
            router
                .register_handler(key, HandlerDescriptor::named("L", literal, ReturnType::Unit))
                .unwrap();
        }

        for literal in &literals {
            let path = format!("/{literal}");
            let request = ServerRequest::get(&path);
            let mut ctx = RequestContext::for_request(&request);
            let resolved = router.resolve(&request, &mut ctx).unwrap().unwrap();

            let match_ctx = MatchContext::new(&request, &path, router.negotiation());
            let mut scanned: Vec<_> = router
                .registry()
                .all_registrations()
                .into_iter()
                .filter_map(|r| r.key().get_matching_condition(&match_ctx).map(|k| (k, r)))
                .collect();
            scanned.sort_by(|(a, ra), (b, rb)| {
                a.compare_to(b, &match_ctx).then_with(|| ra.sequence().cmp(&rb.sequence()))
            });
            prop_assert_eq!(&resolved.handler, scanned[0].1.handler());
            prop_assert_eq!(resolved.handler.method_name(), literal.as_str());
        }
    }

    #[test]
    fn json_write_then_read_preserves_value(
        names in prop::collection::vec("[a-zA-Z0-9 ]{0,12}", 0..5),
        count in any::<i64>(),
        flag in any::<bool>(),
    ) {
        let converter = JsonConverter::new();
        let value = ReturnValue::Json(json!({"names": names, "count": count, "flag": flag}));
        let declared = ReturnType::json("Summary");

        let mut response = ServerResponse::new();
        {
            let mut output = OutputMessage::new(&mut response);
            converter
                .write(&value, &declared, Some(&MediaType::application_json()), &mut output)
                .unwrap();
        }
        let input = InputMessage::new(response.headers(), response.body_bytes());
        let read = converter.read(&declared, &input).unwrap();
        prop_assert_eq!(read, value);
    }
}
