//! # Media Module
//!
//! [`MediaType`] is the value type shared by content negotiation, the `produces`
//! routing condition and the converters.
//!
//! ## Semantics
//!
//! - `type/subtype` are case-insensitive and stored lowercase
//! - parameters keep declaration order; `q` is validated to `0.0..=1.0`
//! - a type is *concrete* when neither part is a wildcard; `*+json` style suffix
//!   wildcards count as wildcard subtypes
//! - [`MediaType::includes`] is directional, [`MediaType::is_compatible_with`] is
//!   symmetric
//!
//! ## Ordering
//!
//! [`sort_by_specificity_and_quality`] orders `Accept` entries by quality, then
//! concrete before partial wildcard before `*/*`, then by parameter count (the `q`
//! parameter itself is not counted). Ties keep their input order.
//!
//! ```rust
//! use routeforge::media::{sort_by_specificity_and_quality, MediaType};
//!
//! let mut accept = MediaType::parse_list("*/*;q=0.5, application/json").unwrap();
//! sort_by_specificity_and_quality(&mut accept);
//! assert_eq!(accept[0], MediaType::application_json());
//! ```

mod core;

pub use core::{
    sort_by_specificity_and_quality, MediaType, ALL, APPLICATION_ALL, APPLICATION_JSON,
    APPLICATION_OCTET_STREAM, TEXT_PLAIN,
};
