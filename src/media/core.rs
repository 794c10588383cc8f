use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::NegotiationError;

const WILDCARD: &str = "*";
const PARAM_QUALITY: &str = "q";
const PARAM_CHARSET: &str = "charset";

/// `*/*`
pub static ALL: Lazy<MediaType> = Lazy::new(|| MediaType::new_unchecked(WILDCARD, WILDCARD));
/// `application/json`
pub static APPLICATION_JSON: Lazy<MediaType> =
    Lazy::new(|| MediaType::new_unchecked("application", "json"));
/// `application/*`
pub static APPLICATION_ALL: Lazy<MediaType> =
    Lazy::new(|| MediaType::new_unchecked("application", WILDCARD));
/// `application/octet-stream`
pub static APPLICATION_OCTET_STREAM: Lazy<MediaType> =
    Lazy::new(|| MediaType::new_unchecked("application", "octet-stream"));
/// `text/plain`
pub static TEXT_PLAIN: Lazy<MediaType> = Lazy::new(|| MediaType::new_unchecked("text", "plain"));

/// A parsed media type: `type/subtype;param=value`.
///
/// Type, subtype and parameter names are stored lowercase; parameter values keep
/// their original spelling. Parameter order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    main_type: String,
    subtype: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    /// Create a media type without parameters.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationError::InvalidMediaType`] when either part is not a
    /// valid token or the combination is illegal (`*/json`).
    pub fn new(main_type: &str, subtype: &str) -> Result<Self, NegotiationError> {
        let raw = format!("{main_type}/{subtype}");
        check_token(&raw, main_type, false)?;
        check_token(&raw, subtype, true)?;
        let media = Self::new_unchecked(main_type, subtype);
        if media.main_type == WILDCARD && media.subtype != WILDCARD {
            return Err(invalid(&raw, "wildcard type is legal only in '*/*' (all media types)"));
        }
        Ok(media)
    }

    fn new_unchecked(main_type: &str, subtype: &str) -> Self {
        Self {
            main_type: main_type.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// `*/*`
    #[must_use]
    pub fn all() -> Self {
        ALL.clone()
    }

    /// `application/json`
    #[must_use]
    pub fn application_json() -> Self {
        APPLICATION_JSON.clone()
    }

    /// `application/octet-stream`
    #[must_use]
    pub fn application_octet_stream() -> Self {
        APPLICATION_OCTET_STREAM.clone()
    }

    /// `text/plain`
    #[must_use]
    pub fn text_plain() -> Self {
        TEXT_PLAIN.clone()
    }

    /// Parse a single media type.
    ///
    /// A bare `*` is accepted as `*/*`, matching what many user agents send.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationError::InvalidMediaType`] for empty input, a missing
    /// `/`, illegal token characters, `*/subtype`, or a quality factor outside
    /// `0.0..=1.0`.
    pub fn parse(value: &str) -> Result<Self, NegotiationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(invalid(value, "'mimeType' must not be empty"));
        }
        let mut parts = split_unquoted(trimmed, ';').into_iter();
        let full_type = parts.next().map(str::trim).unwrap_or_default();
        let full_type = if full_type == WILDCARD { "*/*" } else { full_type };
        let (main_type, subtype) = full_type
            .split_once('/')
            .ok_or_else(|| invalid(value, "does not contain '/'"))?;
        if main_type.is_empty() {
            return Err(invalid(value, "'type' must not be empty"));
        }
        if subtype.is_empty() {
            return Err(invalid(value, "'subtype' must not be empty"));
        }
        let mut media = Self::new(main_type, subtype).map_err(|_| {
            invalid(
                value,
                if main_type == WILDCARD {
                    "wildcard type is legal only in '*/*' (all media types)"
                } else {
                    "type and subtype must be valid tokens"
                },
            )
        })?;
        for param in parts {
            let Some((name, param_value)) = param.split_once('=') else {
                continue;
            };
            let name = name.trim();
            let param_value = param_value.trim();
            if name.is_empty() {
                continue;
            }
            check_token(value, name, false)?;
            media = media.set_param(name, param_value, value)?;
        }
        Ok(media)
    }

    /// Parse a comma-separated list such as an `Accept` header value.
    ///
    /// Empty elements are skipped, so `"text/html,,"` yields one entry.
    ///
    /// # Errors
    ///
    /// Fails on the first element that does not parse.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, NegotiationError> {
        split_unquoted(value, ',')
            .into_iter()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Return a copy with the given parameter set (replacing an existing value).
    ///
    /// # Errors
    ///
    /// Rejects an out-of-range or non-numeric `q`.
    pub fn with_param(self, name: &str, value: &str) -> Result<Self, NegotiationError> {
        let raw = format!("{self};{name}={value}");
        check_token(&raw, name, false)?;
        self.set_param(name, value, &raw)
    }

    /// Return a copy with `charset` set.
    #[must_use]
    pub fn with_charset(mut self, charset: &str) -> Self {
        self.put_param(PARAM_CHARSET, charset);
        self
    }

    fn set_param(mut self, name: &str, value: &str, raw: &str) -> Result<Self, NegotiationError> {
        let name = name.to_ascii_lowercase();
        if name == PARAM_QUALITY {
            let quality: f64 = unquote(value)
                .parse()
                .map_err(|_| invalid(raw, "invalid quality value"))?;
            if !(0.0..=1.0).contains(&quality) {
                return Err(invalid(raw, "invalid quality value, should be between 0.0 and 1.0"));
            }
        }
        self.put_param(&name, value);
        Ok(self)
    }

    fn put_param(&mut self, name: &str, value: &str) {
        match self.params.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.params.push((name.to_string(), value.to_string())),
        }
    }

    /// The primary type, e.g. `application`.
    #[must_use]
    pub fn main_type(&self) -> &str {
        &self.main_type
    }

    /// The subtype, e.g. `json` or `*+json`.
    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Structured syntax suffix of the subtype (`hal+json` -> `json`).
    #[must_use]
    pub fn subtype_suffix(&self) -> Option<&str> {
        self.subtype.rsplit_once('+').map(|(_, suffix)| suffix)
    }

    /// Parameter value by (case-insensitive) name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Declared charset, unquoted.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.param(PARAM_CHARSET).map(unquote)
    }

    /// Quality factor; `1.0` when absent.
    #[must_use]
    pub fn quality(&self) -> f64 {
        self.param(PARAM_QUALITY)
            .and_then(|q| unquote(q).parse().ok())
            .unwrap_or(1.0)
    }

    #[must_use]
    pub fn is_wildcard_type(&self) -> bool {
        self.main_type == WILDCARD
    }

    /// `*` or a suffix wildcard such as `*+json`.
    #[must_use]
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == WILDCARD || self.subtype.starts_with("*+")
    }

    /// Neither the type nor the subtype is a wildcard.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        !self.is_wildcard_type() && !self.is_wildcard_subtype()
    }

    /// Whether `self` is `*/*` or `application/*`, the two ranges that fall back to
    /// `application/octet-stream` when nothing concrete was negotiated.
    #[must_use]
    pub fn is_all_or_application_all(&self) -> bool {
        self.same_type_and_subtype(&ALL) || self.same_type_and_subtype(&APPLICATION_ALL)
    }

    /// Type and subtype equality, ignoring parameters.
    #[must_use]
    pub fn same_type_and_subtype(&self, other: &MediaType) -> bool {
        self.main_type == other.main_type && self.subtype == other.subtype
    }

    /// Whether this media type includes `other`. `text/*` includes `text/plain`,
    /// `application/*+json` includes `application/hal+json`; not symmetric.
    #[must_use]
    pub fn includes(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() {
            return true;
        }
        if self.main_type != other.main_type {
            return false;
        }
        if self.subtype == other.subtype {
            return true;
        }
        if !self.is_wildcard_subtype() {
            return false;
        }
        match self.subtype.rsplit_once('+') {
            None => true,
            Some((prefix, suffix)) => {
                prefix == WILDCARD && other.subtype_suffix().is_some_and(|other| other == suffix)
            }
        }
    }

    /// Symmetric compatibility: either side may include the other.
    #[must_use]
    pub fn is_compatible_with(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() || other.is_wildcard_type() {
            return true;
        }
        if self.main_type != other.main_type {
            return false;
        }
        if self.subtype == other.subtype {
            return true;
        }
        if !self.is_wildcard_subtype() && !other.is_wildcard_subtype() {
            return false;
        }
        if self.subtype == WILDCARD || other.subtype == WILDCARD {
            return true;
        }
        let this_suffix = self.subtype_suffix();
        let other_suffix = other.subtype_suffix();
        if self.is_wildcard_subtype() {
            if let Some(suffix) = this_suffix {
                return suffix == other.subtype || Some(suffix) == other_suffix;
            }
        }
        if other.is_wildcard_subtype() {
            if let Some(suffix) = other_suffix {
                return self.subtype == suffix || Some(suffix) == this_suffix;
            }
        }
        false
    }

    /// A copy carrying `other`'s `q` parameter, or an unchanged copy if `other` has none.
    #[must_use]
    pub fn copy_quality_value(&self, other: &MediaType) -> Self {
        let mut copy = self.clone();
        if let Some(q) = other.param(PARAM_QUALITY) {
            copy.put_param(PARAM_QUALITY, q);
        }
        copy
    }

    /// A copy without the `q` parameter.
    #[must_use]
    pub fn remove_quality_value(&self) -> Self {
        let mut copy = self.clone();
        copy.params.retain(|(key, _)| key != PARAM_QUALITY);
        copy
    }

    fn wildcard_rank(&self) -> u8 {
        if self.is_wildcard_type() {
            2
        } else if self.is_wildcard_subtype() {
            1
        } else {
            0
        }
    }

    fn param_count_without_quality(&self) -> usize {
        self.params
            .iter()
            .filter(|(key, _)| key != PARAM_QUALITY)
            .count()
    }

    /// Pairwise specificity: `Less` when `self` is more specific than `other`.
    ///
    /// Types with different main types (or different concrete subtypes) are
    /// unordered and compare `Equal`.
    #[must_use]
    pub fn specificity_cmp(&self, other: &MediaType) -> Ordering {
        match (self.is_wildcard_type(), other.is_wildcard_type()) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        if self.main_type != other.main_type {
            return Ordering::Equal;
        }
        match (self.is_wildcard_subtype(), other.is_wildcard_subtype()) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        if self.subtype != other.subtype {
            return Ordering::Equal;
        }
        other
            .quality()
            .total_cmp(&self.quality())
            .then_with(|| other.params.len().cmp(&self.params.len()))
    }

    /// The more specific of an acceptable and a producible type, carrying the
    /// acceptable type's quality factor.
    #[must_use]
    pub fn most_specific(acceptable: &MediaType, producible: &MediaType) -> MediaType {
        let producible = producible.copy_quality_value(acceptable);
        if acceptable.specificity_cmp(&producible) == Ordering::Greater {
            producible
        } else {
            acceptable.clone()
        }
    }
}

/// Sort by quality (descending), then concrete before wildcard subtype before
/// `*/*`, then more parameters first. The sort is stable, so entries that tie on
/// all three keep their original relative order.
pub fn sort_by_specificity_and_quality(media_types: &mut [MediaType]) {
    media_types.sort_by(|a, b| {
        b.quality()
            .total_cmp(&a.quality())
            .then_with(|| a.wildcard_rank().cmp(&b.wildcard_rank()))
            .then_with(|| {
                b.param_count_without_quality()
                    .cmp(&a.param_count_without_quality())
            })
    });
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.subtype)?;
        for (name, value) in &self.params {
            write!(f, ";{name}={value}")?;
        }
        Ok(())
    }
}

impl FromStr for MediaType {
    type Err = NegotiationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for MediaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn invalid(value: &str, reason: &str) -> NegotiationError {
    NegotiationError::InvalidMediaType {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

fn check_token(raw: &str, token: &str, allow_suffix_wildcard: bool) -> Result<(), NegotiationError> {
    if token.is_empty() || !token.chars().all(is_token_char) {
        return Err(invalid(raw, &format!("invalid token '{token}'")));
    }
    if !allow_suffix_wildcard && token.len() > 1 && token.contains('*') {
        return Err(invalid(raw, &format!("invalid token '{token}'")));
    }
    Ok(())
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Split on `separator` outside double-quoted strings.
fn split_unquoted(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut escaped = false;
    let mut start = 0;
    for (idx, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            c if c == separator && !quoted => {
                parts.push(&value[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}
