//! Routing keys and their request conditions.
//!
//! A [`RoutingKey`] bundles the conditions a request must meet to reach a handler:
//! path patterns, HTTP verbs, a `produces` media-type list and an optional custom
//! condition. For a concrete request, [`RoutingKey::get_matching_condition`] narrows
//! a key to the parts that matched, and [`RoutingKey::compare_to`] orders two such
//! matched keys from most to least specific.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use http::Method;
use once_cell::unsync::OnceCell;

use super::matcher::{PathMatcher, PathPattern, PatternComparator};
use crate::error::{MappingError, NegotiationError};
use crate::media::MediaType;
use crate::negotiation::ContentNegotiationManager;
use crate::server::ServerRequest;

/// Options applied to every pattern of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOptions {
    /// `/users` also matches `/users.json` (pattern `/users.*`).
    pub use_suffix_pattern_match: bool,
    /// `/users` also matches `/users/`.
    pub use_trailing_slash_match: bool,
    /// Narrows suffix matching to these extensions (stored with a leading dot).
    pub file_extensions: Vec<String>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            use_suffix_pattern_match: false,
            use_trailing_slash_match: true,
            file_extensions: Vec::new(),
        }
    }
}

impl MatchOptions {
    /// Set the suffix extension list; a missing leading dot is added.
    #[must_use]
    pub fn with_file_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.file_extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.as_ref();
                if ext.starts_with('.') {
                    ext.to_string()
                } else {
                    format!(".{ext}")
                }
            })
            .collect();
        self
    }
}

/// An application-defined condition evaluated alongside the built-in ones.
pub trait CustomCondition: Send + Sync + fmt::Debug {
    fn matches(&self, request: &ServerRequest) -> bool;

    /// Higher is more specific.
    fn specificity(&self) -> usize;

    /// Merge with a method-level condition.
    fn combine(&self, other: &Arc<dyn CustomCondition>) -> Arc<dyn CustomCondition>;

    /// Canonical text form; used for equality, hashing and display.
    fn content(&self) -> String;

    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderExpression {
    name: String,
    value: Option<String>,
    negated: bool,
}

impl HeaderExpression {
    fn parse(expression: &str) -> Result<Self, MappingError> {
        let expression = expression.trim();
        let (name, value, negated) = if let Some((name, value)) = expression.split_once("!=") {
            (name, Some(value), true)
        } else if let Some((name, value)) = expression.split_once('=') {
            (name, Some(value), false)
        } else if let Some(name) = expression.strip_prefix('!') {
            (name, None, true)
        } else {
            (expression, None, false)
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(MappingError::InvalidCondition {
                condition: expression.to_string(),
                reason: "header name must not be empty".to_string(),
            });
        }
        Ok(Self {
            name: name.to_ascii_lowercase(),
            value: value.map(|v| v.trim().to_string()),
            negated,
        })
    }

    fn matches(&self, request: &ServerRequest) -> bool {
        let mut values = request.header_values(&self.name);
        let found = match &self.value {
            Some(expected) => values.any(|actual| actual == expected),
            None => values.next().is_some(),
        };
        found != self.negated
    }
}

impl fmt::Display for HeaderExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, self.negated) {
            (Some(value), true) => write!(f, "{}!={value}", self.name),
            (Some(value), false) => write!(f, "{}={value}", self.name),
            (None, true) => write!(f, "!{}", self.name),
            (None, false) => f.write_str(&self.name),
        }
    }
}

/// Request header condition: `X-Api`, `!X-Api`, `X-Api=2`, `X-Api!=2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCondition {
    expressions: Vec<HeaderExpression>,
}

impl HeaderCondition {
    /// # Errors
    ///
    /// Fails on an expression without a header name.
    pub fn parse<I, S>(expressions: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed: Vec<HeaderExpression> = Vec::new();
        for expression in expressions {
            let expression = HeaderExpression::parse(expression.as_ref())?;
            if !parsed.contains(&expression) {
                parsed.push(expression);
            }
        }
        Ok(Self {
            expressions: parsed,
        })
    }
}

impl CustomCondition for HeaderCondition {
    fn matches(&self, request: &ServerRequest) -> bool {
        self.expressions.iter().all(|expr| expr.matches(request))
    }

    fn specificity(&self) -> usize {
        self.expressions.len()
    }

    fn combine(&self, other: &Arc<dyn CustomCondition>) -> Arc<dyn CustomCondition> {
        // Foreign condition types cannot be merged; the method level wins.
        let Some(other_headers) = other.as_any().downcast_ref::<HeaderCondition>() else {
            return Arc::clone(other);
        };
        let mut expressions = self.expressions.clone();
        for expression in &other_headers.expressions {
            if !expressions.contains(expression) {
                expressions.push(expression.clone());
            }
        }
        Arc::new(HeaderCondition { expressions })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn content(&self) -> String {
        let rendered: Vec<String> = self.expressions.iter().map(ToString::to_string).collect();
        rendered.join(" && ")
    }
}

/// One declared pattern plus its pre-compiled suffix and trailing-slash variants.
#[derive(Debug, Clone)]
struct PatternEntry {
    pattern: Arc<PathPattern>,
    suffix: Option<Arc<PathPattern>>,
    extensions: Vec<Arc<PathPattern>>,
    trailing_slash: Option<Arc<PathPattern>>,
}

impl PatternEntry {
    fn compile(source: &str, options: &MatchOptions) -> Result<Self, MappingError> {
        let pattern = Arc::new(PathPattern::parse(source)?);
        let mut suffix = None;
        let mut extensions = Vec::new();
        if options.use_suffix_pattern_match {
            extensions = options
                .file_extensions
                .iter()
                .map(|ext| PathPattern::parse(&format!("{source}{ext}")).map(Arc::new))
                .collect::<Result<_, _>>()?;
            if !source.contains('.') {
                suffix = Some(Arc::new(PathPattern::parse(&format!("{source}.*"))?));
            }
        }
        let trailing_slash = if options.use_trailing_slash_match && !source.ends_with('/') {
            Some(Arc::new(PathPattern::parse(&format!("{source}/"))?))
        } else {
            None
        };
        Ok(Self {
            pattern,
            suffix,
            extensions,
            trailing_slash,
        })
    }

    fn matched(pattern: Arc<PathPattern>) -> Self {
        Self {
            pattern,
            suffix: None,
            extensions: Vec::new(),
            trailing_slash: None,
        }
    }

    fn matching_pattern(&self, lookup_path: &str, options: &MatchOptions) -> Option<Arc<PathPattern>> {
        if self.pattern.as_str() == lookup_path {
            return Some(Arc::clone(&self.pattern));
        }
        if options.use_suffix_pattern_match {
            if !options.file_extensions.is_empty() && lookup_path.contains('.') {
                if let Some(ext) = self.extensions.iter().find(|p| p.matches(lookup_path)) {
                    return Some(Arc::clone(ext));
                }
            } else if let Some(suffix) = self.suffix.as_ref().filter(|p| p.matches(lookup_path)) {
                return Some(Arc::clone(suffix));
            }
        }
        if self.pattern.matches(lookup_path) {
            return Some(Arc::clone(&self.pattern));
        }
        self.trailing_slash
            .as_ref()
            .filter(|p| p.matches(lookup_path))
            .map(Arc::clone)
    }
}

/// Per-request inputs for matching and comparing keys.
///
/// Acceptable media types are resolved at most once, and only if some key
/// declares `produces`.
pub struct MatchContext<'a> {
    request: &'a ServerRequest,
    lookup_path: &'a str,
    negotiation: &'a ContentNegotiationManager,
    acceptable: OnceCell<Option<Vec<MediaType>>>,
}

impl<'a> MatchContext<'a> {
    #[must_use]
    pub fn new(
        request: &'a ServerRequest,
        lookup_path: &'a str,
        negotiation: &'a ContentNegotiationManager,
    ) -> Self {
        Self {
            request,
            lookup_path,
            negotiation,
            acceptable: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn request(&self) -> &ServerRequest {
        self.request
    }

    #[must_use]
    pub fn lookup_path(&self) -> &str {
        self.lookup_path
    }

    /// Acceptable types, or `None` when they could not be determined.
    #[must_use]
    pub fn acceptable(&self) -> Option<&[MediaType]> {
        self.acceptable
            .get_or_init(|| {
                self.negotiation
                    .resolve_media_types(self.request, Some(self.lookup_path))
                    .ok()
            })
            .as_deref()
    }

    /// The error behind an undeterminable acceptable list.
    #[must_use]
    pub fn acceptable_error(&self) -> Option<NegotiationError> {
        self.negotiation
            .resolve_media_types(self.request, Some(self.lookup_path))
            .err()
    }
}

struct KeyInner {
    patterns: Vec<PatternEntry>,
    methods: Vec<Method>,
    produces: Vec<MediaType>,
    custom: Option<Arc<dyn CustomCondition>>,
    name: Option<String>,
    options: MatchOptions,
}

/// Immutable routing key. Cheap to clone.
///
/// Equality and hashing cover patterns, verbs, produced types and the custom
/// condition's content, but not the name.
#[derive(Clone)]
pub struct RoutingKey {
    inner: Arc<KeyInner>,
}

/// Builder for [`RoutingKey`].
#[derive(Debug, Default)]
pub struct RoutingKeyBuilder {
    paths: Vec<String>,
    methods: Vec<Method>,
    produces: Vec<String>,
    headers: Vec<String>,
    custom: Option<Arc<dyn CustomCondition>>,
    name: Option<String>,
    options: MatchOptions,
}

impl RoutingKeyBuilder {
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn methods<I: IntoIterator<Item = Method>>(mut self, methods: I) -> Self {
        self.methods.extend(methods);
        self
    }

    #[must_use]
    pub fn produces<I, S>(mut self, media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.produces
            .extend(media_types.into_iter().map(|m| m.as_ref().to_string()));
        self
    }

    /// Header expressions, combined into a [`HeaderCondition`].
    #[must_use]
    pub fn headers<I, S>(mut self, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.headers
            .extend(expressions.into_iter().map(|h| h.as_ref().to_string()));
        self
    }

    #[must_use]
    pub fn custom(mut self, condition: Arc<dyn CustomCondition>) -> Self {
        self.custom = Some(condition);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// # Errors
    ///
    /// Fails on a malformed pattern, `produces` media type or header expression.
    pub fn build(self) -> Result<RoutingKey, MappingError> {
        let mut sources: Vec<String> = Vec::new();
        for path in self.paths.iter().filter(|p| !p.trim().is_empty()) {
            let path = if path.starts_with('/') {
                path.clone()
            } else {
                format!("/{path}")
            };
            if !sources.contains(&path) {
                sources.push(path);
            }
        }
        if sources.is_empty() {
            sources.push(String::new());
        }
        let patterns = sources
            .iter()
            .map(|source| PatternEntry::compile(source, &self.options))
            .collect::<Result<Vec<_>, _>>()?;

        let mut produces: Vec<MediaType> = Vec::new();
        for value in &self.produces {
            let media = MediaType::parse(value).map_err(|err| MappingError::InvalidCondition {
                condition: format!("produces={value}"),
                reason: err.to_string(),
            })?;
            if !produces.contains(&media) {
                produces.push(media);
            }
        }

        let mut methods: Vec<Method> = Vec::new();
        for method in self.methods {
            if !methods.contains(&method) {
                methods.push(method);
            }
        }

        let custom = match (self.headers.is_empty(), self.custom) {
            (true, custom) => custom,
            (false, custom) => {
                let headers: Arc<dyn CustomCondition> = Arc::new(HeaderCondition::parse(&self.headers)?);
                Some(match custom {
                    Some(custom) => headers.combine(&custom),
                    None => headers,
                })
            }
        };

        Ok(RoutingKey {
            inner: Arc::new(KeyInner {
                patterns,
                methods,
                produces,
                custom,
                name: self.name,
                options: self.options,
            }),
        })
    }
}

impl RoutingKey {
    /// Start a key for the given path patterns. No patterns means the empty-path
    /// mapping, which matches `/` when trailing-slash matching is on.
    pub fn builder<I, S>(paths: I) -> RoutingKeyBuilder
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RoutingKeyBuilder {
            paths: paths.into_iter().map(|p| p.as_ref().to_string()).collect(),
            ..RoutingKeyBuilder::default()
        }
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.inner.patterns.iter().map(|entry| entry.pattern.as_str())
    }

    /// The first (for a matched key: best) pattern.
    #[must_use]
    pub fn best_pattern(&self) -> Option<&PathPattern> {
        self.inner.patterns.first().map(|entry| entry.pattern.as_ref())
    }

    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.inner.methods
    }

    #[must_use]
    pub fn produces(&self) -> &[MediaType] {
        &self.inner.produces
    }

    #[must_use]
    pub fn custom(&self) -> Option<&Arc<dyn CustomCondition>> {
        self.inner.custom.as_ref()
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    #[must_use]
    pub fn options(&self) -> &MatchOptions {
        &self.inner.options
    }

    /// Patterns without wildcards or variables, usable as exact lookup keys.
    #[must_use]
    pub fn direct_paths(&self) -> Vec<String> {
        self.inner
            .patterns
            .iter()
            .filter(|entry| !entry.pattern.is_pattern())
            .map(|entry| entry.pattern.as_str().to_string())
            .collect()
    }

    fn with_parts(
        &self,
        patterns: Vec<PatternEntry>,
        methods: Vec<Method>,
        produces: Vec<MediaType>,
    ) -> Self {
        Self {
            inner: Arc::new(KeyInner {
                patterns,
                methods,
                produces,
                custom: self.inner.custom.clone(),
                name: self.inner.name.clone(),
                options: self.inner.options.clone(),
            }),
        }
    }

    /// Narrow this key to what matches the request, or `None`.
    ///
    /// Verbs narrow to the request verb (`HEAD` is served by `GET` mappings),
    /// `produces` narrows to types compatible with the acceptable list, patterns
    /// narrow to the matching variants sorted best first.
    #[must_use]
    pub fn get_matching_condition(&self, ctx: &MatchContext<'_>) -> Option<RoutingKey> {
        let methods = self.match_methods(ctx.request().method())?;
        if let Some(custom) = &self.inner.custom {
            if !custom.matches(ctx.request()) {
                return None;
            }
        }
        let produces = self.match_produces(ctx)?;
        let patterns = self.match_patterns(ctx.lookup_path())?;
        Some(self.with_parts(patterns, methods, produces))
    }

    /// Like [`get_matching_condition`](Self::get_matching_condition) but ignoring
    /// `produces`. Used to tell "not acceptable" apart from "no handler".
    #[must_use]
    pub(crate) fn matches_ignoring_produces(&self, ctx: &MatchContext<'_>) -> bool {
        self.match_methods(ctx.request().method()).is_some()
            && self
                .inner
                .custom
                .as_ref()
                .map_or(true, |custom| custom.matches(ctx.request()))
            && self.match_patterns(ctx.lookup_path()).is_some()
    }

    fn match_methods(&self, method: &Method) -> Option<Vec<Method>> {
        let declared = &self.inner.methods;
        if declared.is_empty() {
            return Some(Vec::new());
        }
        if declared.contains(method) {
            return Some(vec![method.clone()]);
        }
        if *method == Method::HEAD && declared.contains(&Method::GET) {
            return Some(vec![Method::GET]);
        }
        None
    }

    fn match_produces(&self, ctx: &MatchContext<'_>) -> Option<Vec<MediaType>> {
        let declared = &self.inner.produces;
        if declared.is_empty() {
            return Some(Vec::new());
        }
        let acceptable = ctx.acceptable()?;
        let matched: Vec<MediaType> = declared
            .iter()
            .filter(|produced| acceptable.iter().any(|accept| produced.is_compatible_with(accept)))
            .cloned()
            .collect();
        (!matched.is_empty()).then_some(matched)
    }

    fn match_patterns(&self, lookup_path: &str) -> Option<Vec<PatternEntry>> {
        let options = &self.inner.options;
        let mut matched: Vec<Arc<PathPattern>> = self
            .inner
            .patterns
            .iter()
            .filter_map(|entry| entry.matching_pattern(lookup_path, options))
            .collect();
        if matched.is_empty() {
            return None;
        }
        if matched.len() > 1 {
            let comparator = PatternComparator::new(lookup_path);
            matched.sort_by(|a, b| comparator.compare_patterns(a, b));
        }
        Some(matched.into_iter().map(PatternEntry::matched).collect())
    }

    /// Order two keys already narrowed by [`get_matching_condition`](Self::get_matching_condition).
    /// `Less` means `self` is the better match.
    #[must_use]
    pub fn compare_to(&self, other: &RoutingKey, ctx: &MatchContext<'_>) -> Ordering {
        self.compare_patterns(other, ctx.lookup_path())
            .then_with(|| other.inner.methods.len().cmp(&self.inner.methods.len()))
            .then_with(|| self.compare_custom(other))
            .then_with(|| self.compare_produces(other, ctx))
    }

    fn compare_patterns(&self, other: &RoutingKey, lookup_path: &str) -> Ordering {
        let comparator = PatternComparator::new(lookup_path);
        let mut mine = self.inner.patterns.iter();
        let mut theirs = other.inner.patterns.iter();
        loop {
            match (mine.next(), theirs.next()) {
                (Some(a), Some(b)) => {
                    let result = comparator.compare_patterns(&a.pattern, &b.pattern);
                    if result != Ordering::Equal {
                        return result;
                    }
                }
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => return Ordering::Equal,
            }
        }
    }

    fn compare_custom(&self, other: &RoutingKey) -> Ordering {
        match (&self.inner.custom, &other.inner.custom) {
            (Some(a), Some(b)) => b.specificity().cmp(&a.specificity()),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    fn compare_produces(&self, other: &RoutingKey, ctx: &MatchContext<'_>) -> Ordering {
        if self.inner.produces.is_empty() && other.inner.produces.is_empty() {
            return Ordering::Equal;
        }
        let Some(acceptable) = ctx.acceptable() else {
            return Ordering::Equal;
        };
        let all = [MediaType::all()];
        let expressions = |key: &RoutingKey| -> Vec<MediaType> {
            if key.inner.produces.is_empty() {
                all.to_vec()
            } else {
                key.inner.produces.clone()
            }
        };
        let mine = expressions(self);
        let theirs = expressions(other);
        for accept in acceptable {
            let equal = |list: &[MediaType]| list.iter().any(|m| m.same_type_and_subtype(accept));
            match (equal(&mine), equal(&theirs)) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
            let included = |list: &[MediaType]| list.iter().any(|m| accept.includes(m));
            match (included(&mine), included(&theirs)) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
        }
        Ordering::Equal
    }

    /// Merge a type-level key (`self`) with a method-level key.
    ///
    /// Patterns combine pairwise through `matcher`, verbs union, method-level
    /// `produces` override, custom conditions merge, names join with `#`.
    ///
    /// # Errors
    ///
    /// Propagates pattern combination and compilation failures.
    pub fn combine(&self, other: &RoutingKey, matcher: &dyn PathMatcher) -> Result<RoutingKey, MappingError> {
        let mine: Vec<&str> = self.patterns().filter(|p| !p.is_empty()).collect();
        let theirs: Vec<&str> = other.patterns().filter(|p| !p.is_empty()).collect();
        let sources: Vec<String> = match (mine.is_empty(), theirs.is_empty()) {
            (false, false) => {
                let mut combined = Vec::new();
                for a in &mine {
                    for b in &theirs {
                        combined.push(matcher.combine(a, b)?);
                    }
                }
                combined
            }
            (false, true) => mine.iter().map(ToString::to_string).collect(),
            (true, false) => theirs.iter().map(ToString::to_string).collect(),
            (true, true) => Vec::new(),
        };

        let mut builder = RoutingKey::builder(sources)
            .options(self.inner.options.clone())
            .methods(self.inner.methods.iter().cloned())
            .methods(other.inner.methods.iter().cloned());
        let produces = if other.inner.produces.is_empty() {
            &self.inner.produces
        } else {
            &other.inner.produces
        };
        builder = builder.produces(produces.iter().map(ToString::to_string));
        match (&self.inner.custom, &other.inner.custom) {
            (Some(a), Some(b)) => builder = builder.custom(a.combine(b)),
            (Some(c), None) | (None, Some(c)) => builder = builder.custom(Arc::clone(c)),
            (None, None) => {}
        }
        let name = match (&self.inner.name, &other.inner.name) {
            (Some(a), Some(b)) => Some(format!("{a}#{b}")),
            (Some(n), None) | (None, Some(n)) => Some(n.clone()),
            (None, None) => None,
        };
        if let Some(name) = name {
            builder = builder.name(name);
        }
        builder.build()
    }

    fn sorted_methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.inner.methods.iter().map(Method::as_str).collect();
        methods.sort_unstable();
        methods
    }

    // Patterns and produces are sets; listing order does not change identity.
    fn sorted_patterns(&self) -> Vec<&str> {
        let mut patterns: Vec<&str> = self.patterns().collect();
        patterns.sort_unstable();
        patterns
    }

    fn sorted_produces(&self) -> Vec<String> {
        let mut produces: Vec<String> = self.inner.produces.iter().map(ToString::to_string).collect();
        produces.sort_unstable();
        produces
    }
}

impl PartialEq for RoutingKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.sorted_patterns() == other.sorted_patterns()
                && self.sorted_methods() == other.sorted_methods()
                && self.sorted_produces() == other.sorted_produces()
                && self.inner.custom.as_ref().map(|c| c.content())
                    == other.inner.custom.as_ref().map(|c| c.content()))
    }
}

impl Eq for RoutingKey {}

impl Hash for RoutingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sorted_patterns().hash(state);
        self.sorted_methods().hash(state);
        self.sorted_produces().hash(state);
        self.inner.custom.as_ref().map(|c| c.content()).hash(state);
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let methods = self.sorted_methods();
        if !methods.is_empty() {
            write!(f, "{} ", methods.join(", "))?;
        }
        let patterns: Vec<&str> = self.patterns().collect();
        if patterns.len() == 1 {
            f.write_str(patterns[0])?;
        } else {
            write!(f, "[{}]", patterns.join(", "))?;
        }
        if !self.inner.produces.is_empty() {
            let produces: Vec<String> = self.inner.produces.iter().map(ToString::to_string).collect();
            write!(f, ", produces [{}]", produces.join(", "))?;
        }
        if let Some(custom) = &self.inner.custom {
            write!(f, ", {}", custom.content())?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoutingKey{self}")
    }
}
