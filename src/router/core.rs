//! Router core: best-match handler resolution over the mapping registry.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::key::{MatchContext, MatchOptions, RoutingKey, RoutingKeyBuilder};
use super::matcher::{AntPathMatcher, PathMatcher};
use super::registry::{MappingRegistration, MappingRegistry, RegistrySnapshot};
use crate::dispatcher::{Handler, HandlerExecutionChain, HandlerMapping};
use crate::error::{DispatchError, MappingError, NegotiationError};
use crate::handler::{HandlerDescriptor, HandlerNamingStrategy};
use crate::media::MediaType;
use crate::negotiation::ContentNegotiationManager;
use crate::server::{LookupPathResolver, RequestContext, ServerRequest};

/// Maximum number of URI variables before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Inline storage for extracted URI template variables.
///
/// Names are `Arc<str>` shared with the compiled pattern; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

const SLOW_RESOLUTION: Duration = Duration::from_millis(1);

/// The winning handler for a request.
#[derive(Debug, Clone)]
pub struct ResolvedHandler {
    /// Handler method to invoke.
    pub handler: HandlerDescriptor,
    /// The key narrowed to what matched this request.
    pub matched_key: RoutingKey,
    /// The key as registered.
    pub registered_key: RoutingKey,
    /// The best matching pattern, e.g. `/users/{id}`.
    pub best_pattern: Option<String>,
    /// Variables extracted from the lookup path by the best pattern.
    pub uri_variables: ParamVec,
}

impl ResolvedHandler {
    /// Get a URI variable by name. Last occurrence wins.
    #[inline]
    #[must_use]
    pub fn uri_variable(&self, name: &str) -> Option<&str> {
        self.uri_variables
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

struct Match<'a> {
    key: RoutingKey,
    registration: &'a Arc<MappingRegistration>,
}

/// Maps requests to handler methods registered under [`RoutingKey`]s.
///
/// Resolution tries the direct-path index first and falls back to a scan of
/// every registration. Matching keys are ordered by [`RoutingKey::compare_to`];
/// equal keys keep registration order.
pub struct Router {
    registry: MappingRegistry,
    negotiation: Arc<ContentNegotiationManager>,
    path_resolver: LookupPathResolver,
    matcher: Arc<dyn PathMatcher>,
    options: MatchOptions,
    order: i32,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.registry.len())
            .field("options", &self.options)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: MappingRegistry::new(),
            negotiation: Arc::new(ContentNegotiationManager::default()),
            path_resolver: LookupPathResolver::default(),
            matcher: Arc::new(AntPathMatcher),
            options: MatchOptions::default(),
            order: 0,
        }
    }

    /// Negotiation chain used for `produces` matching.
    #[must_use]
    pub fn with_negotiation(mut self, negotiation: Arc<ContentNegotiationManager>) -> Self {
        self.negotiation = negotiation;
        self
    }

    #[must_use]
    pub fn with_path_resolver(mut self, path_resolver: LookupPathResolver) -> Self {
        self.path_resolver = path_resolver;
        self
    }

    /// Options applied to keys built through [`mapping`](Self::mapping).
    #[must_use]
    pub fn with_match_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_path_matcher(mut self, matcher: Arc<dyn PathMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    #[must_use]
    pub fn with_naming_strategy(mut self, naming: Arc<dyn HandlerNamingStrategy>) -> Self {
        self.registry = MappingRegistry::with_naming_strategy(naming);
        self
    }

    /// Position among the dispatcher's handler mappings; lower goes first.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    #[must_use]
    pub fn negotiation(&self) -> &Arc<ContentNegotiationManager> {
        &self.negotiation
    }

    #[must_use]
    pub fn path_resolver(&self) -> &LookupPathResolver {
        &self.path_resolver
    }

    #[must_use]
    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Start a key carrying this router's match options.
    pub fn mapping<I, S>(&self, paths: I) -> RoutingKeyBuilder
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RoutingKey::builder(paths).options(self.options.clone())
    }

    /// Register a handler under `key`.
    ///
    /// # Errors
    ///
    /// [`MappingError::AmbiguousMapping`] when an equal key maps to another handler.
    pub fn register_handler(&self, key: RoutingKey, handler: HandlerDescriptor) -> Result<bool, MappingError> {
        self.registry.register(key, handler)
    }

    /// Register a handler under the combination of a type-level and a method-level key.
    ///
    /// # Errors
    ///
    /// Pattern combination failures, or an ambiguous mapping.
    pub fn register_combined(
        &self,
        type_key: &RoutingKey,
        method_key: &RoutingKey,
        handler: HandlerDescriptor,
    ) -> Result<bool, MappingError> {
        let key = self.combine(type_key, method_key)?;
        self.registry.register(key, handler)
    }

    /// Merge a type-level key with a method-level key using this router's matcher.
    ///
    /// # Errors
    ///
    /// Pattern combination failures.
    pub fn combine(&self, type_key: &RoutingKey, method_key: &RoutingKey) -> Result<RoutingKey, MappingError> {
        type_key.combine(method_key, self.matcher.as_ref())
    }

    /// `(key, handler)` display pairs in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<(String, String)> {
        self.registry
            .all_registrations()
            .iter()
            .map(|r| (r.key().to_string(), r.handler().to_string()))
            .collect()
    }

    /// Find the best handler for `request` and record the match in `ctx`.
    ///
    /// `Ok(None)` means nothing matched.
    ///
    /// # Errors
    ///
    /// When keys matched everything except their `produces` condition, the request
    /// is not acceptable: either the acceptable types could not be determined (the
    /// negotiation error is returned) or [`NegotiationError::NotAcceptable`] lists
    /// the types those keys produce.
    pub fn resolve(
        &self,
        request: &ServerRequest,
        ctx: &mut RequestContext,
    ) -> Result<Option<ResolvedHandler>, NegotiationError> {
        let start = Instant::now();
        let lookup_path = self.path_resolver.lookup_path(request);
        ctx.set_lookup_path(lookup_path.clone());
        debug!(
            request_id = %ctx.request_id(),
            method = %request.method(),
            path = %request.raw_path(),
            lookup_path = %lookup_path,
            "Route match attempt"
        );

        let snapshot = self.registry.snapshot();
        let match_ctx = MatchContext::new(request, &lookup_path, &self.negotiation);

        let mut matches = Vec::new();
        let direct = snapshot.direct(&lookup_path);
        if !direct.is_empty() {
            Self::add_matches(direct.iter(), &snapshot, &match_ctx, &mut matches);
        }
        let scanned = matches.is_empty();
        if scanned {
            Self::add_matches(
                snapshot.registrations().iter().map(|r| r.key()),
                &snapshot,
                &match_ctx,
                &mut matches,
            );
        }

        if matches.is_empty() {
            let duration = start.elapsed();
            return match Self::not_acceptable(&snapshot, &match_ctx) {
                Some(err) => {
                    warn!(
                        request_id = %ctx.request_id(),
                        method = %request.method(),
                        lookup_path = %lookup_path,
                        error = %err,
                        duration_us = duration.as_micros(),
                        "Route matched but no acceptable representation"
                    );
                    Err(err)
                }
                None => {
                    warn!(
                        request_id = %ctx.request_id(),
                        method = %request.method(),
                        lookup_path = %lookup_path,
                        duration_us = duration.as_micros(),
                        "No route matched"
                    );
                    Ok(None)
                }
            };
        }

        matches.sort_by(|a, b| {
            a.key
                .compare_to(&b.key, &match_ctx)
                .then_with(|| a.registration.sequence().cmp(&b.registration.sequence()))
        });
        if let [best, second, ..] = matches.as_slice() {
            if best.key.compare_to(&second.key, &match_ctx) == Ordering::Equal {
                debug!(
                    lookup_path = %lookup_path,
                    chosen = %best.registration.handler(),
                    other = %second.registration.handler(),
                    "Ambiguous handler methods, earlier registration wins"
                );
            }
        }

        let best = &matches[0];
        let best_pattern = best.key.best_pattern();
        let uri_variables = best_pattern
            .and_then(|pattern| pattern.match_and_extract(&lookup_path))
            .unwrap_or_default();
        let resolved = ResolvedHandler {
            handler: best.registration.handler().clone(),
            matched_key: best.key.clone(),
            registered_key: best.registration.key().clone(),
            best_pattern: best_pattern.map(|p| p.as_str().to_string()),
            uri_variables,
        };

        ctx.record_match(
            resolved.handler.clone(),
            resolved.matched_key.clone(),
            resolved.best_pattern.clone(),
            resolved.uri_variables.clone(),
        );
        if !resolved.matched_key.produces().is_empty() {
            ctx.set_producible_types(resolved.matched_key.produces().to_vec());
        }

        let duration = start.elapsed();
        if duration > SLOW_RESOLUTION {
            warn!(
                request_id = %ctx.request_id(),
                method = %request.method(),
                lookup_path = %lookup_path,
                handler = %resolved.handler,
                best_pattern = ?resolved.best_pattern,
                candidates = matches.len(),
                full_scan = scanned,
                duration_us = duration.as_micros(),
                "Slow route matching detected"
            );
        } else {
            info!(
                request_id = %ctx.request_id(),
                method = %request.method(),
                lookup_path = %lookup_path,
                handler = %resolved.handler,
                best_pattern = ?resolved.best_pattern,
                uri_variables = ?resolved.uri_variables,
                candidates = matches.len(),
                full_scan = scanned,
                duration_us = duration.as_micros(),
                "Route matched"
            );
        }
        Ok(Some(resolved))
    }

    fn add_matches<'s, 'k>(
        keys: impl Iterator<Item = &'k RoutingKey>,
        snapshot: &'s RegistrySnapshot,
        match_ctx: &MatchContext<'_>,
        matches: &mut Vec<Match<'s>>,
    ) {
        for key in keys {
            let Some(registration) = snapshot.get(key) else {
                continue;
            };
            if let Some(matched) = key.get_matching_condition(match_ctx) {
                matches.push(Match {
                    key: matched,
                    registration,
                });
            }
        }
    }

    /// Explain an empty result when some key failed only on `produces`.
    fn not_acceptable(snapshot: &RegistrySnapshot, match_ctx: &MatchContext<'_>) -> Option<NegotiationError> {
        let mut producible: Vec<MediaType> = Vec::new();
        for registration in snapshot.registrations() {
            let key = registration.key();
            if key.produces().is_empty() || !key.matches_ignoring_produces(match_ctx) {
                continue;
            }
            for media_type in key.produces() {
                if !producible.contains(media_type) {
                    producible.push(media_type.clone());
                }
            }
        }
        if producible.is_empty() {
            return None;
        }
        Some(
            match_ctx
                .acceptable_error()
                .unwrap_or(NegotiationError::NotAcceptable { producible }),
        )
    }
}

impl HandlerMapping for Router {
    fn order(&self) -> i32 {
        self.order
    }

    fn name(&self) -> &'static str {
        "router"
    }

    fn handler(
        &self,
        request: &ServerRequest,
        ctx: &mut RequestContext,
    ) -> Result<Option<HandlerExecutionChain>, DispatchError> {
        Ok(self
            .resolve(request, ctx)?
            .map(|resolved| HandlerExecutionChain::new(Handler::Method(resolved.handler))))
    }
}
