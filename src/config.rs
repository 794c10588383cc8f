//! # Configuration Module
//!
//! Runtime switches come from environment variables ([`DispatchConfig::from_env`]);
//! routes come from a table file ([`RouteTable::load`]).
//!
//! ## Environment Variables
//!
//! | Variable | Default | Effect |
//! |----------|---------|--------|
//! | `ROUTEFORGE_SUFFIX_PATTERN` | `false` | `/users` also matches `/users.json` |
//! | `ROUTEFORGE_TRAILING_SLASH` | `true` | `/users` also matches `/users/` |
//! | `ROUTEFORGE_FILE_EXTENSIONS` | empty | comma list narrowing suffix matching |
//! | `ROUTEFORGE_REMOVE_SEMICOLON_CONTENT` | `true` | strip `;name=value` from paths |
//! | `ROUTEFORGE_URL_DECODE` | `true` | percent-decode the lookup path |
//! | `ROUTEFORGE_CONTEXT_PATH` | empty | context path assumed for CLI requests |
//! | `ROUTEFORGE_FAVOR_PATH_EXTENSION` | `false` | negotiate from `/beans.json` |
//! | `ROUTEFORGE_FORMAT_PARAMETER` | unset | negotiate from `?<name>=json` |
//! | `ROUTEFORGE_PRETTY_JSON` | `false` | indent JSON output |
//!
//! Booleans accept `1/0`, `true/false`, `yes/no`, `on/off`. Unparsable values
//! keep the default and log a warning.
//!
//! ## Route Tables
//!
//! YAML (`.yaml`, `.yml`), TOML (`.toml`) or JSON (anything else):
//!
//! ```yaml
//! prefix: /api
//! routes:
//!   - handler: BeanController#beans
//!     paths: [/beans]
//!     methods: [GET]
//!     produces: [application/json]
//!     return_type: List<String>
//!   - handler: BeanController#bean
//!     paths: ["/beans/{name}"]
//! ```
//!
//! A `prefix` is combined with every route path as a type-level mapping.

use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use http::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::converter::{ConverterRegistry, JsonConverter, ReturnValueWriter};
use crate::dispatcher::{Dispatcher, HandlerInvoker, MethodHandlerAdapter, ServiceHandlerAdapter};
use crate::handler::{HandlerDescriptor, ReturnType, ValueKind};
use crate::negotiation::{
    ContentNegotiationManager, ContentNegotiationStrategy, HeaderContentNegotiationStrategy,
    MediaTypeMappings, ParameterContentNegotiationStrategy, PathExtensionContentNegotiationStrategy,
};
use crate::router::{MatchOptions, Router, RoutingKey};
use crate::server::LookupPathResolver;

/// Dispatch-time switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pub use_suffix_pattern_match: bool,
    pub use_trailing_slash_match: bool,
    pub file_extensions: Vec<String>,
    pub remove_semicolon_content: bool,
    pub url_decode: bool,
    pub context_path: String,
    pub favor_path_extension: bool,
    pub format_parameter: Option<String>,
    pub pretty_json: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            use_suffix_pattern_match: false,
            use_trailing_slash_match: true,
            file_extensions: Vec::new(),
            remove_semicolon_content: true,
            url_decode: true,
            context_path: String::new(),
            favor_path_extension: false,
            format_parameter: None,
            pretty_json: false,
        }
    }
}

fn parse_bool(name: &str, value: Option<String>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => {
            warn!(variable = %name, value = %other, default, "Invalid boolean, using default");
            default
        }
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup` (variable name to value).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |name: &str, default: bool| parse_bool(name, lookup(name), default);
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Self {
            use_suffix_pattern_match: flag("ROUTEFORGE_SUFFIX_PATTERN", defaults.use_suffix_pattern_match),
            use_trailing_slash_match: flag("ROUTEFORGE_TRAILING_SLASH", defaults.use_trailing_slash_match),
            file_extensions: non_empty("ROUTEFORGE_FILE_EXTENSIONS")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|ext| !ext.is_empty())
                        .map(ToString::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            remove_semicolon_content: flag(
                "ROUTEFORGE_REMOVE_SEMICOLON_CONTENT",
                defaults.remove_semicolon_content,
            ),
            url_decode: flag("ROUTEFORGE_URL_DECODE", defaults.url_decode),
            context_path: non_empty("ROUTEFORGE_CONTEXT_PATH").unwrap_or_default(),
            favor_path_extension: flag("ROUTEFORGE_FAVOR_PATH_EXTENSION", defaults.favor_path_extension),
            format_parameter: non_empty("ROUTEFORGE_FORMAT_PARAMETER"),
            pretty_json: flag("ROUTEFORGE_PRETTY_JSON", defaults.pretty_json),
        };
        debug!(config = ?config, "Dispatch configuration loaded");
        config
    }

    #[must_use]
    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            use_suffix_pattern_match: self.use_suffix_pattern_match,
            use_trailing_slash_match: self.use_trailing_slash_match,
            file_extensions: Vec::new(),
        }
        .with_file_extensions(&self.file_extensions)
    }

    #[must_use]
    pub fn path_resolver(&self) -> LookupPathResolver {
        LookupPathResolver::new(self.remove_semicolon_content, self.url_decode)
    }

    /// Path extension (if favored), then query parameter (if named), then `Accept`.
    #[must_use]
    pub fn negotiation_manager(&self) -> ContentNegotiationManager {
        let mut strategies: Vec<Arc<dyn ContentNegotiationStrategy>> = Vec::new();
        if self.favor_path_extension {
            strategies.push(Arc::new(PathExtensionContentNegotiationStrategy::new(
                MediaTypeMappings::default(),
            )));
        }
        if let Some(parameter) = &self.format_parameter {
            strategies.push(Arc::new(ParameterContentNegotiationStrategy::new(
                parameter.clone(),
                MediaTypeMappings::default(),
            )));
        }
        strategies.push(Arc::new(HeaderContentNegotiationStrategy));
        ContentNegotiationManager::new(strategies)
    }

    #[must_use]
    pub fn converter_registry(&self) -> ConverterRegistry {
        ConverterRegistry::new(vec![Arc::new(JsonConverter::new().pretty(self.pretty_json))])
    }

    /// A router using this configuration and the given negotiation chain.
    #[must_use]
    pub fn router(&self, negotiation: Arc<ContentNegotiationManager>) -> Router {
        Router::new()
            .with_negotiation(negotiation)
            .with_path_resolver(self.path_resolver())
            .with_match_options(self.match_options())
    }

    /// A dispatcher with `router` as its mapping and both standard adapters.
    ///
    /// Handler return values are written with [`converter_registry`](Self::converter_registry)
    /// and the router's negotiation chain.
    #[must_use]
    pub fn dispatcher(&self, router: Arc<Router>, invoker: Arc<dyn HandlerInvoker>) -> Dispatcher {
        let writer = ReturnValueWriter::new(
            Arc::new(self.converter_registry()),
            Arc::clone(router.negotiation()),
        );
        Dispatcher::new()
            .with_mapping(router)
            .with_adapter(Arc::new(MethodHandlerAdapter::new(invoker, writer)))
            .with_adapter(Arc::new(ServiceHandlerAdapter))
    }
}

/// Declared return shape of a route's handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnKind {
    #[default]
    Json,
    Text,
    Binary,
    Void,
}

/// One route in a table file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteDefinition {
    /// `Type#method`.
    pub handler: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub produces: Vec<String>,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub returns: ReturnKind,
    /// Display name of the return type, e.g. `List<String>`.
    #[serde(default)]
    pub return_type: Option<String>,
    /// Wrap the return type in a response envelope.
    #[serde(default)]
    pub envelope: bool,
}

impl RouteDefinition {
    /// # Errors
    ///
    /// When `handler` is not of the form `Type#method`.
    pub fn descriptor(&self) -> anyhow::Result<HandlerDescriptor> {
        let (type_name, method) = self
            .handler
            .split_once('#')
            .filter(|(t, m)| !t.is_empty() && !m.is_empty())
            .ok_or_else(|| anyhow!("handler '{}' must have the form Type#method", self.handler))?;
        let name = self.return_type.clone();
        let value = match self.returns {
            ReturnKind::Json => ReturnType::json(name.unwrap_or_else(|| "Object".to_string())),
            ReturnKind::Text => ReturnType::value(name.unwrap_or_else(|| "String".to_string()), ValueKind::Text),
            ReturnKind::Binary => ReturnType::value(name.unwrap_or_else(|| "byte[]".to_string()), ValueKind::Binary),
            ReturnKind::Void => ReturnType::Unit,
        };
        let return_type = if self.envelope {
            ReturnType::envelope(value)
        } else {
            value
        };
        Ok(HandlerDescriptor::named(type_name, method, return_type))
    }

    /// # Errors
    ///
    /// Unknown HTTP methods, malformed patterns or conditions.
    pub fn key(&self, router: &Router) -> anyhow::Result<RoutingKey> {
        let methods = self
            .methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
                    .with_context(|| format!("invalid HTTP method '{m}' for {}", self.handler))
            })
            .collect::<anyhow::Result<Vec<Method>>>()?;
        let mut builder = router
            .mapping(&self.paths)
            .methods(methods)
            .produces(&self.produces)
            .headers(&self.headers);
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        Ok(builder.build()?)
    }
}

/// A route table file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteTable {
    /// Type-level path combined with every route.
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub routes: Vec<RouteDefinition>,
}

impl RouteTable {
    /// Load a table, choosing the format by file extension.
    ///
    /// # Errors
    ///
    /// I/O and parse failures, with the file path as context.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read route table {}", path.display()))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let table = match extension.as_deref() {
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_json_str(&content),
        }
        .with_context(|| format!("failed to parse route table {}", path.display()))?;
        info!(
            path = %path.display(),
            routes_count = table.routes.len(),
            prefix = ?table.prefix,
            "Route table loaded"
        );
        Ok(table)
    }

    /// # Errors
    ///
    /// YAML syntax or schema errors.
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// # Errors
    ///
    /// TOML syntax or schema errors.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// # Errors
    ///
    /// JSON syntax or schema errors.
    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Register every route with `router`. Returns the descriptors in table order.
    ///
    /// # Errors
    ///
    /// The first invalid definition or ambiguous mapping; routes registered before
    /// it stay registered.
    pub fn register(&self, router: &Router) -> anyhow::Result<Vec<(HandlerDescriptor, RoutingKey)>> {
        let type_key = self
            .prefix
            .as_ref()
            .map(|prefix| router.mapping([prefix]).build())
            .transpose()?;
        let mut registered = Vec::with_capacity(self.routes.len());
        for route in &self.routes {
            let descriptor = route.descriptor()?;
            let method_key = route.key(router)?;
            let key = match &type_key {
                Some(type_key) => router.combine(type_key, &method_key)?,
                None => method_key,
            };
            router.register_handler(key.clone(), descriptor.clone())?;
            registered.push((descriptor, key));
        }
        Ok(registered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        assert_eq!(DispatchConfig::from_lookup(|_| None), DispatchConfig::default());
    }

    #[test]
    fn test_from_lookup_parses_values() {
        let config = DispatchConfig::from_lookup(lookup(&[
            ("ROUTEFORGE_SUFFIX_PATTERN", "yes"),
            ("ROUTEFORGE_TRAILING_SLASH", "0"),
            ("ROUTEFORGE_FILE_EXTENSIONS", "json, .xml,"),
            ("ROUTEFORGE_FORMAT_PARAMETER", "fmt"),
            ("ROUTEFORGE_URL_DECODE", "maybe"),
        ]));
        assert!(config.use_suffix_pattern_match);
        assert!(!config.use_trailing_slash_match);
        assert_eq!(config.file_extensions, vec!["json", ".xml"]);
        assert_eq!(config.format_parameter.as_deref(), Some("fmt"));
        assert!(config.url_decode);
        assert_eq!(config.match_options().file_extensions, vec![".json", ".xml"]);
    }

    #[test]
    fn test_negotiation_chain_order() {
        let config = DispatchConfig {
            favor_path_extension: true,
            format_parameter: Some("format".to_string()),
            ..DispatchConfig::default()
        };
        assert_eq!(config.negotiation_manager().strategies().len(), 3);
        assert_eq!(DispatchConfig::default().negotiation_manager().strategies().len(), 1);
    }

    #[test]
    fn test_descriptor_from_definition() {
        let route = RouteDefinition {
            handler: "BeanController#beans".to_string(),
            paths: vec!["/beans".to_string()],
            methods: vec![],
            produces: vec![],
            headers: vec![],
            name: None,
            returns: ReturnKind::Json,
            return_type: Some("List<String>".to_string()),
            envelope: true,
        };
        let descriptor = route.descriptor().unwrap();
        assert_eq!(descriptor.to_string(), "BeanController#beans");
        assert_eq!(descriptor.return_type().to_string(), "Entity<List<String>>");

        let bad = RouteDefinition {
            handler: "beans".to_string(),
            ..route
        };
        assert!(bad.descriptor().is_err());
    }

    #[test]
    fn test_yaml_and_toml_tables() {
        let yaml = "prefix: /api\nroutes:\n  - handler: A#a\n    paths: [/a]\n    methods: [get]\n";
        let table = RouteTable::from_yaml_str(yaml).unwrap();
        assert_eq!(table.prefix.as_deref(), Some("/api"));
        assert_eq!(table.routes[0].methods, vec!["get"]);

        let toml = "[[routes]]\nhandler = \"A#a\"\npaths = [\"/a\"]\nreturns = \"text\"\n";
        let table = RouteTable::from_toml_str(toml).unwrap();
        assert_eq!(table.routes[0].returns, ReturnKind::Text);

        assert!(RouteTable::from_yaml_str("routes:\n  - handler: A#a\n    bogus: 1\n").is_err());
    }

    #[test]
    fn test_register_combines_prefix() {
        let table = RouteTable::from_yaml_str(
            "prefix: /api\nroutes:\n  - handler: A#a\n    paths: [/a]\n    methods: [GET]\n",
        )
        .unwrap();
        let router = Router::new();
        let registered = table.register(&router).unwrap();
        assert_eq!(registered[0].1.patterns().collect::<Vec<_>>(), vec!["/api/a"]);
        assert_eq!(router.registry().lookup_by_direct_path("/api/a").len(), 1);
    }

    #[test]
    fn test_register_rejects_bad_method() {
        let table = RouteTable::from_yaml_str("routes:\n  - handler: A#a\n    methods: [\"GE T\"]\n").unwrap();
        assert!(table.register(&Router::new()).is_err());
    }
}
