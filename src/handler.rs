//! Handler descriptors, declared return types and runtime return values.
//!
//! A [`HandlerDescriptor`] identifies *what* gets invoked (a target plus a method
//! signature). It carries no behaviour of its own; invocation is delegated to a
//! [`HandlerInvoker`](crate::dispatcher::HandlerInvoker).

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::router::RoutingKey;

/// Runtime shape of a handler's return value, as seen by converters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Text,
    Json,
    Binary,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Binary => "binary",
        })
    }
}

/// A value produced by a handler, ready for conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    Text(String),
    Json(serde_json::Value),
    Binary(Vec<u8>),
}

impl ReturnValue {
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Json(_) => ValueKind::Json,
            Self::Binary(_) => ValueKind::Binary,
        }
    }
}

impl From<String> for ReturnValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for ReturnValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<serde_json::Value> for ReturnValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<Vec<u8>> for ReturnValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

/// Declared return type of a handler method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnType {
    /// A plain value, e.g. `List<String>` of kind [`ValueKind::Json`].
    Value { name: String, kind: ValueKind },
    /// A response envelope wrapping the real body type.
    Envelope(Box<ReturnType>),
    /// No body.
    Unit,
}

impl ReturnType {
    pub fn value(name: impl Into<String>, kind: ValueKind) -> Self {
        Self::Value {
            name: name.into(),
            kind,
        }
    }

    #[must_use]
    pub fn text() -> Self {
        Self::value("String", ValueKind::Text)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::value(name, ValueKind::Json)
    }

    #[must_use]
    pub fn binary() -> Self {
        Self::value("byte[]", ValueKind::Binary)
    }

    #[must_use]
    pub fn envelope(inner: ReturnType) -> Self {
        Self::Envelope(Box::new(inner))
    }

    /// The body type with any envelopes unwrapped.
    #[must_use]
    pub fn target(&self) -> &ReturnType {
        match self {
            Self::Envelope(inner) => inner.target(),
            other => other,
        }
    }

    #[must_use]
    pub fn kind(&self) -> Option<ValueKind> {
        match self.target() {
            Self::Value { kind, .. } => Some(*kind),
            Self::Envelope(_) | Self::Unit => None,
        }
    }

    #[must_use]
    pub fn is_unit(&self) -> bool {
        matches!(self.target(), Self::Unit)
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value { name, .. } => f.write_str(name),
            Self::Envelope(inner) => write!(f, "Entity<{inner}>"),
            Self::Unit => f.write_str("void"),
        }
    }
}

/// The object a handler method is invoked on.
#[derive(Clone)]
pub enum HandlerTarget {
    /// Resolved lazily by name through the invoker.
    Named { bean_name: String, type_name: String },
    /// A concrete instance; identity is pointer identity.
    Instance {
        type_name: String,
        instance: Arc<dyn Any + Send + Sync>,
    },
}

impl HandlerTarget {
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Named { type_name, .. } | Self::Instance { type_name, .. } => type_name,
        }
    }

    /// Type name without its module or package path.
    #[must_use]
    pub fn simple_type_name(&self) -> &str {
        let name = self.type_name();
        name.rsplit([':', '.']).next().unwrap_or(name)
    }

    fn instance_addr(instance: &Arc<dyn Any + Send + Sync>) -> usize {
        Arc::as_ptr(instance).cast::<()>() as usize
    }
}

impl PartialEq for HandlerTarget {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Named { bean_name: a, .. }, Self::Named { bean_name: b, .. }) => a == b,
            (Self::Instance { instance: a, .. }, Self::Instance { instance: b, .. }) => {
                Self::instance_addr(a) == Self::instance_addr(b)
            }
            _ => false,
        }
    }
}

impl Eq for HandlerTarget {}

impl Hash for HandlerTarget {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Named { bean_name, .. } => {
                0u8.hash(state);
                bean_name.hash(state);
            }
            Self::Instance { instance, .. } => {
                1u8.hash(state);
                Self::instance_addr(instance).hash(state);
            }
        }
    }
}

impl fmt::Debug for HandlerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named {
                bean_name,
                type_name,
            } => f
                .debug_struct("Named")
                .field("bean_name", bean_name)
                .field("type_name", type_name)
                .finish(),
            Self::Instance {
                type_name,
                instance,
            } => f
                .debug_struct("Instance")
                .field("type_name", type_name)
                .field("addr", &format_args!("{:#x}", Self::instance_addr(instance)))
                .finish(),
        }
    }
}

/// Method name plus declared return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    pub name: String,
    pub return_type: ReturnType,
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct DescriptorInner {
    target: HandlerTarget,
    method: MethodSignature,
}

/// Identifies a handler method. Cheap to clone.
///
/// Two descriptors are equal when they have the same target identity and the
/// same method signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerDescriptor {
    inner: Arc<DescriptorInner>,
}

impl HandlerDescriptor {
    #[must_use]
    pub fn new(target: HandlerTarget, method: MethodSignature) -> Self {
        Self {
            inner: Arc::new(DescriptorInner { target, method }),
        }
    }

    /// Descriptor for a named target whose bean name is its type name.
    pub fn named(
        type_name: impl Into<String>,
        method: impl Into<String>,
        return_type: ReturnType,
    ) -> Self {
        let type_name = type_name.into();
        Self::new(
            HandlerTarget::Named {
                bean_name: type_name.clone(),
                type_name,
            },
            MethodSignature {
                name: method.into(),
                return_type,
            },
        )
    }

    #[must_use]
    pub fn target(&self) -> &HandlerTarget {
        &self.inner.target
    }

    #[must_use]
    pub fn method(&self) -> &MethodSignature {
        &self.inner.method
    }

    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.inner.method.name
    }

    #[must_use]
    pub fn return_type(&self) -> &ReturnType {
        &self.inner.method.return_type
    }
}

impl fmt::Display for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.target().type_name(), self.method_name())
    }
}

/// Assigns a name to each registered handler for reverse lookup.
pub trait HandlerNamingStrategy: Send + Sync {
    fn name(&self, handler: &HandlerDescriptor, key: &RoutingKey) -> String;
}

/// Uses the key's explicit name if present, otherwise the uppercase letters of
/// the target's simple type name, `#`, and the method name (`BeanController#beans`
/// becomes `BC#beans`).
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNamingStrategy;

impl HandlerNamingStrategy for DefaultNamingStrategy {
    fn name(&self, handler: &HandlerDescriptor, key: &RoutingKey) -> String {
        if let Some(name) = key.name() {
            return name.to_string();
        }
        let initials: String = handler
            .target()
            .simple_type_name()
            .chars()
            .filter(char::is_ascii_uppercase)
            .collect();
        format!("{initials}#{}", handler.method_name())
    }
}
