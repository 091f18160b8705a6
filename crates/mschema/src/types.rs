//! # Type Resolver
//!
//! Turns the `type` field of a schema node into a [`TypeSet`]: the ordered
//! collection of handles a value is tested against with "instance of any".
//!
//! ## Descriptor Tokens
//!
//! - a primitive kind (`mapping`, `sequence`, `text`, `integer`, `float`,
//!   `boolean`, `null`, or one of their aliases, see [`ValueKind::parse`]);
//! - `any`, matching every value;
//! - `<module-path>:<Name>`, looked up in a caller-supplied
//!   [`TypeRegistry`]. Nothing is loaded dynamically: an embedding
//!   application registers a check closure for every external type its
//!   schemas may reference.
//!
//! Resolution happens once per node at compile time. Order and duplicates
//! of the descriptor list are preserved.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::CompileError;
use crate::value::ValueKind;

/// Wildcard token matching every value.
pub const ANY: &str = "any";

/// Membership check for an externally defined type.
pub type TypeCheck = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A single resolved, acceptable runtime type.
#[derive(Clone)]
pub enum TypeHandle {
    /// A primitive kind.
    Kind(ValueKind),
    /// Matches every value.
    Any,
    /// A registered external type.
    External {
        /// The `module:Name` reference.
        name: String,
        /// Membership check supplied by the registry.
        check: TypeCheck,
    },
}

impl TypeHandle {
    /// Whether `value` is an instance of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            TypeHandle::Kind(kind) => ValueKind::of(value) == *kind,
            TypeHandle::Any => true,
            TypeHandle::External { check, .. } => check(value),
        }
    }

    /// Descriptor token naming this handle in diagnostics.
    pub fn name(&self) -> &str {
        match self {
            TypeHandle::Kind(kind) => kind.as_str(),
            TypeHandle::Any => ANY,
            TypeHandle::External { name, .. } => name,
        }
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeHandle::Kind(kind) => f.debug_tuple("Kind").field(kind).finish(),
            TypeHandle::Any => f.write_str("Any"),
            TypeHandle::External { name, .. } => {
                f.debug_struct("External").field("name", name).finish_non_exhaustive()
            }
        }
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Non-empty, fixed-size, ordered set of accepted types.
#[derive(Debug, Clone)]
pub struct TypeSet {
    handles: Box<[TypeHandle]>,
}

impl TypeSet {
    /// The set containing only `any`.
    pub fn any() -> Self {
        Self {
            handles: Box::new([TypeHandle::Any]),
        }
    }

    /// Whether `value` is an instance of any handle in the set.
    pub fn accepts(&self, value: &Value) -> bool {
        self.handles.iter().any(|handle| handle.accepts(value))
    }

    pub fn handles(&self) -> &[TypeHandle] {
        &self.handles
    }

    /// Whether the set includes the given primitive kind (or `any`).
    pub fn includes(&self, kind: ValueKind) -> bool {
        self.handles.iter().any(|handle| match handle {
            TypeHandle::Kind(k) => *k == kind,
            TypeHandle::Any => true,
            TypeHandle::External { .. } => false,
        })
    }

    /// Descriptor tokens in schema order.
    pub fn names(&self) -> Vec<String> {
        self.handles.iter().map(|h| h.name().to_string()).collect()
    }
}

/// Raw `type` field: a single token or an ordered list of tokens.
///
/// A YAML `null` token stands for the null kind.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TypeDescriptor {
    /// `type: mapping`
    Single(Option<String>),
    /// `type: [integer, float]`
    List(Vec<Option<String>>),
}

impl TypeDescriptor {
    fn tokens(&self) -> Vec<&str> {
        fn token(t: &Option<String>) -> &str {
            t.as_deref().unwrap_or("null")
        }
        match self {
            TypeDescriptor::Single(t) => vec![token(t)],
            TypeDescriptor::List(ts) => ts.iter().map(token).collect(),
        }
    }
}

/// Registry of externally defined types, keyed by `module:Name`.
///
/// ## Thread Safety
///
/// Check closures are `Send + Sync`; a registry can be cloned cheaply and
/// shared across compilers on different threads.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeCheck>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an external type under a `module:Name` reference.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::InvalidRegistration` if `name` is not of the
    /// `module:Name` form, so registered types never shadow primitives.
    pub fn register<F>(&mut self, name: impl Into<String>, check: F) -> Result<(), CompileError>
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        if split_reference(&name).is_none() {
            return Err(CompileError::InvalidRegistration {
                reason: "external type names must have the form <module-path>:<Name>".to_string(),
                name,
            });
        }
        tracing::debug!(%name, "registered external type");
        self.types.insert(name, Arc::new(check));
        Ok(())
    }

    /// Look up a registered check.
    pub fn get(&self, name: &str) -> Option<&TypeCheck> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort();
        names
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.names())
            .finish()
    }
}

/// Split `module.path:Name` at the last colon; both parts must be non-empty.
fn split_reference(token: &str) -> Option<(&str, &str)> {
    let (module, name) = token.rsplit_once(':')?;
    if module.trim().is_empty() || name.trim().is_empty() {
        return None;
    }
    Some((module, name))
}

/// Resolve a descriptor into a [`TypeSet`].
///
/// # Errors
///
/// - `CompileError::InvalidSchema` for an empty descriptor list.
/// - `CompileError::UnknownType` for unrecognized tokens.
/// - `CompileError::UnresolvedType` for `module:Name` references missing
///   from `registry`.
pub fn resolve_types(
    descriptor: &TypeDescriptor,
    registry: &TypeRegistry,
    location: &str,
) -> Result<TypeSet, CompileError> {
    let tokens = descriptor.tokens();
    if tokens.is_empty() {
        return Err(CompileError::InvalidSchema {
            location: location.to_string(),
            reason: "type list must not be empty".to_string(),
        });
    }

    let handles = tokens
        .into_iter()
        .map(|token| resolve_token(token, registry, location))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TypeSet {
        handles: handles.into_boxed_slice(),
    })
}

fn resolve_token(
    token: &str,
    registry: &TypeRegistry,
    location: &str,
) -> Result<TypeHandle, CompileError> {
    let token = token.trim();

    if token == ANY {
        return Ok(TypeHandle::Any);
    }

    if token.contains(':') {
        if split_reference(token).is_none() {
            return Err(CompileError::UnknownType {
                location: location.to_string(),
                descriptor: token.to_string(),
            });
        }
        let check = registry
            .get(token)
            .ok_or_else(|| CompileError::UnresolvedType {
                location: location.to_string(),
                reference: token.to_string(),
            })?;
        return Ok(TypeHandle::External {
            name: token.to_string(),
            check: Arc::clone(check),
        });
    }

    ValueKind::parse(token)
        .map(TypeHandle::Kind)
        .ok_or_else(|| CompileError::UnknownType {
            location: location.to_string(),
            descriptor: token.to_string(),
        })
}
