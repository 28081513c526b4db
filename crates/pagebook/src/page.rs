// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Page classes and the `Page` resolution handle.
//!
//! A [`PageClass`] is the registry's view of an application page: a logical
//! name, the backing Rust type, an optional instance factory, and the
//! handler methods the page exposes. Method metadata is supplied explicitly
//! through [`PageClassBuilder`] — the host framework's scanning/derive layer
//! builds classes, the registry only consumes them.
//!
//! A [`Page`] is the transient handle returned by every registry resolution:
//! a stateless view over the shared descriptor exposing the compiled widget,
//! instantiation, and method dispatch.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::descriptor::PageDescriptor;
use crate::dispatch::MethodDispatcher;
use crate::error::{BoxedError, PageBookError, Result};
use crate::instantiate::InstanceProvider;
use crate::widget::Widget;

/// A live page object, type-erased.
///
/// Handlers downcast to the concrete backing type via
/// [`Any::downcast_mut`].
pub type PageInstance = Box<dyn Any + Send>;

/// Request parameters: name → repeated string values, as parsed by the
/// transport layer from the query string or form body.
pub type RequestParams = HashMap<String, Vec<String>>;

/// A handler method body.
///
/// Receives the page instance and the bound argument values, in the order
/// the binding declared its parameters. The return value passes through
/// dispatch unchanged.
pub type HandlerFn = Arc<dyn Fn(&mut dyn Any, &[JsonValue]) -> JsonValue + Send + Sync>;

type FactoryFn = Arc<dyn Fn() -> std::result::Result<PageInstance, BoxedError> + Send + Sync>;

/// Declared type of a bound handler parameter.
///
/// Values arrive from the transport as string arrays; the dispatcher
/// coerces the first value to the declared kind (`List` takes all values).
/// A missing or unparseable value binds `Null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// First value, as a JSON string.
    Str,
    /// First value parsed as `i64`.
    Int,
    /// First value parsed as `f64`.
    Float,
    /// First value parsed as a boolean (`true`/`1`/`on`/`yes`).
    Bool,
    /// All values, as a JSON array of strings.
    List,
}

/// A named, typed parameter declared by a handler binding.
#[derive(Debug, Clone)]
pub(crate) struct ParamSpec {
    pub(crate) name: String,
    pub(crate) kind: ParamKind,
}

/// One handler method on a page class: an HTTP verb, an optional sub-route
/// pattern, the declared parameters, and the handler body.
///
/// # Example
///
/// ```rust,ignore
/// HandlerBinding::new("GET", |page, args| view_topic(page, args))
///     .at("/{topic}")
///     .param("topic", ParamKind::Str)
/// ```
#[derive(Clone)]
pub struct HandlerBinding {
    pub(crate) method: String,
    pub(crate) pattern: Option<String>,
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) func: HandlerFn,
}

impl HandlerBinding {
    /// Creates a binding for the given HTTP verb at the page's base URI.
    pub fn new<H>(method: &str, handler: H) -> Self
    where
        H: Fn(&mut dyn Any, &[JsonValue]) -> JsonValue + Send + Sync + 'static,
    {
        Self {
            method: method.to_ascii_uppercase(),
            pattern: None,
            params: Vec::new(),
            func: Arc::new(handler),
        }
    }

    /// Attaches a sub-route pattern (matchit syntax, e.g. `/{id}` or
    /// `/{*rest}`) matched against the residual path beyond the page's
    /// base URI.
    pub fn at(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    /// Declares a named parameter bound from path captures or request
    /// parameters. Declaration order is argument order.
    pub fn param(mut self, name: &str, kind: ParamKind) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            kind,
        });
        self
    }
}

impl fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A registered page class: logical name, backing type, instance factory,
/// and handler bindings with a precompiled sub-route matcher.
///
/// Classes are immutable once built and shared (`Arc`) between the registry,
/// descriptors, and resolution handles.
pub struct PageClass {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    factory: Option<FactoryFn>,
    pub(crate) handlers: Vec<HandlerBinding>,
    /// Indices into `handlers` with no sub-route pattern.
    pub(crate) root: Vec<usize>,
    /// Sub-route pattern → indices into `handlers`.
    pub(crate) subroutes: matchit::Router<Vec<usize>>,
}

impl PageClass {
    /// Starts building a page class backed by `T` under the given logical
    /// name (the name `for_name` and embed references resolve through).
    pub fn builder<T: 'static>(name: &str) -> PageClassBuilder {
        PageClassBuilder {
            name: name.to_string(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            factory: None,
            handlers: Vec::new(),
        }
    }

    /// The logical page name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `TypeId` of the backing Rust type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The backing Rust type's name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Constructs a fresh instance via the registered factory.
    ///
    /// Used by [`FactoryProvider`](crate::FactoryProvider); hosts with
    /// their own dependency-injection container bypass this entirely.
    pub fn construct(&self) -> std::result::Result<PageInstance, BoxedError> {
        match &self.factory {
            Some(factory) => factory(),
            None => Err(format!("no factory registered for page class '{}'", self.name).into()),
        }
    }
}

impl fmt::Debug for PageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageClass")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`PageClass`].
pub struct PageClassBuilder {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    factory: Option<FactoryFn>,
    handlers: Vec<HandlerBinding>,
}

impl PageClassBuilder {
    /// Registers the instance factory used by the default provider.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> std::result::Result<PageInstance, BoxedError> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Adds a handler binding.
    pub fn route(mut self, binding: HandlerBinding) -> Self {
        self.handlers.push(binding);
        self
    }

    /// Finalizes the class, precompiling the sub-route matcher.
    ///
    /// An invalid sub-route pattern is logged and skipped rather than
    /// failing the whole class.
    pub fn build(self) -> Arc<PageClass> {
        let mut root = Vec::new();
        let mut by_pattern: HashMap<String, Vec<usize>> = HashMap::new();

        for (index, binding) in self.handlers.iter().enumerate() {
            match &binding.pattern {
                None => root.push(index),
                Some(pattern) => by_pattern.entry(pattern.clone()).or_default().push(index),
            }
        }

        let mut subroutes = matchit::Router::new();
        for (pattern, indices) in by_pattern {
            if let Err(e) = subroutes.insert(&pattern, indices) {
                tracing::warn!(
                    "Could not register sub-route {} on page class {}: {}",
                    pattern,
                    self.name,
                    e
                );
            }
        }

        Arc::new(PageClass {
            name: self.name,
            type_id: self.type_id,
            type_name: self.type_name,
            factory: self.factory,
            handlers: self.handlers,
            root,
            subroutes,
        })
    }
}

/// A resolved page handle.
///
/// Transient and cheap to clone; all state lives on the shared descriptor.
/// Obtained from [`PageBook::get`](crate::PageBook::get) and friends.
#[derive(Clone)]
pub struct Page {
    descriptor: Arc<PageDescriptor>,
    provider: Arc<dyn InstanceProvider>,
}

impl Page {
    pub(crate) fn new(descriptor: Arc<PageDescriptor>, provider: Arc<dyn InstanceProvider>) -> Self {
        Self {
            descriptor,
            provider,
        }
    }

    /// The compiled widget, if one has been compiled or applied yet.
    ///
    /// Always present after a compiling resolution (`get`); may be absent
    /// on handles from `non_compiling_get` or `at`.
    pub fn widget(&self) -> Option<Widget> {
        self.descriptor.widget()
    }

    /// The page class backing this handle.
    pub fn page_class(&self) -> Arc<PageClass> {
        Arc::clone(self.descriptor.class())
    }

    /// Pre-seeds the descriptor's compiled widget, bypassing the
    /// orchestrator. The first widget wins; applying to an
    /// already-compiled descriptor is a no-op.
    pub fn apply(&self, widget: Widget) {
        self.descriptor.apply(widget);
    }

    /// Constructs a live page instance through the instance provider.
    ///
    /// # Errors
    ///
    /// Provider failures surface as [`PageBookError::Instantiation`].
    pub fn instantiate(&self) -> Result<PageInstance> {
        let class = self.descriptor.class();
        self.provider
            .instantiate(class)
            .map_err(|e| PageBookError::Instantiation {
                page: class.name().to_string(),
                message: e.to_string(),
            })
    }

    /// Dispatches an HTTP verb plus residual path to the matching handler
    /// on the given page instance.
    ///
    /// `path_info` is the path beyond the page's base URI (`""` or `"/"`
    /// for the page root); `params` holds the transport-parsed request
    /// parameters.
    ///
    /// # Errors
    ///
    /// [`PageBookError::NoMatchingRoute`] if `path_info` matches no
    /// sub-route, [`PageBookError::NoMatchingHandler`] if no handler
    /// matches the verb.
    pub fn do_method(
        &self,
        http_method: &str,
        instance: &mut dyn Any,
        path_info: &str,
        params: &RequestParams,
    ) -> Result<JsonValue> {
        MethodDispatcher::dispatch(
            self.descriptor.class(),
            http_method,
            instance,
            path_info,
            params,
        )
    }

}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("class", &self.descriptor.class().name())
            .field("compiled", &self.descriptor.is_compiled())
            .finish_non_exhaustive()
    }
}
