// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! # pagebook
//!
//! Page registry and resolution engine for server-side web applications.
//!
//! `pagebook` maps contextual URIs and logical names to registered page
//! classes, compiles each page's renderable widget on demand (cascading
//! through embedded sub-widgets), caches compiled widgets for reuse, and
//! dispatches HTTP verbs to handler methods on page instances.
//!
//! ## Features
//!
//! - Exact-match URI routing plus logical-name lookup (`for_name`)
//! - Compile-once / reuse-many widget caching, safe under concurrency
//! - Cascading compilation of embedded widgets with cycle detection
//! - Verb + sub-route dispatch with typed parameter binding
//! - Pluggable [`TemplateCompiler`] and [`InstanceProvider`] seams
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pagebook::{PageBook, PageClass, HandlerBinding, ParamKind, FactoryProvider};
//! use std::sync::Arc;
//!
//! let book = PageBook::new(compiler, Arc::new(FactoryProvider));
//!
//! let wiki = PageClass::builder::<WikiPage>("Wiki")
//!     .factory(|| Ok(Box::new(WikiPage::default())))
//!     .route(HandlerBinding::new("GET", view_topic)
//!         .at("/{topic}")
//!         .param("topic", ParamKind::Str))
//!     .build();
//!
//! book.at("/wiki", wiki)?;
//!
//! let page = book.get("/wiki")?;      // first call compiles the widget
//! let mut instance = page.instantiate()?;
//! let out = page.do_method("GET", instance.as_mut(), "/rust", &params)?;
//! ```

/// The page registry (URI and name resolution).
pub mod book;
/// Cascading widget compilation.
pub mod compile;
/// Shared per-page descriptors.
pub mod descriptor;
/// HTTP method dispatch.
pub mod dispatch;
/// Embeddable-widget namespace.
pub mod embed;
/// Error types.
pub mod error;
/// Instance provider seam.
pub mod instantiate;
/// Page classes and resolution handles.
pub mod page;
/// Compiled widget artifacts.
pub mod widget;

pub use book::PageBook;
pub use compile::{CompilationOrchestrator, EmbedLookup, TemplateCompiler};
pub use descriptor::{PageDescriptor, RegistrationKind};
pub use dispatch::MethodDispatcher;
pub use embed::EmbedRegistry;
pub use error::{BoxedError, PageBookError, Result};
pub use instantiate::{FactoryProvider, InstanceProvider};
pub use page::{
    HandlerBinding, HandlerFn, Page, PageClass, PageClassBuilder, PageInstance, ParamKind,
    RequestParams,
};
pub use widget::{Renderable, StaticWidget, Widget};

#[cfg(test)]
mod tests;
