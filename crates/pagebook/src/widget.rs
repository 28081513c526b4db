// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Compiled widget artifacts.
//!
//! A [`Widget`] is the compiled, renderable form of a page's presentation
//! definition. The registry never inspects widgets; it only compiles them
//! once (through the external [`TemplateCompiler`](crate::TemplateCompiler))
//! and hands the cached artifact back on every subsequent resolution.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// A compiled, renderable presentation artifact.
///
/// Produced by the external template compiler; implementations must be
/// thread-safe since a single compiled widget is shared across all
/// concurrent resolutions of its page.
pub trait Renderable: Send + Sync + fmt::Debug {
    /// Renders this widget for the given page instance, appending to `out`.
    fn render(&self, page: &dyn Any, out: &mut String) -> Result<()>;
}

/// Shared handle to a compiled widget.
pub type Widget = Arc<dyn Renderable>;

/// A widget that renders fixed markup, ignoring the page instance.
///
/// Useful for pre-seeding a page via [`Page::apply`](crate::Page::apply)
/// with content that needs no compilation.
#[derive(Debug, Clone)]
pub struct StaticWidget {
    markup: String,
}

impl StaticWidget {
    /// Creates a static widget from fixed markup.
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }

    /// Returns the underlying markup.
    pub fn markup(&self) -> &str {
        &self.markup
    }
}

impl Renderable for StaticWidget {
    fn render(&self, _page: &dyn Any, out: &mut String) -> Result<()> {
        out.push_str(&self.markup);
        Ok(())
    }
}
