// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Page descriptors: the registry's shared per-page record.
//!
//! A [`PageDescriptor`] carries the immutable identity of a registered page
//! (class, URI, registration kind) and the mutable compiled-widget slot.
//! The slot is set exactly once ([`std::sync::OnceLock`]) so the compiled
//! common path reads it without any locking; the uncommon first-compile
//! path serializes on the descriptor's own mutex, scoped to that single
//! descriptor.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use crate::page::PageClass;
use crate::widget::Widget;

/// How a descriptor entered the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    /// Registered at a contextual URI via `at`.
    Uri,
    /// Created for embedding via `embed_as`, with no URI of its own.
    Embeddable,
}

/// Shared per-page record: identity plus the compile-once widget slot.
pub struct PageDescriptor {
    class: Arc<PageClass>,
    uri: Option<String>,
    kind: RegistrationKind,
    widget: OnceLock<Widget>,
    compile_lock: Mutex<()>,
}

impl PageDescriptor {
    pub(crate) fn new(class: Arc<PageClass>, uri: Option<String>, kind: RegistrationKind) -> Self {
        Self {
            class,
            uri,
            kind,
            widget: OnceLock::new(),
            compile_lock: Mutex::new(()),
        }
    }

    /// The page class this descriptor was registered with.
    pub fn class(&self) -> &Arc<PageClass> {
        &self.class
    }

    /// The contextual URI, if URI-registered.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// How this descriptor was registered.
    pub fn kind(&self) -> RegistrationKind {
        self.kind
    }

    /// The compiled widget, if set. Lock-free.
    pub fn widget(&self) -> Option<Widget> {
        self.widget.get().cloned()
    }

    /// Whether a compiled widget is attached.
    pub fn is_compiled(&self) -> bool {
        self.widget.get().is_some()
    }

    /// Attaches a compiled widget. The first widget wins; later calls
    /// (a racing compile, a redundant apply) are no-ops.
    pub(crate) fn apply(&self, widget: Widget) {
        let _ = self.widget.set(widget);
    }

    /// A fresh, uncompiled descriptor with the same identity. Used by
    /// registry reset.
    pub(crate) fn renewed(&self) -> PageDescriptor {
        PageDescriptor::new(Arc::clone(&self.class), self.uri.clone(), self.kind)
    }

    pub(crate) fn compile_lock(&self) -> &Mutex<()> {
        &self.compile_lock
    }
}

impl fmt::Debug for PageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageDescriptor")
            .field("class", &self.class.name())
            .field("uri", &self.uri)
            .field("kind", &self.kind)
            .field("compiled", &self.is_compiled())
            .finish_non_exhaustive()
    }
}
