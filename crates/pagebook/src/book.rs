// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The page registry.
//!
//! [`PageBook`] owns every descriptor it creates and exposes the two
//! resolution modes: compiling ([`PageBook::get`], [`PageBook::for_name`])
//! and non-compiling ([`PageBook::non_compiling_get`]). Registration
//! (`at`, `embed_as`) happens at startup; steady-state traffic is
//! read-mostly, so lookups take a brief map read lock and compiled widgets
//! are read without any locking at all.
//!
//! URIs are matched exactly — no prefix or pattern matching at this layer.
//! Residual-path matching belongs to the dispatcher. Lookup keys are
//! normalized the same way on registration and resolution: `""`/`"/"`
//! collapse to `"/"`, trailing slashes are trimmed.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::compile::{CompilationOrchestrator, TemplateCompiler};
use crate::descriptor::{PageDescriptor, RegistrationKind};
use crate::embed::EmbedRegistry;
use crate::error::{PageBookError, Result};
use crate::instantiate::InstanceProvider;
use crate::page::{Page, PageClass};

/// The page registry: contextual URI → page, logical name → page, plus the
/// embeddable-widget namespace.
///
/// Construct one at startup and pass it by reference into the transport
/// layer — there is no ambient global instance.
pub struct PageBook {
    by_uri: RwLock<HashMap<String, Arc<PageDescriptor>>>,
    by_name: RwLock<HashMap<String, Arc<PageDescriptor>>>,
    embeds: Arc<EmbedRegistry>,
    orchestrator: CompilationOrchestrator,
    provider: Arc<dyn InstanceProvider>,
}

impl PageBook {
    /// Creates an empty registry wired to the given external collaborators.
    pub fn new(compiler: Arc<dyn TemplateCompiler>, provider: Arc<dyn InstanceProvider>) -> Self {
        let embeds = Arc::new(EmbedRegistry::new());
        Self {
            by_uri: RwLock::new(HashMap::new()),
            by_name: RwLock::new(HashMap::new()),
            embeds: Arc::clone(&embeds),
            orchestrator: CompilationOrchestrator::new(compiler, embeds),
            provider,
        }
    }

    /// Registers `class` at the given contextual URI.
    ///
    /// Returns a handle to the uncompiled descriptor; callers may
    /// [`Page::apply`] a widget to pre-seed compilation. Re-registering
    /// the same class at the same URI is idempotent.
    ///
    /// # Errors
    ///
    /// [`PageBookError::DuplicateRegistration`] if the URI (or the class's
    /// logical name) is already bound to a different class.
    pub fn at(&self, uri: &str, class: Arc<PageClass>) -> Result<Page> {
        let uri = normalize(uri);
        let mut by_uri = self.by_uri.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = by_uri.get(&uri) {
            if existing.class().type_id() == class.type_id() {
                return Ok(self.handle(Arc::clone(existing)));
            }
            return Err(PageBookError::DuplicateRegistration {
                key: uri,
                existing: existing.class().name().to_string(),
            });
        }

        let mut by_name = self.by_name.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = by_name.get(class.name()) {
            if existing.class().type_id() != class.type_id() {
                return Err(PageBookError::DuplicateRegistration {
                    key: class.name().to_string(),
                    existing: existing.class().type_name().to_string(),
                });
            }
        }

        let descriptor = Arc::new(PageDescriptor::new(
            Arc::clone(&class),
            Some(uri.clone()),
            RegistrationKind::Uri,
        ));
        by_uri.insert(uri.clone(), Arc::clone(&descriptor));
        // The first descriptor of a class keeps the name binding; a second
        // URI for the same class stays reachable by URI only.
        by_name
            .entry(class.name().to_string())
            .or_insert_with(|| Arc::clone(&descriptor));

        tracing::debug!("registered page class {} at {}", class.name(), uri);
        Ok(self.handle(descriptor))
    }

    /// Resolves a URI, compiling the page's widget (and any embedded
    /// widgets, transitively) if this is its first compiling resolution.
    ///
    /// # Errors
    ///
    /// [`PageBookError::UnresolvedRoute`] if nothing is registered at the
    /// URI; compilation failures propagate unretried.
    pub fn get(&self, uri: &str) -> Result<Page> {
        let descriptor = self.lookup_uri(uri)?;
        if !descriptor.is_compiled() {
            self.orchestrator.compile(&descriptor)?;
        }
        Ok(self.handle(descriptor))
    }

    /// Same lookup as [`PageBook::get`], guaranteed never to trigger a
    /// cascading compile. The handle's `widget()` may be absent.
    pub fn non_compiling_get(&self, uri: &str) -> Result<Page> {
        let descriptor = self.lookup_uri(uri)?;
        Ok(self.handle(descriptor))
    }

    /// Resolves a page by logical name, independent of URI — for
    /// programmatic page-to-page references such as redirects. Compiles
    /// like [`PageBook::get`].
    ///
    /// # Errors
    ///
    /// [`PageBookError::UnresolvedName`] if the name is unbound.
    pub fn for_name(&self, name: &str) -> Result<Page> {
        let descriptor = self
            .by_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| PageBookError::UnresolvedName(name.to_string()))?;
        if !descriptor.is_compiled() {
            self.orchestrator.compile(&descriptor)?;
        }
        Ok(self.handle(descriptor))
    }

    /// Registers `class` as an embeddable widget under `as_name`.
    ///
    /// If the class already has a descriptor (from [`PageBook::at`] or an
    /// earlier `embed_as`), that descriptor is reused — a page registered
    /// at a URI and embedded by name share one compiled widget.
    ///
    /// # Errors
    ///
    /// [`PageBookError::DuplicateEmbedName`] if `as_name` is already bound
    /// to a different class.
    pub fn embed_as(&self, class: Arc<PageClass>, as_name: &str) -> Result<Page> {
        let descriptor = {
            let mut by_name = self.by_name.write().unwrap_or_else(PoisonError::into_inner);
            match by_name.get(class.name()) {
                Some(existing) if existing.class().type_id() == class.type_id() => {
                    Arc::clone(existing)
                }
                _ => {
                    let created = Arc::new(PageDescriptor::new(
                        Arc::clone(&class),
                        None,
                        RegistrationKind::Embeddable,
                    ));
                    by_name
                        .entry(class.name().to_string())
                        .or_insert_with(|| Arc::clone(&created));
                    created
                }
            }
        };

        self.embeds.register(as_name, Arc::clone(&descriptor))?;
        tracing::debug!(
            "registered page class {} as embeddable @{}",
            class.name(),
            as_name
        );
        Ok(self.handle(descriptor))
    }

    /// Discards every compiled widget, forcing recompilation on next
    /// resolution. Registrations survive; descriptors shared between the
    /// URI, name, and embed maps stay shared.
    ///
    /// Intended for development-mode reloading.
    pub fn reset(&self) {
        let mut by_uri = self.by_uri.write().unwrap_or_else(PoisonError::into_inner);
        let mut by_name = self.by_name.write().unwrap_or_else(PoisonError::into_inner);

        let mut fresh: HashMap<usize, Arc<PageDescriptor>> = HashMap::new();
        let mut renew = |descriptor: &Arc<PageDescriptor>| -> Arc<PageDescriptor> {
            let key = Arc::as_ptr(descriptor) as usize;
            Arc::clone(
                fresh
                    .entry(key)
                    .or_insert_with(|| Arc::new(descriptor.renewed())),
            )
        };

        for descriptor in by_uri.values_mut() {
            *descriptor = renew(&*descriptor);
        }
        for descriptor in by_name.values_mut() {
            *descriptor = renew(&*descriptor);
        }
        self.embeds.remap(&mut renew);

        tracing::debug!("registry reset: {} descriptors renewed", fresh.len());
    }

    /// Registered URIs, for debugging/listing.
    pub fn uris(&self) -> Vec<String> {
        self.by_uri
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// The embeddable-widget namespace.
    pub fn embeds(&self) -> &EmbedRegistry {
        &self.embeds
    }

    fn lookup_uri(&self, uri: &str) -> Result<Arc<PageDescriptor>> {
        let uri = normalize(uri);
        self.by_uri
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&uri)
            .cloned()
            .ok_or(PageBookError::UnresolvedRoute(uri))
    }

    fn handle(&self, descriptor: Arc<PageDescriptor>) -> Page {
        Page::new(descriptor, Arc::clone(&self.provider))
    }
}

fn normalize(uri: &str) -> String {
    if uri.is_empty() || uri == "/" {
        "/".to_string()
    } else {
        uri.trim_end_matches('/').to_string()
    }
}
