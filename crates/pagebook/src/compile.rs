// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Cascading widget compilation.
//!
//! The orchestrator decides *when* compilation happens; the external
//! [`TemplateCompiler`] decides *how* markup becomes a widget. Each
//! descriptor is compiled at most once: the compiled slot is read without
//! locking, and the first compile of a descriptor serializes on that
//! descriptor's own mutex so concurrent resolvers of different pages never
//! contend with each other.
//!
//! While compiling, the compiler may request embedded widgets by name
//! through [`EmbedLookup`]; the orchestrator resolves them via the
//! [`EmbedRegistry`] and compiles them transitively (the "cascading"
//! compile). An explicit in-progress stack, scoped to one top-level
//! compile call, turns mutual embeds into a [`PageBookError::CyclicEmbed`]
//! instead of unbounded recursion.

use std::sync::{Arc, PoisonError};

use crate::descriptor::PageDescriptor;
use crate::embed::EmbedRegistry;
use crate::error::{BoxedError, PageBookError, Result};
use crate::page::PageClass;
use crate::widget::Widget;

/// Resolves embedded widget references by name during a compile.
///
/// Handed to [`TemplateCompiler::compile`]; resolving a name compiles the
/// embedded page transitively and returns its cached widget.
pub trait EmbedLookup {
    /// The compiled widget registered under the embeddable name.
    fn widget(&mut self, name: &str) -> Result<Widget>;
}

/// External template compiler seam.
///
/// Given a page class and an embed-resolution callback, produces the
/// compiled widget. Failures are propagated (wrapped as
/// [`PageBookError::Compilation`]) — the orchestrator never retries.
pub trait TemplateCompiler: Send + Sync {
    /// Compiles the class's presentation definition into a widget.
    fn compile(
        &self,
        class: &PageClass,
        embeds: &mut dyn EmbedLookup,
    ) -> std::result::Result<Widget, BoxedError>;
}

/// Drives cascading compilation and caches results on descriptors.
pub struct CompilationOrchestrator {
    compiler: Arc<dyn TemplateCompiler>,
    embeds: Arc<EmbedRegistry>,
}

impl CompilationOrchestrator {
    /// Creates an orchestrator over the given compiler and embed namespace.
    pub fn new(compiler: Arc<dyn TemplateCompiler>, embeds: Arc<EmbedRegistry>) -> Self {
        Self { compiler, embeds }
    }

    /// Compiles the descriptor's widget if absent, returning the cached
    /// widget either way. Safe to call redundantly and concurrently; the
    /// compiler runs at most once per descriptor.
    pub fn compile(&self, descriptor: &Arc<PageDescriptor>) -> Result<Widget> {
        let mut in_progress = Vec::new();
        self.compile_with(descriptor, &mut in_progress)
    }

    fn compile_with(
        &self,
        descriptor: &Arc<PageDescriptor>,
        in_progress: &mut Vec<(usize, String)>,
    ) -> Result<Widget> {
        // Common path: already compiled, no locking.
        if let Some(widget) = descriptor.widget() {
            return Ok(widget);
        }

        let key = Arc::as_ptr(descriptor) as usize;
        let name = descriptor.class().name().to_string();

        // Must run before taking the compile lock: a re-entrant descriptor
        // is still uncompiled and its lock is held by this very call chain.
        if in_progress.iter().any(|(k, _)| *k == key) {
            let chain = in_progress
                .iter()
                .map(|(_, n)| n.as_str())
                .chain(std::iter::once(name.as_str()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(PageBookError::CyclicEmbed { page: name, chain });
        }

        let _guard = descriptor
            .compile_lock()
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Another resolver may have finished while we waited on the lock.
        if let Some(widget) = descriptor.widget() {
            return Ok(widget);
        }

        tracing::debug!("compiling widget for page class {}", name);

        in_progress.push((key, name.clone()));
        let outcome = {
            let mut lookup = OrchestratorLookup {
                orchestrator: self,
                in_progress: &mut *in_progress,
            };
            self.compiler.compile(descriptor.class(), &mut lookup)
        };
        in_progress.pop();

        match outcome {
            Ok(widget) => {
                descriptor.apply(Arc::clone(&widget));
                tracing::debug!("compiled widget for page class {}", name);
                Ok(widget)
            }
            // An inner registry error (cyclic embed, unknown embed name)
            // surfaces as itself rather than double-wrapped.
            Err(e) => match e.downcast::<PageBookError>() {
                Ok(inner) => Err(*inner),
                Err(e) => Err(PageBookError::Compilation {
                    page: name,
                    message: e.to_string(),
                }),
            },
        }
    }
}

struct OrchestratorLookup<'a, 'b> {
    orchestrator: &'a CompilationOrchestrator,
    in_progress: &'b mut Vec<(usize, String)>,
}

impl EmbedLookup for OrchestratorLookup<'_, '_> {
    fn widget(&mut self, name: &str) -> Result<Widget> {
        let descriptor = self
            .orchestrator
            .embeds
            .resolve(name)
            .ok_or_else(|| PageBookError::UnresolvedName(name.to_string()))?;
        self.orchestrator.compile_with(&descriptor, self.in_progress)
    }
}
