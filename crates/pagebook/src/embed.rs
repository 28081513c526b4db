// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Embeddable-widget namespace.
//!
//! Maps an embeddable annotation name (the `"Hello"` in `@Hello`) to the
//! page descriptor backing it. Purely a lookup table: the compilation
//! orchestrator consults it while compiling, and compiles the resolved
//! descriptors transitively itself.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::descriptor::PageDescriptor;
use crate::error::{PageBookError, Result};

/// Registry of embeddable names.
///
/// Holds non-owning shares of descriptors owned by the
/// [`PageBook`](crate::PageBook); a descriptor may be reachable by URI and
/// by embed name simultaneously.
#[derive(Debug, Default)]
pub struct EmbedRegistry {
    entries: RwLock<HashMap<String, Arc<PageDescriptor>>>,
}

impl EmbedRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to the given descriptor.
    ///
    /// Re-registering the same page class under the same name is
    /// idempotent (the original descriptor stays). Binding a name already
    /// held by a different class is [`PageBookError::DuplicateEmbedName`] —
    /// never a silent override.
    pub fn register(&self, name: &str, descriptor: Arc<PageDescriptor>) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = entries.get(name) {
            if existing.class().type_id() == descriptor.class().type_id() {
                return Ok(());
            }
            return Err(PageBookError::DuplicateEmbedName {
                name: name.to_string(),
                existing: existing.class().name().to_string(),
            });
        }

        entries.insert(name.to_string(), descriptor);
        Ok(())
    }

    /// Looks up the descriptor bound to `name`.
    pub fn resolve(&self, name: &str) -> Option<Arc<PageDescriptor>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered embeddable names, for diagnostics.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Swaps every entry through `renew`, preserving keys. Used by
    /// registry reset.
    pub(crate) fn remap(
        &self,
        renew: &mut dyn FnMut(&Arc<PageDescriptor>) -> Arc<PageDescriptor>,
    ) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for descriptor in entries.values_mut() {
            *descriptor = renew(&*descriptor);
        }
    }
}
