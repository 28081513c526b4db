// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Instance provider seam.
//!
//! Constructing page objects is an external concern (dependency injection,
//! pooling, whatever the host does). The registry calls the provider once
//! per [`Page::instantiate`](crate::Page::instantiate) and surfaces
//! failures as `Instantiation` errors without interpreting them.

use crate::error::BoxedError;
use crate::page::{PageClass, PageInstance};

/// Constructs live page instances for a page class.
pub trait InstanceProvider: Send + Sync {
    /// Returns a fresh instance of the class's backing type.
    fn instantiate(&self, class: &PageClass) -> std::result::Result<PageInstance, BoxedError>;
}

/// Default provider: delegates to the factory registered on the class
/// itself via [`PageClassBuilder::factory`](crate::PageClassBuilder::factory).
#[derive(Debug, Clone, Copy, Default)]
pub struct FactoryProvider;

impl InstanceProvider for FactoryProvider {
    fn instantiate(&self, class: &PageClass) -> std::result::Result<PageInstance, BoxedError> {
        class.construct()
    }
}
