// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for the pagebook registry.
//!
//! This module defines [`PageBookError`], the main error enum, and the
//! crate-local [`Result`] alias.
//!
//! # Error Categories
//!
//! - **Registration errors**: duplicate URI or embed-name bindings
//! - **Resolution errors**: no page registered for a URI or logical name
//! - **Compilation errors**: external compiler failure, or a cyclic embed
//! - **Instantiation errors**: the instance provider failed
//! - **Dispatch errors**: no handler for a verb, or no sub-route for a path
//!
//! Resolution and compilation errors are surfaced synchronously to the
//! caller; nothing in this crate retries or falls back. Mapping errors to
//! HTTP responses (404, 405, 500, ...) is the transport layer's job.

use thiserror::Error;

/// Boxed error produced by external collaborators (template compiler,
/// instance provider).
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for pagebook operations.
#[derive(Error, Debug)]
pub enum PageBookError {
    /// A URI or logical name is already bound to a different page class.
    #[error("Duplicate registration: '{key}' is already bound to page class '{existing}'")]
    DuplicateRegistration {
        /// The contested URI or logical name.
        key: String,
        /// Name of the page class already holding the binding.
        existing: String,
    },

    /// An embeddable name is already bound to a different page class.
    #[error("Duplicate embed name: '{name}' is already bound to page class '{existing}'")]
    DuplicateEmbedName {
        /// The contested embeddable name.
        name: String,
        /// Name of the page class already holding the name.
        existing: String,
    },

    /// No page is registered at the requested URI.
    #[error("No page registered at '{0}'")]
    UnresolvedRoute(String),

    /// No page is registered under the requested logical name.
    #[error("No page registered under the name '{0}'")]
    UnresolvedName(String),

    /// A page embeds itself, directly or transitively.
    #[error("Cyclic embed while compiling '{page}': {chain}")]
    CyclicEmbed {
        /// The page whose compilation re-entered itself.
        page: String,
        /// The embed chain that closed the cycle, e.g. `A -> B -> A`.
        chain: String,
    },

    /// The external template compiler failed.
    #[error("Compilation of '{page}' failed: {message}")]
    Compilation {
        /// The page class being compiled.
        page: String,
        /// The compiler's failure, stringified.
        message: String,
    },

    /// The instance provider failed to construct a page instance.
    #[error("Instantiation of '{page}' failed: {message}")]
    Instantiation {
        /// The page class being instantiated.
        page: String,
        /// The provider's failure, stringified.
        message: String,
    },

    /// No handler on the page class matches the HTTP verb.
    #[error("No '{method}' handler on page class '{page}'")]
    NoMatchingHandler {
        /// The page class that was dispatched to.
        page: String,
        /// The unmatched HTTP verb.
        method: String,
    },

    /// No sub-route on the page class matches the residual path.
    #[error("No sub-route on page class '{page}' matches '{path_info}'")]
    NoMatchingRoute {
        /// The page class that was dispatched to.
        page: String,
        /// The unmatched residual path.
        path_info: String,
    },
}

/// Convenience type alias for Results with [`PageBookError`].
pub type Result<T> = std::result::Result<T, PageBookError>;
