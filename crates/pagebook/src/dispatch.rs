// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTTP method dispatch.
//!
//! Routes a verb plus residual path to one handler binding on a page
//! class, binds the declared parameters, and invokes the handler on the
//! live page instance. Sub-route patterns use matchit syntax (`/{id}`,
//! `/{*rest}`), matched against the path beyond the page's base URI;
//! path-parameter extraction happens here, not in the registry.
//!
//! # Parameter binding
//!
//! Each binding declares `(name, kind)` pairs; declaration order is
//! argument order. Path captures shadow request parameters of the same
//! name. Values are coerced leniently: a missing parameter or a value that
//! fails to parse binds `Null` — dispatch errors are reserved for route
//! and verb mismatches.

use std::any::Any;
use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::error::{PageBookError, Result};
use crate::page::{PageClass, ParamKind, ParamSpec, RequestParams};

/// Locates and invokes handler methods on page instances.
pub struct MethodDispatcher;

impl MethodDispatcher {
    /// Dispatches `http_method` + `path_info` to the matching handler.
    ///
    /// The handler runs synchronously on the caller's thread; its return
    /// value passes through unchanged. No timeout is imposed.
    pub fn dispatch(
        class: &PageClass,
        http_method: &str,
        instance: &mut dyn Any,
        path_info: &str,
        params: &RequestParams,
    ) -> Result<JsonValue> {
        let verb = http_method.to_ascii_uppercase();

        let (candidates, captures) = Self::match_path(class, path_info)?;

        let index = candidates
            .iter()
            .copied()
            .find(|&i| class.handlers[i].method == verb)
            .ok_or_else(|| PageBookError::NoMatchingHandler {
                page: class.name().to_string(),
                method: verb.clone(),
            })?;

        let binding = &class.handlers[index];
        let args: Vec<JsonValue> = binding
            .params
            .iter()
            .map(|spec| bind_param(spec, &captures, params))
            .collect();

        tracing::debug!(
            "dispatching {} {} on page class {}",
            verb,
            if path_info.is_empty() { "/" } else { path_info },
            class.name()
        );

        Ok((binding.func)(instance, &args))
    }

    /// Resolves `path_info` to candidate handler indices plus any path
    /// captures. Empty or `/` selects the root bindings.
    fn match_path(
        class: &PageClass,
        path_info: &str,
    ) -> Result<(Vec<usize>, HashMap<String, String>)> {
        if path_info.is_empty() || path_info == "/" {
            return Ok((class.root.clone(), HashMap::new()));
        }

        let normalized = if path_info.starts_with('/') {
            path_info.to_string()
        } else {
            format!("/{}", path_info)
        };

        match class.subroutes.at(&normalized) {
            Ok(matched) => {
                let captures = matched
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                Ok((matched.value.clone(), captures))
            }
            Err(_) => Err(PageBookError::NoMatchingRoute {
                page: class.name().to_string(),
                path_info: path_info.to_string(),
            }),
        }
    }
}

fn bind_param(
    spec: &ParamSpec,
    captures: &HashMap<String, String>,
    params: &RequestParams,
) -> JsonValue {
    if let Some(value) = captures.get(&spec.name) {
        return coerce(spec.kind, std::slice::from_ref(value));
    }
    match params.get(&spec.name) {
        Some(values) => coerce(spec.kind, values),
        None => JsonValue::Null,
    }
}

fn coerce(kind: ParamKind, values: &[String]) -> JsonValue {
    let first = values.first().map(String::as_str);
    match kind {
        ParamKind::Str => first
            .map(|s| JsonValue::String(s.to_string()))
            .unwrap_or(JsonValue::Null),
        ParamKind::Int => first
            .and_then(|s| s.parse::<i64>().ok())
            .map(JsonValue::from)
            .unwrap_or(JsonValue::Null),
        ParamKind::Float => first
            .and_then(|s| s.parse::<f64>().ok())
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ParamKind::Bool => first
            .and_then(parse_bool)
            .map(JsonValue::Bool)
            .unwrap_or(JsonValue::Null),
        ParamKind::List => {
            JsonValue::Array(values.iter().map(|v| JsonValue::String(v.clone())).collect())
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}
