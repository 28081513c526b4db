// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! End-to-end registry tests: registration, resolution, cascading
//! compilation, embeds, dispatch, and the concurrency guarantees.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use serde_json::json;

use crate::{
    BoxedError, EmbedLookup, FactoryProvider, HandlerBinding, PageBook, PageBookError, PageClass,
    ParamKind, Renderable, RequestParams, StaticWidget, TemplateCompiler, Widget,
};

fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

// -- stubs -----------------------------------------------------------------

/// Widget that records its page name and compiled children, so tests can
/// assert on the cascade shape via rendered output.
#[derive(Debug)]
struct StubWidget {
    name: String,
    children: Vec<Widget>,
}

impl Renderable for StubWidget {
    fn render(&self, page: &dyn std::any::Any, out: &mut String) -> crate::Result<()> {
        out.push('[');
        out.push_str(&self.name);
        for child in &self.children {
            child.render(page, out)?;
        }
        out.push(']');
        Ok(())
    }
}

/// Compiler stub that counts invocations and resolves a configured list of
/// embed names per page class.
#[derive(Debug, Default)]
struct CountingCompiler {
    calls: AtomicUsize,
    embeds_by_class: HashMap<String, Vec<String>>,
    delay: Option<Duration>,
}

impl CountingCompiler {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_embeds(embeds: Vec<(&str, Vec<&str>)>) -> Arc<Self> {
        let embeds_by_class = embeds
            .into_iter()
            .map(|(class, names)| {
                (
                    class.to_string(),
                    names.into_iter().map(|n| n.to_string()).collect(),
                )
            })
            .collect();
        Arc::new(Self {
            embeds_by_class,
            ..Self::default()
        })
    }

    fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TemplateCompiler for CountingCompiler {
    fn compile(
        &self,
        class: &PageClass,
        embeds: &mut dyn EmbedLookup,
    ) -> std::result::Result<Widget, BoxedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let mut children = Vec::new();
        if let Some(names) = self.embeds_by_class.get(class.name()) {
            for name in names {
                children.push(embeds.widget(name)?);
            }
        }

        Ok(Arc::new(StubWidget {
            name: class.name().to_string(),
            children,
        }))
    }
}

#[derive(Debug)]
struct FailingCompiler;

impl TemplateCompiler for FailingCompiler {
    fn compile(
        &self,
        _class: &PageClass,
        _embeds: &mut dyn EmbedLookup,
    ) -> std::result::Result<Widget, BoxedError> {
        Err("template is malformed".into())
    }
}

// -- fixture pages ---------------------------------------------------------

#[derive(Default)]
struct HomePage;

#[derive(Default)]
struct WikiPage {
    edits: u32,
}

#[derive(Default)]
struct HelloPage;

fn home_class() -> Arc<PageClass> {
    PageClass::builder::<HomePage>("Home")
        .factory(|| Ok(Box::new(HomePage)))
        .route(HandlerBinding::new("GET", |_, _| json!("home")))
        .build()
}

fn wiki_class() -> Arc<PageClass> {
    PageClass::builder::<WikiPage>("Wiki")
        .factory(|| Ok(Box::new(WikiPage::default())))
        .route(HandlerBinding::new("GET", |_, _| json!("wiki-index")))
        .route(
            HandlerBinding::new("POST", |page, args| {
                let wiki = page.downcast_mut::<WikiPage>().unwrap();
                wiki.edits += 1;
                json!({ "topic": args[0].clone(), "edits": wiki.edits })
            })
            .at("/{topic}")
            .param("topic", ParamKind::Str),
        )
        .build()
}

fn hello_class() -> Arc<PageClass> {
    PageClass::builder::<HelloPage>("Hello").build()
}

fn book_with(compiler: Arc<dyn TemplateCompiler>) -> PageBook {
    init_logging();
    PageBook::new(compiler, Arc::new(FactoryProvider))
}

fn rendered(widget: &Widget) -> String {
    let mut out = String::new();
    widget.render(&(), &mut out).unwrap();
    out
}

// -- registration & resolution ---------------------------------------------

#[test]
fn test_get_returns_registered_class() {
    let book = book_with(CountingCompiler::new());
    book.at("/home", home_class()).unwrap();

    let page = book.get("/home").unwrap();
    assert_eq!(page.page_class().name(), "Home");
    assert_eq!(page.page_class().type_id(), TypeId::of::<HomePage>());
}

#[test]
fn test_reregistering_same_class_is_idempotent() {
    let book = book_with(CountingCompiler::new());
    book.at("/home", home_class()).unwrap();
    book.at("/home", home_class()).unwrap();

    assert_eq!(book.uris().len(), 1);
}

#[test]
fn test_duplicate_uri_different_class_fails() {
    let book = book_with(CountingCompiler::new());
    book.at("/home", home_class()).unwrap();

    let err = book.at("/home", wiki_class()).unwrap_err();
    assert!(matches!(err, PageBookError::DuplicateRegistration { .. }));
}

#[test]
fn test_unresolved_route_and_name() {
    let book = book_with(CountingCompiler::new());

    assert!(matches!(
        book.get("/nowhere").unwrap_err(),
        PageBookError::UnresolvedRoute(_)
    ));
    assert!(matches!(
        book.non_compiling_get("/nowhere").unwrap_err(),
        PageBookError::UnresolvedRoute(_)
    ));
    assert!(matches!(
        book.for_name("Nobody").unwrap_err(),
        PageBookError::UnresolvedName(_)
    ));
}

#[test]
fn test_uri_normalization_on_lookup() {
    let book = book_with(CountingCompiler::new());
    book.at("/wiki/", wiki_class()).unwrap();

    assert!(book.get("/wiki").is_ok());
    assert!(book.get("/wiki/").is_ok());
    // Exact match only: no prefix fallback
    assert!(book.get("/wiki/sub").is_err());
}

#[test]
fn test_for_name_resolves_and_compiles() {
    let compiler = CountingCompiler::new();
    let book = book_with(compiler.clone());
    book.at("/wiki", wiki_class()).unwrap();

    let page = book.for_name("Wiki").unwrap();
    assert!(page.widget().is_some());
    assert_eq!(compiler.calls(), 1);
}

// -- compilation & memoization ----------------------------------------------

#[test]
fn test_non_compiling_get_never_invokes_compiler() {
    let compiler = CountingCompiler::new();
    let book = book_with(compiler.clone());
    book.at("/home", home_class()).unwrap();

    let page = book.non_compiling_get("/home").unwrap();
    assert!(page.widget().is_none());
    assert_eq!(compiler.calls(), 0);
}

#[test]
fn test_get_compiles_once_and_memoizes() {
    let compiler = CountingCompiler::new();
    let book = book_with(compiler.clone());
    book.at("/home", home_class()).unwrap();

    let first = book.get("/home").unwrap().widget().unwrap();
    let second = book.get("/home").unwrap().widget().unwrap();

    assert_eq!(compiler.calls(), 1);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_concurrent_gets_compile_once() {
    const RESOLVERS: usize = 8;

    let compiler = CountingCompiler::with_delay(Duration::from_millis(50));
    let book = Arc::new(book_with(compiler.clone()));
    book.at("/home", home_class()).unwrap();

    let barrier = Arc::new(Barrier::new(RESOLVERS));
    let handles: Vec<_> = (0..RESOLVERS)
        .map(|_| {
            let book = Arc::clone(&book);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                book.get("/home").unwrap().widget().unwrap()
            })
        })
        .collect();

    let widgets: Vec<Widget> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(compiler.calls(), 1);
    for widget in &widgets[1..] {
        assert!(Arc::ptr_eq(&widgets[0], widget));
    }
}

#[test]
fn test_apply_preseeds_and_bypasses_compiler() {
    let compiler = CountingCompiler::new();
    let book = book_with(compiler.clone());

    let page = book.at("/static", home_class()).unwrap();
    page.apply(Arc::new(StaticWidget::new("<h1>fixed</h1>")));

    let resolved = book.get("/static").unwrap();
    assert_eq!(compiler.calls(), 0);
    assert_eq!(rendered(&resolved.widget().unwrap()), "<h1>fixed</h1>");
}

#[test]
fn test_compilation_failure_propagates() {
    let book = book_with(Arc::new(FailingCompiler));
    book.at("/home", home_class()).unwrap();

    let err = book.get("/home").unwrap_err();
    match err {
        PageBookError::Compilation { page, message } => {
            assert_eq!(page, "Home");
            assert!(message.contains("malformed"));
        }
        other => panic!("expected Compilation, got {other:?}"),
    }

    // Not cached: the next resolution tries again.
    assert!(book.get("/home").is_err());
}

// -- embeds -----------------------------------------------------------------

#[test]
fn test_embed_cascade_compiles_transitively() {
    let compiler = CountingCompiler::with_embeds(vec![("Home", vec!["Hello"])]);
    let book = book_with(compiler.clone());

    book.embed_as(hello_class(), "Hello").unwrap();
    book.at("/home", home_class()).unwrap();

    let page = book.get("/home").unwrap();
    assert_eq!(rendered(&page.widget().unwrap()), "[Home[Hello]]");
    // Host and embedded page each compiled exactly once
    assert_eq!(compiler.calls(), 2);

    // The embedded page's widget is cached on its own descriptor
    let hello = book.for_name("Hello").unwrap();
    assert_eq!(rendered(&hello.widget().unwrap()), "[Hello]");
    assert_eq!(compiler.calls(), 2);
}

#[test]
fn test_uri_and_embed_share_one_descriptor() {
    let compiler = CountingCompiler::with_embeds(vec![("Home", vec!["Greeting"])]);
    let book = book_with(compiler.clone());

    book.at("/wiki", wiki_class()).unwrap();
    book.embed_as(wiki_class(), "Greeting").unwrap();
    book.at("/home", home_class()).unwrap();

    let host = book.get("/home").unwrap();
    assert_eq!(rendered(&host.widget().unwrap()), "[Home[Wiki]]");

    // The embed compiled the same descriptor /wiki resolves to
    let direct = book.get("/wiki").unwrap().widget().unwrap();
    let embedded = book.embeds().resolve("Greeting").unwrap().widget().unwrap();
    assert!(Arc::ptr_eq(&direct, &embedded));
    assert_eq!(compiler.calls(), 2);
}

#[test]
fn test_duplicate_embed_name_fails() {
    let book = book_with(CountingCompiler::new());
    book.embed_as(hello_class(), "Hello").unwrap();

    // Same class again: fine
    book.embed_as(hello_class(), "Hello").unwrap();

    let err = book.embed_as(home_class(), "Hello").unwrap_err();
    assert!(matches!(err, PageBookError::DuplicateEmbedName { .. }));
}

#[test]
fn test_self_embed_is_cyclic() {
    let compiler = CountingCompiler::with_embeds(vec![("Hello", vec!["Hello"])]);
    let book = book_with(compiler);

    book.at("/hello", hello_class()).unwrap();
    book.embed_as(hello_class(), "Hello").unwrap();

    let err = book.get("/hello").unwrap_err();
    assert!(matches!(err, PageBookError::CyclicEmbed { .. }));
}

#[test]
fn test_mutual_embed_is_cyclic_not_a_hang() {
    let compiler = CountingCompiler::with_embeds(vec![
        ("Home", vec!["Greeting"]),
        ("Wiki", vec!["Welcome"]),
    ]);
    let book = book_with(compiler);

    // Register the URI first so the embed reuses the same descriptor.
    book.at("/home", home_class()).unwrap();
    book.embed_as(home_class(), "Welcome").unwrap();
    book.embed_as(wiki_class(), "Greeting").unwrap();

    match book.get("/home").unwrap_err() {
        PageBookError::CyclicEmbed { chain, .. } => {
            assert_eq!(chain, "Home -> Wiki -> Home");
        }
        other => panic!("expected CyclicEmbed, got {other:?}"),
    }
}

#[test]
fn test_unknown_embed_name_surfaces() {
    let compiler = CountingCompiler::with_embeds(vec![("Home", vec!["Missing"])]);
    let book = book_with(compiler);
    book.at("/home", home_class()).unwrap();

    let err = book.get("/home").unwrap_err();
    assert!(matches!(err, PageBookError::UnresolvedName(_)));
}

// -- reset ------------------------------------------------------------------

#[test]
fn test_reset_forces_recompilation() {
    let compiler = CountingCompiler::with_embeds(vec![("Home", vec!["Hello"])]);
    let book = book_with(compiler.clone());

    book.embed_as(hello_class(), "Hello").unwrap();
    book.at("/home", home_class()).unwrap();

    book.get("/home").unwrap();
    assert_eq!(compiler.calls(), 2);

    book.reset();

    // Registrations survive, widgets are gone
    assert!(book.non_compiling_get("/home").unwrap().widget().is_none());
    book.get("/home").unwrap();
    assert_eq!(compiler.calls(), 4);
}

// -- instantiation & dispatch -----------------------------------------------

#[test]
fn test_instantiate_and_dispatch_end_to_end() {
    let book = book_with(CountingCompiler::new());
    book.at("/wiki", wiki_class()).unwrap();

    let page = book.get("/wiki").unwrap();
    let mut instance = page.instantiate().unwrap();

    let out = page
        .do_method("GET", instance.as_mut(), "", &RequestParams::new())
        .unwrap();
    assert_eq!(out, json!("wiki-index"));

    let out = page
        .do_method("POST", instance.as_mut(), "/rust", &RequestParams::new())
        .unwrap();
    assert_eq!(out["topic"], "rust");
    assert_eq!(out["edits"], 1);

    // State lives on the instance, not the handle
    let out = page
        .do_method("POST", instance.as_mut(), "/rust", &RequestParams::new())
        .unwrap();
    assert_eq!(out["edits"], 2);
}

#[test]
fn test_dispatch_errors_by_category() {
    let book = book_with(CountingCompiler::new());
    book.at("/wiki", wiki_class()).unwrap();

    let page = book.non_compiling_get("/wiki").unwrap();
    let mut instance = page.instantiate().unwrap();

    assert!(matches!(
        page.do_method("DELETE", instance.as_mut(), "", &RequestParams::new())
            .unwrap_err(),
        PageBookError::NoMatchingHandler { .. }
    ));
    assert!(matches!(
        page.do_method("GET", instance.as_mut(), "/a/b", &RequestParams::new())
            .unwrap_err(),
        PageBookError::NoMatchingRoute { .. }
    ));
}

#[test]
fn test_instantiation_failure_is_wrapped() {
    let book = book_with(CountingCompiler::new());
    // Hello has no factory
    book.at("/hello", hello_class()).unwrap();

    let page = book.non_compiling_get("/hello").unwrap();
    let err = page.instantiate().unwrap_err();
    assert!(matches!(err, PageBookError::Instantiation { .. }));
}
