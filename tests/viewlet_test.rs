//! End-to-end tests for the call / refresh / expire protocol.

#![cfg(feature = "minijinja")]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Value, json};

use viewlet::{
    Arguments, Context, MemoryCache, MiniJinjaRenderer, Result, Settings, Timeout, ViewletArgs,
    ViewletError, ViewletOptions, ViewletRegistry,
};

// ============================================================================
// Fixtures
// ============================================================================

fn renderer() -> MiniJinjaRenderer {
    MiniJinjaRenderer::new()
        .template("hello_world.html", "Hello {{ name }}!\n")
        .unwrap()
        .template("hello_timestamp.html", "{{ name }} {{ timestamp }}")
        .unwrap()
        .template("hello_request.html", "{{ greeting }} {{ user }}!")
        .unwrap()
}

fn registry() -> ViewletRegistry {
    ViewletRegistry::builder()
        .renderer(renderer())
        .cache("viewlet", MemoryCache::new())
        .build()
        .unwrap()
}

fn hello_world(_: &Context, _: &ViewletArgs<'_>) -> Result<Value> {
    Ok(json!("Hello wörld!"))
}

fn greet(_: &Context, args: &ViewletArgs<'_>) -> Result<Value> {
    Ok(json!({ "name": args.get("name") }))
}

/// Registers a templated viewlet whose payload changes on every computation.
fn counting(registry: &ViewletRegistry, name: &str, timeout: Timeout) -> Arc<AtomicU64> {
    let runs = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&runs);
    ViewletOptions::new()
        .name(name)
        .template("hello_timestamp.html")
        .param("name")
        .timeout(timeout)
        .register(registry, move |_: &Context, args: &ViewletArgs<'_>| {
            let run = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(json!({ "name": args.get("name"), "timestamp": run }))
        })
        .unwrap();
    runs
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn greet_end_to_end() {
    let registry = registry();
    ViewletOptions::new()
        .template("hello_world.html")
        .param("name")
        .timeout(Timeout::secs(10))
        .register(&registry, greet)
        .unwrap();

    let html = registry.call("greet", None, ["world"]).unwrap();
    assert_eq!(html, "Hello world!\n");

    let viewlet = registry.get("greet").unwrap();
    let key = viewlet.key_for(["world"]).unwrap();
    assert_eq!(viewlet.cache().get(&key), Some(json!({ "name": "world" })));
}

#[test]
fn zero_config_registration() {
    let registry = registry();
    registry.register_fn(hello_world).unwrap();

    let first = registry.call("hello_world", None, ()).unwrap();
    let second = registry.call("hello_world", None, ()).unwrap();
    assert_eq!(first, "Hello wörld!");
    assert_eq!(first, second);
}

#[test]
fn cached_calls_reuse_payload() {
    let registry = registry();
    let runs = counting(&registry, "hello_cache", Timeout::secs(10));

    let html1 = registry.call("hello_cache", None, ["world"]).unwrap();
    let html2 = registry.call("hello_cache", None, ["world"]).unwrap();
    assert_eq!(html1, html2);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn unicode_arguments_cache() {
    let registry = registry();
    let runs = counting(&registry, "hello_cache", Timeout::secs(10));

    let html1 = registry.call("hello_cache", None, ["wörld"]).unwrap();
    let html2 = registry.call("hello_cache", None, ["wörld"]).unwrap();
    assert_eq!(html1, html2);
    assert!(html1.starts_with("wörld "));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn distinct_arguments_distinct_entries() {
    let registry = registry();
    let runs = counting(&registry, "hello_cache", Timeout::secs(10));

    registry.call("hello_cache", None, ["a"]).unwrap();
    registry.call("hello_cache", None, ["b"]).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn zero_timeout_never_reuses() {
    let registry = registry();
    let runs = counting(&registry, "hello_non_cached", Timeout::DISABLED);

    let html1 = registry.call("hello_non_cached", None, ["world"]).unwrap();
    let html2 = registry.call("hello_non_cached", None, ["world"]).unwrap();
    assert_ne!(html1, html2);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    let viewlet = registry.get("hello_non_cached").unwrap();
    assert!(!viewlet.is_using_cache());
    let key = viewlet.key_for(["world"]).unwrap();
    assert!(viewlet.cache().get(&key).is_none());
}

#[test]
fn refresh_replaces_cached_payload() {
    let registry = registry();
    counting(&registry, "hello_cached_timestamp", Timeout::secs(10));

    let html1 = registry.call("hello_cached_timestamp", None, ["world"]).unwrap();
    let refreshed = registry.refresh("hello_cached_timestamp", ["world"]).unwrap();
    let html2 = registry.call("hello_cached_timestamp", None, ["world"]).unwrap();
    assert_ne!(html1, html2);
    assert_eq!(refreshed, html2);

    let viewlet = registry.get("hello_cached_timestamp").unwrap();
    viewlet.refresh(["world"]).unwrap();
    let html3 = registry.call("hello_cached_timestamp", None, ["world"]).unwrap();
    assert_ne!(html3, html2);
}

#[test]
fn refresh_uses_empty_context() {
    let registry = registry();
    ViewletOptions::new()
        .name("hello_request")
        .template("hello_request.html")
        .param("greeting")
        .timeout(Timeout::secs(10))
        .register(&registry, |_: &Context, args: &ViewletArgs<'_>| {
            Ok(json!({ "greeting": args.get("greeting") }))
        })
        .unwrap();

    let context = Context::new().with("user", "nicolas cage");
    let html = registry
        .call("hello_request", Some(&context), ["nice to see you"])
        .unwrap();
    assert_eq!(html, "nice to see you nicolas cage!");

    let refreshed = registry.refresh("hello_request", ["nice to see you"]).unwrap();
    assert_eq!(refreshed, "nice to see you !");

    // Only the payload is cached; the caller's context still renders.
    let other = Context::new().with("user", "castor troy");
    let html = registry
        .call("hello_request", Some(&other), ["nice to see you"])
        .unwrap();
    assert_eq!(html, "nice to see you castor troy!");
}

#[test]
fn expire_removes_entry() {
    let registry = registry();
    let runs = counting(&registry, "hello_cache", Timeout::secs(10));
    let viewlet = registry.get("hello_cache").unwrap();
    let key = viewlet.key_for(["world"]).unwrap();

    viewlet.call(&Context::new(), ["world"]).unwrap();
    assert!(viewlet.cache().get(&key).is_some());

    registry.expire("hello_cache", ["world"]).unwrap();
    assert!(viewlet.cache().get(&key).is_none());

    // Expiring twice is a no-op.
    viewlet.expire(["world"]).unwrap();

    viewlet.call(&Context::new(), ["world"]).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn cached_payload_is_a_mapping() {
    let registry = registry();
    counting(&registry, "hello_cached_timestamp", Timeout::secs(10));
    registry.call("hello_cached_timestamp", None, ["world"]).unwrap();

    let viewlet = registry.get("hello_cached_timestamp").unwrap();
    let key = viewlet.key_for(["world"]).unwrap();
    let payload = viewlet.cache().get(&key).unwrap();
    assert_eq!(payload["name"], "world");
    assert!(payload.is_object());
}

#[test]
fn infinite_timeout_uses_setting() {
    let settings = Settings {
        infinite_timeout_secs: 1_000,
        ..Settings::default()
    };
    let registry = ViewletRegistry::builder()
        .settings(settings)
        .renderer(renderer())
        .build()
        .unwrap();
    counting(&registry, "hello_infinite_cache", Timeout::Infinite);

    let viewlet = registry.get("hello_infinite_cache").unwrap();
    assert_eq!(viewlet.timeout().as_secs(), 1_000);
    assert!(viewlet.is_using_cache());
}

#[test]
fn default_timeout_setting_wins_over_backend() {
    let settings = Settings {
        default_timeout: Timeout::secs(42),
        ..Settings::default()
    };
    let registry = ViewletRegistry::builder()
        .settings(settings)
        .renderer(renderer())
        .build()
        .unwrap();
    let viewlet = registry.register_fn(hello_world).unwrap();
    assert_eq!(viewlet.timeout().as_secs(), 42);
}

#[test]
fn infinite_default_timeout_setting() {
    let settings = Settings::from_toml_str(
        r#"
        default_timeout = "infinite"
        infinite_timeout_secs = 7200
        "#,
    )
    .unwrap();
    let registry = ViewletRegistry::builder()
        .settings(settings)
        .renderer(renderer())
        .build()
        .unwrap();

    let viewlet = registry.register_fn(hello_world).unwrap();
    assert_eq!(viewlet.timeout().as_secs(), 7200);
    assert!(viewlet.is_using_cache());

    // An explicit per-viewlet timeout still wins.
    let runs = counting(&registry, "hello_cache", Timeout::secs(10));
    assert_eq!(registry.get("hello_cache").unwrap().timeout().as_secs(), 10);
    registry.call("hello_cache", None, ["world"]).unwrap();
    registry.call("hello_cache", None, ["world"]).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn expire_on_uncached_viewlet_is_a_no_op() {
    let registry = registry();
    let viewlet = ViewletOptions::new()
        .name("nocache")
        .key("somekey")
        .param("a")
        .timeout(Timeout::DISABLED)
        .register(&registry, hello_world)
        .unwrap();
    viewlet
        .cache()
        .set("somekey", json!("kept"), std::time::Duration::from_secs(10));

    assert_eq!(registry.call("nocache", None, ["x"]).unwrap(), "Hello wörld!");
    assert_eq!(registry.refresh("nocache", ["x"]).unwrap(), "Hello wörld!");
    registry.expire("nocache", ["x"]).unwrap();
    assert_eq!(viewlet.cache().get("somekey"), Some(json!("kept")));
}

#[test]
fn parameter_defaults_and_named_arguments() {
    let registry = registry();
    ViewletOptions::new()
        .name("hello_name")
        .param_default("name", "wurld")
        .register(&registry, |_: &Context, args: &ViewletArgs<'_>| {
            Ok(json!(format!("Hello {}", args.str("name").unwrap_or_default())))
        })
        .unwrap();

    assert_eq!(registry.call("hello_name", None, ()).unwrap(), "Hello wurld");
    assert_eq!(
        registry
            .call("hello_name", None, Arguments::new().kwarg("name", "wörld"))
            .unwrap(),
        "Hello wörld"
    );
    // Undeclared names are ignored.
    assert_eq!(
        registry
            .call("hello_name", None, Arguments::new().kwarg("nope", 1))
            .unwrap(),
        "Hello wurld"
    );
}

#[test]
fn named_argument_overrides_positional() {
    let registry = registry();
    let runs = counting(&registry, "hello_cache", Timeout::secs(10));

    let positional = registry.call("hello_cache", None, ["world"]).unwrap();
    let overridden = registry
        .call(
            "hello_cache",
            None,
            Arguments::new().arg("ignored").kwarg("name", "world"),
        )
        .unwrap();
    assert_eq!(positional, overridden);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn too_many_positional_arguments() {
    let registry = registry();
    counting(&registry, "hello_cache", Timeout::secs(10));

    let err = registry.call("hello_cache", None, ["a", "b"]).unwrap_err();
    assert!(matches!(
        err,
        ViewletError::InvalidArguments {
            expected: 1,
            given: 2,
            ..
        }
    ));
}

#[test]
fn context_is_not_part_of_the_key() {
    let registry = registry();
    let runs = counting(&registry, "hello_cache", Timeout::secs(10));

    let a = Context::new().with("user", "a");
    let b = Context::new().with("user", "b");
    registry.call("hello_cache", Some(&a), ["world"]).unwrap();
    registry.call("hello_cache", Some(&b), ["world"]).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn payload_overrides_context_entries() {
    let registry = registry();
    ViewletOptions::new()
        .template("hello_world.html")
        .param("name")
        .register(&registry, greet)
        .unwrap();

    let context = Context::new().with("name", "context");
    let html = registry.call("greet", Some(&context), ["payload"]).unwrap();
    assert_eq!(html, "Hello payload!\n");
    // The caller's context is left untouched.
    assert_eq!(context.get("name"), Some(&json!("context")));
}

#[test]
fn legacy_string_payload_returned_unmodified() {
    let registry = registry();
    let viewlet = ViewletOptions::new()
        .template("hello_world.html")
        .param("name")
        .timeout(Timeout::secs(10))
        .register(&registry, greet)
        .unwrap();

    let key = viewlet.key_for(["world"]).unwrap();
    viewlet.cache().set(
        &key,
        json!("<h1>old markup</h1>"),
        std::time::Duration::from_secs(10),
    );
    assert_eq!(
        registry.call("greet", None, ["world"]).unwrap(),
        "<h1>old markup</h1>"
    );
}

#[test]
fn cached_null_counts_as_miss() {
    let registry = registry();
    let runs = counting(&registry, "hello_cache", Timeout::secs(10));
    let viewlet = registry.get("hello_cache").unwrap();
    let key = viewlet.key_for(["world"]).unwrap();

    viewlet
        .cache()
        .set(&key, Value::Null, std::time::Duration::from_secs(10));
    registry.call("hello_cache", None, ["world"]).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn callable_errors_propagate_and_cache_nothing() {
    let registry = registry();
    let viewlet = ViewletOptions::new()
        .name("broken")
        .param("name")
        .timeout(Timeout::secs(10))
        .register(&registry, |_: &Context, _: &ViewletArgs<'_>| {
            Err(ViewletError::Callable("boom".to_string()))
        })
        .unwrap();

    let err = registry.call("broken", None, ["x"]).unwrap_err();
    assert!(err.to_string().contains("boom"));
    let key = viewlet.key_for(["x"]).unwrap();
    assert!(viewlet.cache().get(&key).is_none());
}
