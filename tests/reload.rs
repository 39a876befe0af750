//! End-to-end load and reload through real file sources.

use std::time::Duration;

use loadwatch::config::{self, build_loader_watcher};
use loadwatch::hooks::{HookError, LoaderHooks};
use loadwatch::loader::FileLoader;
use loadwatch::watcher::{NopWatcher, TickerWatcher};
use loadwatch::{Engine, EngineError, LoaderWatcher, Value, WatchExit};

mod common;

#[tokio::test]
async fn test_polled_file_is_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_source(
        dir.path(),
        "app.toml",
        "[server]\nport = 8080\nhost = \"localhost\"\n",
    );

    let mut engine = Engine::new(common::test_engine_config());
    engine.register_loader_watcher(LoaderWatcher::new(
        FileLoader::new(&path),
        TickerWatcher::new(Duration::from_millis(50)),
    ));

    engine.load_watch().await.unwrap();
    assert_eq!(engine.store().get("server.port"), Some(Value::from(8080)));
    assert_eq!(engine.active_watchers(), 1);

    common::write_source(dir.path(), "app.toml", "[server]\nport = 9090\n");

    let store = engine.store().clone();
    let reloaded = common::eventually(Duration::from_secs(5), || {
        let store = store.clone();
        async move { store.get("server.port") == Some(Value::from(9090)) }
    })
    .await;
    assert!(reloaded, "new value should be picked up by the poll loop");

    // Keys absent from the new file keep their last value.
    assert_eq!(engine.store().get("server.host"), Some(Value::from("localhost")));

    let exits = engine.shutdown().await;
    assert_eq!(exits.len(), 1);
    assert_eq!(exits[0].1, WatchExit::Shutdown);
    assert_eq!(engine.active_watchers(), 0);
}

#[tokio::test]
async fn test_missing_file_reported_after_retries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let mut engine = Engine::new(common::test_engine_config());
    engine.register_loader_watcher(LoaderWatcher::new(
        FileLoader::new(&path)
            .with_max_retry(2)
            .with_retry_delay(Duration::from_millis(5)),
        NopWatcher::new(),
    ));

    let err = engine.load().await.unwrap_err();
    match err {
        EngineError::Load { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("unexpected error: {other}"),
    }
    assert!(engine.store().is_empty());
}

#[tokio::test]
async fn test_hook_validates_loaded_values() {
    let dir = tempfile::tempdir().unwrap();
    let good = common::write_source(dir.path(), "good.json", r#"{"db": {"url": "postgres://x"}}"#);
    let bad = common::write_source(dir.path(), "bad.json", r#"{"db": {"pool": 4}}"#);

    let require_url = || {
        LoaderHooks::new().with(|store| match store.get("db.url") {
            Some(_) => Ok(()),
            None => Err(HookError::new("db.url is required")),
        })
    };

    let mut engine = Engine::new(common::test_engine_config());
    engine.register_loader_watcher(
        LoaderWatcher::new(FileLoader::new(&good), NopWatcher::new()).with_hooks(require_url()),
    );
    engine.load().await.unwrap();

    let mut engine = Engine::new(common::test_engine_config());
    engine.register_loader_watcher(
        LoaderWatcher::new(FileLoader::new(&bad), NopWatcher::new()).with_hooks(require_url()),
    );
    let err = engine.load().await.unwrap_err();
    assert!(matches!(err, EngineError::Hook { .. }));
    // Values are merged before hooks run.
    assert_eq!(engine.store().get("db.pool"), Some(Value::from(4)));
}

#[tokio::test]
async fn test_daemon_config_drives_engine() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::write_source(dir.path(), "app.toml", "name = \"svc\"\n");
    let daemon = common::write_source(
        dir.path(),
        "loadwatch.toml",
        &format!(
            concat!(
                "[engine]\nno_exit_on_error = true\n\n",
                "[[sources]]\nkind = \"file\"\nname = \"app\"\npath = {:?}\n",
            ),
            app.display().to_string()
        ),
    );

    let daemon = config::load_config(&daemon).unwrap();
    let mut engine = Engine::new(daemon.engine.clone());
    for source in &daemon.sources {
        engine.register_loader_watcher(build_loader_watcher(source));
    }
    assert_eq!(engine.loader_watchers()[0].name(), "app");

    engine.load_watch().await.unwrap();
    assert_eq!(engine.store().get("name"), Some(Value::from("svc")));

    // Unwatched sources sit on a NopWatcher until shutdown.
    let exits = engine.shutdown().await;
    assert_eq!(exits, vec![("app".to_string(), WatchExit::Shutdown)]);
}

#[tokio::test]
async fn test_shared_store_across_engines() {
    let dir = tempfile::tempdir().unwrap();
    let a = common::write_source(dir.path(), "a.toml", "a = 1\n");
    let b = common::write_source(dir.path(), "b.toml", "b = 2\n");

    let first = {
        let mut engine = Engine::new(common::test_engine_config());
        engine.register_loader_watcher(LoaderWatcher::new(FileLoader::new(&a), NopWatcher::new()));
        engine
    };
    let mut second = Engine::new(common::test_engine_config()).with_store(first.store().clone());
    second.register_loader_watcher(LoaderWatcher::new(FileLoader::new(&b), NopWatcher::new()));

    first.load().await.unwrap();
    second.load().await.unwrap();

    let snapshot = first.store().snapshot();
    assert_eq!(snapshot.get("a"), Some(&Value::from(1)));
    assert_eq!(snapshot.get("b"), Some(&Value::from(2)));
}
