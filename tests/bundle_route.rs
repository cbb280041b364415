//! Client bundle routes served end to end.

use std::net::SocketAddr;
use std::time::Duration;

use hydrate_router::hydrate::DEFAULT_IMPORT;
use serde_json::Value;

mod common;

use common::{counter_config, start_app, FakeCompiler, BUNDLE_PATH};

#[tokio::test]
async fn test_bundle_compiled_once_then_cached() {
    let addr: SocketAddr = "127.0.0.1:28301".parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let compiler = FakeCompiler::new();
    let shutdown = start_app(counter_config(addr, dir.path()), compiler.clone()).await;
    let client = common::client();

    let first = client.get(format!("http://{addr}{BUNDLE_PATH}")).send().await.unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(
        first.headers()["content-type"],
        "application/javascript; charset=UTF-8"
    );
    let first_body = first.text().await.unwrap();

    let second = client.get(format!("http://{addr}{BUNDLE_PATH}")).send().await.unwrap();
    assert_eq!(second.status(), 200);
    assert_eq!(second.text().await.unwrap(), first_body);

    assert_eq!(first_body, "console.log(\"build 1\");");
    assert_eq!(compiler.init_count(), 1);
    assert_eq!(compiler.build_count(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_generated_source_mounts_component() {
    let addr: SocketAddr = "127.0.0.1:28302".parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let compiler = FakeCompiler::new();
    let shutdown = start_app(counter_config(addr, dir.path()), compiler.clone()).await;

    let res = common::client()
        .get(format!("http://{addr}{BUNDLE_PATH}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let sources = compiler.sources.lock().unwrap().clone();
    assert_eq!(sources.len(), 1);
    let source = &sources[0];
    assert!(source.starts_with("/** @jsx h */\n"));
    assert!(source.contains(DEFAULT_IMPORT));
    assert!(source.contains("export class Counter extends Component"));
    assert!(source.ends_with("hydrate(<Counter />, document.getElementById(\"counter\"),true);"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_empty_build_output_is_not_found() {
    let addr: SocketAddr = "127.0.0.1:28303".parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let compiler = FakeCompiler::empty_output();
    let shutdown = start_app(counter_config(addr, dir.path()), compiler.clone()).await;
    let client = common::client();

    for _ in 0..2 {
        let res = client.get(format!("http://{addr}{BUNDLE_PATH}")).send().await.unwrap();
        assert_eq!(res.status(), 404);
        assert!(res.text().await.unwrap().is_empty());
    }

    // Nothing was cached, so the second request compiled again.
    assert_eq!(compiler.build_count(), 2);

    shutdown.trigger();
}

#[tokio::test]
async fn test_init_failure_is_server_error_and_sticky() {
    let addr: SocketAddr = "127.0.0.1:28304".parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let compiler = FakeCompiler::failing_init();
    let shutdown = start_app(counter_config(addr, dir.path()), compiler.clone()).await;
    let client = common::client();

    for _ in 0..3 {
        let res = client.get(format!("http://{addr}{BUNDLE_PATH}")).send().await.unwrap();
        assert_eq!(res.status(), 500);
    }
    assert_eq!(compiler.init_count(), 1);
    assert_eq!(compiler.build_count(), 0);

    let status: Value = client
        .get(format!("http://{addr}/_hydrate/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["gate"]["status"], "failed");

    shutdown.trigger();
}

#[tokio::test]
async fn test_bundle_route_is_get_only() {
    let addr: SocketAddr = "127.0.0.1:28305".parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let compiler = FakeCompiler::new();
    let shutdown = start_app(counter_config(addr, dir.path()), compiler.clone()).await;

    let res = common::client()
        .post(format!("http://{addr}{BUNDLE_PATH}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 405);
    assert_eq!(res.headers()["accept"], "GET");
    assert_eq!(compiler.build_count(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_status_reports_cache_contents() {
    let addr: SocketAddr = "127.0.0.1:28306".parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let compiler = FakeCompiler::new();
    let shutdown = start_app(counter_config(addr, dir.path()), compiler).await;
    let client = common::client();

    let before: Value = client
        .get(format!("http://{addr}/_hydrate/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(before["gate"]["mode"], "native");
    assert_eq!(before["gate"]["status"], "not_started");
    assert_eq!(before["cache"]["entries"], 0);

    client.get(format!("http://{addr}{BUNDLE_PATH}")).send().await.unwrap();

    let after: Value = client
        .get(format!("http://{addr}/_hydrate/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(after["gate"]["status"], "ready");
    assert_eq!(after["cache"]["entries"], 1);
    assert_eq!(after["cache"]["keys"][0], BUNDLE_PATH);
    assert_eq!(after["cache"]["bytes"], "console.log(\"build 1\");".len());

    shutdown.trigger();
}

#[tokio::test]
async fn test_coalesced_concurrent_misses_build_once() {
    let addr: SocketAddr = "127.0.0.1:28307".parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut config = counter_config(addr, dir.path());
    config.bundler.coalesce_builds = true;
    let compiler = FakeCompiler::slow(Duration::from_millis(300));
    let shutdown = start_app(config, compiler.clone()).await;
    let client = common::client();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let res = client.get(format!("http://{addr}{BUNDLE_PATH}")).send().await.unwrap();
            assert_eq!(res.status(), 200);
            res.text().await.unwrap()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), "console.log(\"build 1\");");
    }
    assert_eq!(compiler.init_count(), 1);
    assert_eq!(compiler.build_count(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_uncoalesced_concurrent_misses_share_one_init() {
    let addr: SocketAddr = "127.0.0.1:28308".parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let compiler = FakeCompiler::slow(Duration::from_millis(100));
    let shutdown = start_app(counter_config(addr, dir.path()), compiler.clone()).await;
    let client = common::client();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client.get(format!("http://{addr}{BUNDLE_PATH}")).send().await.unwrap().status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }

    assert_eq!(compiler.init_count(), 1);
    assert!(compiler.build_count() >= 1);

    // Whatever the race, later requests are served from the cache.
    let builds = compiler.build_count();
    let res = client.get(format!("http://{addr}{BUNDLE_PATH}")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(compiler.build_count(), builds);

    shutdown.trigger();
}
