//! The file-driven agent behind a running filter.

use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

use am_access_filter::agent::LocalAgent;
use am_access_filter::config::{AgentSettings, FilterConfig};

mod common;

use common::{client, start_filter, start_mock_backend};

const BOOT: &str = r#"
login_url = "https://idp.example.com/login"
notification_url = "http://127.0.0.1:28502/amagent/notify"
"#;

const POLICY: &str = r#"
not_enforced = ["/public"]

[sessions]
"tok-alice" = "alice"
"tok-bob" = "bob"

[[protected]]
path_prefix = "/admin"
subjects = ["alice"]
"#;

#[tokio::test]
async fn test_local_agent_end_to_end() {
    let backend_addr: SocketAddr = "127.0.0.1:28501".parse().unwrap();
    let filter_addr: SocketAddr = "127.0.0.1:28502".parse().unwrap();
    start_mock_backend(backend_addr, "protected content").await;

    let dir = tempfile::tempdir().unwrap();
    let boot_file = dir.path().join("boot.toml");
    let conf_file = dir.path().join("agent.toml");
    fs::write(&boot_file, BOOT).unwrap();
    fs::write(&conf_file, POLICY).unwrap();

    let mut config = FilterConfig::default();
    config.agent = AgentSettings { boot_file, conf_file };
    config.upstream.address = Some(backend_addr.to_string());

    let (shutdown, runtime) = start_filter(filter_addr, config, LocalAgent::without_watcher()).await;
    let client = client();
    let base = format!("http://{}", filter_addr);

    let res = client.get(format!("{}/public/logo.png", base)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "protected content");

    let res = client.get(format!("{}/app", base)).send().await.unwrap();
    assert_eq!(res.status(), 302);
    assert_eq!(
        res.headers()["location"],
        "https://idp.example.com/login?goto=http%3A%2F%2F127.0.0.1%3A28502%2Fapp"
    );

    let res = client
        .get(format!("{}/admin/users", base))
        .header("cookie", "iPlanetDirectoryPro=tok-bob")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let res = client
        .get(format!("{}/admin/users", base))
        .header("cookie", "iPlanetDirectoryPro=tok-alice")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client.post(format!("{}/amagent/notify", base)).body("").send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "OK\n");

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(100)).await;
    runtime.shutdown();
    assert!(runtime.is_shut_down());
}
