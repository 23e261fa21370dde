//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use am_access_filter::agent::{AgentRuntime, AgentStatus, DecisionOracle, RequestCallbacks, Verdict};
use am_access_filter::config::{AgentSettings, FilterConfig};
use am_access_filter::filter::RequestDescriptor;
use am_access_filter::http::HttpServer;
use am_access_filter::lifecycle::Shutdown;

/// Start a simple mock backend that returns a fixed response.
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response_str = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.len(),
                    response
                );
                let _ = socket.write_all(response_str.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });
}

/// An agent that answers every request the same way.
pub struct FixedOracle {
    pub verdict: Verdict,
    pub redirect_target: Option<&'static str>,
    pub status: AgentStatus,
    pub notification_url: &'static str,
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
}

impl FixedOracle {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            redirect_target: None,
            status: AgentStatus::Success,
            notification_url: "",
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    pub fn redirecting_to(target: &'static str) -> Self {
        Self {
            redirect_target: Some(target),
            ..Self::new(Verdict::Redirect)
        }
    }

    pub fn failing(status: AgentStatus) -> Self {
        Self {
            status,
            ..Self::new(Verdict::Ok)
        }
    }

    pub fn with_notification_url(mut self, url: &'static str) -> Self {
        self.notification_url = url;
        self
    }
}

impl DecisionOracle for FixedOracle {
    type Handle = ();

    fn init(&self, _boot_file: &Path, _conf_file: &Path) -> AgentStatus {
        AgentStatus::Success
    }

    fn agent_init(&self) -> AgentStatus {
        AgentStatus::Success
    }

    fn cleanup(&self) {}

    fn acquire_configuration(&self) -> Option<()> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Some(())
    }

    fn release_configuration(&self, _handle: ()) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    fn is_notification_url(&self, url: &str, _handle: &()) -> bool {
        !self.notification_url.is_empty() && url == self.notification_url
    }

    fn decide(&self, _descriptor: &RequestDescriptor, callbacks: &mut RequestCallbacks<'_>, _handle: &()) -> AgentStatus {
        if !self.status.is_success() {
            return self.status;
        }
        callbacks.render_result(self.verdict, self.redirect_target)
    }
}

/// Settings that satisfy the runtime's path checks for in-memory agents.
pub fn placeholder_settings() -> AgentSettings {
    AgentSettings {
        boot_file: "boot.toml".into(),
        conf_file: "agent.toml".into(),
    }
}

/// Boot `oracle`, serve on `addr`, and return the shutdown trigger.
pub async fn start_filter<O: DecisionOracle>(
    addr: SocketAddr,
    mut config: FilterConfig,
    oracle: O,
) -> (Shutdown, Arc<AgentRuntime<O>>) {
    config.listener.bind_address = addr.to_string();
    let runtime = Arc::new(AgentRuntime::start(oracle, &config.agent).unwrap());

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, runtime.clone());
    let listener = TcpListener::bind(addr).await.unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    (shutdown, runtime)
}

/// A client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
