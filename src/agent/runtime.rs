//! Process-wide agent lifecycle.
//!
//! # Responsibilities
//! - Boot the agent once at startup (`init`, then `agent_init`)
//! - Share the booted agent with every request
//! - Run `cleanup` exactly once at shutdown
//!
//! # Design Decisions
//! - Fail fast: a missing path or a failed boot step aborts startup
//! - The runtime is constructed once and injected, never a hidden global

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::agent::oracle::{AgentStatus, DecisionOracle};
use crate::config::AgentSettings;

/// Why the agent could not be started.
#[derive(Debug, Error)]
pub enum AgentStartError {
    #[error("insufficient configuration: please set agent.boot_file")]
    MissingBootFile,

    #[error("insufficient configuration: please set agent.conf_file")]
    MissingConfFile,

    #[error("agent init error status={0}")]
    Init(AgentStatus),

    #[error("agent start error status={0}")]
    AgentInit(AgentStatus),
}

/// A booted agent, shared by all requests until shutdown.
pub struct AgentRuntime<O: DecisionOracle> {
    oracle: O,
    shut_down: AtomicBool,
}

impl<O: DecisionOracle> AgentRuntime<O> {
    /// Boot `oracle` with the configured files.
    pub fn start(oracle: O, settings: &AgentSettings) -> Result<Self, AgentStartError> {
        if settings.boot_file.as_os_str().is_empty() {
            return Err(AgentStartError::MissingBootFile);
        }
        if settings.conf_file.as_os_str().is_empty() {
            return Err(AgentStartError::MissingConfFile);
        }

        let status = oracle.init(&settings.boot_file, &settings.conf_file);
        if !status.is_success() {
            tracing::error!(status = %status, boot_file = ?settings.boot_file, "Agent init failed");
            return Err(AgentStartError::Init(status));
        }

        let status = oracle.agent_init();
        if !status.is_success() {
            tracing::error!(status = %status, "Agent start failed");
            oracle.cleanup();
            return Err(AgentStartError::AgentInit(status));
        }

        tracing::info!(
            boot_file = ?settings.boot_file,
            conf_file = ?settings.conf_file,
            "Agent initialized"
        );

        Ok(Self {
            oracle,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Clean the agent up. Later calls do nothing.
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            self.oracle.cleanup();
            tracing::info!("Agent cleaned up");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl<O: DecisionOracle> Drop for AgentRuntime<O> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use crate::agent::callbacks::RequestCallbacks;
    use crate::filter::descriptor::RequestDescriptor;

    #[derive(Default)]
    struct Calls {
        init: AtomicUsize,
        agent_init: AtomicUsize,
        cleanup: AtomicUsize,
    }

    struct BootOracle {
        calls: Arc<Calls>,
        init_status: AgentStatus,
        agent_init_status: AgentStatus,
    }

    impl BootOracle {
        fn new(calls: Arc<Calls>) -> Self {
            Self {
                calls,
                init_status: AgentStatus::Success,
                agent_init_status: AgentStatus::Success,
            }
        }
    }

    impl DecisionOracle for BootOracle {
        type Handle = ();

        fn init(&self, _boot_file: &Path, _conf_file: &Path) -> AgentStatus {
            self.calls.init.fetch_add(1, Ordering::SeqCst);
            self.init_status
        }

        fn agent_init(&self) -> AgentStatus {
            self.calls.agent_init.fetch_add(1, Ordering::SeqCst);
            self.agent_init_status
        }

        fn cleanup(&self) {
            self.calls.cleanup.fetch_add(1, Ordering::SeqCst);
        }

        fn acquire_configuration(&self) -> Option<()> {
            Some(())
        }

        fn release_configuration(&self, _handle: ()) {}

        fn is_notification_url(&self, _url: &str, _handle: &()) -> bool {
            false
        }

        fn decide(&self, _descriptor: &RequestDescriptor, _callbacks: &mut RequestCallbacks<'_>, _handle: &()) -> AgentStatus {
            AgentStatus::Success
        }
    }

    fn settings(boot: &str, conf: &str) -> AgentSettings {
        AgentSettings {
            boot_file: boot.into(),
            conf_file: conf.into(),
        }
    }

    #[test]
    fn test_start_and_shutdown_once() {
        let calls = Arc::new(Calls::default());
        let runtime = AgentRuntime::start(BootOracle::new(calls.clone()), &settings("boot", "conf")).unwrap();
        assert_eq!(calls.init.load(Ordering::SeqCst), 1);
        assert_eq!(calls.agent_init.load(Ordering::SeqCst), 1);

        runtime.shutdown();
        runtime.shutdown();
        assert!(runtime.is_shut_down());
        drop(runtime);
        assert_eq!(calls.cleanup.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_cleans_up() {
        let calls = Arc::new(Calls::default());
        drop(AgentRuntime::start(BootOracle::new(calls.clone()), &settings("boot", "conf")).unwrap());
        assert_eq!(calls.cleanup.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_paths_rejected() {
        let calls = Arc::new(Calls::default());
        let err = AgentRuntime::start(BootOracle::new(calls.clone()), &settings("", "conf")).err().unwrap();
        assert!(matches!(err, AgentStartError::MissingBootFile));

        let err = AgentRuntime::start(BootOracle::new(calls.clone()), &settings("boot", "")).err().unwrap();
        assert!(matches!(err, AgentStartError::MissingConfFile));
        assert_eq!(calls.init.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_init_aborts() {
        let calls = Arc::new(Calls::default());
        let mut oracle = BootOracle::new(calls.clone());
        oracle.init_status = AgentStatus::Failure;
        let err = AgentRuntime::start(oracle, &settings("boot", "conf")).err().unwrap();

        assert!(matches!(err, AgentStartError::Init(AgentStatus::Failure)));
        assert_eq!(calls.agent_init.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_agent_init_aborts() {
        let calls = Arc::new(Calls::default());
        let mut oracle = BootOracle::new(calls.clone());
        oracle.agent_init_status = AgentStatus::ServiceNotAvailable;
        let err = AgentRuntime::start(oracle, &settings("boot", "conf")).err().unwrap();

        assert!(matches!(err, AgentStartError::AgentInit(AgentStatus::ServiceNotAvailable)));
        assert_eq!(calls.cleanup.load(Ordering::SeqCst), 1);
    }
}
