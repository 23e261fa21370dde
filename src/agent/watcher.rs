//! Policy file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::agent::local::{swap_policy, AgentProperties, PolicyProperties};

/// Watches the agent's policy file and publishes new snapshots.
pub struct PolicyWatcher {
    path: PathBuf,
    properties: Arc<ArcSwapOption<AgentProperties>>,
}

impl PolicyWatcher {
    pub fn new(path: &Path, properties: Arc<ArcSwapOption<AgentProperties>>) -> Self {
        Self {
            path: path.to_path_buf(),
            properties,
        }
    }

    /// Start watching the file in a background thread.
    ///
    /// Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let properties = self.properties;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "Agent policy change detected, reloading...");
                        match PolicyProperties::load(&path) {
                            Ok(policy) => {
                                if !swap_policy(&properties, policy) {
                                    tracing::warn!("Agent not initialized; policy reload ignored");
                                }
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload agent policy. Keeping current policy.");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Agent policy watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::agent::local::BootProperties;

    #[test]
    fn test_watcher_reloads_policy() {
        let dir = tempfile::tempdir().unwrap();
        let policy_path = dir.path().join("agent.toml");
        fs::write(&policy_path, "not_enforced = []\n").unwrap();

        let properties = Arc::new(ArcSwapOption::from_pointee(AgentProperties {
            boot: BootProperties {
                login_url: "https://idp.example.com/login".into(),
                cookie_name: "sid".into(),
                notification_url: None,
            },
            policy: PolicyProperties::default(),
        }));

        let _watcher = PolicyWatcher::new(&policy_path, properties.clone()).run().unwrap();
        fs::write(&policy_path, "not_enforced = [\"/open\"]\n").unwrap();

        let mut reloaded = false;
        for _ in 0..50 {
            std::thread::sleep(Duration::from_millis(100));
            if let Some(current) = properties.load_full() {
                if current.policy.is_not_enforced("/open/file") {
                    reloaded = true;
                    break;
                }
            }
        }
        assert!(reloaded, "policy change was not picked up");
    }
}
