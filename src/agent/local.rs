//! File-driven agent.
//!
//! # Files
//! ```text
//! boot file (TOML)                     policy file (TOML)
//!   login_url = "https://idp/login"      not_enforced = ["/public"]
//!   cookie_name = "iPlanetDirectoryPro"  [sessions]
//!   notification_url = "http://.../n"    "token" = "alice"
//!                                        [[protected]]
//!                                        path_prefix = "/admin"
//!                                        subjects = ["alice"]
//! ```
//!
//! # Decision
//! - Unparsable URL: status `InvalidArgument`, no verdict
//! - Path under a `not_enforced` prefix: OK
//! - No session cookie, or an unknown token: REDIRECT to the login URL with
//!   `goto=<original url>`
//! - Known token: bind the subject, then FORBIDDEN if a matching `protected`
//!   entry does not list it, OK otherwise
//!
//! Configuration handles are `Arc` snapshots; a policy reload never
//! changes a snapshot a request already holds.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwapOption;
use notify::RecommendedWatcher;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::agent::callbacks::RequestCallbacks;
use crate::agent::oracle::{AgentStatus, DecisionOracle, Verdict};
use crate::agent::watcher::PolicyWatcher;
use crate::filter::descriptor::RequestDescriptor;

/// Error loading one of the agent's files.
#[derive(Debug, Error)]
pub enum PropertiesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid login_url: {0}")]
    InvalidLoginUrl(#[from] url::ParseError),
}

fn default_cookie_name() -> String {
    "iPlanetDirectoryPro".to_string()
}

/// Bootstrap properties, read once at init.
#[derive(Debug, Clone, Deserialize)]
pub struct BootProperties {
    /// Where unauthenticated requests are sent.
    pub login_url: String,

    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// URL the identity provider posts notifications to.
    #[serde(default)]
    pub notification_url: Option<String>,
}

impl BootProperties {
    fn load(path: &Path) -> Result<Self, PropertiesError> {
        let boot: Self = toml::from_str(&fs::read_to_string(path)?)?;
        Url::parse(&boot.login_url)?;
        Ok(boot)
    }

    /// Login URL carrying the original request URL in `goto`.
    pub fn login_redirect(&self, original_url: &str) -> Result<String, url::ParseError> {
        let mut login = Url::parse(&self.login_url)?;
        login.query_pairs_mut().append_pair("goto", original_url);
        Ok(login.into())
    }
}

/// Path restricted to a set of subjects.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtectedPath {
    pub path_prefix: String,
    #[serde(default)]
    pub subjects: Vec<String>,
}

/// Reloadable policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyProperties {
    /// Path prefixes that skip enforcement.
    pub not_enforced: Vec<String>,

    /// Session token → subject.
    pub sessions: HashMap<String, String>,

    pub protected: Vec<ProtectedPath>,
}

impl PolicyProperties {
    pub fn load(path: &Path) -> Result<Self, PropertiesError> {
        Ok(toml::from_str(&fs::read_to_string(path)?)?)
    }

    pub fn is_not_enforced(&self, path: &str) -> bool {
        let path = canonical_path(path);
        self.not_enforced.iter().any(|prefix| under_prefix(&path, prefix))
    }

    /// Every protected prefix matching `path` must list `subject`.
    pub fn permits(&self, path: &str, subject: &str) -> bool {
        let path = canonical_path(path);
        self.protected
            .iter()
            .filter(|p| under_prefix(&path, &p.path_prefix))
            .all(|p| p.subjects.iter().any(|s| s == subject))
    }
}

/// Path as an upstream would resolve it: percent-decoded, empty and `.`
/// segments dropped, `..` applied.
fn canonical_path(path: &str) -> String {
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Whole-segment prefix match: `/public` covers `/public/x`, not `/public-x`.
fn under_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    prefix.is_empty()
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// One consistent view of the agent's files.
#[derive(Debug, Clone)]
pub struct AgentProperties {
    pub boot: BootProperties,
    pub policy: PolicyProperties,
}

/// Value of cookie `name` in a `Cookie` header.
fn session_token<'c>(cookie_header: &'c str, name: &str) -> Option<&'c str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// An agent configured from a boot file and a watched policy file.
pub struct LocalAgent {
    properties: Arc<ArcSwapOption<AgentProperties>>,
    conf_file: Mutex<Option<PathBuf>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
    watch_policy: bool,
}

impl LocalAgent {
    /// An agent that reloads its policy file when it changes.
    pub fn new() -> Self {
        Self {
            properties: Arc::new(ArcSwapOption::empty()),
            conf_file: Mutex::new(None),
            watcher: Mutex::new(None),
            watch_policy: true,
        }
    }

    /// An agent whose policy only changes through [`LocalAgent::reload_policy`].
    pub fn without_watcher() -> Self {
        Self {
            watch_policy: false,
            ..Self::new()
        }
    }

    /// Re-read the policy file, keeping the current policy on failure.
    pub fn reload_policy(&self) -> Result<(), PropertiesError> {
        let path = self.conf_file.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match path {
            Some(path) => {
                let policy = PolicyProperties::load(&path)?;
                swap_policy(&self.properties, policy);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Default for LocalAgent {
    fn default() -> Self {
        Self::new()
    }
}

/// Publish `policy` alongside the current boot properties.
pub(crate) fn swap_policy(properties: &ArcSwapOption<AgentProperties>, policy: PolicyProperties) -> bool {
    match properties.load_full() {
        Some(current) => {
            properties.store(Some(Arc::new(AgentProperties {
                boot: current.boot.clone(),
                policy,
            })));
            true
        }
        None => false,
    }
}

impl DecisionOracle for LocalAgent {
    type Handle = Arc<AgentProperties>;

    fn init(&self, boot_file: &Path, conf_file: &Path) -> AgentStatus {
        let boot = match BootProperties::load(boot_file) {
            Ok(boot) => boot,
            Err(e) => {
                tracing::error!(path = ?boot_file, error = %e, "Failed to load agent boot file");
                return AgentStatus::InvalidArgument;
            }
        };
        let policy = match PolicyProperties::load(conf_file) {
            Ok(policy) => policy,
            Err(e) => {
                tracing::error!(path = ?conf_file, error = %e, "Failed to load agent policy file");
                return AgentStatus::InvalidArgument;
            }
        };

        self.properties.store(Some(Arc::new(AgentProperties { boot, policy })));
        *self.conf_file.lock().unwrap_or_else(PoisonError::into_inner) = Some(conf_file.to_path_buf());
        AgentStatus::Success
    }

    fn agent_init(&self) -> AgentStatus {
        if !self.watch_policy {
            return AgentStatus::Success;
        }
        let path = self.conf_file.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let Some(path) = path else {
            return AgentStatus::Failure;
        };

        match PolicyWatcher::new(&path, self.properties.clone()).run() {
            Ok(watcher) => {
                *self.watcher.lock().unwrap_or_else(PoisonError::into_inner) = Some(watcher);
                AgentStatus::Success
            }
            Err(e) => {
                tracing::error!(path = ?path, error = %e, "Failed to watch agent policy file");
                AgentStatus::Failure
            }
        }
    }

    fn cleanup(&self) {
        self.watcher.lock().unwrap_or_else(PoisonError::into_inner).take();
        self.properties.store(None);
    }

    fn acquire_configuration(&self) -> Option<Arc<AgentProperties>> {
        self.properties.load_full()
    }

    fn release_configuration(&self, handle: Arc<AgentProperties>) {
        drop(handle);
    }

    fn is_notification_url(&self, url: &str, handle: &Arc<AgentProperties>) -> bool {
        let without_query = url.split_once('?').map_or(url, |(base, _)| base);
        handle
            .boot
            .notification_url
            .as_deref()
            .is_some_and(|notification| notification == without_query)
    }

    fn decide(
        &self,
        descriptor: &RequestDescriptor,
        callbacks: &mut RequestCallbacks<'_>,
        handle: &Arc<AgentProperties>,
    ) -> AgentStatus {
        let url = descriptor.url();
        let parsed = match Url::parse(&url) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Request URL not understood by agent");
                return AgentStatus::InvalidArgument;
            }
        };
        let path = parsed.path();

        if handle.policy.is_not_enforced(path) {
            return callbacks.render_result(Verdict::Ok, None);
        }

        let cookie = descriptor.cookie();
        let token = cookie
            .as_deref()
            .and_then(|header| session_token(header, &handle.boot.cookie_name));
        let Some(subject) = token.and_then(|t| handle.policy.sessions.get(t)) else {
            return match handle.boot.login_redirect(&url) {
                Ok(target) => callbacks.render_result(Verdict::Redirect, Some(target.as_str())),
                Err(e) => {
                    tracing::error!(error = %e, "Cannot build login redirect");
                    callbacks.render_result(Verdict::Error, None)
                }
            };
        };

        let status = callbacks.set_user(subject);
        if !status.is_success() {
            return status;
        }

        let verdict = if handle.policy.permits(path, subject) {
            Verdict::Ok
        } else {
            Verdict::Forbidden
        };
        callbacks.render_result(verdict, None)
    }
}
