//! Callback slots the agent invokes during a decision.
//!
//! # Contract
//! - Both slots run synchronously on the thread that called `decide`
//! - `set_user` may run zero or more times
//! - `render_result` is expected once; a repeated call replaces the earlier
//!   outcome
//! - Slots must not block: the agent may hold its own locks while calling

use crate::agent::oracle::{AgentStatus, Verdict};

type SetUserFn<'a> = dyn FnMut(&str) -> AgentStatus + 'a;
type RenderResultFn<'a> = dyn FnMut(Verdict, Option<&str>) -> AgentStatus + 'a;

/// The pair of callbacks handed to [`DecisionOracle::decide`].
///
/// Closures borrow request-owned state for the duration of one decision
/// call; the lifetime keeps them from escaping it.
///
/// [`DecisionOracle::decide`]: crate::agent::oracle::DecisionOracle::decide
pub struct RequestCallbacks<'a> {
    set_user: Box<SetUserFn<'a>>,
    render_result: Box<RenderResultFn<'a>>,
}

impl<'a> RequestCallbacks<'a> {
    pub fn new<U, R>(set_user: U, render_result: R) -> Self
    where
        U: FnMut(&str) -> AgentStatus + 'a,
        R: FnMut(Verdict, Option<&str>) -> AgentStatus + 'a,
    {
        Self {
            set_user: Box::new(set_user),
            render_result: Box::new(render_result),
        }
    }

    /// The agent established `user` as the authenticated subject.
    pub fn set_user(&mut self, user: &str) -> AgentStatus {
        (self.set_user)(user)
    }

    /// The agent's final verdict. `REDIRECT` must carry a target.
    pub fn render_result(&mut self, verdict: Verdict, redirect_target: Option<&str>) -> AgentStatus {
        (self.render_result)(verdict, redirect_target)
    }
}
