//! Request-scoped context propagation.
//!
//! A [`RequestContext`] is bound to the dynamic extent of a future with
//! [`run`]. Any code polled inside that future, however deeply nested in
//! `.await` chains, timers or joined branches, can read it back with
//! [`current`] without the value being threaded through signatures.
//!
//! The binding is a tokio task-local, so it is scoped to the future rather
//! than the thread: two requests interleaving on the same worker never see
//! each other's context. Work handed to `tokio::spawn` starts a new task and
//! does not inherit task-locals; use [`spawn`] to carry the context across.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Header carrying the correlation id on inbound and outbound requests.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Per-request identity used to attribute work to the inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
}

impl RequestContext {
    /// Creates a context from explicit values. No validation is applied.
    pub fn new(correlation_id: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            user_id,
        }
    }

    /// Creates a context with a freshly generated correlation id.
    pub fn generate(user_id: Option<String>) -> Self {
        Self::new(generate_correlation_id(), user_id)
    }

    /// Applies the inbound seeding policy.
    ///
    /// A supplied correlation id is trimmed and used if anything remains;
    /// otherwise a UUID v4 is generated. The user id is copied verbatim.
    pub fn seed(inbound_correlation_id: Option<&str>, user_id: Option<String>) -> Self {
        let correlation_id = inbound_correlation_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(generate_correlation_id);

        Self::new(correlation_id, user_id)
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

/// Generates a new random correlation id in UUID v4 format.
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

tokio::task_local! {
    static CURRENT: RequestContext;
}

/// Runs `work` with `context` visible to everything it awaits.
pub async fn run<F>(context: RequestContext, work: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(context, work).await
}

/// Runs a synchronous closure with `context` bound.
pub fn run_sync<R>(context: RequestContext, work: impl FnOnce() -> R) -> R {
    CURRENT.sync_scope(context, work)
}

/// The active context, or `None` outside any [`run`] scope.
pub fn current() -> Option<RequestContext> {
    CURRENT.try_with(RequestContext::clone).ok()
}

/// Correlation id of the active context.
pub fn correlation_id() -> Option<String> {
    CURRENT.try_with(|ctx| ctx.correlation_id.clone()).ok()
}

/// User id of the active context, if the context carries one.
pub fn user_id() -> Option<String> {
    CURRENT.try_with(|ctx| ctx.user_id.clone()).ok().flatten()
}

/// Spawns a tokio task that inherits the caller's context.
///
/// Outside any scope this is plain `tokio::spawn`.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match current() {
        Some(context) => tokio::spawn(CURRENT.scope(context, future)),
        None => tokio::spawn(future),
    }
}
