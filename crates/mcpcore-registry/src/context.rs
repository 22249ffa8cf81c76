//! The per-invocation context and completion contract shared by every
//! registry.

use std::future::Future;
use std::sync::Arc;

/// Reports progress on a long-running invocation. Wired by the facade to
/// emit `notifications/progress`; a no-op by default.
pub type ProgressEmitter = Arc<dyn Fn(f64, Option<f64>) + Send + Sync>;

/// Context handed to a tool, resource, or prompt handler for the duration
/// of a single call.
#[derive(Clone, Default)]
pub struct InvocationContext {
    progress: Option<ProgressEmitter>,
}

impl InvocationContext {
    /// A context with no progress emitter attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that forwards progress updates through `emitter`.
    pub fn with_progress(emitter: ProgressEmitter) -> Self {
        Self {
            progress: Some(emitter),
        }
    }

    /// Report progress. A no-op if the caller attached no emitter, which
    /// happens whenever the inbound request carried no progress token.
    pub fn emit_progress(&self, progress: f64, total: Option<f64>) {
        if let Some(emitter) = &self.progress {
            emitter(progress, total);
        }
    }
}

impl std::fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationContext")
            .field("has_progress", &self.progress.is_some())
            .finish()
    }
}

/// Completion suggestions for a partially-typed argument value, answering
/// `completion/complete`. Attached to an individual tool, resource, or
/// prompt entry; optional.
#[async_trait::async_trait]
pub trait CompletionHandler: Send + Sync {
    /// Return candidate completions for `partial` typed into `argument`.
    async fn complete(&self, argument: &str, partial: &str) -> Vec<String>;
}

#[async_trait::async_trait]
impl<F, Fut> CompletionHandler for F
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = Vec<String>> + Send,
{
    async fn complete(&self, argument: &str, partial: &str) -> Vec<String> {
        (self)(argument.to_string(), partial.to_string()).await
    }
}
