use std::sync::Arc;

use tokio::sync::watch;

use crate::errors::{RequestError, Result};

/// Upload progress callback: `(loaded_bytes, total_bytes)`.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Caller-side handle to cancel requests and observe upload progress.
///
/// Pass it to any call that accepts `Option<&FetchController>`. Calling
/// [`abort`](Self::abort) makes every call governed by this controller resolve
/// to [`RequestError::Aborted`], whether it is in flight or not started yet.
/// Clones share the same abort signal.
///
/// # Example
/// ```no_run
/// # async fn ex(cms: postcms::PostCms) -> postcms::Result<()> {
/// let fc = postcms::FetchController::new();
/// let cancel = fc.clone();
/// tokio::spawn(async move {
///     tokio::time::sleep(std::time::Duration::from_secs(2)).await;
///     cancel.abort();
/// });
/// let posts = cms.bucket("news").get_posts(None, Some(&fc)).await;
/// assert!(posts.is_ok() || posts.unwrap_err().is_aborted());
/// # Ok(()) }
/// ```
#[derive(Clone)]
pub struct FetchController {
    signal: Arc<watch::Sender<bool>>,
    on_progress: Option<ProgressFn>,
}

impl FetchController {
    /// A fresh, non-aborted controller without progress reporting.
    #[must_use]
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            signal: Arc::new(signal),
            on_progress: None,
        }
    }

    /// Attach an upload progress callback, invoked as `(loaded, total)` bytes.
    #[must_use]
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(f));
        self
    }

    /// Cancel every request governed by this controller.
    pub fn abort(&self) {
        self.signal.send_replace(true);
    }

    /// Whether [`abort`](Self::abort) has been called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.signal.borrow()
    }

    pub(crate) fn progress(&self) -> Option<ProgressFn> {
        self.on_progress.as_ref().map(Arc::clone)
    }

    /// Drive `fut` to completion unless the controller is aborted first.
    pub(crate) async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_aborted() {
            return Err(RequestError::Aborted.into());
        }
        tokio::select! {
            biased;
            () = aborted(self.signal.subscribe()) => Err(RequestError::Aborted.into()),
            out = fut => out,
        }
    }
}

/// Resolves once the abort flag is set.
async fn aborted(mut rx: watch::Receiver<bool>) {
    // The sender lives as long as the controller, so this only ends on abort.
    let _ = rx.wait_for(|aborted| *aborted).await;
}

impl Default for FetchController {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FetchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchController")
            .field("aborted", &self.is_aborted())
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}
