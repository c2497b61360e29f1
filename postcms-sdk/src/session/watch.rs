use std::time::Duration;

use futures_util::future::{AbortHandle, Abortable};
use tokio::time::MissedTickBehavior;

use crate::{PostCms, cross_log};

/// Background task re-verifying a [`PostCms`] session on a fixed period.
///
/// Created by [`PostCms::watch_session`]. Verification **starts immediately**,
/// then repeats every period. Dropping this value cancels the task, including an
/// in-flight verification.
#[derive(Debug)]
pub struct SessionWatcher {
    abort: AbortHandle,
    every: Duration,
}

impl SessionWatcher {
    /// Period between two verifications.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.every
    }

    /// Stop the background task. Same as dropping the watcher.
    pub fn stop(self) {
        self.abort.abort();
    }
}

impl Drop for SessionWatcher {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

impl PostCms {
    /// Spawn a task calling [`verify_session`](Self::verify_session) now and then
    /// every `every` (typically [`crate::DEFAULT_SESSION_CHECK_INTERVAL`]).
    ///
    /// Failures are logged and the task keeps running. A 401 clears the session
    /// as usual, which listeners observe through [`crate::CmsEvent::SessionUpdate`].
    /// Calls made directly while the watcher runs are not coordinated with it.
    ///
    /// # Panics
    /// - If called outside a tokio runtime.
    ///
    /// # Example
    /// ```no_run
    /// # async fn ex(cms: postcms::PostCms) {
    /// let watcher = cms.watch_session(postcms::DEFAULT_SESSION_CHECK_INTERVAL);
    /// // ... run the application ...
    /// drop(watcher);
    /// # }
    /// ```
    #[must_use = "dropping the watcher stops it"]
    pub fn watch_session(&self, every: Duration) -> SessionWatcher {
        let every = every.max(Duration::from_millis(1));
        let (abort, registration) = AbortHandle::new_pair();
        let cms = self.clone();

        let fut = async move {
            cross_log!(info, "Watching session of tenant {} every {every:?}", cms.tenant);
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = cms.verify_session().await {
                    cross_log!(warn, "Periodic session check failed: {e}");
                }
            }
        };
        tokio::spawn(Abortable::new(fut, registration));

        SessionWatcher { abort, every }
    }
}
