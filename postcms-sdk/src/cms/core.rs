use std::sync::atomic::AtomicU64;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use url::Url;

use crate::{
    CmsEvent, EventKind, ListenerId, MemoryTokenStore, PostBucket, PostCmsApi, Session,
    TokenStore, errors::BuildError, session::events::EventEmitter,
};

/// Default parent domain; each tenant is served from `<tenant>.<host>`.
pub const DEFAULT_HOST: &str = "postcms.x-static.io";

/// Default period of [`PostCms::watch_session`] re-verification (5 minutes).
pub const DEFAULT_SESSION_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

const DEFAULT_USER_AGENT: &str = concat!("postcms-rs", "@", env!("CARGO_PKG_VERSION"),);

#[derive(Debug, Clone)]
#[must_use]
/// Configures a [`PostCms`] client before construction.
///
/// Most code obtains this via [`PostCms::builder()`].
///
/// # Defaults
/// - Base URL: `https://<tenant>.postcms.x-static.io/`
/// - HTTP request timeout: reqwest default (no global timeout) unless set via
///   [`Self::request_timeout`]
/// - User-agent: `postcms-rs@<crate-version>` plus any [`Self::user_agent_extra`]
/// - Token store: a fresh [`MemoryTokenStore`]
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// # use postcms::{FileTokenStore, PostCms};
/// let cms = PostCms::builder("acme")
///     .request_timeout(Duration::from_secs(10))
///     .user_agent_extra("myapp/1.2.3")
///     .token_store(FileTokenStore::in_dir("/var/lib/myapp"))
///     .build()?;
/// # Ok::<_, postcms::BuildError>(())
/// ```
pub struct PostCmsBuilder {
    tenant: String,
    host: String,
    base_url: Option<String>,
    http_request_timeout: Option<Duration>,

    /// Optional user-agent segment appended to the default UA for app-level telemetry.
    user_agent_extra: Option<String>,

    token_store: Option<Arc<dyn TokenStore>>,
}

impl PostCmsBuilder {
    fn new(tenant: String) -> Self {
        Self {
            tenant,
            host: DEFAULT_HOST.to_string(),
            base_url: None,
            http_request_timeout: None,
            user_agent_extra: None,
            token_store: None,
        }
    }

    /// Serve tenants from `<tenant>.<host>` instead of [`DEFAULT_HOST`].
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    /// Use `url` as the base of every endpoint, ignoring tenant and host.
    ///
    /// Meant for self-hosted deployments, proxies, and local test servers.
    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set HTTP requests timeout.
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.http_request_timeout = Some(timeout);
        self
    }

    /// Append an extra user-agent segment after the default `postcms-rs@<version>`.
    /// Example: `.user_agent_extra("myapp/1.2.3")`
    pub fn user_agent_extra<S: Into<String>>(mut self, extra: S) -> Self {
        self.user_agent_extra = Some(extra.into());
        self
    }

    /// Persist the session token in `store`.
    pub fn token_store<S: TokenStore + 'static>(mut self, store: S) -> Self {
        self.token_store = Some(Arc::new(store));
        self
    }

    /// Persist the session token in an already shared `store`.
    pub fn shared_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    fn resolve_base_url(&self) -> Result<Url, BuildError> {
        if let Some(url) = &self.base_url {
            return Ok(Url::parse(url)?);
        }
        let tenant = self.tenant.trim();
        let valid = !tenant.is_empty()
            && tenant
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(BuildError::InvalidTenant(self.tenant.clone()));
        }
        Ok(Url::parse(&format!("https://{tenant}.{}/", self.host))?)
    }

    /// Build [`PostCms`].
    ///
    /// # Errors
    /// - [`BuildError::InvalidTenant`] if the tenant is not a valid subdomain label
    ///   and no base URL override is set.
    /// - [`BuildError::Url`] if the resulting base URL does not parse.
    /// - [`BuildError::Http`] if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<PostCms, BuildError> {
        let base_url = self.resolve_base_url()?;

        // Compose user agent with optional extra part.
        let user_agent = match &self.user_agent_extra {
            Some(extra) if !extra.trim().is_empty() => {
                format!("{DEFAULT_USER_AGENT} {}", extra.trim())
            }
            _ => DEFAULT_USER_AGENT.to_string(),
        };

        let mut http_builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = self.http_request_timeout {
            http_builder = http_builder.timeout(timeout);
        }

        let tokens = self
            .token_store
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));

        Ok(PostCms {
            tenant: self.tenant,
            api: PostCmsApi {
                http: http_builder.build()?,
                base_url,
                tokens,
            },
            state: Arc::new(SessionState::default()),
        })
    }
}

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) session: RwLock<Option<Session>>,
    /// Bumped by every explicit sign-in or sign-out, under the `session` write lock.
    pub(crate) generation: AtomicU64,
    pub(crate) events: EventEmitter,
}

/// Client for one PostCMS tenant.
///
/// `PostCms` owns the transport ([`PostCmsApi`]), the current [`Session`], and the
/// listeners notified when that session changes.
///
/// ### Mental model
/// - Token in the [`TokenStore`] ⇔ the client believes it is signed in, until the
///   next [`verify_session`](Self::verify_session) says otherwise.
/// - [`bucket`](Self::bucket) hands out resource-scoped [`PostBucket`] handles.
/// - [`watch_session`](Self::watch_session) re-verifies the session periodically.
///
/// Cheap to clone and thread-safe; clones share the transport, session and listeners.
///
/// # Example
/// ```no_run
/// # async fn run() -> postcms::Result<()> {
/// use postcms::PostCms;
///
/// let cms = PostCms::new("acme")?;
/// let session = cms.login("alice", "s3cret").await?;
/// println!("signed in as {}", session.user.id);
///
/// let posts = cms.bucket("news").get_posts(None, None).await?;
/// println!("{} posts", posts.len());
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct PostCms {
    pub(crate) tenant: String,
    pub(crate) api: PostCmsApi,
    pub(crate) state: Arc<SessionState>,
}

impl PostCms {
    /// Client for `tenant` with default settings.
    ///
    /// # Errors
    /// - See [`PostCmsBuilder::build`].
    pub fn new<S: Into<String>>(tenant: S) -> Result<Self, BuildError> {
        Self::builder(tenant).build()
    }

    /// Returns a builder to edit settings before creating [`PostCms`].
    pub fn builder<S: Into<String>>(tenant: S) -> PostCmsBuilder {
        PostCmsBuilder::new(tenant.into())
    }

    /// Tenant id this client was built for.
    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Access the underlying transport (advanced use).
    #[must_use]
    pub const fn api(&self) -> &PostCmsApi {
        &self.api
    }

    /// The current session, `None` when signed out.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.state
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register `listener` for `kind` events.
    ///
    /// # Example
    /// ```no_run
    /// # fn ex(cms: &postcms::PostCms) {
    /// use postcms::{CmsEvent, EventKind};
    ///
    /// let id = cms.on(EventKind::SessionUpdate, |event| {
    ///     let CmsEvent::SessionUpdate(session) = event;
    ///     println!("signed in: {}", session.is_some());
    /// });
    /// cms.off(EventKind::SessionUpdate, Some(id));
    /// # }
    /// ```
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&CmsEvent) + Send + Sync + 'static,
    {
        self.state.events.on(kind, Arc::new(listener))
    }

    /// Remove the listener `id`, or every listener of `kind` when `id` is `None`.
    ///
    /// Returns true if a listener was removed.
    pub fn off(&self, kind: EventKind, id: Option<ListenerId>) -> bool {
        self.state.events.off(kind, id)
    }

    /// Handle for the bucket named `name`. No request is made.
    #[must_use]
    pub fn bucket<S: Into<String>>(&self, name: S) -> PostBucket {
        PostBucket::new(self.clone(), name.into())
    }
}
