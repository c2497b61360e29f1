//! Common imports for quick starts.

// Common
pub use crate::{BuildError, Error, Result};

// Transport
pub use crate::{FetchController, PostCmsApi};

// High level actors
// Tenant client: session, buckets, uploads.
pub use crate::{PostCms, PostCmsBuilder};
// Post CRUD on one bucket.
pub use crate::PostBucket;
// Periodic session re-verification.
pub use crate::SessionWatcher;

// Helpers
// Where the session token lives between runs.
pub use crate::{FileTokenStore, MemoryTokenStore, TokenStore};
// Session change notifications.
pub use crate::{CmsEvent, EventKind};
// Payloads and records
pub use crate::{BucketAcl, FileUpload, Post, PostDraft, QueryPostsFilter, Session, User};
