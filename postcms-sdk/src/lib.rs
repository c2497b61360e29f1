#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(any(), deny(clippy::unwrap_used))]

mod bucket;
mod client;
mod cms;
pub mod errors;
mod macros;
mod session;
mod types;
mod util;

pub mod prelude;

// --- PUBLIC API EXPORTS ---
// Transport
pub use client::controller::{FetchController, ProgressFn};
pub use client::core::PostCmsApi;
pub use client::payload::{FileUpload, FormPayload, FormValue, QueryParams};
// High level actors
pub use bucket::PostBucket;
pub use cms::core::{PostCms, PostCmsBuilder};
pub use session::events::{CmsEvent, EventKind, ListenerId};
pub use session::store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use session::watch::SessionWatcher;

// Error types
pub use errors::{ApiError, BuildError, Error, RequestError, Result, StoreError};

// Data model
pub use types::{
    BucketAcl, BucketInfo, NewUser, Post, PostDraft, PostOrder, QueryPostsFilter, ReadAccess,
    Session, SfsObject, User, WriteAccess,
};

// Constants
pub use cms::core::{DEFAULT_HOST, DEFAULT_SESSION_CHECK_INTERVAL};
pub use session::store::SESSION_TOKEN_KEY;

// Re-exports
pub use reqwest::StatusCode;
