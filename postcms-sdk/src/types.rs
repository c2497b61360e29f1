//! Data transfer objects mirrored from the PostCMS JSON API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Error, RequestError};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned identifier.
    pub id: String,
    /// Login name, if the account has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Contact email, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact phone number, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pn: Option<String>,
    /// Role code assigned by the backend.
    #[serde(default)]
    pub role: i64,
    /// Creation timestamp.
    #[serde(default)]
    pub crtime: i64,
    /// Free-form profile attributes.
    #[serde(default)]
    pub profile: Map<String, Value>,
}

/// The signed-in state of a [`crate::PostCms`] client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The authenticated user.
    pub user: User,
}

/// A content record stored in a bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Server-assigned identifier.
    pub id: String,
    /// Human-friendly unique alias (slug).
    #[serde(default)]
    pub alias: String,
    /// Id of the owning user.
    #[serde(default)]
    pub owner: String,
    /// Publication status code.
    #[serde(default)]
    pub status: i64,
    /// Creation timestamp.
    #[serde(default)]
    pub crtime: i64,
    /// Last modification timestamp.
    #[serde(default)]
    pub modtime: i64,
    /// Tags attached to the post.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Arbitrary key-value metadata.
    #[serde(default)]
    pub kv: Map<String, Value>,
}

/// Writable subset of a [`Post`]: everything but `id`, `crtime` and `modtime`.
///
/// Unset fields are not sent, so an update only touches what is set here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostDraft {
    /// Alias (slug) of the post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Owning user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Publication status code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    /// Tags attached to the post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Key-value metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kv: Option<Map<String, Value>>,
}

impl PostDraft {
    /// Empty draft.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the alias.
    #[must_use]
    pub fn alias<S: Into<String>>(mut self, alias: S) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set the status code.
    #[must_use]
    pub const fn status(mut self, status: i64) -> Self {
        self.status = Some(status);
        self
    }

    /// Replace the tags.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Insert one key-value entry.
    #[must_use]
    pub fn kv<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.kv
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Sort order for post listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostOrder {
    /// Oldest first.
    #[serde(rename = "ASC")]
    Asc,
    /// Newest first.
    #[serde(rename = "DESC")]
    Desc,
}

/// Filter accepted by [`crate::PostBucket::get_posts`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPostsFilter {
    /// Only posts carrying these tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Key-value entries to include in each returned post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kv: Option<Vec<String>>,
    /// Pagination cursor returned by a previous listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    /// Maximum number of posts to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Sort order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<PostOrder>,
}

/// Account creation request for [`crate::PostCms::create_user`].
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    /// Initial password.
    pub password: String,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Login name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pn: Option<String>,
    /// Free-form profile attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Map<String, Value>>,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("pn", &self.pn)
            .field("profile", &self.profile)
            .finish()
    }
}

/// Server record of a bucket, returned on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    /// Name the bucket is addressed by.
    pub alias: String,
    /// Server-assigned identifier, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Encoded access-control pair, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<u8>,
}

/// Uploaded file record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SfsObject {
    /// Server-assigned identifier.
    pub id: String,
    /// Content-addressed storage name.
    #[serde(default)]
    pub hashname: String,
    /// Id of the uploading user.
    #[serde(default)]
    pub owner: String,
    /// Creation timestamp.
    #[serde(default)]
    pub crtime: i64,
    /// File metadata (name, size, type, ...).
    #[serde(default)]
    pub meta: Map<String, Value>,
}

// --- Access control ---

/// Who may read a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadAccess {
    /// Owner only.
    Private,
    /// Anyone.
    Public,
}

/// Who may write to a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteAccess {
    /// Owner only.
    Private,
    /// Any signed-in member.
    Member,
    /// Anyone.
    Public,
}

/// Access-control pair of a bucket.
///
/// Sent to the backend as a small integer, see [`BucketAcl::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketAcl {
    /// Read visibility.
    pub read: ReadAccess,
    /// Write visibility.
    pub write: WriteAccess,
}

impl BucketAcl {
    /// Owner-only read and write.
    pub const PRIVATE: Self = Self::new(ReadAccess::Private, WriteAccess::Private);
    /// Public read, owner-only write.
    pub const PUBLIC_READ: Self = Self::new(ReadAccess::Public, WriteAccess::Private);
    /// Public read, members write.
    pub const MEMBER_WRITE: Self = Self::new(ReadAccess::Public, WriteAccess::Member);
    /// Public read and write.
    pub const PUBLIC: Self = Self::new(ReadAccess::Public, WriteAccess::Public);

    /// Pair a read and a write visibility.
    #[must_use]
    pub const fn new(read: ReadAccess, write: WriteAccess) -> Self {
        Self { read, write }
    }

    /// Integer encoding understood by the backend.
    ///
    /// `{private,private}→0`, `{public,private}→1`, `{public,member}→2`,
    /// `{public,public}→3`.
    #[must_use]
    pub const fn code(self) -> u8 {
        let read = match self.read {
            ReadAccess::Private => 0,
            ReadAccess::Public => 1,
        };
        let write = match self.write {
            WriteAccess::Private => 0,
            WriteAccess::Member => 1,
            WriteAccess::Public => 2,
        };
        read + write
    }
}

impl From<BucketAcl> for u8 {
    fn from(acl: BucketAcl) -> Self {
        acl.code()
    }
}

impl TryFrom<u8> for BucketAcl {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::PRIVATE),
            1 => Ok(Self::PUBLIC_READ),
            2 => Ok(Self::MEMBER_WRITE),
            3 => Ok(Self::PUBLIC),
            _ => Err(RequestError::Validation {
                message: format!("unknown bucket ACL code {code}"),
            }
            .into()),
        }
    }
}
