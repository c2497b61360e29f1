//! Post CRUD scoped to one bucket.

use serde::Deserialize;
use serde::de::IgnoredAny;

use crate::{
    FetchController, FormPayload, Post, PostCms, PostDraft, QueryParams, QueryPostsFilter,
    Result, cross_log,
};

#[derive(Deserialize)]
struct PostsPayload {
    posts: Vec<Post>,
}

#[derive(Deserialize)]
struct PostPayload {
    post: Post,
}

/// Handle on the posts of one bucket.
///
/// Obtained from [`PostCms::bucket`] or [`PostCms::create_bucket`]. Holding a handle
/// makes no request and does not check that the bucket exists; every call goes
/// through the parent client and carries its session token.
///
/// # Example
/// ```no_run
/// # async fn ex(cms: postcms::PostCms) -> postcms::Result<()> {
/// use postcms::{PostDraft, QueryPostsFilter};
///
/// let news = cms.bucket("news");
/// let post = news
///     .create_post(Some(&PostDraft::new().alias("hello").kv("title", "Hello")))
///     .await?;
///
/// let filter = QueryPostsFilter { tags: Some(vec!["tech".into()]), ..Default::default() };
/// for p in news.get_posts(Some(&filter), None).await? {
///     println!("{} {}", p.id, p.alias);
/// }
/// news.delete_post(&post.id).await?;
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
pub struct PostBucket {
    cms: PostCms,
    name: String,
}

impl PostBucket {
    pub(crate) const fn new(cms: PostCms, name: String) -> Self {
        Self { cms, name }
    }

    /// Name the bucket is addressed by.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The client this handle sends requests through.
    #[must_use]
    pub const fn cms(&self) -> &PostCms {
        &self.cms
    }

    /// List posts, optionally filtered.
    ///
    /// Array filters are sent comma-joined (`tags=news,tech`).
    ///
    /// # Errors
    /// - [`crate::Error::Api`] if the backend refuses.
    /// - [`crate::Error::Request`] on transport failure or abort.
    pub async fn get_posts(
        &self,
        filter: Option<&QueryPostsFilter>,
        controller: Option<&FetchController>,
    ) -> Result<Vec<Post>> {
        let params = filter.map(QueryParams::from_serialize).transpose()?;
        let PostsPayload { posts } = self
            .cms
            .api
            .query(&self.name, params.as_ref(), controller)
            .await?;
        cross_log!(debug, "Listed {} posts from bucket {}", posts.len(), self.name);
        Ok(posts)
    }

    /// Fetch one post, including the `kv` entries named in `kv`.
    ///
    /// # Errors
    /// - [`crate::Error::Api`] if the post does not exist or is not readable.
    /// - [`crate::Error::Request`] on transport failure or abort.
    pub async fn get_post(
        &self,
        id: &str,
        kv: Option<&[String]>,
        controller: Option<&FetchController>,
    ) -> Result<Post> {
        let params = kv.map(|keys| QueryParams::new().insert("kv", keys.to_vec()));
        let endpoint = format!("{}/{id}", self.name);
        let PostPayload { post } = self
            .cms
            .api
            .query(&endpoint, params.as_ref(), controller)
            .await?;
        Ok(post)
    }

    /// Create a post from `draft`, or an empty one.
    ///
    /// # Errors
    /// - [`crate::Error::Api`] if the backend refuses.
    /// - [`crate::Error::Request`] on transport failure.
    pub async fn create_post(&self, draft: Option<&PostDraft>) -> Result<Post> {
        let form = self.draft_form(draft)?;
        let PostPayload { post } = self.cms.api.mutation("create-post", Some(form), None).await?;
        cross_log!(info, "Created post {} in bucket {}", post.id, self.name);
        Ok(post)
    }

    /// Overwrite the fields set in `draft` on post `id`.
    ///
    /// # Errors
    /// - [`crate::Error::Api`] if the backend refuses.
    /// - [`crate::Error::Request`] on transport failure.
    pub async fn update_post(&self, id: &str, draft: &PostDraft) -> Result<()> {
        let form = self.draft_form(Some(draft))?.text("id", id);
        let _: IgnoredAny = self.cms.api.mutation("update-post", Some(form), None).await?;
        cross_log!(info, "Updated post {id} in bucket {}", self.name);
        Ok(())
    }

    /// Delete post `id`.
    ///
    /// # Errors
    /// - [`crate::Error::Api`] if the backend refuses.
    /// - [`crate::Error::Request`] on transport failure.
    pub async fn delete_post(&self, id: &str) -> Result<()> {
        let form = FormPayload::new().text("id", id).text("bucket", &self.name);
        let _: IgnoredAny = self.cms.api.mutation("delete-post", Some(form), None).await?;
        cross_log!(info, "Deleted post {id} from bucket {}", self.name);
        Ok(())
    }

    /// Draft fields plus the bucket name; the bucket always wins over a draft key.
    fn draft_form(&self, draft: Option<&PostDraft>) -> Result<FormPayload> {
        let form = match draft {
            Some(draft) => FormPayload::from_serialize(draft)?,
            None => FormPayload::new(),
        };
        Ok(form.text("bucket", &self.name))
    }
}
