use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use super::controller::FetchController;
use super::payload::{FormPayload, QueryParams};
use crate::{
    TokenStore, cross_log,
    errors::{RequestError, Result},
    util::decode_envelope,
};

/// Header carrying the session token on every request.
pub(crate) const SESSION_HEADER: &str = "X-Session";

/// Transport for the PostCMS HTTP API.
///
/// `PostCmsApi` is the low-level engine [`crate::PostCms`] and
/// [`crate::PostBucket`] are built on. It owns:
/// - A reqwest HTTP client (connection pool, timeouts, user-agent).
/// - The tenant base URL, `https://<tenant>.postcms.x-static.io/` by default.
/// - A handle to the [`TokenStore`] the session token is read from.
///
/// ### What it does
/// - `query`: GET `<base>/<endpoint>?<params>`.
/// - `mutation`: POST `<base>/<endpoint>` with a multipart body.
/// - Attaches the `X-Session` header whenever a token is stored.
/// - Decodes the `{ ...payload, error? }` envelope; a non-null `error` becomes
///   [`crate::Error::Api`] and the payload is discarded.
///
/// ### What it *doesn’t* do
/// - It does not update the session. Token rotation and 401 handling live in
///   [`crate::PostCms`].
///
/// Cheap to clone; clones share the HTTP pool and the token store.
#[derive(Clone)]
pub struct PostCmsApi {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) tokens: Arc<dyn TokenStore>,
}

impl PostCmsApi {
    /// The tenant base URL every endpoint is resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The store the session token is read from.
    #[must_use]
    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Resolve `endpoint` against the base URL.
    ///
    /// Leading, trailing and repeated slashes are ignored; each segment is
    /// percent-encoded.
    ///
    /// # Errors
    /// - [`RequestError::Validation`] if the endpoint has no segment.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        let segments: Vec<&str> = endpoint.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(RequestError::Validation {
                message: format!("empty endpoint {endpoint:?}"),
            }
            .into());
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RequestError::Validation {
                message: format!("base URL {} cannot be a base", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET `endpoint` and decode the response envelope into `T`.
    ///
    /// # Example
    /// ```no_run
    /// # use serde::Deserialize;
    /// # #[derive(Deserialize)] struct Posts { posts: Vec<postcms::Post> }
    /// # async fn ex(api: &postcms::PostCmsApi) -> postcms::Result<()> {
    /// let params = postcms::QueryParams::new().insert("limit", 5);
    /// let Posts { posts } = api.query("news", Some(&params), None).await?;
    /// # Ok(()) }
    /// ```
    ///
    /// # Errors
    /// - [`crate::Error::Api`] when the envelope carries an `error`.
    /// - [`crate::Error::Request`] on transport failure, abort, or undecodable body.
    pub async fn query<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Option<&QueryParams>,
        controller: Option<&FetchController>,
    ) -> Result<T> {
        let mut url = self.endpoint_url(endpoint)?;
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            let mut query = url.query_pairs_mut();
            for (key, value) in params.pairs() {
                query.append_pair(&key, &value);
            }
        }
        cross_log!(debug, "GET {}", url.path());
        let rb = self.request(Method::GET, url)?;
        Self::send(rb, controller).await
    }

    /// POST `data` as a multipart form to `endpoint` and decode the envelope into `T`.
    ///
    /// File parts are streamed and reported to the controller's progress callback.
    ///
    /// # Errors
    /// - [`crate::Error::Api`] when the envelope carries an `error`.
    /// - [`crate::Error::Request`] on transport failure, abort, or undecodable body.
    pub async fn mutation<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        data: Option<FormPayload>,
        controller: Option<&FetchController>,
    ) -> Result<T> {
        let url = self.endpoint_url(endpoint)?;
        let progress = controller.and_then(FetchController::progress);
        let form = data.unwrap_or_default().into_form(progress)?;
        cross_log!(debug, "POST {}", url.path());
        let rb = self.request(Method::POST, url)?.multipart(form);
        Self::send(rb, controller).await
    }

    /// Start a request, attaching the stored session token if there is one.
    pub(crate) fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let rb = self.http.request(method, url);
        let rb = match self.tokens.load()? {
            Some(token) => rb.header(SESSION_HEADER, token),
            None => rb,
        };
        Ok(rb)
    }

    async fn send<T: DeserializeOwned>(
        rb: RequestBuilder,
        controller: Option<&FetchController>,
    ) -> Result<T> {
        let exchange = async {
            let response = rb.send().await?;
            decode_envelope(response).await
        };
        match controller {
            Some(fc) => fc.run(exchange).await,
            None => exchange.await,
        }
    }
}

impl std::fmt::Debug for PostCmsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostCmsApi")
            .field("base_url", &self.base_url.as_str())
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}
