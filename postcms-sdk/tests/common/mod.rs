#![allow(dead_code, reason = "each test binary uses a subset of the helpers")]

use httpmock::MockServer;
use postcms::{MemoryTokenStore, PostCms};
use serde_json::{Value, json};

/// Client pointed at `server` with an in-memory token store the test can inspect.
pub fn client(server: &MockServer) -> (PostCms, MemoryTokenStore) {
    let store = MemoryTokenStore::new();
    let cms = PostCms::builder("acme")
        .base_url(server.base_url())
        .token_store(store.clone())
        .build()
        .expect("client builds");
    (cms, store)
}

/// Same as [`client`] but already holding `token`.
pub fn signed_in_client(server: &MockServer, token: &str) -> (PostCms, MemoryTokenStore) {
    let store = MemoryTokenStore::with_token(token);
    let cms = PostCms::builder("acme")
        .base_url(server.base_url())
        .token_store(store.clone())
        .build()
        .expect("client builds");
    (cms, store)
}

pub fn user_json(id: &str) -> Value {
    json!({ "id": id, "username": id, "role": 1, "crtime": 1_700_000_000 })
}

pub fn post_json(id: &str, alias: &str) -> Value {
    json!({
        "id": id,
        "alias": alias,
        "owner": "u1",
        "status": 1,
        "crtime": 1_700_000_000,
        "modtime": 1_700_000_000,
        "tags": ["news"],
        "kv": { "title": alias },
    })
}
