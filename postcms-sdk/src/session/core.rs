use std::sync::PoisonError;
use std::sync::atomic::Ordering;

use serde::Deserialize;

use crate::{CmsEvent, FormPayload, NewUser, PostCms, Result, Session, User, cross_log};

/// Who is changing the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// `login`, `create_user` or `logout`. Always applied.
    Explicit,
    /// A verification started at this generation. Dropped if an explicit change
    /// landed while it was in flight.
    Verified(u64),
}

/// `{ token, user }` answer of `login`, `create-user` and `session`.
#[derive(Deserialize)]
struct SessionPayload {
    token: String,
    user: User,
}

impl PostCms {
    /// Sign in with an id (username, email or phone number) and password.
    ///
    /// The returned token is persisted in the token store and a
    /// [`CmsEvent::SessionUpdate`] is emitted.
    ///
    /// # Errors
    /// - [`crate::Error::Api`] if the credentials are rejected.
    /// - [`crate::Error::Request`] on transport failure.
    /// - [`crate::Error::Store`] if the token cannot be persisted.
    pub async fn login(&self, id: &str, password: &str) -> Result<Session> {
        cross_log!(info, "Logging in {id} on tenant {}", self.tenant);
        let form = FormPayload::new().text("id", id).text("password", password);
        let SessionPayload { token, user } = self.api.mutation("login", Some(form), None).await?;
        self.update_session(Some((token.as_str(), user.clone())), Origin::Explicit)?;
        cross_log!(info, "Login succeeded for {id}");
        Ok(Session { user })
    }

    /// Forget the session locally: the token is removed and listeners are notified.
    ///
    /// No request is sent; the backend expires the token on its own.
    ///
    /// # Errors
    /// - [`crate::Error::Store`] if the token cannot be removed.
    pub fn logout(&self) -> Result<()> {
        cross_log!(info, "Logging out of tenant {}", self.tenant);
        self.update_session(None, Origin::Explicit)?;
        Ok(())
    }

    /// Register a new account and sign in as it.
    ///
    /// # Errors
    /// - [`crate::Error::Api`] if the backend refuses the account.
    /// - [`crate::Error::Request`] on transport failure or an unserializable profile.
    /// - [`crate::Error::Store`] if the token cannot be persisted.
    pub async fn create_user(&self, new_user: &NewUser) -> Result<User> {
        cross_log!(info, "Creating user on tenant {}", self.tenant);
        let form = FormPayload::from_serialize(new_user)?;
        let SessionPayload { token, user } =
            self.api.mutation("create-user", Some(form), None).await?;
        self.update_session(Some((token.as_str(), user.clone())), Origin::Explicit)?;
        cross_log!(info, "Created user {}", user.id);
        Ok(user)
    }

    /// Check the stored token with the backend.
    ///
    /// Returns:
    /// - `Ok(None)` without any request when no token is stored.
    /// - `Ok(Some(session))` when the backend accepts the token; a rotated token
    ///   replaces the stored one.
    /// - `Ok(None)` when the backend answers 401, with or without an error
    ///   envelope; the session is cleared.
    /// - `Err(_)` for any other failure; the session is left untouched.
    ///
    /// If [`login`](Self::login), [`create_user`](Self::create_user) or
    /// [`logout`](Self::logout) completes while the check is in flight, the
    /// check's outcome is discarded and the current session is returned instead.
    ///
    /// Every applied outcome emits a [`CmsEvent::SessionUpdate`].
    ///
    /// # Errors
    /// - [`crate::Error::Api`] for error envelopes other than 401.
    /// - [`crate::Error::Request`] on transport failure.
    /// - [`crate::Error::Store`] if the token store fails.
    pub async fn verify_session(&self) -> Result<Option<Session>> {
        let started = Origin::Verified(self.state.generation.load(Ordering::SeqCst));
        if self.api.tokens.load()?.is_none() {
            cross_log!(debug, "No stored session token; skipping verification");
            return Ok(None);
        }
        match self
            .api
            .query::<SessionPayload>("session", None, None)
            .await
        {
            Ok(SessionPayload { token, user }) => {
                if !self.update_session(Some((token.as_str(), user.clone())), started)? {
                    return Ok(self.discard_stale_check());
                }
                cross_log!(debug, "Session on tenant {} remains valid", self.tenant);
                Ok(Some(Session { user }))
            }
            Err(e) if e.is_unauthorized() => {
                if !self.update_session(None, started)? {
                    return Ok(self.discard_stale_check());
                }
                cross_log!(warn, "Session on tenant {} no longer valid (401)", self.tenant);
                Ok(None)
            }
            Err(e) => {
                cross_log!(error, "Session verification on tenant {} failed: {e}", self.tenant);
                Err(e)
            }
        }
    }

    fn discard_stale_check(&self) -> Option<Session> {
        cross_log!(debug, "Session on tenant {} changed during verification", self.tenant);
        self.session()
    }

    /// Persist or clear the token, swap the in-memory session, then notify listeners.
    ///
    /// Returns false, changing nothing, for a [`Origin::Verified`] update that an
    /// explicit change has overtaken. The session is left unchanged if the token
    /// store fails.
    pub(crate) fn update_session(
        &self,
        signed_in: Option<(&str, User)>,
        origin: Origin,
    ) -> Result<bool> {
        let session = {
            let mut current = self
                .state
                .session
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if let Origin::Verified(seen) = origin
                && self.state.generation.load(Ordering::SeqCst) != seen
            {
                return Ok(false);
            }
            let session = match signed_in {
                Some((token, user)) => {
                    self.api.tokens.save(token)?;
                    Some(Session { user })
                }
                None => {
                    self.api.tokens.clear()?;
                    None
                }
            };
            if origin == Origin::Explicit {
                self.state.generation.fetch_add(1, Ordering::SeqCst);
            }
            *current = session.clone();
            session
        };
        self.state.events.emit(&CmsEvent::SessionUpdate(session));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{EventKind, MemoryTokenStore, TokenStore};

    fn user(id: &str) -> User {
        serde_json::from_value(serde_json::json!({ "id": id, "role": 1 })).unwrap()
    }

    #[test]
    fn update_session_persists_and_notifies() {
        let store = MemoryTokenStore::new();
        let cms = PostCms::builder("acme")
            .token_store(store.clone())
            .build()
            .unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        cms.on(EventKind::SessionUpdate, move |event| {
            let CmsEvent::SessionUpdate(session) = event;
            sink.lock().unwrap().push(session.as_ref().map(|s| s.user.id.clone()));
        });

        assert!(cms.update_session(Some(("tok", user("u1"))), Origin::Explicit).unwrap());
        assert_eq!(store.load().unwrap().as_deref(), Some("tok"));
        assert_eq!(cms.session().map(|s| s.user.id), Some("u1".to_string()));

        cms.logout().unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert!(cms.session().is_none());

        assert_eq!(*seen.lock().unwrap(), vec![Some("u1".to_string()), None]);
    }

    #[test]
    fn overtaken_verification_is_discarded() {
        let store = MemoryTokenStore::new();
        let cms = PostCms::builder("acme")
            .token_store(store.clone())
            .build()
            .unwrap();
        let started = Origin::Verified(cms.state.generation.load(Ordering::SeqCst));

        cms.logout().unwrap();
        let applied = cms.update_session(Some(("tok-late", user("u1"))), started).unwrap();

        assert!(!applied);
        assert_eq!(store.load().unwrap(), None);
        assert!(cms.session().is_none());
    }

    #[test]
    fn current_verification_is_applied() {
        let cms = PostCms::new("acme").unwrap();
        let started = Origin::Verified(cms.state.generation.load(Ordering::SeqCst));
        assert!(cms.update_session(Some(("tok", user("u1"))), started).unwrap());
        assert_eq!(cms.session().map(|s| s.user.id), Some("u1".to_string()));
    }

    #[tokio::test]
    async fn verify_without_token_makes_no_request() {
        // Port 9 (discard) would fail the request if one were sent.
        let cms = PostCms::builder("acme")
            .base_url("http://127.0.0.1:9/")
            .build()
            .unwrap();
        assert_eq!(cms.verify_session().await.unwrap(), None);
    }
}
