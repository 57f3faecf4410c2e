//! Server side sessions.
//!
//! The [`SessionStore`] is owned by the server and shared by every connection. Each
//! entry carries an expiry task; renewing a session aborts that task and spawns a new
//! one, and an expiry task only ever removes the generation it was spawned for.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use strand_http::params::cookie::SESSION_COOKIE;
use tokio::task::AbortHandle;
use tracing::{debug, trace};

const SESSION_ID_LEN: usize = 32;

/// Key-value data attached to one client.
#[derive(Debug)]
pub struct Session {
    id: String,
    data: DashMap<String, Value>,
}

impl Session {
    fn new(id: String) -> Self {
        Self { id, data: DashMap::new() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.get(key).map(|value| value.clone())
    }

    /// Reads `key` back into `T`, `None` when absent or of another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn set<T: Serialize>(&self, key: impl Into<String>, value: T) -> Result<(), serde_json::Error> {
        self.data.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.data.remove(key).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug)]
struct Entry {
    session: Arc<Session>,
    generation: u64,
    expiry: AbortHandle,
}

#[derive(Debug)]
struct Inner {
    entries: DashMap<String, Entry>,
    timeout: Duration,
    generation: AtomicU64,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for entry in self.entries.iter() {
            entry.expiry.abort();
        }
    }
}

/// Session id -> session, with per-entry expiry.
///
/// Must be used inside a tokio runtime, timers are spawned tasks.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self { inner: Arc::new(Inner { entries: DashMap::new(), timeout, generation: AtomicU64::new(0) }) }
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Creates a session under a fresh random id.
    pub fn create(&self) -> Arc<Session> {
        loop {
            let id = generate_id();
            // ids of live sessions are never reused
            if let dashmap::mapref::entry::Entry::Vacant(vacant) = self.inner.entries.entry(id.clone()) {
                let session = Arc::new(Session::new(id.clone()));
                let generation = self.next_generation();
                let expiry = self.spawn_expiry(id, generation);
                vacant.insert(Entry { session: Arc::clone(&session), generation, expiry });
                debug!(session_id = session.id(), "session created");
                return session;
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.inner.entries.get(id).map(|entry| Arc::clone(&entry.session))
    }

    /// Restarts the expiry timer of `id`, returns false when the session is gone.
    pub fn touch(&self, id: &str) -> bool {
        let Some(mut entry) = self.inner.entries.get_mut(id) else {
            return false;
        };

        entry.expiry.abort();
        let generation = self.next_generation();
        entry.generation = generation;
        entry.expiry = self.spawn_expiry(id.to_string(), generation);
        trace!(session_id = id, "session renewed");
        true
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        self.inner.entries.remove(id).map(|(_, entry)| {
            entry.expiry.abort();
            entry.session
        })
    }

    /// Returns the live session for a cookie value and renews it, or a fresh session
    /// when there is no cookie or it points to an expired one. The flag tells whether
    /// the session was created by this call.
    pub fn resolve(&self, id: Option<&str>) -> (Arc<Session>, bool) {
        if let Some(id) = id {
            if self.touch(id) {
                if let Some(session) = self.get(id) {
                    return (session, false);
                }
            }
        }
        (self.create(), true)
    }

    /// `Set-Cookie` value renewing session `id`. `localhost` gets an empty domain,
    /// browsers refuse it otherwise.
    pub fn set_cookie_value(&self, id: &str, domain: &str) -> String {
        let expires = httpdate::fmt_http_date(SystemTime::now() + self.inner.timeout);
        let domain = if domain.eq_ignore_ascii_case("localhost") { "" } else { domain };
        format!("{SESSION_COOKIE}={id};expires={expires};path=/;domain={domain};httponly")
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    fn next_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::Relaxed)
    }

    fn spawn_expiry(&self, id: String, generation: u64) -> AbortHandle {
        let store: Weak<Inner> = Arc::downgrade(&self.inner);
        let timeout = self.inner.timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(store) = store.upgrade() {
                if store.entries.remove_if(&id, |_, entry| entry.generation == generation).is_some() {
                    debug!(session_id = %id, "session expired");
                }
            }
        })
        .abort_handle()
    }
}

fn generate_id() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(SESSION_ID_LEN).map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(60);

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = SessionStore::new(TIMEOUT);
        let session = store.create();

        assert_eq!(session.id().len(), 32);
        assert!(session.id().chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(Arc::ptr_eq(&store.get(session.id()).unwrap(), &session));
        assert_ne!(store.create().id(), session.id());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn session_data() {
        let store = SessionStore::new(TIMEOUT);
        let session = store.create();

        session.set("user", "alice").unwrap();
        session.set("visits", 3).unwrap();
        assert_eq!(session.get_as::<String>("user").as_deref(), Some("alice"));
        assert_eq!(session.get_as::<u32>("visits"), Some(3));
        assert_eq!(session.get_as::<u32>("user"), None);
        assert_eq!(session.remove("user"), Some(Value::from("alice")));
        assert_eq!(session.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expire_after_timeout() {
        let store = SessionStore::new(TIMEOUT);
        let id = store.create().id().to_string();

        tokio::time::sleep(TIMEOUT - Duration::from_secs(1)).await;
        assert!(store.get(&id).is_some());

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn touch_renews_expiry() {
        let store = SessionStore::new(TIMEOUT);
        let id = store.create().id().to_string();

        tokio::time::sleep(Duration::from_secs(40)).await;
        assert!(store.touch(&id));

        tokio::time::sleep(Duration::from_secs(40)).await;
        settle().await;
        assert!(store.get(&id).is_some(), "old timer must not remove the renewed session");

        tokio::time::sleep(Duration::from_secs(30)).await;
        settle().await;
        assert!(store.get(&id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_expired_gives_fresh_session() {
        let store = SessionStore::new(TIMEOUT);
        let id = store.create().id().to_string();

        let (session, created) = store.resolve(Some(&id));
        assert_eq!(session.id(), id);
        assert!(!created);

        tokio::time::sleep(TIMEOUT + Duration::from_secs(1)).await;
        settle().await;

        let (session, created) = store.resolve(Some(&id));
        assert_ne!(session.id(), id);
        assert!(created);

        let (_, created) = store.resolve(None);
        assert!(created);
    }

    #[tokio::test]
    async fn remove_session() {
        let store = SessionStore::new(TIMEOUT);
        let id = store.create().id().to_string();
        assert!(store.remove(&id).is_some());
        assert!(!store.touch(&id));
        assert!(store.remove(&id).is_none());
    }

    #[tokio::test]
    async fn cookie_value() {
        let store = SessionStore::new(TIMEOUT);

        let value = store.set_cookie_value("abc", "example.com");
        assert!(value.starts_with("_session=abc;expires="));
        assert!(value.ends_with(" GMT;path=/;domain=example.com;httponly"));

        let value = store.set_cookie_value("abc", "localhost");
        assert!(value.ends_with(";path=/;domain=;httponly"));
    }
}
