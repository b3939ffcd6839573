//! In-process cookie store.

use std::sync::Arc;

use async_trait::async_trait;
use contract::{CookieAccessor, CookieError, CookieName};
use dashmap::DashMap;
use tracing::debug;

/// In-process cookie storage.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryCookieStore {
    values: Arc<DashMap<String, String>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `token` as the auth token.
    pub fn with_auth_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store
            .values
            .insert(CookieName::AUTH_TOKEN.to_owned(), token.into());
        store
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[async_trait]
impl CookieAccessor for MemoryCookieStore {
    async fn get(&self, name: &CookieName) -> Result<Option<String>, CookieError> {
        Ok(self
            .values
            .get(name.as_str())
            .map(|v| v.value().clone())
            .filter(|v| !v.is_empty()))
    }

    async fn set(&self, name: &CookieName, value: String) -> Result<(), CookieError> {
        debug!(cookie = %name, "Storing cookie");
        self.values.insert(name.as_str().to_owned(), value);
        Ok(())
    }

    async fn delete(&self, name: &CookieName) -> Result<(), CookieError> {
        debug!(cookie = %name, "Deleting cookie");
        self.values.remove(name.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_cookie_is_none() {
        let store = MemoryCookieStore::new();
        assert_eq!(store.get(&CookieName::auth_token()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_get_delete() {
        let store = MemoryCookieStore::new();
        let name = CookieName::auth_token();

        store.set(&name, "abc".into()).await.unwrap();
        assert_eq!(store.get(&name).await.unwrap().as_deref(), Some("abc"));

        store.delete(&name).await.unwrap();
        assert_eq!(store.get(&name).await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn empty_value_reads_as_absent() {
        let store = MemoryCookieStore::with_auth_token("");
        assert_eq!(store.get(&CookieName::auth_token()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = MemoryCookieStore::new();
        let other = store.clone();
        store
            .set(&CookieName::auth_token(), "shared".into())
            .await
            .unwrap();
        assert_eq!(
            other.get(&CookieName::auth_token()).await.unwrap().as_deref(),
            Some("shared")
        );
    }
}
