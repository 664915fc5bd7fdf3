use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::AuthSession;
use crate::errors::ServiceError;
use crate::store::KvStore;

/// In-process fake of the hosted store: one JSON tree behind a lock.
///
/// Mirrors the REST surface's semantics (absent reads are `None`, deletes of
/// absent paths succeed, patches merge shallowly) without auth rules, so a
/// session is accepted but never checked. Intended for tests and local
/// development.
#[derive(Default)]
pub struct MemoryStore {
    root: RwLock<Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Value::Object(Map::new())),
        }
    }

    fn segments(path: &str) -> Vec<&str> {
        path.split('/').filter(|s| !s.is_empty()).collect()
    }

    fn node<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
        let mut current = root;
        for segment in Self::segments(path) {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Walks to the parent of the last segment, creating objects on the way,
    /// and returns (parent map, final key).
    fn entry_slot<'a>(root: &'a mut Value, path: &str) -> (&'a mut Map<String, Value>, String) {
        let segments = Self::segments(path);
        let (last, parents) = segments.split_last().expect("empty store path");

        let mut current = root;
        for segment in parents {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            current = current
                .as_object_mut()
                .expect("just ensured object")
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        (
            current.as_object_mut().expect("just ensured object"),
            (*last).to_string(),
        )
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, _session: &AuthSession, path: &str) -> Result<Option<Value>, ServiceError> {
        let root = self.root.read().await;
        Ok(Self::node(&root, path)
            .filter(|v| !v.is_null())
            .cloned())
    }

    async fn put(
        &self,
        _session: &AuthSession,
        path: &str,
        value: Value,
    ) -> Result<(), ServiceError> {
        let mut root = self.root.write().await;
        let (parent, key) = Self::entry_slot(&mut root, path);
        parent.insert(key, value);
        Ok(())
    }

    async fn patch(
        &self,
        _session: &AuthSession,
        path: &str,
        value: Value,
    ) -> Result<(), ServiceError> {
        let updates = match value {
            Value::Object(map) => map,
            other => {
                return Err(ServiceError::InvalidOperation(format!(
                    "patch requires an object, got {}",
                    other
                )))
            }
        };

        let mut root = self.root.write().await;
        let (parent, key) = Self::entry_slot(&mut root, path);
        let target = parent
            .entry(key)
            .or_insert_with(|| Value::Object(Map::new()));
        if !target.is_object() {
            *target = Value::Object(Map::new());
        }
        let target = target.as_object_mut().expect("just ensured object");
        for (k, v) in updates {
            target.insert(k, v);
        }
        Ok(())
    }

    async fn push(
        &self,
        _session: &AuthSession,
        path: &str,
        value: Value,
    ) -> Result<String, ServiceError> {
        let key = format!("-{}", Uuid::new_v4().simple());
        let child = format!("{}/{}", path.trim_end_matches('/'), key);
        self.put(_session, &child, value).await?;
        Ok(key)
    }

    async fn delete(&self, _session: &AuthSession, path: &str) -> Result<(), ServiceError> {
        let segments = Self::segments(path);
        let Some((last, parents)) = segments.split_last() else {
            return Ok(());
        };

        let mut root = self.root.write().await;
        let mut current = &mut *root;
        for segment in parents {
            match current.as_object_mut().and_then(|o| o.get_mut(*segment)) {
                Some(next) => current = next,
                // Absent subtree: nothing to delete.
                None => return Ok(()),
            }
        }
        if let Some(obj) = current.as_object_mut() {
            obj.remove(*last);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> AuthSession {
        AuthSession::new("u1", "token")
    }

    #[tokio::test]
    async fn get_absent_path_is_none() {
        let store = MemoryStore::new();
        let got = store.get(&session(), "carts/u1").await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = MemoryStore::new();
        store
            .put(&session(), "orders/k1", json!({ "status": "pending" }))
            .await
            .unwrap();

        let got = store.get(&session(), "orders/k1").await.unwrap().unwrap();
        assert_eq!(got["status"], "pending");
    }

    #[tokio::test]
    async fn patch_merges_shallowly() {
        let store = MemoryStore::new();
        store
            .put(
                &session(),
                "orders/k1",
                json!({ "status": "pending", "total": 100 }),
            )
            .await
            .unwrap();
        store
            .patch(&session(), "orders/k1", json!({ "status": "processing" }))
            .await
            .unwrap();

        let got = store.get(&session(), "orders/k1").await.unwrap().unwrap();
        assert_eq!(got["status"], "processing");
        assert_eq!(got["total"], 100);
    }

    #[tokio::test]
    async fn push_creates_distinct_keys() {
        let store = MemoryStore::new();
        let k1 = store
            .push(&session(), "carts/u1", json!({ "quantity": 1 }))
            .await
            .unwrap();
        let k2 = store
            .push(&session(), "carts/u1", json!({ "quantity": 2 }))
            .await
            .unwrap();
        assert_ne!(k1, k2);

        let subtree = store.get(&session(), "carts/u1").await.unwrap().unwrap();
        assert_eq!(subtree.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_absent_path_is_ok() {
        let store = MemoryStore::new();
        store.delete(&session(), "carts/u1/i1").await.unwrap();
    }

    #[tokio::test]
    async fn delete_removes_subtree() {
        let store = MemoryStore::new();
        store
            .put(&session(), "carts/u1/i1", json!({ "quantity": 1 }))
            .await
            .unwrap();
        store.delete(&session(), "carts/u1").await.unwrap();
        assert!(store.get(&session(), "carts/u1").await.unwrap().is_none());
    }
}
