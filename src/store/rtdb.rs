use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;

use crate::auth::AuthSession;
use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::store::KvStore;

/// REST client for the hosted realtime-database tree.
///
/// Every call targets `{base}/{path}.json?auth={idToken}`; the credential
/// rides as a query parameter, which is the surface's auth contract. One
/// attempt per operation; retry policy belongs to callers.
#[derive(Clone)]
pub struct RtdbClient {
    http: Client,
    base_url: String,
}

/// The store answers a push with the generated child key.
#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

impl RtdbClient {
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.rtdb_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, session: &AuthSession, path: &str) -> String {
        format!("{}/{}.json?auth={}", self.base_url, path, session.id_token)
    }

    async fn send(
        &self,
        method: Method,
        session: &AuthSession,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, ServiceError> {
        let mut request = self.http.request(method, self.url(session, path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ServiceError::from_backend_status(response.status(), path));
        }
        Ok(response)
    }
}

#[async_trait]
impl KvStore for RtdbClient {
    #[instrument(skip(self, session))]
    async fn get(&self, session: &AuthSession, path: &str) -> Result<Option<Value>, ServiceError> {
        let response = self.send(Method::GET, session, path, None).await?;
        let value: Value = response.json().await?;
        // The surface answers an absent subtree with a JSON null body.
        Ok(if value.is_null() { None } else { Some(value) })
    }

    #[instrument(skip(self, session, value))]
    async fn put(
        &self,
        session: &AuthSession,
        path: &str,
        value: Value,
    ) -> Result<(), ServiceError> {
        self.send(Method::PUT, session, path, Some(&value)).await?;
        Ok(())
    }

    #[instrument(skip(self, session, value))]
    async fn patch(
        &self,
        session: &AuthSession,
        path: &str,
        value: Value,
    ) -> Result<(), ServiceError> {
        self.send(Method::PATCH, session, path, Some(&value))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, session, value))]
    async fn push(
        &self,
        session: &AuthSession,
        path: &str,
        value: Value,
    ) -> Result<String, ServiceError> {
        let response = self.send(Method::POST, session, path, Some(&value)).await?;
        let created: PushResponse = response.json().await?;
        Ok(created.name)
    }

    #[instrument(skip(self, session))]
    async fn delete(&self, session: &AuthSession, path: &str) -> Result<(), ServiceError> {
        self.send(Method::DELETE, session, path, None).await?;
        Ok(())
    }
}
