use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::auth::AuthSession;
use crate::errors::ServiceError;
use crate::models::{NewProduct, Product, ProductPatch, ProductStatus};
use crate::store::{paths, KvStore};

/// Catalog service over `products/{productId}`.
///
/// The workflow reads listings at add-to-cart time; sellers manage their own
/// listings through the write operations.
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn KvStore>,
}

impl ProductService {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, session))]
    pub async fn get_product(
        &self,
        session: &AuthSession,
        product_id: &str,
    ) -> Result<Option<Product>, ServiceError> {
        let Some(value) = self
            .store
            .get(session, &paths::product(product_id))
            .await?
        else {
            return Ok(None);
        };
        Product::from_entry(product_id, value).map(Some)
    }

    /// All listings, undecodable records skipped.
    #[instrument(skip(self, session))]
    pub async fn get_products(&self, session: &AuthSession) -> Result<Vec<Product>, ServiceError> {
        let Some(table) = self.store.get(session, paths::PRODUCTS).await? else {
            return Ok(Vec::new());
        };
        let entries = table.as_object().cloned().unwrap_or_default();

        let mut products = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match Product::from_entry(&key, value) {
                Ok(product) => products.push(product),
                Err(err) => warn!(product_id = %key, %err, "skipping undecodable listing"),
            }
        }
        Ok(products)
    }

    /// Listings currently offered for sale.
    #[instrument(skip(self, session))]
    pub async fn list_active(&self, session: &AuthSession) -> Result<Vec<Product>, ServiceError> {
        let mut products = self.get_products(session).await?;
        products.retain(|p| p.status == ProductStatus::Active);
        Ok(products)
    }

    /// Creates a listing, stamping `createdAt`, and returns its key.
    #[instrument(skip(self, session, draft), fields(name = %draft.name))]
    pub async fn add_product(
        &self,
        session: &AuthSession,
        draft: NewProduct,
    ) -> Result<String, ServiceError> {
        let mut value = serde_json::to_value(&draft)?;
        if let Some(record) = value.as_object_mut() {
            record.insert("createdAt".to_string(), json!(Utc::now()));
        }

        let key = self.store.push(session, paths::PRODUCTS, value).await?;
        info!(product_id = %key, "listing created");
        Ok(key)
    }

    /// Patches the set fields of a listing.
    #[instrument(skip(self, session, patch))]
    pub async fn update_product(
        &self,
        session: &AuthSession,
        product_id: &str,
        patch: ProductPatch,
    ) -> Result<(), ServiceError> {
        let value = serde_json::to_value(&patch)?;
        if value.as_object().is_some_and(|patch| patch.is_empty()) {
            return Ok(());
        }
        self.store
            .patch(session, &paths::product(product_id), value)
            .await
    }

    #[instrument(skip(self, session))]
    pub async fn delete_product(
        &self,
        session: &AuthSession,
        product_id: &str,
    ) -> Result<(), ServiceError> {
        self.store
            .delete(session, &paths::product(product_id))
            .await
    }
}
