use crate::error::{Result, ScraperError};
use crate::listing::{NaturalKey, StoredListing};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Minimal CRUD contract against the listings table. The pipeline depends
/// only on this: key lookup, insert returning the row id, partial update
/// by id, and the image-enrichment queries.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Exact-match lookup by natural key; at most one row.
    async fn find_by_natural_key(&self, key: &NaturalKey) -> Result<Option<StoredListing>>;

    async fn insert_listing(&self, fields: &Map<String, Value>) -> Result<String>;

    /// Overwrites the provided columns on one row. Callers strip unset
    /// fields first, so an update never blanks populated columns.
    async fn update_listing(&self, id: &str, fields: &Map<String, Value>) -> Result<()>;

    /// Photo ids already assigned to some listing, across the whole table.
    async fn used_photo_ids(&self) -> Result<HashSet<String>>;

    async fn listings_missing_image(&self, limit: usize) -> Result<Vec<StoredListing>>;

    async fn set_listing_image(
        &self,
        id: &str,
        image_url: &str,
        photo_id: &str,
        photographer: &str,
    ) -> Result<()>;
}

/// In-memory store for tests and dry development runs. Rows keep insertion
/// order so enrichment queries are deterministic.
#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<Vec<StoredListing>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all rows, for test assertions.
    pub fn rows(&self) -> Vec<StoredListing> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingStore for InMemoryStore {
    async fn find_by_natural_key(&self, key: &NaturalKey) -> Result<Option<StoredListing>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|row| {
                row.fields
                    .get(key.column())
                    .and_then(Value::as_str)
                    .map(|v| v == key.value())
                    .unwrap_or(false)
            })
            .cloned())
    }

    async fn insert_listing(&self, fields: &Map<String, Value>) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let mut rows = self.rows.lock().unwrap();
        rows.push(StoredListing {
            id: id.clone(),
            fields: fields.clone(),
        });
        debug!("Inserted listing with id {}", id);
        Ok(id)
    }

    async fn update_listing(&self, id: &str, fields: &Map<String, Value>) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| ScraperError::Storage {
                message: format!("no row with id {}", id),
            })?;
        for (key, value) in fields {
            row.fields.insert(key.clone(), value.clone());
        }
        debug!("Updated listing with id {}", id);
        Ok(())
    }

    async fn used_photo_ids(&self) -> Result<HashSet<String>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter_map(|row| {
                row.fields
                    .get("unsplash_photo_id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .collect())
    }

    async fn listings_missing_image(&self, limit: usize) -> Result<Vec<StoredListing>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|row| {
                row.fields
                    .get("image")
                    .map(|v| v.is_null())
                    .unwrap_or(true)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn set_listing_image(
        &self,
        id: &str,
        image_url: &str,
        photo_id: &str,
        photographer: &str,
    ) -> Result<()> {
        let mut fields = Map::new();
        fields.insert("image".to_string(), Value::String(image_url.to_string()));
        fields.insert(
            "unsplash_photo_id".to_string(),
            Value::String(photo_id.to_string()),
        );
        fields.insert(
            "photographer".to_string(),
            Value::String(photographer.to_string()),
        );
        self.update_listing(id, &fields).await
    }
}

/// Store backed by the shared Supabase listings table, speaking PostgREST.
/// Config via env: SUPABASE_URL (or SUPABASE_PROJECT_REF) plus
/// SUPABASE_SERVICE_ROLE_KEY.
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    key: String,
}

impl SupabaseStore {
    pub fn from_env() -> Result<Self> {
        let base_url = match std::env::var("SUPABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                let project_ref = std::env::var("SUPABASE_PROJECT_REF")?;
                format!("https://{}.supabase.co", project_ref)
            }
        };
        let key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            key,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/listings", self.base_url)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", &self.key))
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScraperError::Storage {
                message: format!("{} failed: {} - {}", action, status.as_u16(), body),
            });
        }
        Ok(response)
    }

    fn row_from_value(value: &Value) -> Option<StoredListing> {
        let object = value.as_object()?;
        let id = match object.get("id")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(StoredListing {
            id,
            fields: object.clone(),
        })
    }
}

#[async_trait]
impl ListingStore for SupabaseStore {
    async fn find_by_natural_key(&self, key: &NaturalKey) -> Result<Option<StoredListing>> {
        let response = self
            .authed(self.client.get(self.table_url()))
            .query(&[
                (key.column(), format!("eq.{}", key.value())),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        let response = Self::check(response, "select").await?;
        let rows: Vec<Value> = response.json().await?;
        Ok(rows.first().and_then(Self::row_from_value))
    }

    async fn insert_listing(&self, fields: &Map<String, Value>) -> Result<String> {
        let response = self
            .authed(self.client.post(self.table_url()))
            .header("Prefer", "return=representation")
            .json(&vec![Value::Object(fields.clone())])
            .send()
            .await?;
        let response = Self::check(response, "insert").await?;
        let rows: Vec<Value> = response.json().await?;
        rows.first()
            .and_then(Self::row_from_value)
            .map(|row| row.id)
            .ok_or_else(|| ScraperError::Storage {
                message: "insert returned no row".to_string(),
            })
    }

    async fn update_listing(&self, id: &str, fields: &Map<String, Value>) -> Result<()> {
        let response = self
            .authed(self.client.patch(self.table_url()))
            .query(&[("id", format!("eq.{}", id))])
            .json(&Value::Object(fields.clone()))
            .send()
            .await?;
        Self::check(response, "update").await?;
        Ok(())
    }

    async fn used_photo_ids(&self) -> Result<HashSet<String>> {
        let response = self
            .authed(self.client.get(self.table_url()))
            .query(&[
                ("select", "unsplash_photo_id"),
                ("unsplash_photo_id", "not.is.null"),
            ])
            .send()
            .await?;
        let response = Self::check(response, "select photo ids").await?;
        let rows: Vec<Value> = response.json().await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                row.get("unsplash_photo_id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .collect())
    }

    async fn listings_missing_image(&self, limit: usize) -> Result<Vec<StoredListing>> {
        let response = self
            .authed(self.client.get(self.table_url()))
            .query(&[
                ("image", "is.null".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;
        let response = Self::check(response, "select missing images").await?;
        let rows: Vec<Value> = response.json().await?;
        Ok(rows.iter().filter_map(Self::row_from_value).collect())
    }

    async fn set_listing_image(
        &self,
        id: &str,
        image_url: &str,
        photo_id: &str,
        photographer: &str,
    ) -> Result<()> {
        let mut fields = Map::new();
        fields.insert("image".to_string(), Value::String(image_url.to_string()));
        fields.insert(
            "unsplash_photo_id".to_string(),
            Value::String(photo_id.to_string()),
        );
        fields.insert(
            "photographer".to_string(),
            Value::String(photographer.to_string()),
        );
        self.update_listing(id, &fields).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn insert_then_find_by_key() {
        let store = InMemoryStore::new();
        let id = store
            .insert_listing(&fields(&[
                ("website", Value::String("https://e.org/1".into())),
                ("title", Value::String("Zoo Day".into())),
            ]))
            .await
            .unwrap();

        let found = store
            .find_by_natural_key(&NaturalKey::Website("https://e.org/1".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.fields["title"], "Zoo Day");

        let missing = store
            .find_by_natural_key(&NaturalKey::Website("https://e.org/2".into()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn update_overwrites_only_provided_columns() {
        let store = InMemoryStore::new();
        let id = store
            .insert_listing(&fields(&[
                ("website", Value::String("https://e.org/1".into())),
                ("title", Value::String("Zoo Day".into())),
                ("price", Value::String("$5".into())),
            ]))
            .await
            .unwrap();

        store
            .update_listing(&id, &fields(&[("title", Value::String("Zoo Night".into()))]))
            .await
            .unwrap();

        let row = &store.rows()[0];
        assert_eq!(row.fields["title"], "Zoo Night");
        assert_eq!(row.fields["price"], "$5");
    }

    #[tokio::test]
    async fn photo_queries_round_trip() {
        let store = InMemoryStore::new();
        let id = store
            .insert_listing(&fields(&[(
                "website",
                Value::String("https://e.org/1".into()),
            )]))
            .await
            .unwrap();
        store
            .insert_listing(&fields(&[
                ("website", Value::String("https://e.org/2".into())),
                ("image", Value::String("https://img".into())),
                ("unsplash_photo_id", Value::String("ph_1".into())),
            ]))
            .await
            .unwrap();

        let missing = store.listings_missing_image(10).await.unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, id);

        store
            .set_listing_image(&id, "https://img2", "ph_2", "A. Adams")
            .await
            .unwrap();
        let used = store.used_photo_ids().await.unwrap();
        assert!(used.contains("ph_1") && used.contains("ph_2"));
        assert!(store.listings_missing_image(10).await.unwrap().is_empty());
    }
}
