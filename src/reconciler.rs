use crate::error::Result;
use crate::listing::Listing;
use crate::storage::ListingStore;
use crate::types::ChangeType;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Create-vs-update decision and the single write that follows it.
///
/// Lookup is exact natural-key equality against at most one row. This is a
/// read-then-write sequence with no transactional guarantee; two concurrent
/// runs over the same source could each insert. Runs are sequential and
/// single-operator in practice, so that window is accepted.
pub struct Reconciler {
    store: Arc<dyn ListingStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ListingStore>) -> Self {
        Self { store }
    }

    pub async fn reconcile(&self, listing: &Listing) -> Result<ChangeType> {
        // Unset fields are already stripped, so the update below cannot
        // blank out previously-populated columns.
        let fields = listing.to_fields();

        match self.store.find_by_natural_key(&listing.natural_key).await? {
            Some(existing) => {
                let mut update = fields;
                update.insert(
                    "updated_at".to_string(),
                    Value::String(Utc::now().to_rfc3339()),
                );
                self.store.update_listing(&existing.id, &update).await?;
                debug!("Updated listing {} ({})", listing.title, existing.id);
                Ok(ChangeType::Updated)
            }
            None => {
                let id = self.store.insert_listing(&fields).await?;
                info!("Created listing {} ({})", listing.title, id);
                Ok(ChangeType::Created)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{ListingType, NaturalKey};
    use crate::storage::InMemoryStore;

    fn listing(title: &str, price: Option<&str>) -> Listing {
        Listing {
            natural_key: NaturalKey::Website("https://e.org/1".into()),
            title: title.into(),
            listing_type: ListingType::Event,
            description: None,
            start_date: None,
            location_name: None,
            street: None,
            city: None,
            state: None,
            zip: None,
            latitude: None,
            longitude: None,
            price: price.map(str::to_string),
            age_range: None,
            organizer: None,
            website: Some("https://e.org/1".into()),
            image: None,
            tags: String::new(),
            place_type: None,
        }
    }

    #[tokio::test]
    async fn first_write_creates_second_updates() {
        let store = Arc::new(InMemoryStore::new());
        let reconciler = Reconciler::new(store.clone());

        assert_eq!(
            reconciler.reconcile(&listing("Zoo Day", Some("$5"))).await.unwrap(),
            ChangeType::Created
        );
        assert_eq!(
            reconciler.reconcile(&listing("Zoo Day", Some("$5"))).await.unwrap(),
            ChangeType::Updated
        );
        assert_eq!(store.rows().len(), 1);
    }

    #[tokio::test]
    async fn update_does_not_blank_fields_the_new_record_lacks() {
        let store = Arc::new(InMemoryStore::new());
        let reconciler = Reconciler::new(store.clone());

        reconciler.reconcile(&listing("Zoo Day", Some("$5"))).await.unwrap();
        reconciler.reconcile(&listing("Zoo Day", None)).await.unwrap();

        let row = &store.rows()[0];
        assert_eq!(row.fields["price"], "$5");
        assert!(row.fields.contains_key("updated_at"));
    }
}
