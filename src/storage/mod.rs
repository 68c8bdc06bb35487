//! Document storage for every collection the backend owns.
//!
//! Documents are JSON values keyed by id inside named collections. The
//! [`DocumentStore`] trait is the backend seam; [`Db`] layers typed access
//! for each collection on top of it.
//!
//! ## Collections
//!
//! ```text
//! universities               # UniversityRecord, versioned
//! user_profiles              # UserProfile by uid
//! studyAbroadPathways        # PathwayTemplate by profile key
//! userStudyAbroadPathways    # UserPathway by id
//! subscriptionUsage          # SubscriptionUsage by uid
//! exchangeRates              # ExchangeRates by base currency
//! ```

pub mod local;
pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::Result;
use crate::models::{
    ExchangeRates, PathwayTemplate, SubscriptionUsage, UniversityRecord, UserPathway, UserProfile,
    migrate_university,
};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Named document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Universities,
    UserProfiles,
    PathwayTemplates,
    UserPathways,
    SubscriptionUsage,
    ExchangeRates,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Universities,
        Collection::UserProfiles,
        Collection::PathwayTemplates,
        Collection::UserPathways,
        Collection::SubscriptionUsage,
        Collection::ExchangeRates,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Universities => "universities",
            Collection::UserProfiles => "user_profiles",
            Collection::PathwayTemplates => "studyAbroadPathways",
            Collection::UserPathways => "userStudyAbroadPathways",
            Collection::SubscriptionUsage => "subscriptionUsage",
            Collection::ExchangeRates => "exchangeRates",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for document storage backends.
///
/// Writes are per-document atomic; there are no multi-document transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>>;

    /// Insert or replace one document.
    async fn put(&self, collection: Collection, id: &str, doc: Value) -> Result<()>;

    /// Remove one document, returning whether it existed.
    async fn delete(&self, collection: Collection, id: &str) -> Result<bool>;

    /// All documents of a collection, ordered by id.
    async fn list(&self, collection: Collection) -> Result<Vec<Value>>;
}

/// Typed access to the collections.
#[derive(Clone)]
pub struct Db {
    store: Arc<dyn DocumentStore>,
}

impl Db {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Database backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    async fn get_as<T: DeserializeOwned>(&self, collection: Collection, id: &str) -> Result<Option<T>> {
        match self.store.get(collection, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    async fn put_as<T: Serialize>(&self, collection: Collection, id: &str, doc: &T) -> Result<()> {
        self.store
            .put(collection, id, serde_json::to_value(doc)?)
            .await
    }

    /// Decode every document, skipping the ones that no longer parse.
    async fn list_as<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let docs = self.store.list(collection).await?;
        let mut items = Vec::with_capacity(docs.len());
        for doc in docs {
            match serde_json::from_value(doc) {
                Ok(item) => items.push(item),
                Err(e) => log::warn!("Skipping malformed document in {}: {}", collection, e),
            }
        }
        Ok(items)
    }

    // --- Universities ---

    pub async fn university(&self, id: &str) -> Result<Option<UniversityRecord>> {
        match self.store.get(Collection::Universities, id).await? {
            Some(doc) => Ok(Some(migrate_university(doc)?)),
            None => Ok(None),
        }
    }

    /// All universities, migrated to the current schema.
    pub async fn universities(&self) -> Result<Vec<UniversityRecord>> {
        let docs = self.store.list(Collection::Universities).await?;
        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            match migrate_university(doc) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping unreadable university document: {}", e),
            }
        }
        Ok(records)
    }

    pub async fn save_university(&self, record: &UniversityRecord) -> Result<()> {
        self.put_as(Collection::Universities, &record.id, record).await
    }

    pub async fn delete_university(&self, id: &str) -> Result<bool> {
        self.store.delete(Collection::Universities, id).await
    }

    /// Raw university documents, for migrations that report per-document outcomes.
    pub async fn raw_universities(&self) -> Result<Vec<Value>> {
        self.store.list(Collection::Universities).await
    }

    // --- Pathway templates ---

    pub async fn template(&self, key: &str) -> Result<Option<PathwayTemplate>> {
        self.get_as(Collection::PathwayTemplates, key).await
    }

    pub async fn templates(&self) -> Result<Vec<PathwayTemplate>> {
        self.list_as(Collection::PathwayTemplates).await
    }

    pub async fn save_template(&self, template: &PathwayTemplate) -> Result<()> {
        self.put_as(Collection::PathwayTemplates, &template.key, template)
            .await
    }

    // --- User pathways ---

    pub async fn user_pathway(&self, id: &str) -> Result<Option<UserPathway>> {
        self.get_as(Collection::UserPathways, id).await
    }

    /// Pathways of one user, most recently updated first.
    pub async fn user_pathways(&self, user_id: &str) -> Result<Vec<UserPathway>> {
        let mut pathways: Vec<UserPathway> = self
            .list_as::<UserPathway>(Collection::UserPathways)
            .await?
            .into_iter()
            .filter(|p| p.user_id == user_id)
            .collect();
        pathways.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(pathways)
    }

    pub async fn save_user_pathway(&self, pathway: &UserPathway) -> Result<()> {
        self.put_as(Collection::UserPathways, &pathway.id, pathway)
            .await
    }

    // --- Profiles and usage ---

    pub async fn profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        self.get_as(Collection::UserProfiles, uid).await
    }

    pub async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        self.put_as(Collection::UserProfiles, &profile.uid, profile)
            .await
    }

    pub async fn usage(&self, uid: &str) -> Result<Option<SubscriptionUsage>> {
        self.get_as(Collection::SubscriptionUsage, uid).await
    }

    pub async fn save_usage(&self, usage: &SubscriptionUsage) -> Result<()> {
        self.put_as(Collection::SubscriptionUsage, &usage.user_id, usage)
            .await
    }

    // --- Exchange rates ---

    pub async fn exchange_rates(&self, base: &str) -> Result<Option<ExchangeRates>> {
        self.get_as(Collection::ExchangeRates, base).await
    }

    pub async fn save_exchange_rates(&self, rates: &ExchangeRates) -> Result<()> {
        self.put_as(Collection::ExchangeRates, &rates.base, rates)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::sample_university;
    use serde_json::json;

    #[tokio::test]
    async fn list_skips_malformed_documents() {
        let store = Arc::new(MemoryStorage::new());
        let db = Db::new(store.clone());

        db.save_university(&sample_university("McGill University", "Montreal", "Canada"))
            .await
            .unwrap();
        store
            .put(Collection::Universities, "broken", json!("not an object"))
            .await
            .unwrap();

        let records = db.universities().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "McGill University");
    }

    #[tokio::test]
    async fn university_roundtrip_and_delete() {
        let db = Db::in_memory();
        let record = sample_university("University of Melbourne", "Melbourne", "Australia");
        db.save_university(&record).await.unwrap();

        assert_eq!(db.university(&record.id).await.unwrap(), Some(record.clone()));
        assert!(db.delete_university(&record.id).await.unwrap());
        assert!(!db.delete_university(&record.id).await.unwrap());
        assert!(db.university(&record.id).await.unwrap().is_none());
    }
}
