use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use futures::TryStreamExt;
use mongodb::{Client, Collection, Database};

use crate::error::StoreError;
use crate::models::itinerary::Itinerary;

pub const COLLECTION: &str = "itineraries";

/// Persistence for itineraries. Ids the backend cannot parse behave like
/// ids that do not exist.
#[async_trait]
pub trait ItineraryStore: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Checks the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Stores a new itinerary and returns it with its assigned id.
    async fn insert(&self, itinerary: Itinerary) -> Result<Itinerary, StoreError>;

    /// All itineraries, newest first.
    async fn list(&self) -> Result<Vec<Itinerary>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Itinerary>, StoreError>;

    /// Overwrites an existing itinerary. Returns `None` if it is gone.
    async fn replace(&self, id: &str, itinerary: Itinerary) -> Result<Option<Itinerary>, StoreError>;

    /// Returns whether anything was removed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

pub struct MongoItineraryStore {
    database: Database,
    collection: Collection<Document>,
}

impl MongoItineraryStore {
    pub fn new(client: Arc<Client>, database: &str) -> Self {
        let database = client.database(database);
        Self {
            collection: database.collection(COLLECTION),
            database,
        }
    }

    fn to_document(itinerary: &Itinerary) -> Result<Document, StoreError> {
        let mut document = bson::to_document(itinerary)?;
        document.remove("id");
        Ok(document)
    }

    fn from_document(mut document: Document) -> Result<Itinerary, StoreError> {
        if let Some(Bson::ObjectId(oid)) = document.remove("_id") {
            document.insert("id", oid.to_hex());
        }
        Ok(bson::from_document(document)?)
    }
}

#[async_trait]
impl ItineraryStore for MongoItineraryStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn insert(&self, mut itinerary: Itinerary) -> Result<Itinerary, StoreError> {
        let oid = ObjectId::new();
        let mut document = Self::to_document(&itinerary)?;
        document.insert("_id", oid);
        self.collection.insert_one(document).await?;

        itinerary.id = Some(oid.to_hex());
        Ok(itinerary)
    }

    async fn list(&self) -> Result<Vec<Itinerary>, StoreError> {
        // ObjectIds start with their creation time.
        let cursor = self.collection.find(doc! {}).sort(doc! { "_id": -1 }).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        documents.into_iter().map(Self::from_document).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<Itinerary>, StoreError> {
        let oid = match ObjectId::parse_str(id) {
            Ok(oid) => oid,
            Err(_) => return Ok(None),
        };
        match self.collection.find_one(doc! { "_id": oid }).await? {
            Some(document) => Ok(Some(Self::from_document(document)?)),
            None => Ok(None),
        }
    }

    async fn replace(&self, id: &str, mut itinerary: Itinerary) -> Result<Option<Itinerary>, StoreError> {
        let oid = match ObjectId::parse_str(id) {
            Ok(oid) => oid,
            Err(_) => return Ok(None),
        };
        let document = Self::to_document(&itinerary)?;
        let result = self.collection.replace_one(doc! { "_id": oid }, document).await?;
        if result.matched_count == 0 {
            return Ok(None);
        }

        itinerary.id = Some(oid.to_hex());
        Ok(Some(itinerary))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let oid = match ObjectId::parse_str(id) {
            Ok(oid) => oid,
            Err(_) => return Ok(false),
        };
        let result = self.collection.delete_one(doc! { "_id": oid }).await?;
        Ok(result.deleted_count > 0)
    }
}

/// Process-local store used when MongoDB is not configured or unreachable.
/// Ids are decimal counters; nothing survives a restart.
#[derive(Default)]
pub struct InMemoryItineraryStore {
    next_id: AtomicU64,
    itineraries: RwLock<BTreeMap<u64, Itinerary>>,
}

impl InMemoryItineraryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItineraryStore for InMemoryItineraryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, mut itinerary: Itinerary) -> Result<Itinerary, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        itinerary.id = Some(id.to_string());

        let mut itineraries = self.itineraries.write().map_err(|_| StoreError::Poisoned)?;
        itineraries.insert(id, itinerary.clone());
        Ok(itinerary)
    }

    async fn list(&self) -> Result<Vec<Itinerary>, StoreError> {
        let itineraries = self.itineraries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(itineraries.values().rev().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Itinerary>, StoreError> {
        let key = match id.parse::<u64>() {
            Ok(key) => key,
            Err(_) => return Ok(None),
        };
        let itineraries = self.itineraries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(itineraries.get(&key).cloned())
    }

    async fn replace(&self, id: &str, mut itinerary: Itinerary) -> Result<Option<Itinerary>, StoreError> {
        let key = match id.parse::<u64>() {
            Ok(key) => key,
            Err(_) => return Ok(None),
        };
        let mut itineraries = self.itineraries.write().map_err(|_| StoreError::Poisoned)?;
        match itineraries.get_mut(&key) {
            Some(slot) => {
                itinerary.id = Some(key.to_string());
                *slot = itinerary.clone();
                Ok(Some(itinerary))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let key = match id.parse::<u64>() {
            Ok(key) => key,
            Err(_) => return Ok(false),
        };
        let mut itineraries = self.itineraries.write().map_err(|_| StoreError::Poisoned)?;
        Ok(itineraries.remove(&key).is_some())
    }
}
