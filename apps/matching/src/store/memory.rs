//! MemoryStore - Vec-backed matching store for tests and local development.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use super::{
    MatchingDocument, MatchingFilter, MatchingStore, MatchingUpdate, StoreError, UpdateCounts,
};

/// In-memory store. Documents keep insertion order. Clone-friendly via Arc.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<Vec<MatchingDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<MatchingDocument>>, StoreError> {
        self.documents
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<MatchingDocument>>, StoreError> {
        self.documents
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn assign_id(document: &MatchingDocument) -> (ObjectId, MatchingDocument) {
        let id = document.id.unwrap_or_else(ObjectId::new);
        let stored = MatchingDocument {
            id: Some(id),
            ..document.clone()
        };
        (id, stored)
    }
}

#[async_trait]
impl MatchingStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }

    async fn find(&self, filter: &MatchingFilter) -> Result<Vec<MatchingDocument>, StoreError> {
        Ok(self
            .read()?
            .iter()
            .filter(|document| filter.matches(document))
            .cloned()
            .collect())
    }

    async fn find_one(
        &self,
        filter: &MatchingFilter,
    ) -> Result<Option<MatchingDocument>, StoreError> {
        Ok(self
            .read()?
            .iter()
            .find(|document| filter.matches(document))
            .cloned())
    }

    async fn insert_one(&self, document: &MatchingDocument) -> Result<ObjectId, StoreError> {
        let (id, stored) = Self::assign_id(document);
        let mut documents = self.write()?;
        if documents.iter().any(|existing| existing.id == Some(id)) {
            return Err(StoreError::Unavailable(format!("duplicate key _id {id}")));
        }
        documents.push(stored);
        Ok(id)
    }

    async fn insert_many(
        &self,
        documents: &[MatchingDocument],
    ) -> Result<Vec<ObjectId>, StoreError> {
        let mut stored = self.write()?;
        let mut ids = Vec::with_capacity(documents.len());
        for document in documents {
            let (id, document) = Self::assign_id(document);
            stored.push(document);
            ids.push(id);
        }
        Ok(ids)
    }

    async fn update_one(
        &self,
        filter: &MatchingFilter,
        update: &MatchingUpdate,
    ) -> Result<UpdateCounts, StoreError> {
        let mut documents = self.write()?;
        let Some(document) = documents.iter_mut().find(|document| filter.matches(document)) else {
            return Ok(UpdateCounts::default());
        };
        let modified = u64::from(update.apply(document));
        Ok(UpdateCounts {
            matched: 1,
            modified,
        })
    }

    async fn delete_many(&self, filter: &MatchingFilter) -> Result<u64, StoreError> {
        let mut documents = self.write()?;
        let before = documents.len();
        documents.retain(|document| !filter.matches(document));
        Ok((before - documents.len()) as u64)
    }
}
