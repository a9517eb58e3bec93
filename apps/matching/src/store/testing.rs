//! Store doubles shared by the repository and router tests.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use super::{
    MatchingDocument, MatchingFilter, MatchingStore, MatchingUpdate, MemoryStore, StoreError,
    UpdateCounts,
};

/// Store whose scans fail after yielding the documents it holds, whose bulk
/// inserts and pings fail outright, and whose other calls succeed.
#[derive(Default)]
pub struct BrokenStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl MatchingStore for BrokenStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn find(&self, filter: &MatchingFilter) -> Result<Vec<MatchingDocument>, StoreError> {
        Err(StoreError::Scan {
            partial: self.inner.find(filter).await?,
            source: Box::new(StoreError::Decode("invalid type: string".into())),
        })
    }

    async fn find_one(
        &self,
        filter: &MatchingFilter,
    ) -> Result<Option<MatchingDocument>, StoreError> {
        self.inner.find_one(filter).await
    }

    async fn insert_one(&self, document: &MatchingDocument) -> Result<ObjectId, StoreError> {
        self.inner.insert_one(document).await
    }

    async fn insert_many(
        &self,
        _documents: &[MatchingDocument],
    ) -> Result<Vec<ObjectId>, StoreError> {
        Err(StoreError::Unavailable("write concern not satisfied".into()))
    }

    async fn update_one(
        &self,
        filter: &MatchingFilter,
        update: &MatchingUpdate,
    ) -> Result<UpdateCounts, StoreError> {
        self.inner.update_one(filter, update).await
    }

    async fn delete_many(&self, filter: &MatchingFilter) -> Result<u64, StoreError> {
        self.inner.delete_many(filter).await
    }
}
