//! Document store seam for matching records.
//!
//! `MongoStore` is the production backend. `MemoryStore` keeps documents in
//! process and backs the test suite and local runs without a database.
//! `MatchingRepository` holds an `Arc<dyn MatchingStore>` and never talks to
//! the driver directly.

pub mod memory;
pub mod mongo;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::matching::{now_millis, Matching};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Collection holding matching documents.
pub const MATCHING_COLLECTION: &str = "matching";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store error: {0}")]
    Driver(#[from] mongodb::error::Error),

    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to decode matching document: {0}")]
    Decode(String),

    #[error("scan aborted after {} documents: {source}", .partial.len())]
    Scan {
        partial: Vec<MatchingDocument>,
        source: Box<StoreError>,
    },
}

/// Stored shape of a matching. `_id` is left out on insert so the store assigns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub summary_id: ObjectId,
    pub matched_summary_id: ObjectId,
    pub match_rate: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<BsonDateTime>,
}

impl MatchingDocument {
    /// Builds the document inserted for a new matching: no `_id`, and
    /// `createdAt` stamped now when the caller left it unset.
    pub fn for_insert(matching: &Matching) -> Self {
        let created_at = matching.created_at.unwrap_or_else(now_millis);
        MatchingDocument {
            id: None,
            summary_id: matching.summary_id,
            matched_summary_id: matching.matched_summary_id,
            match_rate: matching.match_rate,
            created_at: Some(to_bson_datetime(created_at)),
        }
    }
}

impl From<MatchingDocument> for Matching {
    fn from(document: MatchingDocument) -> Self {
        Matching {
            id: document.id,
            summary_id: document.summary_id,
            matched_summary_id: document.matched_summary_id,
            match_rate: document.match_rate,
            created_at: document.created_at.and_then(from_bson_datetime),
        }
    }
}

fn to_bson_datetime(at: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(at.timestamp_millis())
}

fn from_bson_datetime(at: BsonDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(at.timestamp_millis())
}

/// Equality filters the repository issues against the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingFilter {
    All,
    Id(ObjectId),
    SummaryId(ObjectId),
}

impl MatchingFilter {
    pub fn to_document(&self) -> Document {
        match self {
            MatchingFilter::All => doc! {},
            MatchingFilter::Id(id) => doc! { "_id": *id },
            MatchingFilter::SummaryId(id) => doc! { "summaryId": *id },
        }
    }

    pub fn matches(&self, document: &MatchingDocument) -> bool {
        match self {
            MatchingFilter::All => true,
            MatchingFilter::Id(id) => document.id.as_ref() == Some(id),
            MatchingFilter::SummaryId(id) => document.summary_id == *id,
        }
    }
}

/// The mutable fields of a matching. `_id` and `createdAt` are never part of an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingUpdate {
    pub summary_id: ObjectId,
    pub matched_summary_id: ObjectId,
    pub match_rate: i64,
}

impl From<&Matching> for MatchingUpdate {
    fn from(matching: &Matching) -> Self {
        MatchingUpdate {
            summary_id: matching.summary_id,
            matched_summary_id: matching.matched_summary_id,
            match_rate: matching.match_rate,
        }
    }
}

impl MatchingUpdate {
    pub fn to_document(&self) -> Document {
        doc! {
            "$set": {
                "summaryId": self.summary_id,
                "matchedSummaryId": self.matched_summary_id,
                "matchRate": self.match_rate,
            }
        }
    }

    /// Applies the update in place, returning whether any field changed.
    pub fn apply(&self, document: &mut MatchingDocument) -> bool {
        let changed = document.summary_id != self.summary_id
            || document.matched_summary_id != self.matched_summary_id
            || document.match_rate != self.match_rate;
        document.summary_id = self.summary_id;
        document.matched_summary_id = self.matched_summary_id;
        document.match_rate = self.match_rate;
        changed
    }
}

/// Result of an update: how many documents the filter selected and how many changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateCounts {
    pub matched: u64,
    pub modified: u64,
}

/// Collection-scoped primitives every backend provides. All calls are
/// cancelled by dropping the returned future.
#[async_trait]
pub trait MatchingStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    /// Every document selected by `filter`, in store order.
    async fn find(&self, filter: &MatchingFilter) -> Result<Vec<MatchingDocument>, StoreError>;

    async fn find_one(
        &self,
        filter: &MatchingFilter,
    ) -> Result<Option<MatchingDocument>, StoreError>;

    /// Inserts one document and returns the id the store assigned.
    async fn insert_one(&self, document: &MatchingDocument) -> Result<ObjectId, StoreError>;

    /// Inserts all documents, returning assigned ids in input order.
    async fn insert_many(&self, documents: &[MatchingDocument])
        -> Result<Vec<ObjectId>, StoreError>;

    async fn update_one(
        &self,
        filter: &MatchingFilter,
        update: &MatchingUpdate,
    ) -> Result<UpdateCounts, StoreError>;

    /// Removes every selected document. Test setup only; no route reaches it.
    #[cfg_attr(not(test), allow(dead_code))]
    async fn delete_many(&self, filter: &MatchingFilter) -> Result<u64, StoreError>;
}
