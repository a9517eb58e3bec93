//! Matching repository: typed operations in, store filters and updates out.
//!
//! Every call round-trips to the store; nothing is cached. Store errors are
//! passed through unchanged and nothing is retried.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::matching::validation::check_new;
use crate::models::matching::{now_millis, truncate_to_millis, Matching};
use crate::models::object_id;
use crate::store::{
    MatchingDocument, MatchingFilter, MatchingStore, MatchingUpdate, StoreError, UpdateCounts,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("scan aborted after {} matchings: {source}", .partial.len())]
    PartialScan {
        partial: Vec<Matching>,
        source: StoreError,
    },

    #[error("document store did not respond within {0:?}")]
    Timeout(Duration),
}

/// What `create_or_update` did.
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert {
    /// A new record was inserted; carries it with its assigned id and timestamp.
    Created(Matching),
    Updated(UpdateCounts),
}

impl Upsert {
    /// 1 for an insert, the store's modified count for an update.
    pub fn modified_count(&self) -> u64 {
        match self {
            Upsert::Created(_) => 1,
            Upsert::Updated(counts) => counts.modified,
        }
    }
}

/// Outcome for one record of a bulk create.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkOutcome {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none", with = "object_id::option")]
    pub id: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct MatchingRepository {
    store: Arc<dyn MatchingStore>,
    timeout: Duration,
}

impl MatchingRepository {
    pub fn new(store: Arc<dyn MatchingStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Bounds `operation` by the store timeout. Operations do not apply it
    /// themselves; callers opt in.
    pub async fn with_timeout<T, F>(&self, operation: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| RepositoryError::Timeout(self.timeout))?
    }

    pub async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(self.store.ping().await?)
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Matching>, RepositoryError> {
        self.read_one(MatchingFilter::Id(*id)).await
    }

    pub async fn find_by_summary_id(
        &self,
        summary_id: &ObjectId,
    ) -> Result<Option<Matching>, RepositoryError> {
        self.read_one(MatchingFilter::SummaryId(*summary_id)).await
    }

    /// Like `find_by_id`, but an absent record comes back as `Matching::default()`.
    /// Keeps the zero-value lookup contract; handlers use `find_by_id` and answer 404.
    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn get_by_id(&self, id: &ObjectId) -> Result<Matching, RepositoryError> {
        Ok(self.find_by_id(id).await?.unwrap_or_default())
    }

    /// Like `find_by_summary_id`, but an absent record comes back as `Matching::default()`.
    /// Keeps the zero-value lookup contract; handlers use `find_by_summary_id`.
    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn get_by_summary_id(
        &self,
        summary_id: &ObjectId,
    ) -> Result<Matching, RepositoryError> {
        Ok(self.find_by_summary_id(summary_id).await?.unwrap_or_default())
    }

    /// Every matching in the collection. A decode failure mid-scan returns
    /// `PartialScan` carrying the records read before it.
    pub async fn get_all(&self) -> Result<Vec<Matching>, RepositoryError> {
        match self.store.find(&MatchingFilter::All).await {
            Ok(documents) => {
                debug!("Read {} matchings", documents.len());
                Ok(documents.into_iter().map(Matching::from).collect())
            }
            Err(StoreError::Scan { partial, source }) => Err(RepositoryError::PartialScan {
                partial: partial.into_iter().map(Matching::from).collect(),
                source: *source,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Inserts `matching` as a new document, ignoring any id it carries.
    pub async fn create(&self, matching: &Matching) -> Result<ObjectId, RepositoryError> {
        let document = MatchingDocument::for_insert(matching);
        let id = self.store.insert_one(&document).await?;
        info!(
            "Created matching {id} for summary {}",
            matching.summary_id
        );
        Ok(id)
    }

    /// Replaces the mutable fields of the matching stored under `id`.
    /// `matched == 0` in the result means no such record.
    pub async fn update_by_id(
        &self,
        id: &ObjectId,
        matching: &Matching,
    ) -> Result<UpdateCounts, RepositoryError> {
        let counts = self
            .store
            .update_one(&MatchingFilter::Id(*id), &MatchingUpdate::from(matching))
            .await?;
        info!(
            "Updated matching {id}: matched {}, modified {}",
            counts.matched, counts.modified
        );
        Ok(counts)
    }

    /// Inserts when `matching.id` is unset, otherwise updates the record with that id.
    pub async fn create_or_update(&self, matching: &Matching) -> Result<Upsert, RepositoryError> {
        match matching.id {
            None => {
                let mut created = matching.clone();
                created.created_at = Some(match matching.created_at {
                    Some(at) => truncate_to_millis(at),
                    None => now_millis(),
                });
                created.id = Some(self.create(&created).await?);
                Ok(Upsert::Created(created))
            }
            Some(id) => Ok(Upsert::Updated(self.update_by_id(&id, matching).await?)),
        }
    }

    /// Validates each record, inserts the valid ones in a single call and
    /// reports one outcome per input record, in input order.
    pub async fn create_many(
        &self,
        matchings: &[Matching],
    ) -> Result<Vec<BulkOutcome>, RepositoryError> {
        let mut outcomes = Vec::with_capacity(matchings.len());
        let mut accepted = Vec::new();
        let mut documents = Vec::new();

        for (index, matching) in matchings.iter().enumerate() {
            let problems = check_new(matching);
            if problems.is_empty() {
                accepted.push(index);
                documents.push(MatchingDocument::for_insert(matching));
            }
            outcomes.push(BulkOutcome {
                index,
                id: None,
                error: (!problems.is_empty()).then(|| problems.join("; ")),
            });
        }

        let ids = self.store.insert_many(&documents).await?;
        for (index, id) in accepted.into_iter().zip(ids) {
            outcomes[index].id = Some(id);
        }

        info!(
            "Bulk create: {} of {} matchings inserted",
            documents.len(),
            matchings.len()
        );
        Ok(outcomes)
    }

    async fn read_one(&self, filter: MatchingFilter) -> Result<Option<Matching>, RepositoryError> {
        let document = self.store.find_one(&filter).await?;
        debug!("Lookup {:?} found: {}", filter, document.is_some());
        Ok(document.map(Matching::from))
    }
}
