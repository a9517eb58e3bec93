use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Bson};
use mongodb::{Client, Collection, Database};

use super::{
    MatchingDocument, MatchingFilter, MatchingStore, MatchingUpdate, StoreError, UpdateCounts,
    MATCHING_COLLECTION,
};

/// MongoDB-backed store over the `matching` collection of one database.
#[derive(Clone)]
pub struct MongoStore {
    database: Database,
    collection: Collection<MatchingDocument>,
}

impl MongoStore {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let database = client.database(db_name);
        let collection = database.collection::<MatchingDocument>(MATCHING_COLLECTION);
        Self {
            database,
            collection,
        }
    }
}

fn object_id(id: &Bson) -> Result<ObjectId, StoreError> {
    id.as_object_id()
        .ok_or_else(|| StoreError::Decode(format!("store assigned a non-ObjectId _id: {id}")))
}

#[async_trait]
impl MatchingStore for MongoStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn find(&self, filter: &MatchingFilter) -> Result<Vec<MatchingDocument>, StoreError> {
        let mut cursor = self.collection.find(filter.to_document()).await?;
        let mut documents = Vec::new();
        loop {
            let advanced = match cursor.advance().await {
                Ok(advanced) => advanced,
                Err(e) if documents.is_empty() => return Err(e.into()),
                Err(e) => {
                    return Err(StoreError::Scan {
                        partial: documents,
                        source: Box::new(e.into()),
                    })
                }
            };
            if !advanced {
                break;
            }
            match cursor.deserialize_current() {
                Ok(document) => documents.push(document),
                Err(e) => {
                    return Err(StoreError::Scan {
                        partial: documents,
                        source: Box::new(StoreError::Decode(e.to_string())),
                    })
                }
            }
        }
        Ok(documents)
    }

    async fn find_one(
        &self,
        filter: &MatchingFilter,
    ) -> Result<Option<MatchingDocument>, StoreError> {
        Ok(self.collection.find_one(filter.to_document()).await?)
    }

    async fn insert_one(&self, document: &MatchingDocument) -> Result<ObjectId, StoreError> {
        let result = self.collection.insert_one(document).await?;
        object_id(&result.inserted_id)
    }

    async fn insert_many(
        &self,
        documents: &[MatchingDocument],
    ) -> Result<Vec<ObjectId>, StoreError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let result = self.collection.insert_many(documents).await?;
        (0..documents.len())
            .map(|index| {
                result
                    .inserted_ids
                    .get(&index)
                    .ok_or_else(|| StoreError::Decode(format!("no id reported for document {index}")))
                    .and_then(object_id)
            })
            .collect()
    }

    async fn update_one(
        &self,
        filter: &MatchingFilter,
        update: &MatchingUpdate,
    ) -> Result<UpdateCounts, StoreError> {
        let result = self
            .collection
            .update_one(filter.to_document(), update.to_document())
            .await?;
        Ok(UpdateCounts {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_many(&self, filter: &MatchingFilter) -> Result<u64, StoreError> {
        let result = self.collection.delete_many(filter.to_document()).await?;
        Ok(result.deleted_count)
    }
}
