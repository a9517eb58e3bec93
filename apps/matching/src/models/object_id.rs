//! Serde adapters that render BSON ObjectIds as 24-character hex strings in JSON.
//!
//! `ObjectId`'s own `Serialize` impl emits extended JSON (`{"$oid": "..."}`),
//! which is not what API clients send or expect.

use mongodb::bson::oid::ObjectId;
use serde::{de, Deserialize, Deserializer, Serializer};

/// The all-zero ObjectId. Stands in for "unset" in zero-value records.
pub fn nil() -> ObjectId {
    ObjectId::from_bytes([0; 12])
}

pub fn is_nil(id: &ObjectId) -> bool {
    id.bytes() == [0; 12]
}

/// Parses a hex ObjectId, returning `None` for anything malformed.
pub fn parse(raw: &str) -> Option<ObjectId> {
    ObjectId::parse_str(raw).ok()
}

pub fn serialize<S: Serializer>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_hex())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ObjectId, D::Error> {
    let raw = String::deserialize(deserializer)?;
    ObjectId::parse_str(&raw)
        .map_err(|_| de::Error::custom(format!("'{raw}' is not a valid 24-character hex id")))
}

/// Optional ids: `null`, a missing field and the nil id all read as `None`.
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        id: &Option<ObjectId>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => serializer.serialize_str(&id.to_hex()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<ObjectId>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        let id = ObjectId::parse_str(&raw)
            .map_err(|_| de::Error::custom(format!("'{raw}' is not a valid 24-character hex id")))?;
        Ok(if is_nil(&id) { None } else { Some(id) })
    }
}
