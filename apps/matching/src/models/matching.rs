use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::object_id;

/// A directed match between two summaries, as exchanged over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matching {
    #[serde(default, with = "object_id::option")]
    pub id: Option<ObjectId>,
    #[serde(with = "object_id")]
    pub summary_id: ObjectId,
    #[serde(with = "object_id")]
    pub matched_summary_id: ObjectId,
    pub match_rate: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The zero value: what a lookup that found nothing decodes to.
impl Default for Matching {
    fn default() -> Self {
        Matching {
            id: None,
            summary_id: object_id::nil(),
            matched_summary_id: object_id::nil(),
            match_rate: 0,
            created_at: None,
        }
    }
}

/// Current time at the precision the store keeps (milliseconds).
pub fn now_millis() -> DateTime<Utc> {
    truncate_to_millis(Utc::now())
}

pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    const SUMMARY_A: &str = "5e458de13f2d3aad1bf0bb6f";
    const SUMMARY_B: &str = "5e458de13f2d3aad1bf0bb70";

    #[test]
    fn test_serializes_ids_as_hex_and_omits_unset_created_at() {
        let matching = Matching {
            id: None,
            summary_id: ObjectId::parse_str(SUMMARY_A).unwrap(),
            matched_summary_id: ObjectId::parse_str(SUMMARY_B).unwrap(),
            match_rate: 15,
            created_at: None,
        };

        let value = serde_json::to_value(&matching).unwrap();
        assert_eq!(
            value,
            json!({
                "id": null,
                "summaryId": SUMMARY_A,
                "matchedSummaryId": SUMMARY_B,
                "matchRate": 15
            })
        );
    }

    #[test]
    fn test_deserializes_full_record() {
        let matching: Matching = serde_json::from_value(json!({
            "id": "5e458def3f2d3aad1bf0bb86",
            "summaryId": SUMMARY_A,
            "matchedSummaryId": SUMMARY_B,
            "matchRate": 42,
            "createdAt": "2024-03-01T10:15:30.250Z"
        }))
        .unwrap();

        assert_eq!(matching.id.unwrap().to_hex(), "5e458def3f2d3aad1bf0bb86");
        assert_eq!(matching.match_rate, 42);
        assert_eq!(
            matching.created_at,
            Some(Utc.timestamp_millis_opt(1_709_288_130_250).unwrap())
        );
    }

    #[test]
    fn test_nil_and_missing_id_read_as_unset() {
        let nil: Matching = serde_json::from_value(json!({
            "id": "000000000000000000000000",
            "summaryId": SUMMARY_A,
            "matchedSummaryId": SUMMARY_B,
            "matchRate": 1
        }))
        .unwrap();
        assert!(nil.id.is_none());

        let missing: Matching = serde_json::from_value(json!({
            "summaryId": SUMMARY_A,
            "matchedSummaryId": SUMMARY_B,
            "matchRate": 1
        }))
        .unwrap();
        assert!(missing.id.is_none());
    }

    #[test]
    fn test_rejects_malformed_foreign_key() {
        let result: Result<Matching, _> = serde_json::from_value(json!({
            "summaryId": "not-a-hex-id",
            "matchedSummaryId": SUMMARY_B,
            "matchRate": 1
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_requires_match_rate() {
        let result: Result<Matching, _> = serde_json::from_value(json!({
            "summaryId": SUMMARY_A,
            "matchedSummaryId": SUMMARY_B
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_value_uses_nil_ids() {
        let zero = Matching::default();
        assert!(zero.id.is_none() && zero.match_rate == 0);
        let value = serde_json::to_value(&zero).unwrap();
        assert_eq!(value["summaryId"], "000000000000000000000000");
        assert!(value.get("createdAt").is_none());
    }

    #[test]
    fn test_truncate_to_millis_drops_sub_millisecond_precision() {
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let truncated = truncate_to_millis(at);
        assert_eq!(truncated.timestamp_subsec_nanos(), 123_000_000);
        assert_eq!(truncate_to_millis(truncated), truncated);
    }
}
