use crate::models::matching::Matching;
use crate::models::object_id;

/// Checks that both foreign keys are set. Existence of the referenced
/// summaries and the range of `matchRate` are not checked here.
pub fn check_references(matching: &Matching) -> Vec<String> {
    let mut problems = Vec::new();
    if object_id::is_nil(&matching.summary_id) {
        problems.push("summaryId is required".to_string());
    }
    if object_id::is_nil(&matching.matched_summary_id) {
        problems.push("matchedSummaryId is required".to_string());
    }
    problems
}

/// Problems that keep a record out of a create: missing references, or an
/// id the caller tried to choose.
pub fn check_new(matching: &Matching) -> Vec<String> {
    let mut problems = Vec::new();
    if matching.id.is_some() {
        problems.push("id is assigned by the store and must not be supplied".to_string());
    }
    problems.extend(check_references(matching));
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    fn valid() -> Matching {
        Matching {
            id: None,
            summary_id: ObjectId::new(),
            matched_summary_id: ObjectId::new(),
            match_rate: 50,
            created_at: None,
        }
    }

    #[test]
    fn test_valid_record_has_no_problems() {
        assert!(check_new(&valid()).is_empty());
    }

    #[test]
    fn test_nil_references_are_reported() {
        let problems = check_references(&Matching::default());
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("summaryId"));
        assert!(problems[1].contains("matchedSummaryId"));
    }

    #[test]
    fn test_supplied_id_rejected_for_create() {
        let matching = Matching {
            id: Some(ObjectId::new()),
            ..valid()
        };
        let problems = check_new(&matching);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("id is assigned"));
    }

    #[test]
    fn test_match_rate_is_not_bounded() {
        let matching = Matching {
            match_rate: -7,
            ..valid()
        };
        assert!(check_new(&matching).is_empty());
    }
}
