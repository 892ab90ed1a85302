//! Conversions between stored column values and the domain sub-records.
//! Nested sub-records live in jsonb columns; missing keys in stored values
//! fall back to their zero defaults on the way out.

use super::*;

pub fn serialize_track(track: Track) -> String {
    track.as_str().to_string()
}

pub fn deserialize_track(raw: &str) -> Result<Track, String> {
    Track::parse(raw).ok_or_else(|| format!("unknown track in store: {raw}"))
}

pub fn sheet_to_json(sheet: &AttendanceSheet) -> Result<Value, String> {
    serde_json::to_value(sheet).map_err(|err| err.to_string())
}

pub fn json_to_sheet(value: Value) -> Result<AttendanceSheet, String> {
    serde_json::from_value(value).map_err(|err| err.to_string())
}

pub fn evaluation_to_json(round: &EvaluationRound) -> Result<Value, String> {
    serde_json::to_value(round).map_err(|err| err.to_string())
}

pub fn json_to_evaluation(value: Value) -> Result<EvaluationRound, String> {
    serde_json::from_value(value).map_err(|err| err.to_string())
}

pub fn changes_to_json(changes: &[ChangeEntry]) -> Result<Value, String> {
    serde_json::to_value(changes).map_err(|err| err.to_string())
}

pub fn json_to_changes(value: Value) -> Result<Vec<ChangeEntry>, String> {
    serde_json::from_value(value).map_err(|err| err.to_string())
}

pub fn problems_to_json(problems: &[String]) -> Result<Value, String> {
    serde_json::to_value(problems).map_err(|err| err.to_string())
}

pub fn json_to_problems(value: Value) -> Result<Vec<String>, String> {
    serde_json::from_value(value).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stored_sheet_with_missing_keys_falls_back_to_defaults() {
        let sheet = json_to_sheet(json!({"leader": true})).unwrap();
        assert!(sheet.leader);
        assert!(!sheet.member4);
        assert_eq!(sheet.marked_by, None);
        assert_eq!(sheet.marked_at, None);
    }

    #[test]
    fn empty_object_is_a_zero_value_evaluation() {
        let round = json_to_evaluation(json!({})).unwrap();
        assert_eq!(round, EvaluationRound::default());
    }
}
