//! Sequential team id allocation.

/// How many candidate ids the store layer will try before giving up.
/// Each retry re-scans the existing ids, so collisions only happen under
/// concurrent registration in the same track.
pub const ALLOCATION_RETRY_LIMIT: usize = 5;

/// Derive the next team id for a track.
///
/// Only ids matching `<prefix>` followed by exactly `width` digits count;
/// everything else in the input is ignored. The result is max + 1 (not
/// first gap), zero-padded back to `width` digits.
pub fn next_team_id(existing_ids: &[String], prefix: &str, width: usize) -> String {
    let max_suffix = existing_ids
        .iter()
        .filter_map(|id| parse_suffix(id, prefix, width))
        .max()
        .unwrap_or(0);
    format!("{prefix}{:0width$}", max_suffix + 1)
}

fn parse_suffix(id: &str, prefix: &str, width: usize) -> Option<u32> {
    let suffix = id.strip_prefix(prefix)?;
    if suffix.len() != width || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_allocation_starts_at_one() {
        assert_eq!(next_team_id(&[], "BTECH", 3), "BTECH001");
    }

    #[test]
    fn next_is_max_plus_one_not_first_gap() {
        let existing = ids(&["P001", "P002", "P004"]);
        assert_eq!(next_team_id(&existing, "P", 3), "P005");
    }

    #[test]
    fn foreign_prefixes_are_ignored() {
        let existing = ids(&["MCA007", "BTECH002", "BTECH001"]);
        assert_eq!(next_team_id(&existing, "BTECH", 3), "BTECH003");
        assert_eq!(next_team_id(&existing, "MCA", 3), "MCA008");
    }

    #[test]
    fn wrong_width_and_junk_suffixes_are_ignored() {
        let existing = ids(&["BTECH0001", "BTECH01", "BTECHXYZ", "BTECH9x9", "BTECH004"]);
        assert_eq!(next_team_id(&existing, "BTECH", 3), "BTECH005");
    }

    #[test]
    fn zero_padding_survives_growth() {
        let existing = ids(&["MCA099"]);
        assert_eq!(next_team_id(&existing, "MCA", 3), "MCA100");
    }
}
