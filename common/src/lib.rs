//! A library with common types and record logic for the hackathon portal.

pub mod attendance;
pub mod db_util;
pub mod evaluation;
pub mod mailer;
pub mod merge;
pub mod team_id;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of digits in the numeric suffix of a team id, e.g. `BTECH001`.
pub const TEAM_ID_WIDTH: usize = 3;

/// Lower bound for marks in every round.
pub const MARKS_LOWER_BOUND: i32 = 0;

/// Upper bound for round-two marks, both tracks.
pub const ROUND2_MARKS_UPPER_BOUND: i32 = 80;

/// Each registration track the portal supports.
///
/// The track decides the team id prefix, the round-one mark bound and the
/// problem-selection rules at submission time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    /// Track A: one chosen problem statement, legacy 0-100 round-one marks.
    BTech,
    /// Track B: a set of selected problem keys, 0-20 round-one marks.
    Mca,
}

impl Track {
    pub fn as_str(&self) -> &'static str {
        match self {
            Track::BTech => "btech",
            Track::Mca => "mca",
        }
    }

    /// Prefix used when allocating team ids for this track.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Track::BTech => "BTECH",
            Track::Mca => "MCA",
        }
    }

    /// Upper bound for round-one marks on this track.
    pub fn round1_marks_upper_bound(&self) -> i32 {
        match self {
            Track::BTech => 100,
            Track::Mca => 20,
        }
    }

    /// Minimum number of problem selections required to submit.
    pub fn min_problem_selections(&self) -> usize {
        match self {
            Track::BTech => 1,
            Track::Mca => 3,
        }
    }

    pub fn parse(s: &str) -> Option<Track> {
        match s.to_ascii_lowercase().as_str() {
            "btech" => Some(Track::BTech),
            "mca" => Some(Track::Mca),
            _ => None,
        }
    }
}

/// The actor class behind an update request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActorRole {
    Student,
    Evaluator,
}

/// Evaluation/attendance round.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Round {
    One,
    Two,
}

/// The four member slots of a team. The leader slot is always filled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberSlot {
    Leader,
    Member2,
    Member3,
    Member4,
}

impl MemberSlot {
    pub const ALL: [MemberSlot; 4] = [
        MemberSlot::Leader,
        MemberSlot::Member2,
        MemberSlot::Member3,
        MemberSlot::Member4,
    ];
}

/// One member of a team. Empty strings mean the slot is unfilled; inbound
/// payloads that omit a field normalize to `""` on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMember {
    pub name: String,
    pub enrollment: String,
    pub email: String,
}

/// The full set of presence flags for one attendance snapshot.
/// Omitted flags deserialize to `false`, not "unchanged".
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceFlags {
    pub leader: bool,
    pub member2: bool,
    pub member3: bool,
    pub member4: bool,
}

impl PresenceFlags {
    pub fn slot(&self, slot: MemberSlot) -> bool {
        match slot {
            MemberSlot::Leader => self.leader,
            MemberSlot::Member2 => self.member2,
            MemberSlot::Member3 => self.member3,
            MemberSlot::Member4 => self.member4,
        }
    }
}

/// One attendance snapshot: who was present, who marked it and when.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceSheet {
    pub leader: bool,
    pub member2: bool,
    pub member3: bool,
    pub member4: bool,
    pub marked_by: Option<String>,
    pub marked_at: Option<DateTime<Utc>>,
}

impl AttendanceSheet {
    pub fn present(&self, slot: MemberSlot) -> bool {
        match slot {
            MemberSlot::Leader => self.leader,
            MemberSlot::Member2 => self.member2,
            MemberSlot::Member3 => self.member3,
            MemberSlot::Member4 => self.member4,
        }
    }
}

/// Which of the four attendance snapshots a write targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SnapshotKind {
    StudentRound1,
    EvaluatorRound1,
    StudentRound2,
    EvaluatorRound2,
}

impl SnapshotKind {
    /// The snapshot owned by the given actor class for the given round.
    pub fn for_actor(role: ActorRole, round: Round) -> SnapshotKind {
        match (role, round) {
            (ActorRole::Student, Round::One) => SnapshotKind::StudentRound1,
            (ActorRole::Evaluator, Round::One) => SnapshotKind::EvaluatorRound1,
            (ActorRole::Student, Round::Two) => SnapshotKind::StudentRound2,
            (ActorRole::Evaluator, Round::Two) => SnapshotKind::EvaluatorRound2,
        }
    }
}

/// The four independent attendance snapshots of a team record.
///
/// Student writes only ever touch the student snapshots, evaluator writes
/// only the evaluator snapshots. No relationship between rounds is enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceRecord {
    pub student_round1: AttendanceSheet,
    pub evaluator_round1: AttendanceSheet,
    pub student_round2: AttendanceSheet,
    pub evaluator_round2: AttendanceSheet,
}

impl AttendanceRecord {
    pub fn sheet(&self, kind: SnapshotKind) -> &AttendanceSheet {
        match kind {
            SnapshotKind::StudentRound1 => &self.student_round1,
            SnapshotKind::EvaluatorRound1 => &self.evaluator_round1,
            SnapshotKind::StudentRound2 => &self.student_round2,
            SnapshotKind::EvaluatorRound2 => &self.evaluator_round2,
        }
    }

    /// Replace the targeted snapshot in full, leaving the other three untouched.
    pub fn replace(&mut self, kind: SnapshotKind, sheet: AttendanceSheet) {
        match kind {
            SnapshotKind::StudentRound1 => self.student_round1 = sheet,
            SnapshotKind::EvaluatorRound1 => self.evaluator_round1 = sheet,
            SnapshotKind::StudentRound2 => self.student_round2 = sheet,
            SnapshotKind::EvaluatorRound2 => self.evaluator_round2 = sheet,
        }
    }
}

/// One evaluation round: marks, free-text feedback and the stamp time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationRound {
    pub marks: Option<i32>,
    pub feedback: Option<String>,
    pub evaluated_at: Option<DateTime<Utc>>,
}

/// Both evaluation rounds. Round two never reads round one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationRecord {
    pub round1: EvaluationRound,
    pub round2: EvaluationRound,
}

impl EvaluationRecord {
    pub fn round(&self, round: Round) -> &EvaluationRound {
        match round {
            Round::One => &self.round1,
            Round::Two => &self.round2,
        }
    }
}

/// The compared state of one member slot at update time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub name: String,
    pub enrollment: String,
    pub present: bool,
}

/// One append-only change-log entry: a member slot whose name, enrollment
/// or presence differed between the stored and incoming record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub slot: MemberSlot,
    pub old: MemberSnapshot,
    pub new: MemberSnapshot,
}

/// A registered team. One per team id, never deleted in normal flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub team_id: String,
    pub track: Track,
    pub leader: TeamMember,
    pub leader_mobile: String,
    pub member2: TeamMember,
    pub member3: TeamMember,
    pub member4: TeamMember,
    pub problem_statement: Option<String>,
    pub selected_problems: Vec<String>,
    pub submitted: bool,
    pub submitted_by: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub attendance: AttendanceRecord,
    pub evaluation: EvaluationRecord,
    pub change_log: Vec<ChangeEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamRecord {
    /// The member occupying a slot. The leader counts as a member here.
    pub fn member(&self, slot: MemberSlot) -> &TeamMember {
        match slot {
            MemberSlot::Leader => &self.leader,
            MemberSlot::Member2 => &self.member2,
            MemberSlot::Member3 => &self.member3,
            MemberSlot::Member4 => &self.member4,
        }
    }

    /// Every non-empty member email, leader first. Used for confirmation mail.
    pub fn member_emails(&self) -> Vec<String> {
        MemberSlot::ALL
            .iter()
            .map(|slot| self.member(*slot).email.trim().to_string())
            .filter(|email| !email.is_empty())
            .collect()
    }
}

/// Per-round, per-actor feature toggles set from the admin dashboard.
/// A disabled toggle rejects requests before any core logic runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundGates {
    pub student_round1: bool,
    pub evaluator_round1: bool,
    pub student_round2: bool,
    pub evaluator_round2: bool,
}

impl Default for RoundGates {
    fn default() -> Self {
        Self {
            student_round1: true,
            evaluator_round1: true,
            student_round2: true,
            evaluator_round2: true,
        }
    }
}

impl RoundGates {
    pub fn allows(&self, role: ActorRole, round: Round) -> bool {
        match (role, round) {
            (ActorRole::Student, Round::One) => self.student_round1,
            (ActorRole::Evaluator, Round::One) => self.evaluator_round1,
            (ActorRole::Student, Round::Two) => self.student_round2,
            (ActorRole::Evaluator, Round::Two) => self.evaluator_round2,
        }
    }
}

/// A problem statement offered to teams on a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemStatement {
    pub key: String,
    pub title: String,
}

/// Registration input: the roster as entered on the signup form.
/// Everything except the leader may be left blank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewTeamInput {
    pub leader: TeamMember,
    pub leader_mobile: String,
    pub member2: TeamMember,
    pub member3: TeamMember,
    pub member4: TeamMember,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_flags_default_to_absent() {
        let flags: PresenceFlags = serde_json::from_str(r#"{"leader": true}"#).unwrap();
        assert!(flags.leader);
        assert!(!flags.member2);
        assert!(!flags.member3);
        assert!(!flags.member4);
    }

    #[test]
    fn presence_flags_reject_non_boolean_values() {
        let result: Result<PresenceFlags, _> = serde_json::from_str(r#"{"leader": "yes"}"#);
        assert!(result.is_err());
        let result: Result<PresenceFlags, _> = serde_json::from_str(r#"{"member2": 1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn track_parse_round_trips() {
        assert_eq!(Track::parse("btech"), Some(Track::BTech));
        assert_eq!(Track::parse("MCA"), Some(Track::Mca));
        assert_eq!(Track::parse("phd"), None);
        assert_eq!(Track::parse(Track::Mca.as_str()), Some(Track::Mca));
    }

    #[test]
    fn gates_default_open() {
        let gates = RoundGates::default();
        assert!(gates.allows(ActorRole::Student, Round::One));
        assert!(gates.allows(ActorRole::Evaluator, Round::Two));
    }
}
