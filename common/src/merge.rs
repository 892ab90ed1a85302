//! Merge rules applied to a stored team record when an update arrives.
//!
//! Updates are typed per actor class and merging produces a [`TeamPatch`]:
//! the set of sub-documents the update owns. The store applies each patched
//! sub-document with a targeted update instead of rewriting the whole
//! record, so concurrent writers touching different sub-documents both land.

use crate::{
    ActorRole, AttendanceRecord, AttendanceSheet, ChangeEntry, EvaluationRecord, EvaluationRound,
    MemberSlot, MemberSnapshot, NewTeamInput, PresenceFlags, Round, SnapshotKind, TeamMember,
    TeamRecord, Track, attendance, evaluation,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A student-originated update: the roster, problem selection, the
/// submission lock and the student attendance snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentUpdate {
    pub team_id: String,
    pub leader: TeamMember,
    pub leader_mobile: String,
    pub member2: TeamMember,
    pub member3: TeamMember,
    pub member4: TeamMember,
    pub problem_statement: Option<String>,
    /// `None` leaves the stored selection alone; `Some` replaces it.
    pub selected_problems: Option<Vec<String>>,
    pub submitted: bool,
    pub submitted_by: Option<String>,
    pub round1_presence: Option<PresenceFlags>,
    pub round2_presence: Option<PresenceFlags>,
    pub marked_by: Option<String>,
}

/// An evaluator-originated update: evaluator attendance snapshots, marks
/// and feedback. The type carries no submission lock field at all, so an
/// evaluator request can never flip the lock as a side effect of saving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorUpdate {
    pub team_id: String,
    pub evaluator: String,
    pub round1_presence: Option<PresenceFlags>,
    pub round2_presence: Option<PresenceFlags>,
    pub round1_marks: Option<i32>,
    pub round1_feedback: Option<String>,
    pub round2_marks: Option<i32>,
    pub round2_feedback: Option<String>,
}

/// Either update kind, tagged by the actor class that sent it.
#[derive(Debug, Clone)]
pub enum TeamUpdate {
    Student(StudentUpdate),
    Evaluator(EvaluatorUpdate),
}

impl TeamUpdate {
    pub fn team_id(&self) -> &str {
        match self {
            TeamUpdate::Student(update) => &update.team_id,
            TeamUpdate::Evaluator(update) => &update.team_id,
        }
    }

    pub fn actor_role(&self) -> ActorRole {
        match self {
            TeamUpdate::Student(_) => ActorRole::Student,
            TeamUpdate::Evaluator(_) => ActorRole::Evaluator,
        }
    }
}

/// Replacement values for the roster sub-document. Scalars are last write
/// wins; only the change log records what was overwritten.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterPatch {
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
}

/// The sub-documents one update owns. Anything not present here is left
/// byte-for-byte unchanged by the store.
#[derive(Debug, Clone, Default)]
pub struct TeamPatch {
    pub roster: Option<RosterPatch>,
    pub attendance: Vec<(SnapshotKind, AttendanceSheet)>,
    pub evaluation: Vec<(Round, EvaluationRound)>,
    /// Entries appended to the end of the stored change log.
    pub new_changes: Vec<ChangeEntry>,
}

impl TeamPatch {
    pub fn is_empty(&self) -> bool {
        self.roster.is_none()
            && self.attendance.is_empty()
            && self.evaluation.is_empty()
            && self.new_changes.is_empty()
    }
}

/// Construct a fresh record at registration time. Every optional sub-record
/// is seeded to its explicit zero value, never left unset.
pub fn new_team_record(
    team_id: String,
    track: Track,
    input: &NewTeamInput,
    now: DateTime<Utc>,
) -> TeamRecord {
    TeamRecord {
        team_id,
        track,
        leader: input.leader.clone(),
        leader_mobile: input.leader_mobile.clone(),
        member2: input.member2.clone(),
        member3: input.member3.clone(),
        member4: input.member4.clone(),
        problem_statement: None,
        selected_problems: Vec::new(),
        submitted: false,
        submitted_by: None,
        submitted_at: None,
        attendance: AttendanceRecord::default(),
        evaluation: EvaluationRecord::default(),
        change_log: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

/// Merge an update into the stored record, producing the patch to persist.
pub fn merge(existing: &TeamRecord, update: &TeamUpdate, now: DateTime<Utc>) -> TeamPatch {
    match update {
        TeamUpdate::Student(update) => merge_student_update(existing, update, now),
        TeamUpdate::Evaluator(update) => merge_evaluator_update(existing, update, now),
    }
}

/// Merge a student update: unconditional roster overwrite, change-log
/// diffing, the submission lock rules and the student snapshots.
pub fn merge_student_update(
    existing: &TeamRecord,
    update: &StudentUpdate,
    now: DateTime<Utc>,
) -> TeamPatch {
    let mut patch = TeamPatch {
        new_changes: member_changes(existing, update),
        ..TeamPatch::default()
    };

    // The lock stamp survives an unlock; it is written only on the
    // false -> true transition with an identity attached.
    let mut submitted_by = existing.submitted_by.clone();
    let mut submitted_at = existing.submitted_at;
    if update.submitted && !existing.submitted {
        if let Some(by) = &update.submitted_by {
            submitted_by = Some(by.clone());
            submitted_at = Some(now);
        }
    }

    let selected_problems = match &update.selected_problems {
        Some(problems) => problems.clone(),
        None => existing.selected_problems.clone(),
    };

    patch.roster = Some(RosterPatch {
        leader: update.leader.clone(),
        leader_mobile: update.leader_mobile.clone(),
        member2: update.member2.clone(),
        member3: update.member3.clone(),
        member4: update.member4.clone(),
        problem_statement: update.problem_statement.clone(),
        selected_problems,
        submitted: update.submitted,
        submitted_by,
        submitted_at,
    });

    let marker = update
        .marked_by
        .as_deref()
        .or(update.submitted_by.as_deref());
    if let Some(flags) = update.round1_presence {
        patch.attendance.push((
            SnapshotKind::StudentRound1,
            attendance::reconcile(flags, marker, now),
        ));
    }
    if let Some(flags) = update.round2_presence {
        patch.attendance.push((
            SnapshotKind::StudentRound2,
            attendance::reconcile(flags, marker, now),
        ));
    }

    patch
}

/// Merge an evaluator update: evaluator snapshots and round evaluations.
/// Never produces a roster patch, so the lock state cannot change here.
pub fn merge_evaluator_update(
    existing: &TeamRecord,
    update: &EvaluatorUpdate,
    now: DateTime<Utc>,
) -> TeamPatch {
    let mut patch = TeamPatch::default();
    let marker = (!update.evaluator.trim().is_empty()).then_some(update.evaluator.as_str());

    if let Some(flags) = update.round1_presence {
        patch.attendance.push((
            SnapshotKind::EvaluatorRound1,
            attendance::reconcile(flags, marker, now),
        ));
    }
    if let Some(flags) = update.round2_presence {
        patch.attendance.push((
            SnapshotKind::EvaluatorRound2,
            attendance::reconcile(flags, marker, now),
        ));
    }

    if update.round1_marks.is_some() || update.round1_feedback.is_some() {
        let bound = evaluation::marks_upper_bound(existing.track, Round::One);
        patch.evaluation.push((
            Round::One,
            evaluation::record(
                &existing.evaluation.round1,
                update.round1_marks,
                update.round1_feedback.as_deref(),
                bound,
                now,
            ),
        ));
    }
    if update.round2_marks.is_some() || update.round2_feedback.is_some() {
        let bound = evaluation::marks_upper_bound(existing.track, Round::Two);
        patch.evaluation.push((
            Round::Two,
            evaluation::record(
                &existing.evaluation.round2,
                update.round2_marks,
                update.round2_feedback.as_deref(),
                bound,
                now,
            ),
        ));
    }

    patch
}

/// Apply a patch to an in-memory record, mirroring what the store commits.
pub fn apply_patch(record: &mut TeamRecord, patch: &TeamPatch, now: DateTime<Utc>) {
    if let Some(roster) = &patch.roster {
        record.leader = roster.leader.clone();
        record.leader_mobile = roster.leader_mobile.clone();
        record.member2 = roster.member2.clone();
        record.member3 = roster.member3.clone();
        record.member4 = roster.member4.clone();
        record.problem_statement = roster.problem_statement.clone();
        record.selected_problems = roster.selected_problems.clone();
        record.submitted = roster.submitted;
        record.submitted_by = roster.submitted_by.clone();
        record.submitted_at = roster.submitted_at;
    }
    for (kind, sheet) in &patch.attendance {
        record.attendance.replace(*kind, sheet.clone());
    }
    for (round, evaluated) in &patch.evaluation {
        match round {
            Round::One => record.evaluation.round1 = evaluated.clone(),
            Round::Two => record.evaluation.round2 = evaluated.clone(),
        }
    }
    record.change_log.extend(patch.new_changes.iter().cloned());
    record.updated_at = now;
}

/// One change entry per member slot whose name, enrollment or round-one
/// presence differs between the stored record and the incoming update.
/// Typed fields already normalize missing strings to `""`, so an omitted
/// name never diffs against a stored empty one.
fn member_changes(existing: &TeamRecord, update: &StudentUpdate) -> Vec<ChangeEntry> {
    let stored_sheet = &existing.attendance.student_round1;
    MemberSlot::ALL
        .iter()
        .filter_map(|&slot| {
            let stored = existing.member(slot);
            let incoming = incoming_member(update, slot);
            let old = MemberSnapshot {
                name: stored.name.clone(),
                enrollment: stored.enrollment.clone(),
                present: stored_sheet.present(slot),
            };
            let new = MemberSnapshot {
                name: incoming.name.clone(),
                enrollment: incoming.enrollment.clone(),
                present: update
                    .round1_presence
                    .map(|flags| flags.slot(slot))
                    .unwrap_or(old.present),
            };
            (old != new).then(|| ChangeEntry { slot, old, new })
        })
        .collect()
}

fn incoming_member(update: &StudentUpdate, slot: MemberSlot) -> &TeamMember {
    match slot {
        MemberSlot::Leader => &update.leader,
        MemberSlot::Member2 => &update.member2,
        MemberSlot::Member3 => &update.member3,
        MemberSlot::Member4 => &update.member4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn member(name: &str, enrollment: &str) -> TeamMember {
        TeamMember {
            name: name.to_string(),
            enrollment: enrollment.to_string(),
            email: String::new(),
        }
    }

    fn create_test_team() -> TeamRecord {
        let now = Utc::now();
        let input = NewTeamInput {
            leader: member("Asha Rao", "EN2301"),
            leader_mobile: "9900112233".to_string(),
            member2: member("Dev Patel", "EN2302"),
            ..NewTeamInput::default()
        };
        new_team_record("MCA001".to_string(), Track::Mca, &input, now)
    }

    fn student_update_from(record: &TeamRecord) -> StudentUpdate {
        StudentUpdate {
            team_id: record.team_id.clone(),
            leader: record.leader.clone(),
            leader_mobile: record.leader_mobile.clone(),
            member2: record.member2.clone(),
            member3: record.member3.clone(),
            member4: record.member4.clone(),
            problem_statement: record.problem_statement.clone(),
            submitted: record.submitted,
            ..StudentUpdate::default()
        }
    }

    #[test]
    fn registration_seeds_zero_values() {
        let team = create_test_team();
        assert!(!team.submitted);
        assert_eq!(team.submitted_by, None);
        assert_eq!(team.attendance, AttendanceRecord::default());
        assert_eq!(team.evaluation, EvaluationRecord::default());
        assert!(team.change_log.is_empty());
        assert!(team.selected_problems.is_empty());
    }

    #[test]
    fn identical_update_produces_no_change_entries() {
        let team = create_test_team();
        let update = student_update_from(&team);
        let patch = merge_student_update(&team, &update, Utc::now());
        assert!(patch.new_changes.is_empty());
        // the roster is still overwritten wholesale
        assert!(patch.roster.is_some());
    }

    #[test]
    fn member_scalars_are_last_write_wins() {
        let mut team = create_test_team();
        let mut update = student_update_from(&team);
        update.member2 = member("", "");

        let patch = merge_student_update(&team, &update, Utc::now());
        apply_patch(&mut team, &patch, Utc::now());

        // an empty incoming slot overwrites the stored one; the change log
        // keeps the audit trail but does not block the overwrite
        assert_eq!(team.member2.name, "");
        assert_eq!(patch.new_changes.len(), 1);
        assert_eq!(patch.new_changes[0].slot, MemberSlot::Member2);
        assert_eq!(patch.new_changes[0].old.name, "Dev Patel");
        assert_eq!(patch.new_changes[0].new.name, "");
    }

    #[test]
    fn presence_difference_is_logged() {
        let team = create_test_team();
        let mut update = student_update_from(&team);
        update.round1_presence = Some(PresenceFlags {
            leader: true,
            ..PresenceFlags::default()
        });

        let patch = merge_student_update(&team, &update, Utc::now());
        assert_eq!(patch.new_changes.len(), 1);
        assert_eq!(patch.new_changes[0].slot, MemberSlot::Leader);
        assert!(!patch.new_changes[0].old.present);
        assert!(patch.new_changes[0].new.present);
    }

    #[test]
    fn change_log_only_grows_and_keeps_its_prefix() {
        let mut team = create_test_team();
        let now = Utc::now();

        let mut first = student_update_from(&team);
        first.leader = member("Asha R.", "EN2301");
        let patch = merge_student_update(&team, &first, now);
        apply_patch(&mut team, &patch, now);
        let after_first = team.change_log.clone();
        assert_eq!(after_first.len(), 1);

        let mut second = student_update_from(&team);
        second.member2 = member("Devika Patel", "EN2302");
        let patch = merge_student_update(&team, &second, now);
        apply_patch(&mut team, &patch, now);

        assert_eq!(team.change_log.len(), 2);
        assert_eq!(&team.change_log[..1], &after_first[..]);
    }

    #[test]
    fn submit_transition_stamps_identity_and_time() {
        let mut team = create_test_team();
        let now = Utc::now();
        let mut update = student_update_from(&team);
        update.submitted = true;
        update.submitted_by = Some("Asha Rao".to_string());

        let patch = merge_student_update(&team, &update, now);
        apply_patch(&mut team, &patch, now);

        assert!(team.submitted);
        assert_eq!(team.submitted_by.as_deref(), Some("Asha Rao"));
        assert_eq!(team.submitted_at, Some(now));
    }

    #[test]
    fn resubmission_keeps_the_first_stamp() {
        let mut team = create_test_team();
        let first_submit = Utc::now();
        let mut update = student_update_from(&team);
        update.submitted = true;
        update.submitted_by = Some("Asha Rao".to_string());
        let patch = merge_student_update(&team, &update, first_submit);
        apply_patch(&mut team, &patch, first_submit);

        let later = first_submit + TimeDelta::minutes(10);
        let mut again = student_update_from(&team);
        again.submitted = true;
        again.submitted_by = Some("Dev Patel".to_string());
        let patch = merge_student_update(&team, &again, later);
        apply_patch(&mut team, &patch, later);

        assert_eq!(team.submitted_by.as_deref(), Some("Asha Rao"));
        assert_eq!(team.submitted_at, Some(first_submit));
    }

    #[test]
    fn unlock_does_not_clear_the_stamp() {
        let mut team = create_test_team();
        let now = Utc::now();
        let mut submit = student_update_from(&team);
        submit.submitted = true;
        submit.submitted_by = Some("Asha Rao".to_string());
        let patch = merge_student_update(&team, &submit, now);
        apply_patch(&mut team, &patch, now);

        let mut unlock = student_update_from(&team);
        unlock.submitted = false;
        let patch = merge_student_update(&team, &unlock, now);
        apply_patch(&mut team, &patch, now);

        assert!(!team.submitted);
        assert_eq!(team.submitted_by.as_deref(), Some("Asha Rao"));
        assert!(team.submitted_at.is_some());
    }

    #[test]
    fn evaluator_update_never_touches_the_lock() {
        let mut team = create_test_team();
        team.submitted = true;
        let update = EvaluatorUpdate {
            team_id: team.team_id.clone(),
            evaluator: "Prof. Iyer".to_string(),
            round1_presence: Some(PresenceFlags {
                leader: true,
                ..PresenceFlags::default()
            }),
            round1_marks: Some(18),
            ..EvaluatorUpdate::default()
        };

        let now = Utc::now();
        let patch = merge_evaluator_update(&team, &update, now);
        assert!(patch.roster.is_none());

        apply_patch(&mut team, &patch, now);
        assert!(team.submitted);
        assert!(team.attendance.evaluator_round1.leader);
        // the student snapshot for the same round stays untouched
        assert_eq!(team.attendance.student_round1, AttendanceSheet::default());
    }

    #[test]
    fn evaluator_marks_clamp_to_the_track_bound() {
        let team = create_test_team();
        let update = EvaluatorUpdate {
            team_id: team.team_id.clone(),
            evaluator: "Prof. Iyer".to_string(),
            round1_marks: Some(25),
            round2_marks: Some(95),
            ..EvaluatorUpdate::default()
        };

        let patch = merge_evaluator_update(&team, &update, Utc::now());
        assert_eq!(patch.evaluation.len(), 2);
        assert_eq!(patch.evaluation[0].1.marks, Some(20)); // mca round one
        assert_eq!(patch.evaluation[1].1.marks, Some(80)); // round two, both tracks
    }

    #[test]
    fn selected_problems_replace_only_when_present() {
        let mut team = create_test_team();
        team.selected_problems = vec!["prblm1".to_string(), "prblm4".to_string()];

        let keep = student_update_from(&team);
        let patch = merge_student_update(&team, &keep, Utc::now());
        assert_eq!(
            patch.roster.as_ref().unwrap().selected_problems,
            team.selected_problems
        );

        let mut replace = student_update_from(&team);
        replace.selected_problems = Some(vec!["prblm9".to_string()]);
        let patch = merge_student_update(&team, &replace, Utc::now());
        assert_eq!(
            patch.roster.as_ref().unwrap().selected_problems,
            vec!["prblm9".to_string()]
        );
    }

    #[test]
    fn attendance_marker_falls_back_to_submitter() {
        let team = create_test_team();
        let mut update = student_update_from(&team);
        update.submitted_by = Some("Asha Rao".to_string());
        update.round1_presence = Some(PresenceFlags::default());

        let patch = merge_student_update(&team, &update, Utc::now());
        let (kind, sheet) = &patch.attendance[0];
        assert_eq!(*kind, SnapshotKind::StudentRound1);
        assert_eq!(sheet.marked_by.as_deref(), Some("Asha Rao"));
    }
}
