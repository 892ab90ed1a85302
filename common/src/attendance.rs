//! Attendance reconciliation: wholesale snapshot replacement per actor class.

use crate::{AttendanceSheet, PresenceFlags};
use chrono::{DateTime, Utc};

/// Build the replacement snapshot for an attendance write.
///
/// The targeted snapshot is replaced in full: all four presence flags,
/// `marked_by` and `marked_at` are overwritten together. There is no
/// per-member incremental update within a snapshot; callers supply the full
/// flag set every time. Re-submitting identical flags produces the same
/// presence data but still bumps `marked_at`.
pub fn reconcile(
    flags: PresenceFlags,
    marked_by: Option<&str>,
    now: DateTime<Utc>,
) -> AttendanceSheet {
    AttendanceSheet {
        leader: flags.leader,
        member2: flags.member2,
        member3: flags.member3,
        member4: flags.member4,
        marked_by: marked_by.map(str::to_string),
        marked_at: Some(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActorRole, AttendanceRecord, Round, SnapshotKind};
    use chrono::TimeDelta;

    fn flags(leader: bool, member2: bool) -> PresenceFlags {
        PresenceFlags {
            leader,
            member2,
            member3: false,
            member4: false,
        }
    }

    #[test]
    fn replacement_is_idempotent_except_for_timestamp() {
        let first_pass = Utc::now();
        let second_pass = first_pass + TimeDelta::minutes(5);

        let first = reconcile(flags(true, true), Some("aditi"), first_pass);
        let second = reconcile(flags(true, true), Some("aditi"), second_pass);

        assert_eq!(first.leader, second.leader);
        assert_eq!(first.member2, second.member2);
        assert_eq!(first.member3, second.member3);
        assert_eq!(first.member4, second.member4);
        assert_eq!(first.marked_by, second.marked_by);
        assert_eq!(first.marked_at, Some(first_pass));
        assert_eq!(second.marked_at, Some(second_pass));
    }

    #[test]
    fn snapshots_do_not_interfere() {
        let now = Utc::now();
        let mut attendance = AttendanceRecord::default();

        // student marks leader and member2 present for round one
        attendance.replace(
            SnapshotKind::StudentRound1,
            reconcile(flags(true, true), Some("team lead"), now),
        );
        // evaluator marks only the leader present for the same round
        attendance.replace(
            SnapshotKind::EvaluatorRound1,
            reconcile(flags(true, false), Some("evaluator one"), now),
        );

        assert!(attendance.student_round1.leader);
        assert!(attendance.student_round1.member2);
        assert!(attendance.evaluator_round1.leader);
        assert!(!attendance.evaluator_round1.member2);

        // the untouched snapshots keep their zero values
        assert_eq!(attendance.student_round2, AttendanceSheet::default());
        assert_eq!(attendance.evaluator_round2, AttendanceSheet::default());
    }

    #[test]
    fn rounds_are_independent() {
        let now = Utc::now();
        let mut attendance = AttendanceRecord::default();

        // present in round two while absent in round one is fine
        attendance.replace(
            SnapshotKind::for_actor(ActorRole::Student, Round::Two),
            reconcile(flags(false, true), None, now),
        );

        assert!(!attendance.student_round1.member2);
        assert!(attendance.student_round2.member2);
    }

    #[test]
    fn omitted_marker_is_stored_as_none() {
        let sheet = reconcile(flags(true, false), None, Utc::now());
        assert_eq!(sheet.marked_by, None);
        assert!(sheet.marked_at.is_some());
    }
}
