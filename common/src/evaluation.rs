//! Evaluation recording: range clamping and timestamping of round marks.

use crate::{EvaluationRound, MARKS_LOWER_BOUND, ROUND2_MARKS_UPPER_BOUND, Round, Track};
use chrono::{DateTime, Utc};

/// Upper mark bound for a round on a track.
pub fn marks_upper_bound(track: Track, round: Round) -> i32 {
    match round {
        Round::One => track.round1_marks_upper_bound(),
        Round::Two => ROUND2_MARKS_UPPER_BOUND,
    }
}

/// Clamp marks into the valid range for a round. Out-of-range input is
/// clamped silently, never rejected.
pub fn clamp_marks(marks: i32, upper_bound: i32) -> i32 {
    marks.clamp(MARKS_LOWER_BOUND, upper_bound)
}

/// Record an evaluation write over the stored round.
///
/// Marks are clamped to the round's bound and stamp `evaluated_at`.
/// Feedback is stored verbatim with no length bound. A feedback-only write
/// leaves the stored marks and `evaluated_at` untouched.
pub fn record(
    existing: &EvaluationRound,
    marks: Option<i32>,
    feedback: Option<&str>,
    upper_bound: i32,
    now: DateTime<Utc>,
) -> EvaluationRound {
    let mut next = existing.clone();
    if let Some(marks) = marks {
        next.marks = Some(clamp_marks(marks, upper_bound));
        next.evaluated_at = Some(now);
    }
    if let Some(feedback) = feedback {
        next.feedback = Some(feedback.to_string());
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_two_marks_clamp_to_eighty() {
        assert_eq!(clamp_marks(95, ROUND2_MARKS_UPPER_BOUND), 80);
        assert_eq!(clamp_marks(80, ROUND2_MARKS_UPPER_BOUND), 80);
        assert_eq!(clamp_marks(-3, ROUND2_MARKS_UPPER_BOUND), 0);
        assert_eq!(clamp_marks(42, ROUND2_MARKS_UPPER_BOUND), 42);
    }

    #[test]
    fn round_one_bound_depends_on_track() {
        assert_eq!(marks_upper_bound(Track::BTech, Round::One), 100);
        assert_eq!(marks_upper_bound(Track::Mca, Round::One), 20);
        assert_eq!(marks_upper_bound(Track::BTech, Round::Two), 80);
        assert_eq!(marks_upper_bound(Track::Mca, Round::Two), 80);
    }

    #[test]
    fn marks_write_stamps_evaluated_at() {
        let now = Utc::now();
        let stored = EvaluationRound::default();
        let next = record(&stored, Some(95), None, 80, now);
        assert_eq!(next.marks, Some(80));
        assert_eq!(next.evaluated_at, Some(now));
        assert_eq!(next.feedback, None);
    }

    #[test]
    fn feedback_only_write_leaves_stamp_alone() {
        let earlier = Utc::now();
        let stored = EvaluationRound {
            marks: Some(12),
            feedback: None,
            evaluated_at: Some(earlier),
        };
        let next = record(&stored, None, Some("solid prototype"), 20, Utc::now());
        assert_eq!(next.marks, Some(12));
        assert_eq!(next.evaluated_at, Some(earlier));
        assert_eq!(next.feedback.as_deref(), Some("solid prototype"));
    }

    #[test]
    fn feedback_is_stored_verbatim() {
        let long = "x".repeat(10_000);
        let next = record(&EvaluationRound::default(), Some(5), Some(&long), 20, Utc::now());
        assert_eq!(next.feedback.as_deref(), Some(long.as_str()));
    }
}
