use super::*;
use crate::merge::{TeamPatch, new_team_record};
use crate::team_id::{ALLOCATION_RETRY_LIMIT, next_team_id};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

diesel::table! {
    teams (id) {
        id -> BigInt,
        team_id -> Varchar,
        track -> Varchar,
        leader_name -> Varchar,
        leader_enrollment -> Varchar,
        leader_mobile -> Varchar,
        leader_email -> Varchar,
        member2_name -> Varchar,
        member2_enrollment -> Varchar,
        member2_email -> Varchar,
        member3_name -> Varchar,
        member3_enrollment -> Varchar,
        member3_email -> Varchar,
        member4_name -> Varchar,
        member4_enrollment -> Varchar,
        member4_email -> Varchar,
        problem_statement -> Nullable<Varchar>,
        selected_problems -> Jsonb,
        submitted -> Bool,
        submitted_by -> Nullable<Varchar>,
        submitted_at -> Nullable<Timestamptz>,
        att_student_round1 -> Jsonb,
        att_evaluator_round1 -> Jsonb,
        att_student_round2 -> Jsonb,
        att_evaluator_round2 -> Jsonb,
        evaluation_round1 -> Jsonb,
        evaluation_round2 -> Jsonb,
        change_log -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

#[derive(Queryable)]
#[diesel(table_name = teams)]
struct TeamPrivate {
    id: i64,
    team_id: String,
    track: String,
    leader_name: String,
    leader_enrollment: String,
    leader_mobile: String,
    leader_email: String,
    member2_name: String,
    member2_enrollment: String,
    member2_email: String,
    member3_name: String,
    member3_enrollment: String,
    member3_email: String,
    member4_name: String,
    member4_enrollment: String,
    member4_email: String,
    problem_statement: Option<String>,
    selected_problems: Value,
    submitted: bool,
    submitted_by: Option<String>,
    submitted_at: Option<DateTime<Utc>>,
    att_student_round1: Value,
    att_evaluator_round1: Value,
    att_student_round2: Value,
    att_evaluator_round2: Value,
    evaluation_round1: Value,
    evaluation_round2: Value,
    change_log: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = teams)]
struct TeamPrivateNew {
    team_id: String,
    track: String,
    leader_name: String,
    leader_enrollment: String,
    leader_mobile: String,
    leader_email: String,
    member2_name: String,
    member2_enrollment: String,
    member2_email: String,
    member3_name: String,
    member3_enrollment: String,
    member3_email: String,
    member4_name: String,
    member4_enrollment: String,
    member4_email: String,
    problem_statement: Option<String>,
    selected_problems: Value,
    submitted: bool,
    submitted_by: Option<String>,
    submitted_at: Option<DateTime<Utc>>,
    att_student_round1: Value,
    att_evaluator_round1: Value,
    att_student_round2: Value,
    att_evaluator_round2: Value,
    evaluation_round1: Value,
    evaluation_round2: Value,
    change_log: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn private_to_public(p: TeamPrivate) -> Result<TeamRecord, String> {
    use conversions::*;
    Ok(TeamRecord {
        team_id: p.team_id,
        track: deserialize_track(&p.track)?,
        leader: TeamMember {
            name: p.leader_name,
            enrollment: p.leader_enrollment,
            email: p.leader_email,
        },
        leader_mobile: p.leader_mobile,
        member2: TeamMember {
            name: p.member2_name,
            enrollment: p.member2_enrollment,
            email: p.member2_email,
        },
        member3: TeamMember {
            name: p.member3_name,
            enrollment: p.member3_enrollment,
            email: p.member3_email,
        },
        member4: TeamMember {
            name: p.member4_name,
            enrollment: p.member4_enrollment,
            email: p.member4_email,
        },
        problem_statement: p.problem_statement,
        selected_problems: json_to_problems(p.selected_problems)?,
        submitted: p.submitted,
        submitted_by: p.submitted_by,
        submitted_at: p.submitted_at,
        attendance: AttendanceRecord {
            student_round1: json_to_sheet(p.att_student_round1)?,
            evaluator_round1: json_to_sheet(p.att_evaluator_round1)?,
            student_round2: json_to_sheet(p.att_student_round2)?,
            evaluator_round2: json_to_sheet(p.att_evaluator_round2)?,
        },
        evaluation: EvaluationRecord {
            round1: json_to_evaluation(p.evaluation_round1)?,
            round2: json_to_evaluation(p.evaluation_round2)?,
        },
        change_log: json_to_changes(p.change_log)?,
        created_at: p.created_at,
        updated_at: p.updated_at,
    })
}

fn build_new_row(record: &TeamRecord) -> Result<TeamPrivateNew, String> {
    use conversions::*;
    Ok(TeamPrivateNew {
        team_id: record.team_id.clone(),
        track: serialize_track(record.track),
        leader_name: record.leader.name.clone(),
        leader_enrollment: record.leader.enrollment.clone(),
        leader_mobile: record.leader_mobile.clone(),
        leader_email: record.leader.email.clone(),
        member2_name: record.member2.name.clone(),
        member2_enrollment: record.member2.enrollment.clone(),
        member2_email: record.member2.email.clone(),
        member3_name: record.member3.name.clone(),
        member3_enrollment: record.member3.enrollment.clone(),
        member3_email: record.member3.email.clone(),
        member4_name: record.member4.name.clone(),
        member4_enrollment: record.member4.enrollment.clone(),
        member4_email: record.member4.email.clone(),
        problem_statement: record.problem_statement.clone(),
        selected_problems: problems_to_json(&record.selected_problems)?,
        submitted: record.submitted,
        submitted_by: record.submitted_by.clone(),
        submitted_at: record.submitted_at,
        att_student_round1: sheet_to_json(&record.attendance.student_round1)?,
        att_evaluator_round1: sheet_to_json(&record.attendance.evaluator_round1)?,
        att_student_round2: sheet_to_json(&record.attendance.student_round2)?,
        att_evaluator_round2: sheet_to_json(&record.attendance.evaluator_round2)?,
        evaluation_round1: evaluation_to_json(&record.evaluation.round1)?,
        evaluation_round2: evaluation_to_json(&record.evaluation.round2)?,
        change_log: changes_to_json(&record.change_log)?,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

/// Fetch one record by team id.
pub fn get_team(conn: &mut PgConnection, input_team_id: &str) -> Result<Option<TeamRecord>, String> {
    use self::teams::dsl::*;

    teams
        .filter(team_id.eq(input_team_id))
        .first::<TeamPrivate>(conn)
        .optional()
        .map_err(|err| err.to_string())?
        .map(private_to_public)
        .transpose()
}

/// Fetch every record on a track, ordered by team id.
pub fn get_all_teams(conn: &mut PgConnection, input_track: Track) -> Result<Vec<TeamRecord>, String> {
    use self::teams::dsl::*;

    teams
        .filter(track.eq(conversions::serialize_track(input_track)))
        .order(team_id.asc())
        .load::<TeamPrivate>(conn)
        .map_err(|err| err.to_string())?
        .into_iter()
        .map(private_to_public)
        .collect()
}

fn list_team_ids(conn: &mut PgConnection, input_track: Track) -> Result<Vec<String>, String> {
    use self::teams::dsl::*;

    teams
        .filter(track.eq(conversions::serialize_track(input_track)))
        .select(team_id)
        .load::<String>(conn)
        .map_err(|err| err.to_string())
}

enum InsertTeamError {
    DuplicateTeamId,
    Store(String),
}

fn insert_team(conn: &mut PgConnection, record: &TeamRecord) -> Result<TeamRecord, InsertTeamError> {
    use self::teams::dsl::*;

    let insert_row = build_new_row(record).map_err(InsertTeamError::Store)?;

    diesel::insert_into(teams)
        .values(&insert_row)
        .get_result::<TeamPrivate>(conn)
        .map_err(|err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                InsertTeamError::DuplicateTeamId
            }
            other => InsertTeamError::Store(other.to_string()),
        })
        .and_then(|row| private_to_public(row).map_err(InsertTeamError::Store))
}

/// Why a registration could not be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// Every candidate id collided with a concurrent registration.
    AllocationFailed,
    Store(String),
}

/// Register a new team: allocate the next id for the track and insert the
/// zero-value record.
///
/// Allocation is serialized through the unique constraint on `team_id`:
/// compute a candidate from the current ids, attempt the insert, and on a
/// uniqueness violation re-scan and retry, bounded by a small limit.
pub fn register_team(
    conn: &mut PgConnection,
    input_track: Track,
    input: &NewTeamInput,
    now: DateTime<Utc>,
) -> Result<TeamRecord, RegisterError> {
    for attempt in 0..ALLOCATION_RETRY_LIMIT {
        let existing_ids = list_team_ids(conn, input_track).map_err(RegisterError::Store)?;
        let candidate = next_team_id(&existing_ids, input_track.id_prefix(), TEAM_ID_WIDTH);
        let record = new_team_record(candidate, input_track, input, now);

        match insert_team(conn, &record) {
            Ok(inserted) => return Ok(inserted),
            Err(InsertTeamError::DuplicateTeamId) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    team_id = %record.team_id,
                    "Team id collided with a concurrent registration, retrying"
                );
            }
            Err(InsertTeamError::Store(err)) => return Err(RegisterError::Store(err)),
        }
    }
    Err(RegisterError::AllocationFailed)
}

/// Apply a merge patch with one targeted update per owned sub-document.
///
/// Sub-documents absent from the patch are never rewritten, so a concurrent
/// writer touching other fields is not clobbered. The change log is
/// appended with a jsonb concat at the store for the same reason.
pub fn apply_team_patch(
    conn: &mut PgConnection,
    input_team_id: &str,
    patch: &TeamPatch,
    now: DateTime<Utc>,
) -> Result<TeamRecord, String> {
    use self::teams::dsl::*;

    if let Some(roster) = &patch.roster {
        diesel::update(teams.filter(team_id.eq(input_team_id)))
            .set((
                leader_name.eq(&roster.leader.name),
                leader_enrollment.eq(&roster.leader.enrollment),
                leader_mobile.eq(&roster.leader_mobile),
                leader_email.eq(&roster.leader.email),
                member2_name.eq(&roster.member2.name),
                member2_enrollment.eq(&roster.member2.enrollment),
                member2_email.eq(&roster.member2.email),
                member3_name.eq(&roster.member3.name),
                member3_enrollment.eq(&roster.member3.enrollment),
                member3_email.eq(&roster.member3.email),
                member4_name.eq(&roster.member4.name),
                member4_enrollment.eq(&roster.member4.enrollment),
                member4_email.eq(&roster.member4.email),
                problem_statement.eq(roster.problem_statement.as_deref()),
                selected_problems.eq(conversions::problems_to_json(&roster.selected_problems)?),
                submitted.eq(roster.submitted),
                submitted_by.eq(roster.submitted_by.as_deref()),
                submitted_at.eq(roster.submitted_at),
                updated_at.eq(now),
            ))
            .execute(conn)
            .map_err(|err| err.to_string())?;
    }

    for (kind, sheet) in &patch.attendance {
        let sheet_value = conversions::sheet_to_json(sheet)?;
        let update = diesel::update(teams.filter(team_id.eq(input_team_id)));
        match kind {
            SnapshotKind::StudentRound1 => update
                .set((att_student_round1.eq(sheet_value), updated_at.eq(now)))
                .execute(conn),
            SnapshotKind::EvaluatorRound1 => update
                .set((att_evaluator_round1.eq(sheet_value), updated_at.eq(now)))
                .execute(conn),
            SnapshotKind::StudentRound2 => update
                .set((att_student_round2.eq(sheet_value), updated_at.eq(now)))
                .execute(conn),
            SnapshotKind::EvaluatorRound2 => update
                .set((att_evaluator_round2.eq(sheet_value), updated_at.eq(now)))
                .execute(conn),
        }
        .map_err(|err| err.to_string())?;
    }

    for (round, evaluated) in &patch.evaluation {
        let round_value = conversions::evaluation_to_json(evaluated)?;
        let update = diesel::update(teams.filter(team_id.eq(input_team_id)));
        match round {
            Round::One => update
                .set((evaluation_round1.eq(round_value), updated_at.eq(now)))
                .execute(conn),
            Round::Two => update
                .set((evaluation_round2.eq(round_value), updated_at.eq(now)))
                .execute(conn),
        }
        .map_err(|err| err.to_string())?;
    }

    if !patch.new_changes.is_empty() {
        let appended = conversions::changes_to_json(&patch.new_changes)?;
        diesel::update(teams.filter(team_id.eq(input_team_id)))
            .set((change_log.eq(change_log.concat(appended)), updated_at.eq(now)))
            .execute(conn)
            .map_err(|err| err.to_string())?;
    }

    get_team(conn, input_team_id)?
        .ok_or_else(|| format!("no record for team {input_team_id} after update"))
}

/// Administrative maintenance only; not part of the steady-state flow.
pub fn delete_all_teams(conn: &mut PgConnection, input_track: Option<Track>) -> Result<usize, String> {
    use self::teams::dsl::*;

    match input_track {
        Some(t) => diesel::delete(teams.filter(track.eq(conversions::serialize_track(t))))
            .execute(conn),
        None => diesel::delete(teams).execute(conn),
    }
    .map_err(|err| err.to_string())
}
