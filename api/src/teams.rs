//! Team registration, lookup, update and evaluation routes.

use crate::helpers::{
    ApiError, ApiResult, bad_request_error, internal_error, not_found_error,
    service_unavailable_error,
};
use crate::session::{AdminSession, EvaluatorSession, StaffSession, ensure_round_open};
use chrono::Utc;
use hackathon_common::db_util::{self, PgPool, RegisterError};
use hackathon_common::mailer::{self, MailerConfig};
use hackathon_common::merge::{self, EvaluatorUpdate, StudentUpdate};
use hackathon_common::{ActorRole, NewTeamInput, Round, TeamRecord, Track};
use rocket::State;
use rocket::request::FromParam;
use rocket::serde::json::{Json, Value, json};

/// Path segment naming a registration track (`btech` or `mca`).
pub struct TrackParam(pub Track);

impl<'r> FromParam<'r> for TrackParam {
    type Error = &'r str;

    fn from_param(param: &'r str) -> Result<Self, Self::Error> {
        Track::parse(param).map(TrackParam).ok_or(param)
    }
}

#[post("/<track>/newteam", data = "<body>")]
pub async fn register_team(
    track: TrackParam,
    body: Json<NewTeamInput>,
    pool: &State<PgPool>,
    mail_config: &State<MailerConfig>,
) -> ApiResult<Value> {
    let TrackParam(track) = track;
    let input = body.into_inner();

    let record = {
        let mut conn = db_util::get_pooled_database_connection(pool).map_err(internal_error)?;
        ensure_round_open(&mut conn, ActorRole::Student, Round::One)?;
        db_util::register_team(&mut conn, track, &input, Utc::now()).map_err(|err| match err {
            RegisterError::AllocationFailed => {
                service_unavailable_error("Could not allocate a team id, please try again")
            }
            RegisterError::Store(err) => internal_error(err),
        })?
    };
    tracing::info!(team_id = %record.team_id, track = track.as_str(), "Team registered");

    // Mail failure is a soft warning, never a registration failure.
    let mail_sent = {
        let config = mail_config.inner().clone();
        let team = record.clone();
        let outcome =
            rocket::tokio::task::spawn_blocking(move || mailer::send_confirmation(&config, &team))
                .await
                .map_err(|err| err.to_string())
                .and_then(|sent| sent);
        match outcome {
            Ok(sent) => sent,
            Err(err) => {
                tracing::warn!(team_id = %record.team_id, error = %err, "Confirmation mail failed");
                false
            }
        }
    };

    Ok(Json(json!({
        "message": "Team registered successfully",
        "team_id": record.team_id,
        "mail_sent": mail_sent,
    })))
}

#[get("/<track>/team?<team_id>")]
pub fn get_team(track: TrackParam, team_id: &str, pool: &State<PgPool>) -> ApiResult<TeamRecord> {
    if team_id.trim().is_empty() {
        return Err(bad_request_error("Team ID is required"));
    }
    let mut conn = db_util::get_pooled_database_connection(pool).map_err(internal_error)?;
    let record = load_team(&mut conn, team_id, track.0)?;
    Ok(Json(record))
}

#[post("/<track>/team", data = "<body>")]
pub fn update_team(
    track: TrackParam,
    body: Json<StudentUpdate>,
    pool: &State<PgPool>,
) -> ApiResult<TeamRecord> {
    let update = body.into_inner();
    if update.team_id.trim().is_empty() {
        return Err(bad_request_error("Team ID is required"));
    }

    let mut conn = db_util::get_pooled_database_connection(pool).map_err(internal_error)?;
    // roster edits belong to round one; a pure round-two attendance write
    // only needs the round-two gate
    let touches_round2 = update.round2_presence.is_some();
    if update.round1_presence.is_some() || !touches_round2 {
        ensure_round_open(&mut conn, ActorRole::Student, Round::One)?;
    }
    if touches_round2 {
        ensure_round_open(&mut conn, ActorRole::Student, Round::Two)?;
    }

    let existing = load_team(&mut conn, &update.team_id, track.0)?;
    if update.submitted && !existing.submitted {
        validate_problem_selection(&existing, &update)?;
    }

    let now = Utc::now();
    let patch = merge::merge_student_update(&existing, &update, now);
    let record =
        db_util::apply_team_patch(&mut conn, &update.team_id, &patch, now).map_err(internal_error)?;
    Ok(Json(record))
}

#[post("/<track>/evaluate", data = "<body>")]
pub fn evaluate_team(
    _session: EvaluatorSession,
    track: TrackParam,
    body: Json<EvaluatorUpdate>,
    pool: &State<PgPool>,
) -> ApiResult<TeamRecord> {
    let update = body.into_inner();
    if update.team_id.trim().is_empty() {
        return Err(bad_request_error("Team ID is required"));
    }

    let mut conn = db_util::get_pooled_database_connection(pool).map_err(internal_error)?;
    let touches_round1 = update.round1_presence.is_some()
        || update.round1_marks.is_some()
        || update.round1_feedback.is_some();
    let touches_round2 = update.round2_presence.is_some()
        || update.round2_marks.is_some()
        || update.round2_feedback.is_some();
    if touches_round1 {
        ensure_round_open(&mut conn, ActorRole::Evaluator, Round::One)?;
    }
    if touches_round2 {
        ensure_round_open(&mut conn, ActorRole::Evaluator, Round::Two)?;
    }

    let existing = load_team(&mut conn, &update.team_id, track.0)?;
    let now = Utc::now();
    let patch = merge::merge_evaluator_update(&existing, &update, now);
    let record =
        db_util::apply_team_patch(&mut conn, &update.team_id, &patch, now).map_err(internal_error)?;
    Ok(Json(record))
}

#[get("/<track>/team/all")]
pub fn all_teams(
    _session: StaffSession,
    track: TrackParam,
    pool: &State<PgPool>,
) -> ApiResult<Vec<TeamRecord>> {
    let mut conn = db_util::get_pooled_database_connection(pool).map_err(internal_error)?;
    let records = db_util::get_all_teams(&mut conn, track.0).map_err(internal_error)?;
    Ok(Json(records))
}

#[delete("/admin/teams?<track>")]
pub fn delete_teams(
    _session: AdminSession,
    track: Option<&str>,
    pool: &State<PgPool>,
) -> ApiResult<Value> {
    let track = match track {
        Some(raw) => Some(
            Track::parse(raw).ok_or_else(|| bad_request_error(format!("Unknown track: {raw}")))?,
        ),
        None => None,
    };
    let mut conn = db_util::get_pooled_database_connection(pool).map_err(internal_error)?;
    let deleted = db_util::delete_all_teams(&mut conn, track).map_err(internal_error)?;
    tracing::info!(deleted, "Bulk team delete");
    Ok(Json(json!({"deleted": deleted})))
}

fn load_team(
    conn: &mut db_util::PooledPgConnection,
    team_id: &str,
    track: Track,
) -> Result<TeamRecord, ApiError> {
    let record = db_util::get_team(conn, team_id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found_error("Team not found"))?;
    // team ids are globally unique, but a record is only visible on its own track
    if record.track != track {
        return Err(not_found_error("Team not found"));
    }
    Ok(record)
}

/// Submission requires a problem selection: the chosen statement on track A,
/// at least the track minimum of selected keys on track B.
fn validate_problem_selection(
    existing: &TeamRecord,
    update: &StudentUpdate,
) -> Result<(), ApiError> {
    match existing.track {
        Track::BTech => {
            let chosen = update.problem_statement.as_deref().unwrap_or("").trim();
            if chosen.is_empty() {
                return Err(bad_request_error("A problem statement is required to submit"));
            }
        }
        Track::Mca => {
            let selected = update
                .selected_problems
                .as_ref()
                .unwrap_or(&existing.selected_problems);
            let minimum = existing.track.min_problem_selections();
            if selected.len() < minimum {
                return Err(bad_request_error(format!(
                    "Select at least {minimum} problem statements to submit"
                )));
            }
        }
    }
    Ok(())
}
