//! Problem-statement listing.

use crate::helpers::{ApiResult, internal_error};
use crate::teams::TrackParam;
use hackathon_common::ProblemStatement;
use hackathon_common::db_util::{self, PgPool};
use rocket::State;
use rocket::serde::json::Json;

#[get("/<track>/problems")]
pub fn list_problems(track: TrackParam, pool: &State<PgPool>) -> ApiResult<Vec<ProblemStatement>> {
    let mut conn = db_util::get_pooled_database_connection(pool).map_err(internal_error)?;
    let problems = db_util::get_problem_statements(&mut conn, track.0).map_err(internal_error)?;
    Ok(Json(problems))
}
