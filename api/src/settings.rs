//! Admin round-gate toggles.

use crate::helpers::{ApiResult, internal_error};
use crate::session::AdminSession;
use chrono::Utc;
use hackathon_common::RoundGates;
use hackathon_common::db_util::{self, PgPool};
use rocket::State;
use rocket::serde::json::{Json, Value, json};

#[get("/admin/settings")]
pub fn get_settings(_session: AdminSession, pool: &State<PgPool>) -> ApiResult<RoundGates> {
    let mut conn = db_util::get_pooled_database_connection(pool).map_err(internal_error)?;
    let gates = db_util::get_round_gates(&mut conn, Utc::now()).map_err(internal_error)?;
    Ok(Json(gates))
}

#[post("/admin/settings", data = "<body>")]
pub fn update_settings(
    _session: AdminSession,
    body: Json<RoundGates>,
    pool: &State<PgPool>,
) -> ApiResult<Value> {
    let mut conn = db_util::get_pooled_database_connection(pool).map_err(internal_error)?;
    let gates =
        db_util::update_round_gates(&mut conn, body.into_inner(), Utc::now()).map_err(internal_error)?;
    tracing::info!(?gates, "Round gates updated");
    Ok(Json(json!({"message": "Settings updated successfully"})))
}
