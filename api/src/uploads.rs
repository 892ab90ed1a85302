//! File store boundary: team uploads and project submission records.
//!
//! Only filenames and a submission timestamp reach the team record; the
//! bytes live under a team-scoped directory on disk.

use crate::helpers::{ApiResult, bad_request_error, internal_error};
use crate::session::ensure_round_open;
use crate::teams::TrackParam;
use chrono::Utc;
use hackathon_common::db_util::{self, PgPool};
use hackathon_common::merge::TeamPatch;
use hackathon_common::{ActorRole, PresenceFlags, Round, SnapshotKind, attendance};
use rocket::data::{Data, ToByteUnit};
use rocket::serde::Deserialize;
use rocket::serde::json::{Json, Value, json};
use rocket::{State, tokio};
use std::env;
use std::path::PathBuf;

/// Where uploaded files and submission records land on disk.
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    pub uploads_dir: PathBuf,
    pub submissions_dir: PathBuf,
}

impl FileStoreConfig {
    pub fn from_env() -> Self {
        Self {
            uploads_dir: env::var("UPLOADS_DIR")
                .unwrap_or_else(|_| "uploads_teams".to_string())
                .into(),
            submissions_dir: env::var("SUBMISSIONS_DIR")
                .unwrap_or_else(|_| "project_submissions".to_string())
                .into(),
        }
    }
}

/// Collapse anything outside `[A-Za-z0-9._-]` so a client-supplied name can
/// never escape the team directory.
fn sanitize_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[post("/<_track>/upload?<team_id>&<filename>", data = "<file>")]
pub async fn upload_file(
    _track: TrackParam,
    team_id: &str,
    filename: &str,
    file: Data<'_>,
    store: &State<FileStoreConfig>,
) -> ApiResult<Value> {
    if team_id.trim().is_empty() {
        return Err(bad_request_error("Team ID is required"));
    }
    if filename.trim().is_empty() {
        return Err(bad_request_error("File name is required"));
    }

    let team_segment = sanitize_segment(team_id);
    let file_segment = sanitize_segment(filename);
    // dot-only segments would walk out of the uploads directory
    if team_segment.chars().all(|c| c == '.') {
        return Err(bad_request_error("Invalid team ID"));
    }
    if file_segment.chars().all(|c| c == '.') {
        return Err(bad_request_error("Invalid file name"));
    }

    let team_dir = store.uploads_dir.join(&team_segment);
    tokio::fs::create_dir_all(&team_dir)
        .await
        .map_err(|err| internal_error(err.to_string()))?;

    let destination = team_dir.join(&file_segment);
    let written = file
        .open(10.mebibytes())
        .into_file(&destination)
        .await
        .map_err(|err| internal_error(err.to_string()))?;
    if !written.n.complete {
        return Err(bad_request_error("File exceeds the 10 MiB upload limit"));
    }

    tracing::info!(team_id, file = %file_segment, "File uploaded");
    Ok(Json(json!({
        "success": true,
        "message": "File uploaded successfully",
        "file_path": format!("/{}/{team_segment}/{file_segment}", store.uploads_dir.display()),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SubmitProjectRequest {
    pub team_id: String,
    pub uploaded_files: Vec<String>,
    #[serde(default)]
    pub round2_presence: Option<PresenceFlags>,
    #[serde(default)]
    pub marked_by: Option<String>,
}

#[post("/<track>/submit-project", data = "<body>")]
pub fn submit_project(
    track: TrackParam,
    body: Json<SubmitProjectRequest>,
    pool: &State<PgPool>,
    store: &State<FileStoreConfig>,
) -> ApiResult<Value> {
    let request = body.into_inner();
    if request.team_id.trim().is_empty() {
        return Err(bad_request_error("Team ID is required"));
    }
    if request.uploaded_files.is_empty() {
        return Err(bad_request_error("No files have been uploaded"));
    }

    let mut conn = db_util::get_pooled_database_connection(pool).map_err(internal_error)?;
    ensure_round_open(&mut conn, ActorRole::Student, Round::Two)?;

    let existing = db_util::get_team(&mut conn, &request.team_id)
        .map_err(internal_error)?
        .filter(|record| record.track == track.0)
        .ok_or_else(|| crate::helpers::not_found_error("Team not found"))?;

    // submission always rewrites the student round-two snapshot in full
    let now = Utc::now();
    let sheet = attendance::reconcile(
        request.round2_presence.unwrap_or_default(),
        request.marked_by.as_deref(),
        now,
    );
    let patch = TeamPatch {
        attendance: vec![(SnapshotKind::StudentRound2, sheet)],
        ..TeamPatch::default()
    };
    db_util::apply_team_patch(&mut conn, &existing.team_id, &patch, now).map_err(internal_error)?;

    let submission = json!({
        "team_id": existing.team_id,
        "submission_date": now,
        "files": request.uploaded_files,
    });
    std::fs::create_dir_all(&store.submissions_dir).map_err(|err| internal_error(err.to_string()))?;
    let record_path = store
        .submissions_dir
        .join(format!("{}_submission.json", sanitize_segment(&existing.team_id)));
    let rendered = serde_json::to_vec_pretty(&submission).map_err(|err| internal_error(err.to_string()))?;
    std::fs::write(&record_path, rendered).map_err(|err| internal_error(err.to_string()))?;

    tracing::info!(team_id = %existing.team_id, files = request.uploaded_files.len(), "Project submitted");
    Ok(Json(json!({
        "success": true,
        "message": "Project submitted successfully",
        "submission_date": now,
    })))
}
