//! Login routes, session guards and round-gate checks.
//!
//! Sessions are fixed shared-credential cookies, one per role. Round gates
//! are the admin toggles: a disabled gate rejects the request before any
//! record logic runs.

use crate::helpers::{ApiError, ApiResult, forbidden_error, internal_error, unauthorized_error};
use chrono::Utc;
use hackathon_common::db_util::{self, PooledPgConnection};
use hackathon_common::{ActorRole, Round};
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::Deserialize;
use rocket::serde::json::{Json, Value, json};
use rocket::time::Duration;
use std::env;

pub const ADMIN_SESSION_COOKIE: &str = "admin_session";
pub const EVALUATOR_SESSION_COOKIE: &str = "evaluator_session";
const SESSION_AUTHENTICATED: &str = "authenticated";
const SESSION_MAX_AGE: Duration = Duration::days(1);

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct LoginRequest {
    username: String,
    password: String,
}

fn credentials(user_var: &str, pass_var: &str) -> Result<(String, String), ApiError> {
    match (env::var(user_var), env::var(pass_var)) {
        (Ok(user), Ok(pass)) if !user.is_empty() && !pass.is_empty() => Ok((user, pass)),
        _ => {
            tracing::error!("Credentials not configured: {user_var}/{pass_var}");
            Err(internal_error("Authentication service misconfigured"))
        }
    }
}

fn session_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, SESSION_AUTHENTICATED))
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(SESSION_MAX_AGE)
        .path("/")
        .build()
}

#[post("/admin/login", data = "<body>")]
pub fn admin_login(jar: &CookieJar<'_>, body: Json<LoginRequest>) -> ApiResult<Value> {
    let (username, password) = credentials("ADMIN_USERNAME", "ADMIN_PASSWORD")?;
    if body.username == username && body.password == password {
        jar.add(session_cookie(ADMIN_SESSION_COOKIE));
        Ok(Json(json!({"success": true})))
    } else {
        Err(unauthorized_error("Invalid credentials"))
    }
}

#[post("/evaluator/login", data = "<body>")]
pub fn evaluator_login(jar: &CookieJar<'_>, body: Json<LoginRequest>) -> ApiResult<Value> {
    let (username, password) = credentials("EVALUATOR_USERNAME", "EVALUATOR_PASSWORD")?;
    if body.username == username && body.password == password {
        jar.add(session_cookie(EVALUATOR_SESSION_COOKIE));
        Ok(Json(json!({"success": true, "message": "Login successful"})))
    } else {
        Err(unauthorized_error("Invalid username or password"))
    }
}

#[post("/evaluator/logout")]
pub fn evaluator_logout(jar: &CookieJar<'_>) -> ApiResult<Value> {
    jar.remove(Cookie::build(EVALUATOR_SESSION_COOKIE).path("/"));
    Ok(Json(json!({"success": true, "message": "Logged out successfully"})))
}

fn has_session(request: &Request<'_>, cookie_name: &str) -> bool {
    request
        .cookies()
        .get(cookie_name)
        .is_some_and(|cookie| cookie.value() == SESSION_AUTHENTICATED)
}

/// Request guard admitting only a logged-in admin.
pub struct AdminSession;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminSession {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, ()> {
        if has_session(request, ADMIN_SESSION_COOKIE) {
            Outcome::Success(AdminSession)
        } else {
            Outcome::Error((Status::Unauthorized, ()))
        }
    }
}

/// Request guard admitting only a logged-in evaluator.
pub struct EvaluatorSession;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for EvaluatorSession {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, ()> {
        if has_session(request, EVALUATOR_SESSION_COOKIE) {
            Outcome::Success(EvaluatorSession)
        } else {
            Outcome::Error((Status::Unauthorized, ()))
        }
    }
}

/// Request guard admitting any staff session, admin or evaluator.
pub struct StaffSession;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for StaffSession {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, ()> {
        if has_session(request, ADMIN_SESSION_COOKIE)
            || has_session(request, EVALUATOR_SESSION_COOKIE)
        {
            Outcome::Success(StaffSession)
        } else {
            Outcome::Error((Status::Unauthorized, ()))
        }
    }
}

/// Reject the request when the admin toggle for this actor/round is off.
pub fn ensure_round_open(
    conn: &mut PooledPgConnection,
    role: ActorRole,
    round: Round,
) -> Result<(), ApiError> {
    let gates = db_util::get_round_gates(conn, Utc::now()).map_err(internal_error)?;
    if gates.allows(role, round) {
        Ok(())
    } else {
        Err(forbidden_error("This round is currently closed"))
    }
}
