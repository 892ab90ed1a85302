//! An api for the hackathon registration and evaluation portal.

#[macro_use]
extern crate rocket;

mod helpers;
mod problems;
mod session;
mod settings;
mod teams;
mod uploads;

use hackathon_common::db_util;
use hackathon_common::mailer::MailerConfig;
use helpers::{CorsFairing, RequestTimingFairing};
use rocket::serde::json::{Value, json};
use rocket_prometheus::PrometheusMetrics;
use tracing_subscriber::EnvFilter;
use uploads::FileStoreConfig;

#[catch(401)]
fn unauthorized() -> Value {
    json!("A valid session is required for this resource.")
}

#[catch(404)]
fn not_found() -> Value {
    json!("The requested resource could not be found.")
}

#[catch(422)]
fn unprocessable() -> Value {
    json!("The request body could not be parsed.")
}

#[launch]
fn rocket() -> _ {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let pool = db_util::create_database_pool()
        .unwrap_or_else(|err| panic!("Failed to build the database pool: {err}"));
    let prometheus = PrometheusMetrics::new();

    rocket::build()
        .manage(pool)
        .manage(MailerConfig::from_env())
        .manage(FileStoreConfig::from_env())
        .attach(RequestTimingFairing)
        .attach(CorsFairing)
        .attach(prometheus.clone())
        .mount("/metrics", prometheus)
        .mount(
            "/api",
            routes![
                session::admin_login,
                session::evaluator_login,
                session::evaluator_logout,
                settings::get_settings,
                settings::update_settings,
                teams::register_team,
                teams::get_team,
                teams::update_team,
                teams::evaluate_team,
                teams::all_teams,
                teams::delete_teams,
                problems::list_problems,
                uploads::upload_file,
                uploads::submit_project,
            ],
        )
        .register("/api", catchers![unauthorized, not_found, unprocessable])
}
