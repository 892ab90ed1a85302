//! Interfaces between the application code and the record store.

use super::*;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use serde_json::Value;

mod conversions;
mod problems;
mod settings;
mod teams;

pub use problems::get_problem_statements;
pub use settings::{get_round_gates, update_round_gates};
pub use teams::{
    RegisterError, apply_team_patch, delete_all_teams, get_all_teams, get_team, register_team,
};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PooledPgConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Build the process-wide connection pool from `DATABASE_URL`.
/// Called once at startup; every request checks out of this pool.
pub fn create_database_pool() -> Result<PgPool, String> {
    let database_url =
        dotenvy::var("DATABASE_URL").map_err(|_| "DATABASE_URL is not set".to_string())?;
    Pool::builder()
        .build(ConnectionManager::new(database_url))
        .map_err(|err| err.to_string())
}

/// Check out a connection from the shared pool.
pub fn get_pooled_database_connection(pool: &PgPool) -> Result<PooledPgConnection, String> {
    pool.get().map_err(|err| err.to_string())
}
