use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use timetabler_db::DbPool;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Check {
    pub status: Readiness,
    pub detail: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthReport {
    pub status: Readiness,
    pub service: Check,
    pub database: Check,
    pub checked_at: DateTime<Utc>,
}

/// Readiness endpoint, merged into the portal router.
pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(report)).with_state(db_pool)
}

async fn report(State(pool): State<DbPool>) -> (StatusCode, Json<HealthReport>) {
    let database = check_schema(&pool).await;
    let (status, code) = match database.status {
        Readiness::Ready => (Readiness::Ready, StatusCode::OK),
        Readiness::Degraded => (Readiness::Degraded, StatusCode::SERVICE_UNAVAILABLE),
    };

    let service = Check {
        status: Readiness::Ready,
        detail: "timetabler-server accepting requests".to_string(),
    };
    (code, Json(HealthReport { status, service, database, checked_at: Utc::now() }))
}

/// The portal is usable only once the accounts table exists.
async fn check_schema(pool: &DbPool) -> Check {
    let outcome = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users").fetch_one(pool).await;
    match outcome {
        Ok(accounts) => Check {
            status: Readiness::Ready,
            detail: format!("portal schema reachable ({accounts} accounts)"),
        },
        Err(error) => Check {
            status: Readiness::Degraded,
            detail: format!("schema check failed: {error}"),
        },
    }
}
