//! Timetable approval portal.
//!
//! HTML endpoints:
//! - `GET  /`                              sign-in page
//! - `POST /`                              credential check, redirect to role dashboard
//! - `POST /logout/`                       end the session
//! - `GET  /admin-dashboard/`              admin landing page with every timetable
//! - `GET  /dept-dashboard/`               department head landing page
//! - `GET  /scheduler-dashboard/`          scheduler landing page
//! - `GET  /scheduler/`                    hand off to the authoring tool
//! - `GET  /schedule/`                     the caller's own timetables
//! - `POST /schedule/`                     submit a timetable
//! - `GET  /create-timetable/`             submission form
//! - `POST /create-timetable/`             submit a timetable
//! - `GET  /admin-panel/`                  every timetable, optional `?status=` filter
//! - `POST /update-status/{id}/{status}/`  admin status transition
//! - `POST /clear-schedule-history/`       delete the caller's own timetables
//! - `POST /clear-admin-history/`          delete every timetable
//!
//! Mutating paths answer any other method with 403.

use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, Form, Path, Query, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use chrono::{Duration, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use tera::{Context, Tera};
use tracing::{error, info, warn};

use timetabler_core::access::{AccessGate, Permission};
use timetabler_core::config::AppConfig;
use timetabler_core::credentials::authenticate;
use timetabler_core::dashboard::{Dashboard, DashboardRoute};
use timetabler_core::domain::session::SessionRecord;
use timetabler_core::domain::timetable::{TimetableDraft, TimetableId, TimetableStatus};
use timetabler_core::domain::user::Identity;
use timetabler_core::errors::{AccessError, AuthError, WorkflowError};
use timetabler_core::handoff::Handoff;
use timetabler_core::workflow::{ClearScope, WorkflowEngine, DEFAULT_TITLE};
use timetabler_db::{
    DbPool, RepositoryError, SessionRepository, SqlSessionRepository, SqlTimetableRepository,
    SqlUserRepository, TimetableRepository, UserRepository,
};

use crate::auth::{CookieSettings, SignedIn};
use crate::flash::FlashMessage;

const TEMPLATES: [(&str, &str); 8] = [
    ("base.html", include_str!("../../../templates/portal/base.html")),
    ("login.html", include_str!("../../../templates/portal/login.html")),
    ("dashboard_admin.html", include_str!("../../../templates/portal/dashboard_admin.html")),
    ("dashboard_dept.html", include_str!("../../../templates/portal/dashboard_dept.html")),
    (
        "dashboard_scheduler.html",
        include_str!("../../../templates/portal/dashboard_scheduler.html"),
    ),
    ("schedule.html", include_str!("../../../templates/portal/schedule.html")),
    ("create_timetable.html", include_str!("../../../templates/portal/create_timetable.html")),
    ("admin_panel.html", include_str!("../../../templates/portal/admin_panel.html")),
];

#[derive(Clone)]
pub struct PortalState {
    users: Arc<dyn UserRepository>,
    timetables: Arc<dyn TimetableRepository>,
    sessions: Arc<dyn SessionRepository>,
    templates: Arc<Tera>,
    cookies: Arc<CookieSettings>,
    session_ttl: Duration,
    authoring_url: Arc<str>,
    gate: AccessGate,
    workflow: WorkflowEngine,
}

impl PortalState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        timetables: Arc<dyn TimetableRepository>,
        sessions: Arc<dyn SessionRepository>,
        config: &AppConfig,
    ) -> Result<Self, tera::Error> {
        let session_ttl = Duration::hours(i64::from(config.session.ttl_hours));
        let gate = AccessGate;

        Ok(Self {
            users,
            timetables,
            sessions,
            templates: init_templates()?,
            cookies: Arc::new(CookieSettings {
                name: config.session.cookie_name.clone(),
                max_age_secs: session_ttl.num_seconds(),
                secure: config.session.secure_cookie,
            }),
            session_ttl,
            authoring_url: Arc::from(config.authoring.url.as_str()),
            gate,
            workflow: WorkflowEngine::new(gate),
        })
    }

    pub fn from_pool(db_pool: DbPool, config: &AppConfig) -> Result<Self, tera::Error> {
        Self::new(
            Arc::new(SqlUserRepository::new(db_pool.clone())),
            Arc::new(SqlTimetableRepository::new(db_pool.clone())),
            Arc::new(SqlSessionRepository::new(db_pool)),
            config,
        )
    }

    pub(crate) fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    pub(crate) fn sessions(&self) -> &dyn SessionRepository {
        self.sessions.as_ref()
    }

    pub(crate) fn cookies(&self) -> &CookieSettings {
        &self.cookies
    }

    fn render(&self, template: &str, context: &Context) -> Result<Html<String>, PortalFailure> {
        Ok(Html(self.templates.render(template, context)?))
    }

    fn hand_off(&self, handoff: Handoff) -> Response {
        info!(
            event_name = handoff.event_name(),
            target = %self.authoring_url,
            "redirecting to authoring tool"
        );
        Redirect::to(&self.authoring_url).into_response()
    }
}

fn init_templates() -> Result<Arc<Tera>, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES)?;
    Ok(Arc::new(tera))
}

pub fn router(state: PortalState) -> Router {
    Router::new()
        .route("/", get(login_page).post(login))
        .route("/logout/", post(logout).fallback(forbidden_method))
        .route("/admin-dashboard/", get(admin_dashboard))
        .route("/dept-dashboard/", get(dept_dashboard))
        .route("/scheduler-dashboard/", get(scheduler_dashboard))
        .route("/scheduler/", get(launch_authoring_tool))
        .route("/schedule/", get(own_timetables).post(submit_timetable))
        .route("/create-timetable/", get(submission_form).post(submit_timetable))
        .route("/admin-panel/", get(admin_panel))
        .route("/update-status/{id}/{status}/", post(update_status).fallback(forbidden_method))
        .route("/clear-schedule-history/", post(clear_own_history).fallback(forbidden_method))
        .route("/clear-admin-history/", post(clear_all_history).fallback(forbidden_method))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum PortalFailure {
    SignInRequired,
    /// Read-only page requested by the wrong role.
    PageDenied,
    /// Mutation attempted by the wrong role.
    Forbidden,
    /// Raw id from the path; it may not even be numeric.
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl PortalFailure {
    pub fn page_denied(error: AccessError) -> Self {
        let AccessError::Forbidden { permission, required, actual } = error;
        warn!(
            event_name = "portal.access.page_denied",
            permission = ?permission,
            required = %required,
            actual = %actual,
            "role-gated page denied"
        );
        Self::PageDenied
    }
}

impl From<AccessError> for PortalFailure {
    fn from(error: AccessError) -> Self {
        let AccessError::Forbidden { permission, required, actual } = error;
        if !permission.is_mutating() {
            return Self::page_denied(error);
        }
        warn!(
            event_name = "portal.access.forbidden",
            permission = ?permission,
            required = %required,
            actual = %actual,
            "role-gated operation forbidden"
        );
        Self::Forbidden
    }
}

impl From<WorkflowError> for PortalFailure {
    fn from(error: WorkflowError) -> Self {
        match error {
            WorkflowError::Access(access) => access.into(),
            WorkflowError::InvalidStatus(raw) => {
                Self::BadRequest(WorkflowError::InvalidStatus(raw).to_string())
            }
            WorkflowError::NotFound(id) => Self::NotFound(id.to_string()),
        }
    }
}

impl From<RepositoryError> for PortalFailure {
    fn from(error: RepositoryError) -> Self {
        Self::Internal(format!("repository: {error}"))
    }
}

impl From<tera::Error> for PortalFailure {
    fn from(error: tera::Error) -> Self {
        Self::Internal(format!("template: {error:?}"))
    }
}

impl IntoResponse for PortalFailure {
    fn into_response(self) -> Response {
        match self {
            Self::SignInRequired => flash_redirect("/", FlashMessage::SignInRequired),
            Self::PageDenied => flash_redirect("/", FlashMessage::NotAuthorized),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Html("<h1>Forbidden</h1><p>You are not authorized to perform this action.</p>"),
            )
                .into_response(),
            Self::NotFound(id) => (
                StatusCode::NOT_FOUND,
                Html(format!(
                    "<h1>Not Found</h1><p>Timetable {} does not exist.</p>",
                    tera::escape_html(&id)
                )),
            )
                .into_response(),
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Html(format!("<h1>Bad Request</h1><p>{}</p>", tera::escape_html(&message))),
            )
                .into_response(),
            Self::Internal(detail) => {
                error!(
                    event_name = "portal.internal_error",
                    error = %detail,
                    "portal request failed"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html("<h1>Internal Error</h1><p>An unexpected internal error occurred.</p>"),
                )
                    .into_response()
            }
        }
    }
}

fn flash_redirect(location: &str, message: FlashMessage) -> Response {
    (AppendHeaders([(SET_COOKIE, message.set_cookie())]), Redirect::to(location)).into_response()
}

async fn forbidden_method() -> PortalFailure {
    PortalFailure::Forbidden
}

// ---------------------------------------------------------------------------
// Sign-in
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

async fn login_page(
    State(state): State<PortalState>,
    headers: HeaderMap,
) -> Result<Response, PortalFailure> {
    let mut context = Context::new();
    if let Some(flash) = FlashMessage::from_headers(&headers) {
        context.insert("flash", &flash.text());
        context.insert("flash_is_error", &flash.is_error());
    }

    let page = state.render("login.html", &context)?;
    Ok((AppendHeaders([(SET_COOKIE, FlashMessage::clear_cookie())]), page).into_response())
}

async fn login(
    State(state): State<PortalState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, PortalFailure> {
    let account = state.users.find_by_username(form.username.trim()).await?;
    let password = SecretString::from(form.password);

    let identity = match authenticate(account.as_ref(), &password) {
        Ok(identity) => identity,
        Err(AuthError::Hashing(detail)) => {
            return Err(PortalFailure::Internal(format!("credential check: {detail}")));
        }
        Err(error) => {
            warn!(
                event_name = "portal.login.rejected",
                username = %form.username,
                reason = %error,
                "sign-in rejected"
            );
            return Ok(flash_redirect("/", FlashMessage::from(&error)));
        }
    };

    let now = Utc::now();
    if let Err(error) = state.sessions.purge_expired(now).await {
        warn!(
            event_name = "portal.session.purge_failed",
            error = %error,
            "expired session purge failed"
        );
    }

    let session = SessionRecord::issue(identity.user_id, now, state.session_ttl);
    let cookie = state.cookies.issue(&session.token);
    state.sessions.insert(session).await?;

    let route = DashboardRoute::for_role(identity.role);
    info!(
        event_name = "portal.login.succeeded",
        user_id = %identity.user_id,
        role = %identity.role,
        "sign-in succeeded"
    );
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to(route.path())).into_response())
}

async fn logout(
    State(state): State<PortalState>,
    SignedIn(session): SignedIn,
) -> Result<Response, PortalFailure> {
    if state.sessions.delete(&session.token).await? {
        info!(
            event_name = "portal.logout",
            user_id = %session.identity.user_id,
            "session ended"
        );
    }

    Ok((
        AppendHeaders([
            (SET_COOKIE, state.cookies.clear()),
            (SET_COOKIE, FlashMessage::LoggedOut.set_cookie()),
        ]),
        Redirect::to("/"),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Dashboards
// ---------------------------------------------------------------------------

async fn admin_dashboard(
    State(state): State<PortalState>,
    SignedIn(session): SignedIn,
) -> Result<Html<String>, PortalFailure> {
    render_dashboard(&state, &session.identity, DashboardRoute::Admin).await
}

async fn dept_dashboard(
    State(state): State<PortalState>,
    SignedIn(session): SignedIn,
) -> Result<Html<String>, PortalFailure> {
    render_dashboard(&state, &session.identity, DashboardRoute::DeptHead).await
}

async fn scheduler_dashboard(
    State(state): State<PortalState>,
    SignedIn(session): SignedIn,
) -> Result<Html<String>, PortalFailure> {
    render_dashboard(&state, &session.identity, DashboardRoute::Scheduler).await
}

async fn render_dashboard(
    state: &PortalState,
    identity: &Identity,
    route: DashboardRoute,
) -> Result<Html<String>, PortalFailure> {
    state.gate.require(identity, route.permission()).map_err(PortalFailure::page_denied)?;

    let listing = if Dashboard::needs_listing(route) {
        state.timetables.list_all(None).await?
    } else {
        Vec::new()
    };
    let dashboard = Dashboard::assemble(&state.gate, identity, route, listing)
        .map_err(PortalFailure::page_denied)?;

    let mut context = Context::new();
    context.insert("dashboard", &dashboard);
    state.render(route.template(), &context)
}

// ---------------------------------------------------------------------------
// Scheduler pages
// ---------------------------------------------------------------------------

async fn launch_authoring_tool(
    State(state): State<PortalState>,
    SignedIn(session): SignedIn,
) -> Result<Response, PortalFailure> {
    let handoff =
        Handoff::launch(&state.gate, &session.identity).map_err(PortalFailure::page_denied)?;
    Ok(state.hand_off(handoff))
}

async fn own_timetables(
    State(state): State<PortalState>,
    SignedIn(session): SignedIn,
) -> Result<Html<String>, PortalFailure> {
    let identity = &session.identity;
    state.gate.require(identity, Permission::ViewOwnTimetables)?;

    let timetables = state.timetables.list_for_owner(identity.user_id).await?;

    let mut context = Context::new();
    context.insert("username", &identity.username);
    context.insert("timetables", &timetables);
    state.render("schedule.html", &context)
}

async fn submission_form(
    State(state): State<PortalState>,
    SignedIn(session): SignedIn,
) -> Result<Html<String>, PortalFailure> {
    state
        .gate
        .require(&session.identity, Permission::SubmitTimetable)
        .map_err(PortalFailure::page_denied)?;

    let mut context = Context::new();
    context.insert("username", &session.identity.username);
    context.insert("default_title", DEFAULT_TITLE);
    state.render("create_timetable.html", &context)
}

/// Any `status` field in the form is ignored; new records are always Pending.
/// The role is checked before the body is looked at. A body that is not a
/// urlencoded form submits the placeholder draft.
async fn submit_timetable(
    State(state): State<PortalState>,
    SignedIn(session): SignedIn,
    form: Result<Form<TimetableDraft>, FormRejection>,
) -> Result<Response, PortalFailure> {
    state.gate.require(&session.identity, Permission::SubmitTimetable)?;

    let draft = match form {
        Ok(Form(draft)) => draft,
        Err(rejection) => {
            warn!(
                event_name = "portal.timetable.unreadable_form",
                reason = %rejection.body_text(),
                "submission body ignored"
            );
            TimetableDraft::default()
        }
    };
    let record = state.workflow.submit(&session.identity, draft, Utc::now())?;
    let created = state.timetables.insert(record).await?;

    info!(
        event_name = "portal.timetable.submitted",
        timetable_id = %created.id,
        owner_id = %created.created_by,
        "timetable submitted for approval"
    );
    Ok(state.hand_off(Handoff::after_submission(created.id)))
}

async fn clear_own_history(
    State(state): State<PortalState>,
    SignedIn(session): SignedIn,
) -> Result<Response, PortalFailure> {
    let scope = state.workflow.clear_own(&session.identity)?;
    apply_clear(&state, scope).await?;
    Ok(Redirect::to("/schedule/").into_response())
}

// ---------------------------------------------------------------------------
// Admin pages
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct AdminPanelQuery {
    pub status: Option<String>,
}

/// Unknown or empty filter values show every record.
fn status_filter(raw: Option<&str>) -> Option<TimetableStatus> {
    raw.and_then(|value| value.parse().ok())
}

async fn admin_panel(
    State(state): State<PortalState>,
    SignedIn(session): SignedIn,
    Query(query): Query<AdminPanelQuery>,
) -> Result<Html<String>, PortalFailure> {
    state.gate.require(&session.identity, Permission::ViewAllTimetables)?;

    let filter = status_filter(query.status.as_deref());
    let timetables = state.timetables.list_all(filter).await?;
    let counts = state.timetables.count_by_status().await?;

    let mut context = Context::new();
    context.insert("username", &session.identity.username);
    context.insert("timetables", &timetables);
    context.insert("status_filter", &filter.map(|status| status.as_str()).unwrap_or(""));
    context.insert(
        "statuses",
        &TimetableStatus::ALL.iter().map(TimetableStatus::as_str).collect::<Vec<_>>(),
    );
    context.insert(
        "stats",
        &serde_json::json!({
            "total": counts.total(),
            "pending": counts.get(TimetableStatus::Pending),
            "approved": counts.get(TimetableStatus::Approved),
            "rejected": counts.get(TimetableStatus::Rejected),
            "review": counts.get(TimetableStatus::Review),
        }),
    );
    state.render("admin_panel.html", &context)
}

async fn update_status(
    State(state): State<PortalState>,
    SignedIn(session): SignedIn,
    Path((raw_id, raw_status)): Path<(String, String)>,
) -> Result<Response, PortalFailure> {
    let identity = &session.identity;
    let target = state.workflow.authorize_transition(identity, &raw_status)?;

    let id = raw_id.parse().map(TimetableId).map_err(|_| PortalFailure::NotFound(raw_id))?;
    let mut timetable =
        state.timetables.find_by_id(id).await?.ok_or(WorkflowError::NotFound(id))?;
    let transition = state.workflow.transition(identity, &mut timetable, target)?;

    if !state.timetables.update_status(id, timetable.status).await? {
        return Err(WorkflowError::NotFound(id).into());
    }

    info!(
        event_name = "portal.timetable.status_updated",
        timetable_id = %transition.timetable_id,
        from = %transition.from,
        to = %transition.to,
        reaffirmed = transition.is_reaffirmation(),
        actor_id = %identity.user_id,
        "timetable status updated"
    );
    Ok(Redirect::to("/admin-panel/").into_response())
}

async fn clear_all_history(
    State(state): State<PortalState>,
    SignedIn(session): SignedIn,
) -> Result<Response, PortalFailure> {
    let scope = state.workflow.clear_all(&session.identity)?;
    apply_clear(&state, scope).await?;
    Ok(Redirect::to("/admin-panel/").into_response())
}

async fn apply_clear(state: &PortalState, scope: ClearScope) -> Result<u64, RepositoryError> {
    let removed = match scope {
        ClearScope::OwnedBy(owner) => state.timetables.delete_for_owner(owner).await?,
        ClearScope::All => state.timetables.delete_all().await?,
    };
    info!(
        event_name = "portal.timetable.cleared",
        scope = ?scope,
        removed,
        "timetable history cleared"
    );
    Ok(removed)
}
