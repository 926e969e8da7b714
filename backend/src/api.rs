//! Web API Module
//!
//! REST endpoints for the placement tracker frontend. Every body is wrapped
//! in `ApiResponse`; the caller is identified by the `X-User-Id` header.

use actix_cors::Cors;
use actix_web::{
    error::JsonPayloadError, http::StatusCode, middleware, web, App, HttpRequest, HttpResponse,
    HttpServer, Responder, ResponseError,
};
use placement_core::{
    accounts, analytics, assignment, companies, eligibility, feedback, progress, seed,
    assignment::AssignOutcome, Account, CompanyInput, NewAccount, NewCertification, NewFeedback,
    PersonRef, ProfileUpdate, ProgressCounters, Role, Store, TrackerError,
};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::Caller;
use crate::config::Config;

// ============================================================
// APPLICATION STATE
// ============================================================

/// Shared application state
pub struct AppState {
    pub store: Store,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

// ============================================================
// API REQUEST/RESPONSE TYPES
// ============================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub student_id: String,
    pub mentor_id: String,
}

#[derive(Serialize)]
pub struct AssignResponse {
    pub message: String,
    #[serde(flatten)]
    pub outcome: AssignOutcome,
}

/// The caller's own account; students also get their mentor's details.
#[derive(Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub account: Account,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentor: Option<PersonRef>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn error(code: &str, message: &str) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.to_string()),
            code: Some(code.to_string()),
        }
    }
}

fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(data))
}

fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse::success(data))
}

// ============================================================
// ERRORS
// ============================================================

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Tracker(e) => e.code(),
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Tracker(e) => match e {
                TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
                TrackerError::InvalidRole(_) | TrackerError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
                TrackerError::Conflict(_) => StatusCode::CONFLICT,
                TrackerError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
                TrackerError::Storage(_)
                | TrackerError::Serialization(_)
                | TrackerError::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            log::error!("[api] {}", self);
            match self {
                ApiError::Tracker(TrackerError::Transient(_)) => self.to_string(),
                _ => "internal server error".to_string(),
            }
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(ApiResponse::<()>::error(self.code(), &message))
    }
}

type ApiResult = Result<HttpResponse, ApiError>;

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(format!("invalid request body: {}", err)).into()
}

// ============================================================
// API HANDLERS
// ============================================================

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "Placement Tracker API",
        "version": placement_core::get_version()
    }))
}

// --- Assignment -------------------------------------------------

async fn assign_mentor(
    data: web::Data<Arc<AppState>>,
    caller: Caller,
    req: web::Json<AssignRequest>,
) -> ApiResult {
    caller.require(Role::Admin)?;
    let outcome = assignment::assign(&data.store, &req.student_id, &req.mentor_id)?;
    Ok(ok(AssignResponse {
        message: "Student assigned to mentor successfully".to_string(),
        outcome,
    }))
}

async fn unassign_mentor(
    data: web::Data<Arc<AppState>>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult {
    caller.require(Role::Admin)?;
    let had_mentor = assignment::unassign(&data.store, &path)?;
    let message = if had_mentor {
        "Student unassigned"
    } else {
        "Student had no mentor"
    };
    Ok(ok(MessageResponse::new(message)))
}

async fn get_roster(data: web::Data<Arc<AppState>>, caller: Caller) -> ApiResult {
    let mentor = caller.require(Role::Mentor)?;
    Ok(ok(assignment::list_roster(&data.store, &mentor.id)?))
}

// --- Eligibility ------------------------------------------------

async fn get_eligible(data: web::Data<Arc<AppState>>, caller: Caller) -> ApiResult {
    let student = caller.require(Role::Student)?;
    Ok(ok(eligibility::eligible_for_student(&data.store, &student.id)?))
}

// --- Analytics --------------------------------------------------

async fn get_admin_analytics(data: web::Data<Arc<AppState>>, caller: Caller) -> ApiResult {
    caller.require(Role::Admin)?;
    Ok(ok(analytics::admin_analytics(&data.store)?))
}

async fn get_mentor_analytics(data: web::Data<Arc<AppState>>, caller: Caller) -> ApiResult {
    let mentor = caller.require(Role::Mentor)?;
    Ok(ok(analytics::mentor_analytics(&data.store, &mentor.id)?))
}

// --- Users ------------------------------------------------------

async fn create_user(
    data: web::Data<Arc<AppState>>,
    caller: Caller,
    req: web::Json<NewAccount>,
) -> ApiResult {
    caller.require(Role::Admin)?;
    Ok(created(accounts::create_account(&data.store, req.into_inner())?))
}

async fn get_profile(data: web::Data<Arc<AppState>>, caller: Caller) -> ApiResult {
    let account = caller.0;
    let mentor = match account.role() {
        Role::Student => assignment::mentor_of(&data.store, &account.id)?,
        _ => None,
    };
    Ok(ok(ProfileResponse { account, mentor }))
}

async fn update_profile(
    data: web::Data<Arc<AppState>>,
    caller: Caller,
    req: web::Json<ProfileUpdate>,
) -> ApiResult {
    let student = caller.require(Role::Student)?;
    Ok(ok(accounts::update_student_profile(&data.store, &student.id, req.into_inner())?))
}

async fn list_users(data: web::Data<Arc<AppState>>, caller: Caller) -> ApiResult {
    caller.require(Role::Admin)?;
    Ok(ok(accounts::list_accounts(&data.store)?))
}

async fn list_students(data: web::Data<Arc<AppState>>, _caller: Caller) -> ApiResult {
    Ok(ok(accounts::list_by_role(&data.store, Role::Student)?))
}

async fn list_mentors(data: web::Data<Arc<AppState>>, _caller: Caller) -> ApiResult {
    Ok(ok(accounts::list_by_role(&data.store, Role::Mentor)?))
}

async fn delete_user(
    data: web::Data<Arc<AppState>>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult {
    let admin = caller.require(Role::Admin)?;
    if admin.id == *path {
        return Err(ApiError::BadRequest("admins cannot delete their own account".to_string()));
    }
    accounts::delete_account(&data.store, &path)?;
    Ok(ok(MessageResponse::new("User deleted")))
}

// --- Companies --------------------------------------------------

async fn list_companies(data: web::Data<Arc<AppState>>, _caller: Caller) -> ApiResult {
    Ok(ok(companies::list_companies(&data.store)?))
}

async fn get_company(
    data: web::Data<Arc<AppState>>,
    _caller: Caller,
    path: web::Path<String>,
) -> ApiResult {
    Ok(ok(companies::get_company(&data.store, &path)?))
}

async fn create_company(
    data: web::Data<Arc<AppState>>,
    caller: Caller,
    req: web::Json<CompanyInput>,
) -> ApiResult {
    caller.require(Role::Admin)?;
    Ok(created(companies::create_company(&data.store, req.into_inner())?))
}

async fn update_company(
    data: web::Data<Arc<AppState>>,
    caller: Caller,
    path: web::Path<String>,
    req: web::Json<CompanyInput>,
) -> ApiResult {
    caller.require(Role::Admin)?;
    Ok(ok(companies::update_company(&data.store, &path, req.into_inner())?))
}

async fn delete_company(
    data: web::Data<Arc<AppState>>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult {
    caller.require(Role::Admin)?;
    companies::delete_company(&data.store, &path)?;
    Ok(ok(MessageResponse::new("Company deleted")))
}

// --- Progress ---------------------------------------------------

async fn get_progress(data: web::Data<Arc<AppState>>, caller: Caller) -> ApiResult {
    let student = caller.require(Role::Student)?;
    Ok(ok(progress::get_or_create(&data.store, &student.id)?))
}

async fn create_progress(
    data: web::Data<Arc<AppState>>,
    caller: Caller,
    req: web::Json<ProgressCounters>,
) -> ApiResult {
    let student = caller.require(Role::Student)?;
    Ok(created(progress::create(&data.store, &student.id, req.into_inner())?))
}

async fn update_progress(
    data: web::Data<Arc<AppState>>,
    caller: Caller,
    req: web::Json<ProgressCounters>,
) -> ApiResult {
    let student = caller.require(Role::Student)?;
    Ok(ok(progress::update_counters(&data.store, &student.id, req.into_inner())?))
}

async fn add_certification(
    data: web::Data<Arc<AppState>>,
    caller: Caller,
    req: web::Json<NewCertification>,
) -> ApiResult {
    let student = caller.require(Role::Student)?;
    Ok(ok(progress::add_certification(&data.store, &student.id, req.into_inner())?))
}

async fn delete_certification(
    data: web::Data<Arc<AppState>>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult {
    let student = caller.require(Role::Student)?;
    Ok(ok(progress::delete_certification(&data.store, &student.id, &path)?))
}

// --- Feedback ---------------------------------------------------

async fn create_feedback(
    data: web::Data<Arc<AppState>>,
    caller: Caller,
    req: web::Json<NewFeedback>,
) -> ApiResult {
    let mentor = caller.require(Role::Mentor)?;
    Ok(created(feedback::create_feedback(&data.store, &mentor.id, req.into_inner())?))
}

async fn get_student_feedback(data: web::Data<Arc<AppState>>, caller: Caller) -> ApiResult {
    let student = caller.require(Role::Student)?;
    Ok(ok(feedback::list_for_student(&data.store, &student.id)?))
}

async fn get_mentor_feedback(data: web::Data<Arc<AppState>>, caller: Caller) -> ApiResult {
    let mentor = caller.require(Role::Mentor)?;
    Ok(ok(feedback::list_for_mentor(&data.store, &mentor.id)?))
}

// ============================================================
// SERVER CONFIGURATION
// ============================================================

/// Register every route. `AppState` must be provided by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .route("/health", web::get().to(health_check))
        .route("/api/assign", web::post().to(assign_mentor))
        .route("/api/assign/{student_id}", web::delete().to(unassign_mentor))
        .route("/api/roster", web::get().to(get_roster))
        .route("/api/eligible", web::get().to(get_eligible))
        .route("/api/analytics/admin", web::get().to(get_admin_analytics))
        .route("/api/analytics/mentor", web::get().to(get_mentor_analytics))
        .route("/api/users", web::post().to(create_user))
        .route("/api/users/profile", web::get().to(get_profile))
        .route("/api/users/profile", web::put().to(update_profile))
        .route("/api/users/all", web::get().to(list_users))
        .route("/api/users/students", web::get().to(list_students))
        .route("/api/users/mentors", web::get().to(list_mentors))
        .route("/api/users/{id}", web::delete().to(delete_user))
        .route("/api/companies", web::get().to(list_companies))
        .route("/api/companies", web::post().to(create_company))
        .route("/api/companies/{id}", web::get().to(get_company))
        .route("/api/companies/{id}", web::put().to(update_company))
        .route("/api/companies/{id}", web::delete().to(delete_company))
        .route("/api/progress", web::get().to(get_progress))
        .route("/api/progress", web::post().to(create_progress))
        .route("/api/progress", web::put().to(update_progress))
        .route("/api/progress/certifications", web::post().to(add_certification))
        .route(
            "/api/progress/certifications/{cert_id}",
            web::delete().to(delete_certification),
        )
        .route("/api/feedback", web::post().to(create_feedback))
        .route("/api/feedback/student", web::get().to(get_student_feedback))
        .route("/api/feedback/mentor", web::get().to(get_mentor_feedback));
}

/// Open the store, seed it if asked, and serve until shutdown.
pub async fn run_server(config: Config) -> io::Result<()> {
    let store = config
        .open_store()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    if config.seed_demo_data {
        seed::seed_demo_data(&store)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    }
    let state = Arc::new(AppState::new(store));

    log::info!(
        "[api] Placement Tracker API starting at http://{}:{}",
        config.host,
        config.port
    );

    let origins = config.allowed_origins.clone();
    HttpServer::new(move || {
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
