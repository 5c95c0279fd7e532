//! HTTP API: accounts, document upload and rule management, dataset profiling.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `POST`   | `/api/auth/signup` | Register an account |
//! | `POST`   | `/api/auth/login` | Exchange credentials for a session token |
//! | `POST`   | `/api/auth/forgot-password` | Issue a short-lived reset token |
//! | `POST`   | `/api/auth/reset-password` | Set a new password with a reset token |
//! | `GET`    | `/api/documents` | Caller's documents, newest first |
//! | `POST`   | `/api/documents/upload` | Upload instructions, extract rules, store |
//! | `GET`    | `/api/documents/{id}` | One of the caller's documents |
//! | `DELETE` | `/api/documents/{id}` | Delete one of the caller's documents |
//! | `POST`   | `/api/documents/update-rules/{id}` | Revise rules with a free-text instruction |
//! | `POST`   | `/api/documents/{id}/profile` | Validate a CSV, download the report |
//!
//! Everything under `/api/documents` needs `Authorization: Bearer <token>`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "Document not found" } }
//! ```
//!
//! Codes: `bad_request` (400), `unauthorized` (401), `not_found` (404),
//! `payload_too_large` (413), `rule_extraction_failed`, `rule_update_failed`,
//! `script_generation_failed`, `script_execution_failed` (502), `internal` (500).

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::auth::{self, AuthUser, TokenPurpose, TokenService};
use crate::config::Config;
use crate::error::PipelineError;
use crate::extract;
use crate::llm::{self, LlmClient};
use crate::models::{Document, Rule, User};
use crate::profile::Profiler;
use crate::rules::RuleExtractor;
use crate::script_gen::ScriptGenerator;
use crate::storage::{FileStorage, FIELD_DATASET, FIELD_INSTRUCTIONS, FIELD_PROFILE_DATASET};
use crate::store::{SqliteStore, Store};

/// Process-wide handles shared by every handler. Built once before the listener binds.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub extractor: RuleExtractor,
    pub profiler: Profiler,
    pub storage: FileStorage,
    pub tokens: Arc<TokenService>,
    pool: SqlitePool,
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl AppState {
    /// Connects the database, applies the schema, and builds the LLM client
    /// and token service from config and environment.
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        let llm = llm::create_client(&config.llm)?;
        let tokens = TokenService::from_config(&config.auth)?;
        Self::with_components(config, llm, tokens).await
    }

    /// Like [`initialize`](Self::initialize) with an explicit LLM client and token service.
    pub async fn with_components(
        config: &Config,
        llm: Arc<dyn LlmClient>,
        tokens: TokenService,
    ) -> anyhow::Result<Self> {
        let pool = crate::db::connect(config).await?;
        crate::migrate::apply(&pool).await?;

        let storage = FileStorage::new(&config.storage);
        let extractor = RuleExtractor::new(llm.clone(), storage.archive_dir());
        let generator = ScriptGenerator::new(
            llm.clone(),
            storage.clone(),
            &config.profiling.language,
            &config.profiling.script_extension,
        );
        let profiler = Profiler::new(generator, storage.clone(), &config.profiling);

        info!(model = llm.model_name(), db = %config.db.path.display(), "application state ready");

        Ok(Self {
            config: Arc::new(config.clone()),
            store: Arc::new(SqliteStore::new(pool.clone())),
            extractor,
            profiler,
            storage,
            tokens: Arc::new(tokens),
            pool,
        })
    }
}

/// Starts the HTTP server on `[server].bind` and runs until Ctrl-C or SIGTERM.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState::initialize(config).await?;
    serve(state, &config.server.bind).await
}

/// Serves `state` on `bind` with graceful shutdown; closes the pool on exit.
pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let pool = state.pool.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("server stopped");
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/auth/signup", post(handle_signup))
        .route("/api/auth/login", post(handle_login))
        .route("/api/auth/forgot-password", post(handle_forgot_password))
        .route("/api/auth/reset-password", post(handle_reset_password))
        .route("/api/documents", get(handle_list_documents))
        .route("/api/documents/upload", post(handle_upload))
        .route(
            "/api/documents/{id}",
            get(handle_get_document).delete(handle_delete_document),
        )
        .route("/api/documents/update-rules/{id}", post(handle_update_rules))
        .route("/api/documents/{id}/profile", post(handle_profile))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "could not install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "could not install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type every handler returns; renders as the JSON error body.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    fn bad_gateway(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, code, message)
    }

    /// Logs the cause; the client only sees a generic message.
    fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        error!(error = %err, "{}", context);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", context.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal("internal error", format!("{:#}", err))
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let detail = err.to_string();
        match err {
            PipelineError::NoRules => AppError::not_found("No rules found"),
            PipelineError::RuleExtractionFailed(_) => {
                warn!(error = %detail, "upload rejected");
                AppError::bad_gateway(
                    "rule_extraction_failed",
                    "Failed to extract regulatory instructions.",
                )
            }
            PipelineError::ScriptGenerationFailed(_) => {
                warn!(error = %detail, "profiling aborted");
                AppError::bad_gateway("script_generation_failed", "Failed to generate validation script")
            }
            PipelineError::ScriptExecutionFailed { .. } => {
                warn!(error = %detail, "profiling failed");
                AppError::bad_gateway(
                    "script_execution_failed",
                    "Failed to process file after retries",
                )
            }
            PipelineError::Io(e) => AppError::internal("file system error", e),
        }
    }
}

fn parse_document_id(id: &str) -> Result<String, AppError> {
    uuid::Uuid::parse_str(id)
        .map(|u| u.to_string())
        .map_err(|_| AppError::bad_request("Invalid Document ID"))
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Accounts ============

#[derive(Deserialize)]
struct SignupRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    message: String,
    token: String,
}

#[derive(Deserialize)]
struct ForgotPasswordRequest {
    #[serde(default)]
    email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ForgotPasswordResponse {
    message: String,
    reset_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest {
    #[serde(default)]
    token: String,
    #[serde(default)]
    new_password: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn handle_signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let email = normalize_email(&req.email);
    if req.name.trim().is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request("name, email and password are required"));
    }

    let password_hash = auth::hash_password(&req.password, state.config.auth.bcrypt_cost).await?;
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        email,
        password_hash,
        created_at: chrono::Utc::now().timestamp_millis(),
    };

    if !state.store.insert_user(&user).await? {
        return Err(AppError::bad_request("User already exists"));
    }
    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        MessageResponse::new("User registered successfully"),
    ))
}

async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let invalid = || AppError::bad_request("Invalid email or password");

    let user = state
        .store
        .find_user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;
    if !auth::verify_password(&req.password, &user.password_hash).await {
        return Err(invalid());
    }

    let token = state
        .tokens
        .issue_session(&user)
        .map_err(|e| AppError::internal("could not issue token", e))?;
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
    }))
}

async fn handle_forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, AppError> {
    let user = state
        .store
        .find_user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(|| AppError::bad_request("Email not found"))?;

    let reset_token = state
        .tokens
        .issue_reset(&user)
        .map_err(|e| AppError::internal("could not issue token", e))?;
    info!(user_id = %user.id, "password reset token issued");
    Ok(Json(ForgotPasswordResponse {
        message: "Password reset token generated".to_string(),
        reset_token,
    }))
}

async fn handle_reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let invalid = || AppError::bad_request("Invalid or expired token");

    let claims = state
        .tokens
        .verify(&req.token, TokenPurpose::Reset)
        .map_err(|_| invalid())?;
    if req.new_password.is_empty() {
        return Err(AppError::bad_request("newPassword is required"));
    }

    let password_hash =
        auth::hash_password(&req.new_password, state.config.auth.bcrypt_cost).await?;
    if !state.store.update_password(&claims.sub, &password_hash).await? {
        return Err(invalid());
    }
    info!(user_id = %claims.sub, "password reset");
    Ok(MessageResponse::new("Password reset successful"))
}

// ============ Documents ============

async fn handle_list_documents(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Document>>, AppError> {
    Ok(Json(state.store.list_documents(&user.id).await?))
}

async fn handle_get_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    let id = parse_document_id(&id)?;
    let doc = state
        .store
        .find_document(&id, &user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Document not found"))?;
    Ok(Json(doc))
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted_count: u64,
}

async fn handle_delete_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = parse_document_id(&id)?;
    let deleted_count = state.store.delete_document(&id, &user.id).await?;
    if deleted_count == 0 {
        return Err(AppError::not_found("Document not found"));
    }
    info!(document_id = %id, user_id = %user.id, "document deleted");
    Ok(Json(DeleteResponse { deleted_count }))
}

/// A file part already written to storage.
struct SavedUpload {
    path: PathBuf,
    original_name: String,
    content_type: String,
}

/// Multipart body split into text fields and saved file parts.
#[derive(Default)]
struct UploadForm {
    fields: std::collections::HashMap<String, String>,
    files: std::collections::HashMap<String, SavedUpload>,
}

impl UploadForm {
    /// Files saved before a failing part are removed again.
    async fn read(storage: &FileStorage, multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();
        match form.fill(storage, multipart).await {
            Ok(()) => Ok(form),
            Err(e) => {
                form.discard_except(&[]).await;
                Err(e)
            }
        }
    }

    async fn fill(&mut self, storage: &FileStorage, mut multipart: Multipart) -> Result<(), AppError> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(multipart_error)?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let declared = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?;

            match file_name {
                Some(original_name) => {
                    let path = storage
                        .save_upload(&name, &original_name, &bytes)
                        .await
                        .map_err(|e| AppError::internal("could not store upload", e))?;
                    let content_type = resolve_content_type(declared.as_deref(), &original_name);
                    if let Some(previous) = self.files.insert(
                        name,
                        SavedUpload {
                            path,
                            original_name,
                            content_type,
                        },
                    ) {
                        remove_scratch(&previous.path).await;
                    }
                }
                None => {
                    self.fields
                        .insert(name, String::from_utf8_lossy(&bytes).into_owned());
                }
            }
        }
        Ok(())
    }

    fn text(&self, name: &str) -> String {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }

    /// Removes every saved file except the ones named in `keep`.
    async fn discard_except(&self, keep: &[&str]) {
        for (field, upload) in &self.files {
            if !keep.contains(&field.as_str()) {
                remove_scratch(&upload.path).await;
            }
        }
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", err.body_text())
    } else {
        AppError::bad_request(format!("malformed multipart body: {}", err.body_text()))
    }
}

/// Browsers often send `application/octet-stream`; fall back to the extension.
fn resolve_content_type(declared: Option<&str>, file_name: &str) -> String {
    match declared.map(extract::normalize_content_type) {
        Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct,
        _ => extract::content_type_for_name(file_name)
            .unwrap_or_default()
            .to_string(),
    }
}

async fn remove_scratch(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "could not remove scratch file");
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    message: String,
    document_id: String,
}

async fn handle_upload(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let form = UploadForm::read(&state.storage, multipart).await?;

    let name = form.text("name");
    let description = form.text("description");
    let Some(instructions) = form.files.get(FIELD_INSTRUCTIONS) else {
        form.discard_except(&[]).await;
        return Err(AppError::bad_request("instructionsFile is required"));
    };
    if name.is_empty() {
        form.discard_except(&[]).await;
        return Err(AppError::bad_request("name is required"));
    }

    let text = extract::extract(&instructions.path, &instructions.content_type).await;
    if text.trim().is_empty() {
        warn!(file = %instructions.original_name, "instructions file yielded no text");
    }

    let dataset = form.files.get(FIELD_DATASET).map(|d| d.path.as_path());
    let result = state.extractor.extract_rules(&text, dataset, &name).await;

    // Everything but the instructions file is scratch from here on.
    form.discard_except(&[FIELD_INSTRUCTIONS]).await;
    let rules = match result {
        Ok(rules) => rules,
        Err(e) => {
            remove_scratch(&instructions.path).await;
            return Err(e.into());
        }
    };

    let doc = Document {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        description,
        source_file_name: instructions.original_name.clone(),
        source_file_path: instructions.path.to_string_lossy().into_owned(),
        owner_id: user.id.clone(),
        created_at: chrono::Utc::now().timestamp_millis(),
        extracted_rules: rules,
    };
    state.store.insert_document(&doc).await?;
    info!(
        document_id = %doc.id,
        user_id = %user.id,
        rules = doc.extracted_rules.len(),
        "document stored"
    );

    Ok(Json(UploadResponse {
        message: "Document processed successfully".to_string(),
        document_id: doc.id,
    }))
}

#[derive(Deserialize)]
struct UpdateRulesRequest {
    #[serde(default)]
    updates: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRulesResponse {
    message: String,
    extracted_rules: Vec<Rule>,
}

async fn handle_update_rules(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateRulesRequest>,
) -> Result<Json<UpdateRulesResponse>, AppError> {
    let id = parse_document_id(&id)?;
    if req.updates.trim().is_empty() {
        return Err(AppError::bad_request("updates is required"));
    }

    let doc = state
        .store
        .find_document(&id, &user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Document not found"))?;

    let existing = serde_json::to_string(&doc.extracted_rules)
        .map_err(|e| AppError::internal("could not serialize rules", e))?;
    let rules = state.extractor.update_rules(&existing, &req.updates).await;
    if rules.is_empty() {
        return Err(AppError::bad_gateway(
            "rule_update_failed",
            "The rule update produced no usable rules; stored rules are unchanged",
        ));
    }

    if !state.store.update_rules(&id, &user.id, &rules).await? {
        return Err(AppError::not_found("Document not found"));
    }
    info!(document_id = %id, rules = rules.len(), "rules updated");
    Ok(Json(UpdateRulesResponse {
        message: "Document processed successfully".to_string(),
        extracted_rules: rules,
    }))
}

async fn handle_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = UploadForm::read(&state.storage, multipart).await?;
    // Only the dataset survives past this point, and the profiler deletes it.
    form.discard_except(&[FIELD_PROFILE_DATASET]).await;
    let dataset = form.files.get(FIELD_PROFILE_DATASET).map(|f| f.path.clone());

    let doc = match parse_document_id(&id) {
        Ok(id) => state.store.find_document(&id, &user.id).await,
        Err(e) => {
            if let Some(path) = &dataset {
                remove_scratch(path).await;
            }
            return Err(e);
        }
    };
    let doc = match doc {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            if let Some(path) = &dataset {
                remove_scratch(path).await;
            }
            return Err(AppError::not_found("Document not found"));
        }
        Err(e) => {
            if let Some(path) = &dataset {
                remove_scratch(path).await;
            }
            return Err(e.into());
        }
    };

    let Some(dataset) = dataset else {
        return Err(AppError::bad_request("CSV file is required"));
    };

    let report = state.profiler.profile(&doc, &dataset).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"data.csv\""),
        ],
        report,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ids_must_be_uuids() {
        let id = uuid::Uuid::new_v4().to_string();
        assert_eq!(parse_document_id(&id).unwrap(), id);
        let err = parse_document_id("not-an-id").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid Document ID");
    }

    #[test]
    fn pipeline_errors_map_to_gateway_codes() {
        let err = AppError::from(PipelineError::ScriptExecutionFailed {
            attempts: 4,
            last_error: "boom".into(),
        });
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.code, "script_execution_failed");

        let err = AppError::from(PipelineError::NoRules);
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "No rules found");
    }

    #[test]
    fn content_type_falls_back_to_extension() {
        assert_eq!(resolve_content_type(Some("text/plain"), "x.pdf"), "text/plain");
        assert_eq!(
            resolve_content_type(Some("application/octet-stream"), "x.pdf"),
            extract::MIME_PDF
        );
        assert_eq!(resolve_content_type(None, "x.csv"), extract::MIME_CSV);
        assert_eq!(resolve_content_type(None, "x.bin"), "");
    }
}
