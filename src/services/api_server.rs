// src/services/api_server.rs
//! API Server for the Certificate Registry
//!
//! Thin HTTP gateway over [`CertificateService`]. One endpoint per contract
//! operation, all under `/api`:
//! - `GET  /api/health`
//! - `GET  /api/certificates/:id`
//! - `POST /api/certificates`
//! - `POST /api/certificates/:id/verify`
//! - `POST /api/certificates/:id/revoke`
//! - `PUT  /api/certificates/:id/hash`
//! - `GET  /api/certificates/:id/history`
//! - `GET  /api/certificates/student/:alumno`
//!
//! Contract errors are mapped to HTTP statuses through their stable codes.

use crate::blockchain::ledger::{LedgerError, LedgerNetwork};
use crate::contracts::errors::ContractError;
use crate::models::certificate::{
    CertStatus, Certificate, CertificateRequest, HistoryEntry, VerificationResult,
};
use crate::services::certificate_service::CertificateService;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Json, Path, Request, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{SecondsFormat, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

// API request and response structures

/// Request payload for verifying a document hash
#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct VerifyCertificateRequest {
    hash_doc: Option<String>,
}

/// Request payload for revoking a certificate
#[derive(Serialize, Deserialize, Default)]
struct RevokeCertificateRequest {
    razon: Option<String>,
}

/// Request payload for replacing a document hash
#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UpdateHashRequest {
    new_hash_doc: Option<String>,
}

/// Summary returned after issuance
#[derive(Serialize, Deserialize)]
struct CreatedCertificate {
    id: String,
    estado: CertStatus,
}

/// Success envelope shared by every endpoint
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    certificate_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    student: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    timestamp: String,
}

impl<T: Serialize> ApiResponse<T> {
    fn with_data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            certificate_id: None,
            student: None,
            count: None,
            timestamp: now(),
        }
    }

    fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    fn certificate_id(mut self, id: &str) -> Self {
        self.certificate_id = Some(id.to_string());
        self
    }
}

impl ApiResponse<()> {
    fn empty() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
            certificate_id: None,
            student: None,
            count: None,
            timestamp: now(),
        }
    }
}

/// Error envelope
#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
    timestamp: String,
}

/// An error on its way out of the gateway.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_REQUEST",
            message: message.to_string(),
        }
    }
}

/// HTTP status for a contract error kind.
fn status_for(err: &ContractError) -> StatusCode {
    match err {
        ContractError::NotFound(_) => StatusCode::NOT_FOUND,
        ContractError::AlreadyExists(_) | ContractError::InvalidStateForOperation { .. } => {
            StatusCode::CONFLICT
        }
        ContractError::InvalidData(_)
        | ContractError::InvalidDateFormat(_)
        | ContractError::InvalidHashFormat
        | ContractError::UnknownFunction(_)
        | ContractError::InvalidArguments { .. } => StatusCode::BAD_REQUEST,
        ContractError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        ContractError::Ledger(LedgerError::MvccReadConflict { .. }) => StatusCode::CONFLICT,
        ContractError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ContractError> for ApiError {
    fn from(err: ContractError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            error!("ledger failure: {}", err);
        }
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "CERT_003",
            message: format!("invalid request body: {}", rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.message,
            code: self.code.to_string(),
            timestamp: now(),
        };
        (self.status, Json(body)).into_response()
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// API server state containing the gateway service
pub struct ApiServer<N: LedgerNetwork> {
    /// Service running contract operations on the ledger
    service: CertificateService<N>,

    /// Allowed CORS origin, `*` for any
    cors_origin: String,
}

impl<N: LedgerNetwork + 'static> ApiServer<N> {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `service` - Gateway service for contract operations
    /// * `cors_origin` - Allowed CORS origin
    pub fn new(service: CertificateService<N>, cors_origin: impl Into<String>) -> Self {
        ApiServer {
            service,
            cors_origin: cors_origin.into(),
        }
    }

    /// Builds the router with every endpoint, CORS and request logging.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/health", get(Self::health_handler))
            .route("/api/certificates", post(Self::create_certificate_handler))
            .route("/api/certificates/:id", get(Self::get_certificate_handler))
            .route("/api/certificates/:id/verify", post(Self::verify_certificate_handler))
            .route("/api/certificates/:id/revoke", post(Self::revoke_certificate_handler))
            .route("/api/certificates/:id/hash", put(Self::update_hash_handler))
            // `/student/:alumno` wins over `/:id/history` for an id literally
            // named `student`; that certificate's history is reachable only
            // through the contract.
            .route("/api/certificates/:id/history", get(Self::history_handler))
            .route("/api/certificates/student/:alumno", get(Self::query_by_student_handler))
            .fallback(Self::not_found_handler)
            .layer(middleware::from_fn(log_request))
            .layer(cors_layer(&self.cors_origin))
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3001")
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API running on http://{}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
    }

    // =====================
    // Handlers
    // =====================

    /// GET /api/health
    async fn health_handler() -> Json<ApiResponse<()>> {
        Json(ApiResponse::empty().message("API is running"))
    }

    /// Issues a new certificate
    ///
    /// # Endpoint
    /// POST /api/certificates
    ///
    /// # Responses
    /// - 201 Created: `{id, estado: "VIGENTE"}`
    /// - 400 Bad Request: Invalid fields, date or hash
    /// - 403 Forbidden: Gateway identity is not the registrar
    /// - 409 Conflict: Id already in use
    async fn create_certificate_handler(
        State(state): State<Arc<ApiServer<N>>>,
        payload: Result<Json<CertificateRequest>, JsonRejection>,
    ) -> Result<(StatusCode, Json<ApiResponse<CreatedCertificate>>), ApiError> {
        let Json(payload) = payload?;
        info!("creating certificate {}", payload.id);

        let id = payload.id.clone();
        state.service.create_certificate(payload.into())?;

        let created = CreatedCertificate {
            id,
            estado: CertStatus::Vigente,
        };
        Ok((
            StatusCode::CREATED,
            Json(ApiResponse::with_data(created).message("Certificate created successfully")),
        ))
    }

    /// GET /api/certificates/:id
    async fn get_certificate_handler(
        State(state): State<Arc<ApiServer<N>>>,
        Path(id): Path<String>,
    ) -> Result<Json<ApiResponse<Certificate>>, ApiError> {
        let certificate = state.service.get_certificate(&id)?;
        Ok(Json(ApiResponse::with_data(certificate)))
    }

    /// Verifies a document hash against the stored certificate
    ///
    /// # Endpoint
    /// POST /api/certificates/:id/verify
    ///
    /// # Request Body
    /// `{hashDoc}`; the gateway requires it even though the contract accepts
    /// an empty hash
    async fn verify_certificate_handler(
        State(state): State<Arc<ApiServer<N>>>,
        Path(id): Path<String>,
        payload: Result<Json<VerifyCertificateRequest>, JsonRejection>,
    ) -> Result<Json<ApiResponse<VerificationResult>>, ApiError> {
        let Json(payload) = payload?;
        let hash_doc = match payload.hash_doc.filter(|h| !h.is_empty()) {
            Some(hash) => hash,
            None => return Err(ApiError::bad_request("hashDoc is required")),
        };

        let verification = state.service.verify_certificate(&id, Some(&hash_doc))?;
        Ok(Json(ApiResponse::with_data(verification)))
    }

    /// Revokes a certificate
    ///
    /// # Endpoint
    /// POST /api/certificates/:id/revoke
    ///
    /// # Request Body
    /// Optional `{razon}`. An empty body revokes with the default reason; a
    /// body that is present but not a valid request is rejected with 400
    /// before anything is written.
    async fn revoke_certificate_handler(
        State(state): State<Arc<ApiServer<N>>>,
        Path(id): Path<String>,
        body: Bytes,
    ) -> Result<Json<ApiResponse<()>>, ApiError> {
        let reason = parse_revoke_body(&body)?.razon;
        info!("revoking certificate {} (reason: {:?})", id, reason);

        state.service.revoke_certificate(&id, reason.as_deref())?;
        Ok(Json(
            ApiResponse::empty()
                .message("Certificate revoked successfully")
                .certificate_id(&id),
        ))
    }

    /// PUT /api/certificates/:id/hash with `{newHashDoc}`
    async fn update_hash_handler(
        State(state): State<Arc<ApiServer<N>>>,
        Path(id): Path<String>,
        payload: Result<Json<UpdateHashRequest>, JsonRejection>,
    ) -> Result<Json<ApiResponse<()>>, ApiError> {
        let Json(payload) = payload?;
        let new_hash = match payload.new_hash_doc.filter(|h| !h.is_empty()) {
            Some(hash) => hash,
            None => return Err(ApiError::bad_request("newHashDoc is required")),
        };

        state.service.update_certificate_hash(&id, &new_hash)?;
        Ok(Json(
            ApiResponse::empty()
                .message("Certificate hash updated successfully")
                .certificate_id(&id),
        ))
    }

    /// GET /api/certificates/:id/history
    async fn history_handler(
        State(state): State<Arc<ApiServer<N>>>,
        Path(id): Path<String>,
    ) -> Result<Json<ApiResponse<Vec<HistoryEntry>>>, ApiError> {
        let history = state.service.get_certificate_history(&id)?;
        Ok(Json(ApiResponse::with_data(history).certificate_id(&id)))
    }

    /// GET /api/certificates/student/:alumno
    async fn query_by_student_handler(
        State(state): State<Arc<ApiServer<N>>>,
        Path(alumno): Path<String>,
    ) -> Result<Json<ApiResponse<Vec<Certificate>>>, ApiError> {
        let certificates = state.service.query_by_student(&alumno)?;
        let mut response = ApiResponse::with_data(certificates);
        response.count = response.data.as_ref().map(Vec::len);
        response.student = Some(alumno);
        Ok(Json(response))
    }

    async fn not_found_handler(uri: Uri) -> ApiError {
        ApiError {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND",
            message: format!("Not found - {}", uri),
        }
    }
}

impl<N: LedgerNetwork> Clone for ApiServer<N> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            cors_origin: self.cors_origin.clone(),
        }
    }
}

fn parse_revoke_body(body: &[u8]) -> Result<RevokeCertificateRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RevokeCertificateRequest::default());
    }
    serde_json::from_slice(body).map_err(|err| ApiError {
        status: StatusCode::BAD_REQUEST,
        code: "CERT_003",
        message: format!("invalid request body: {}", err),
    })
}

async fn log_request(request: Request, next: Next) -> Response {
    info!("{} {}", request.method(), request.uri().path());
    next.run(request).await
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match origin.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin '{}'", origin);
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE])
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, draining connections");
}
