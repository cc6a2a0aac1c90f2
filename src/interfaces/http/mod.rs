use crate::application::use_cases::risk_analysis::{RiskAnalysis, OUTPUT_FILENAME};
use crate::application::{RiskAnalysisUseCase, RiskNarrativeUseCase};
use crate::domain::compound::{find_compound, COMPOUNDS};
use crate::domain::error::AppError;
use crate::domain::risk::RiskSummary;
use crate::infrastructure::config::ServerConfig;
use crate::infrastructure::conversion::DocumentConverter;
use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::http::{header, StatusCode};
use actix_web::{dev::Server, get, post, web, App, HttpResponse, HttpServer, ResponseError};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

pub struct HttpState {
    pub analysis: Arc<RiskAnalysisUseCase>,
    pub narrative: RiskNarrativeUseCase,
    pub converter: Arc<dyn DocumentConverter + Send + Sync>,
    pub max_upload_bytes: usize,
}

/// Failures surfaced to HTTP clients
#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    MissingFile,
    TooLarge { limit: usize },
    Multipart(String),
    NotFound(String),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::App(err) => err.kind(),
            ApiError::MissingFile => "missing_file",
            ApiError::TooLarge { .. } => "payload_too_large",
            ApiError::Multipart(_) => "invalid_multipart",
            ApiError::NotFound(_) => "not_found",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // internal detail stays in the logs
            ApiError::App(AppError::Unexpected(_)) => write!(f, "Processing error"),
            ApiError::App(err) => write!(f, "{}", err),
            ApiError::MissingFile => write!(f, "Multipart field 'file' is required"),
            ApiError::TooLarge { limit } => {
                write!(f, "Uploaded file exceeds the limit of {} bytes", limit)
            }
            ApiError::Multipart(msg) => write!(f, "Invalid multipart payload: {}", msg),
            ApiError::NotFound(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::App(err)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::App(err) => match err {
                AppError::Format(_) | AppError::Detection { .. } | AppError::ValidationError(_) => {
                    StatusCode::BAD_REQUEST
                }
                AppError::Conversion { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                AppError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
                AppError::LLMError(_) | AppError::ConversionService(_) => StatusCode::BAD_GATEWAY,
                AppError::Unexpected(_) | AppError::IoError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::MissingFile | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            if let ApiError::App(err) = self {
                error!(kind = self.kind(), error = %err, "request failed");
            }
        }

        HttpResponse::build(status).json(json!({
            "status": status.as_u16(),
            "error": self.kind(),
            "detail": self.to_string(),
        }))
    }
}

#[derive(Debug)]
struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    prompt: Option<String>,
}

impl UploadForm {
    fn require_file(self) -> Result<(UploadedFile, Option<String>), ApiError> {
        match self.file {
            Some(file) => Ok((file, self.prompt)),
            None => Err(ApiError::MissingFile),
        }
    }
}

/// Drains the multipart stream, keeping the `file` and `prompt` fields.
/// `limit` caps the bytes read across all fields of the request.
async fn read_form(mut payload: Multipart, limit: usize) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    let mut received = 0usize;

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| ApiError::Multipart(e.to_string()))?;
        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(|f| f.to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::Multipart(e.to_string()))?;
            received += chunk.len();
            if received > limit {
                return Err(ApiError::TooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "file" => {
                form.file = Some(UploadedFile {
                    filename: filename.unwrap_or_else(|| "upload.csv".to_string()),
                    bytes,
                })
            }
            "prompt" => form.prompt = Some(String::from_utf8_lossy(&bytes).into_owned()),
            other => debug!(field = other, "ignoring multipart field"),
        }
    }

    Ok(form)
}

/// Runs the pipeline on the blocking pool; a panic there becomes `Unexpected`
async fn analyze_bytes(state: &HttpState, bytes: Vec<u8>) -> Result<RiskAnalysis, ApiError> {
    let use_case = state.analysis.clone();
    let outcome = web::block(move || use_case.execute(&bytes))
        .await
        .map_err(|e| AppError::Unexpected(format!("analysis task aborted: {}", e)))?;
    Ok(outcome.map_err(AppError::from)?)
}

fn csv_attachment(analysis: RiskAnalysis) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", OUTPUT_FILENAME),
        ))
        .insert_header(("X-Processing-Time-Ms", analysis.processing_time_ms.to_string()))
        .body(analysis.csv)
}

#[derive(Serialize)]
struct AnalyzeResponse {
    summary: RiskSummary,
    analysis: String,
    generated_at: DateTime<Utc>,
}

#[get("/")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "active", "version": "1.0" }))
}

#[post("/upload/")]
async fn upload(data: web::Data<HttpState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    async move {
        let (file, _) = read_form(payload, data.max_upload_bytes)
            .await?
            .require_file()?;
        info!(filename = %file.filename, bytes = file.bytes.len(), "upload received");

        let analysis = analyze_bytes(&data, file.bytes).await?;
        Ok::<_, ApiError>(csv_attachment(analysis))
    }
    .instrument(info_span!("upload", %request_id))
    .await
}

#[post("/convert/")]
async fn convert(data: web::Data<HttpState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    async move {
        let (file, _) = read_form(payload, data.max_upload_bytes)
            .await?
            .require_file()?;
        info!(filename = %file.filename, bytes = file.bytes.len(), "conversion requested");

        let csv = data
            .converter
            .convert(&file.filename, file.bytes, "csv")
            .await?;
        let analysis = analyze_bytes(&data, csv).await?;
        Ok::<_, ApiError>(csv_attachment(analysis))
    }
    .instrument(info_span!("convert", %request_id))
    .await
}

#[post("/analyze/")]
async fn analyze(data: web::Data<HttpState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    async move {
        let (file, prompt) = read_form(payload, data.max_upload_bytes)
            .await?
            .require_file()?;
        info!(filename = %file.filename, custom_prompt = prompt.is_some(), "analysis requested");

        let summary = analyze_bytes(&data, file.bytes).await?.summary();
        let analysis = data.narrative.execute(&summary, prompt).await?;
        Ok::<_, ApiError>(HttpResponse::Ok().json(AnalyzeResponse {
            summary,
            analysis,
            generated_at: Utc::now(),
        }))
    }
    .instrument(info_span!("analyze", %request_id))
    .await
}

#[get("/compounds")]
async fn list_compounds() -> HttpResponse {
    HttpResponse::Ok().json(&COMPOUNDS[..])
}

#[get("/compounds/{id}")]
async fn get_compound(path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    find_compound(&id)
        .map(|compound| HttpResponse::Ok().json(compound))
        .ok_or_else(|| ApiError::NotFound(format!("Unknown compound '{}'", id)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(upload)
        .service(convert)
        .service(analyze)
        .service(list_compounds)
        .service(get_compound);
}

fn cors(server: &ServerConfig) -> Cors {
    if server.allowed_origins.is_empty() {
        return Cors::permissive();
    }
    server
        .allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .expose_headers(vec![header::CONTENT_DISPOSITION])
}

pub fn start_server(config: &ServerConfig, state: HttpState) -> std::io::Result<Server> {
    let state = web::Data::new(state);
    let cors_config = config.clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(cors(&cors_config))
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    info!(host = %config.host, port = config.port, "http server listening");
    Ok(server)
}
