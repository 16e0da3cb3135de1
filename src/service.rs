use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{error, info};

use crate::{
    config::HandoverConfig,
    helpers::{pdf, xlsx},
    models::handover::{
        ChecklistFlags, ComponentRecord, ComponentRegister, DocumentationChecklist, Project,
    },
};

pub const FALLBACK_FILE_STEM: &str = "projekt";
pub const SPREADSHEET_SUFFIX: &str = "Komponentenregister";
pub const REPORT_SUFFIX: &str = "Uebergabe-Komponentenregister";

/// Current form values sent along with an export.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ExportRequest {
    pub project: Project,
    pub checklist: ChecklistFlags,
}

/// A finished export, ready to be offered for download.
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Download {
    /// `Content-Disposition` with an ASCII `filename` fallback and the exact
    /// UTF-8 name in `filename*`.
    pub fn content_disposition(&self) -> String {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii_file_name(&self.file_name),
            urlencoding::encode(&self.file_name)
        )
    }
}

impl IntoResponse for Download {
    fn into_response(self) -> Response {
        let disposition = self.content_disposition();
        (
            [
                (header::CONTENT_TYPE, self.content_type.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.bytes,
        )
            .into_response()
    }
}

#[derive(Debug)]
pub enum ServiceError {
    RowNotFound(usize),
    SessionUnavailable,
    Export(anyhow::Error),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::RowNotFound(index) => write!(f, "No component row at index {}", index),
            ServiceError::SessionUnavailable => f.write_str("Session state is unavailable"),
            ServiceError::Export(e) => write!(f, "Export failed: {:#}", e),
        }
    }
}

impl std::error::Error for ServiceError {}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            ServiceError::RowNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::SessionUnavailable | ServiceError::Export(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

/// `<project number or "projekt">_<suffix>.<extension>`. Path separators,
/// quotes and control characters become `_`.
pub fn download_file_name(project_number: &str, suffix: &str, extension: &str) -> String {
    let stem: String = project_number
        .trim()
        .chars()
        .map(|ch| match ch {
            '"' | '\\' | '/' => '_',
            _ if ch.is_control() => '_',
            _ => ch,
        })
        .collect();
    let stem = if stem.is_empty() {
        FALLBACK_FILE_STEM
    } else {
        stem.as_str()
    };
    format!("{}_{}.{}", stem, suffix, extension)
}

/// The file name restricted to characters allowed in a quoted header value.
pub fn ascii_file_name(file_name: &str) -> String {
    file_name
        .chars()
        .map(|ch| if ch == ' ' || ch.is_ascii_graphic() { ch } else { '_' })
        .collect()
}

/// One interactive session: owns the component register and turns its
/// current contents into downloads.
pub struct HandoverService {
    pub config: HandoverConfig,
    register: Mutex<ComponentRegister>,
}

impl HandoverService {
    pub fn new(config: HandoverConfig) -> Self {
        Self::with_register(config, ComponentRegister::default())
    }

    pub fn with_register(config: HandoverConfig, register: ComponentRegister) -> Self {
        info!(
            "Creating new HandoverService with {} component row(s)",
            register.len()
        );
        Self {
            config,
            register: Mutex::new(register),
        }
    }

    /// Create an Axum router for the handover service
    pub fn router(self) -> Router {
        info!("Creating handover service router");
        let shared_state = Arc::new(self);

        Router::new()
            .route(
                "/components",
                get(list_components)
                    .put(replace_components)
                    .post(add_component),
            )
            .route("/components/{index}", delete(remove_component))
            .route("/legal-references", get(legal_references))
            .route("/export/pdf", post(export_pdf))
            .route("/export/xlsx", post(export_xlsx))
            .with_state(shared_state)
    }

    fn register(&self) -> Result<MutexGuard<'_, ComponentRegister>, ServiceError> {
        self.register.lock().map_err(|_| {
            error!("Component register lock is poisoned");
            ServiceError::SessionUnavailable
        })
    }

    pub fn components(&self) -> Result<Vec<ComponentRecord>, ServiceError> {
        Ok(self.register()?.snapshot())
    }

    pub fn add_component(&self, record: ComponentRecord) -> Result<Vec<ComponentRecord>, ServiceError> {
        let mut register = self.register()?;
        register.push(record);
        info!("Added component row, register now has {} row(s)", register.len());
        Ok(register.snapshot())
    }

    pub fn remove_component(&self, index: usize) -> Result<Vec<ComponentRecord>, ServiceError> {
        let mut register = self.register()?;
        if register.remove(index).is_none() {
            info!("No component row at index {} to remove", index);
            return Err(ServiceError::RowNotFound(index));
        }
        info!("Removed component row {}, {} row(s) left", index, register.len());
        Ok(register.snapshot())
    }

    pub fn replace_components(
        &self,
        rows: Vec<ComponentRecord>,
    ) -> Result<Vec<ComponentRecord>, ServiceError> {
        let mut register = self.register()?;
        register.replace(rows);
        info!("Replaced component register with {} row(s)", register.len());
        Ok(register.snapshot())
    }

    /// Render the handover report from the current register snapshot
    pub fn export_pdf(&self, request: &ExportRequest) -> Result<Download, ServiceError> {
        let components = self.components()?;
        let checklist = DocumentationChecklist::from(request.checklist);
        info!(
            "Exporting handover report for project '{}' with {} component(s)",
            request.project.project_number,
            components.len()
        );

        let bytes = pdf::render_report(
            &request.project,
            &checklist,
            &components,
            &self.config.legal_references,
            &self.config.page,
            Local::now().date_naive(),
        )
        .map_err(|e| {
            error!("Failed to create handover report: {:#}", e);
            ServiceError::Export(e)
        })?;

        Ok(Download {
            file_name: download_file_name(&request.project.project_number, REPORT_SUFFIX, "pdf"),
            content_type: pdf::MIME_TYPE,
            bytes,
        })
    }

    /// Write the project sheet and component register workbook
    pub fn export_xlsx(&self, request: &ExportRequest) -> Result<Download, ServiceError> {
        let components = self.components()?;
        info!(
            "Exporting component register for project '{}' with {} component(s)",
            request.project.project_number,
            components.len()
        );

        let bytes = xlsx::export_spreadsheet(&request.project, &components).map_err(|e| {
            error!("Failed to create component register workbook: {:#}", e);
            ServiceError::Export(e)
        })?;

        Ok(Download {
            file_name: download_file_name(
                &request.project.project_number,
                SPREADSHEET_SUFFIX,
                "xlsx",
            ),
            content_type: xlsx::MIME_TYPE,
            bytes,
        })
    }
}

/// The full application: the handover API under `/api/handover` plus a
/// health check.
pub fn app(service: HandoverService) -> Router {
    Router::new()
        .nest("/api/handover", service.router())
        .route("/health", get(|| async { "OK" }))
}

// Route handlers
async fn list_components(
    State(service): State<Arc<HandoverService>>,
) -> Result<Json<Vec<ComponentRecord>>, ServiceError> {
    service.components().map(Json)
}

async fn replace_components(
    State(service): State<Arc<HandoverService>>,
    Json(rows): Json<Vec<ComponentRecord>>,
) -> Result<Json<Vec<ComponentRecord>>, ServiceError> {
    service.replace_components(rows).map(Json)
}

async fn add_component(
    State(service): State<Arc<HandoverService>>,
    Json(record): Json<ComponentRecord>,
) -> Result<Json<Vec<ComponentRecord>>, ServiceError> {
    service.add_component(record).map(Json)
}

async fn remove_component(
    State(service): State<Arc<HandoverService>>,
    Path(index): Path<usize>,
) -> Result<Json<Vec<ComponentRecord>>, ServiceError> {
    service.remove_component(index).map(Json)
}

async fn legal_references(State(service): State<Arc<HandoverService>>) -> Json<Vec<String>> {
    Json(service.config.legal_references.clone())
}

async fn export_pdf(
    State(service): State<Arc<HandoverService>>,
    Json(request): Json<ExportRequest>,
) -> Result<Download, ServiceError> {
    info!("Received report export request");
    service.export_pdf(&request)
}

async fn export_xlsx(
    State(service): State<Arc<HandoverService>>,
    Json(request): Json<ExportRequest>,
) -> Result<Download, ServiceError> {
    info!("Received spreadsheet export request");
    service.export_xlsx(&request)
}
