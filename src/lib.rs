//! PV Handover & Component Register Library
//!
//! This library keeps the component register of a solar-installation
//! handover, computes warranty end dates, and exports the handover data as a
//! PDF report and an XLSX workbook.

pub mod config;
pub mod helpers;
pub mod models;
pub mod service;

pub use config::{HandoverConfig, PageSetup};
pub use service::{app, Download, ExportRequest, HandoverService};

// Re-export key types for convenience
pub use helpers::pdf::export_report;
pub use helpers::warranty::compute_warranty_end;
pub use helpers::xlsx::export_spreadsheet;
pub use models::handover::{
    ChecklistEntry, ChecklistFlags, ComponentRecord, ComponentRegister, DocumentationChecklist,
    Project,
};
