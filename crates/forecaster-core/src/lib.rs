//! Forecaster Core Library
//!
//! Shared functionality for the enrollment and growth forecaster:
//! - Session store holding one organization's workspace
//! - Field schema and validation for the four input sections
//! - Deterministic growth score computation
//! - Report documents rendered to PDF or JSON

pub mod error;
pub mod forecast;
pub mod models;
pub mod report;
pub mod schema;
pub mod session;

pub use error::{Error, RenderError, Result, ValidationError};
pub use forecast::{Classification, ForecastEngine, ForecastResult, ScoreBreakdown, MAX_SCORE};
pub use models::{
    Attachment, Capacity, EconomicStatus, ExternalFactors, FieldEntry, FieldValue,
    HistoricalTrends, InquirySource, LocalGrowth, MarketData, SectionData, SectionId,
    SectionSnapshot,
};
pub use report::{render_report, ReportDocument, ReportFormat, ReportRenderer, REPORT_TITLE};
pub use schema::{FieldKind, FieldMap, FieldSpec, SCHEMA};
pub use session::{SessionStore, Workspace, HISTORY_EXTENSIONS, MAX_UPLOAD_SIZE};
