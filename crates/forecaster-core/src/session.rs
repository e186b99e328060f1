//! Session store: the single active workspace and its validated transitions
//!
//! A [`SessionStore`] owns exactly one [`Workspace`]. All writes go through the
//! store, each one validated before anything is replaced, so a rejected write
//! leaves the workspace exactly as it was. Readers get a borrowed view or an
//! owned snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{Result, ValidationError};
use crate::forecast::{ForecastEngine, ForecastResult};
use crate::models::{
    Attachment, Capacity, ExternalFactors, HistoricalTrends, MarketData, SectionData, SectionId,
    SectionSnapshot,
};
use crate::report::ReportDocument;
use crate::schema::{self, FieldMap};

/// Maximum accepted size of an enrollment history upload (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Extensions accepted for enrollment history uploads
pub const HISTORY_EXTENSIONS: &[&str] = &["csv", "xlsx"];

/// Full in-memory state for one organization's session
///
/// All four sections always exist; they start empty and are replaced
/// wholesale on submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Workspace {
    organization_name: String,
    historical_trends: HistoricalTrends,
    market_data: MarketData,
    capacity: Capacity,
    external_factors: ExternalFactors,
    history_upload: Option<Attachment>,
}

impl Workspace {
    /// An empty workspace: no organization, four empty sections
    pub fn new() -> Self {
        Self::default()
    }

    /// Organization name, empty until set
    pub fn organization_name(&self) -> &str {
        &self.organization_name
    }

    pub fn has_organization(&self) -> bool {
        !self.organization_name.is_empty()
    }

    pub fn historical_trends(&self) -> &HistoricalTrends {
        &self.historical_trends
    }

    pub fn market_data(&self) -> &MarketData {
        &self.market_data
    }

    pub fn capacity(&self) -> &Capacity {
        &self.capacity
    }

    pub fn external_factors(&self) -> &ExternalFactors {
        &self.external_factors
    }

    pub fn history_upload(&self) -> Option<&Attachment> {
        self.history_upload.as_ref()
    }

    /// Owned copy of one section's record
    pub fn section(&self, id: SectionId) -> SectionData {
        match id {
            SectionId::A => SectionData::HistoricalTrends(self.historical_trends.clone()),
            SectionId::B => SectionData::MarketData(self.market_data.clone()),
            SectionId::C => SectionData::Capacity(self.capacity.clone()),
            SectionId::D => SectionData::ExternalFactors(self.external_factors.clone()),
        }
    }

    /// All four sections in order A, B, C, D
    pub fn sections(&self) -> Vec<SectionSnapshot> {
        SectionId::ALL
            .iter()
            .map(|id| SectionSnapshot::of(&self.section(*id)))
            .collect()
    }

    fn replace(&mut self, data: SectionData) {
        match data {
            SectionData::HistoricalTrends(a) => self.historical_trends = a,
            SectionData::MarketData(b) => self.market_data = b,
            SectionData::Capacity(c) => self.capacity = c,
            SectionData::ExternalFactors(d) => self.external_factors = d,
        }
    }
}

/// Owner of one active workspace
///
/// One store per user session; stores are never shared between sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    workspace: Workspace,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the session with a fresh, empty workspace
    pub fn initialize(&mut self) -> Workspace {
        self.workspace = Workspace::new();
        debug!("Workspace initialized");
        self.snapshot()
    }

    /// Discard all state, including the organization name
    pub fn reset(&mut self) -> Workspace {
        let had_organization = self.workspace.has_organization();
        self.workspace = Workspace::new();
        info!(had_organization, "Workspace reset");
        self.snapshot()
    }

    /// Borrowed read-only view of the current workspace
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Owned copy of the current workspace
    pub fn snapshot(&self) -> Workspace {
        self.workspace.clone()
    }

    /// Set the organization identity, once per session
    pub fn set_organization_name(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyOrganizationName.into());
        }
        if self.workspace.has_organization() {
            return Err(ValidationError::OrganizationAlreadySet(
                self.workspace.organization_name.clone(),
            )
            .into());
        }

        self.workspace.organization_name = name.to_string();
        info!(organization = %name, "Organization set");
        Ok(())
    }

    /// Replace one section from raw submitted values
    pub fn submit_section(&mut self, id: SectionId, values: &FieldMap) -> Result<()> {
        let data = schema::parse_section(id, values)?;
        self.submit(data)
    }

    /// Replace one section from a typed record
    ///
    /// The whole record is replaced, fields left unset in `data` are cleared.
    pub fn submit(&mut self, data: impl Into<SectionData>) -> Result<()> {
        let data = data.into();
        data.validate()?;

        let id = data.id();
        let field_count = data.entries().len();
        self.workspace.replace(data);
        debug!(section = %id, fields = field_count, "Section submitted");
        Ok(())
    }

    /// Record an enrollment history file for Section A
    ///
    /// Only the name, size and SHA-256 of the content are kept.
    pub fn attach_history(&mut self, file_name: &str, content: &[u8]) -> Result<Attachment> {
        let file_name = file_name.trim();
        let extension = std::path::Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());
        let supported = extension
            .as_deref()
            .map(|ext| HISTORY_EXTENSIONS.contains(&ext))
            .unwrap_or(false);
        if !supported {
            return Err(ValidationError::UnsupportedUpload(file_name.to_string()).into());
        }
        if content.is_empty() {
            return Err(ValidationError::EmptyUpload(file_name.to_string()).into());
        }
        if content.len() > MAX_UPLOAD_SIZE {
            return Err(ValidationError::UploadTooLarge {
                name: file_name.to_string(),
                size: content.len(),
                max: MAX_UPLOAD_SIZE,
            }
            .into());
        }

        let mut hasher = Sha256::new();
        hasher.update(content);
        let attachment = Attachment {
            file_name: file_name.to_string(),
            size_bytes: content.len() as u64,
            sha256: hex::encode(hasher.finalize()),
        };

        info!(
            file = %attachment.file_name,
            size = attachment.size_bytes,
            "History file attached"
        );
        self.workspace.history_upload = Some(attachment.clone());
        Ok(attachment)
    }

    /// Score the current workspace and build its report document
    ///
    /// The organization must be named before a forecast can be run.
    pub fn compute_forecast(&self) -> Result<(ForecastResult, ReportDocument)> {
        self.compute_forecast_at(Utc::now())
    }

    /// Same as [`compute_forecast`](Self::compute_forecast) with an explicit
    /// generation time
    pub fn compute_forecast_at(
        &self,
        generated_at: DateTime<Utc>,
    ) -> Result<(ForecastResult, ReportDocument)> {
        if !self.workspace.has_organization() {
            return Err(ValidationError::EmptyOrganizationName.into());
        }
        let result = ForecastEngine::compute(&self.workspace)?;
        let report = ReportDocument::build(&self.workspace, &result, generated_at);
        Ok((result, report))
    }
}
