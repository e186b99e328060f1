//! Report generation
//!
//! A [`ReportDocument`] is the frozen content of one forecast: organization,
//! score and every submitted field in schema order. [`ReportRenderer`] turns
//! it into downloadable bytes, either a paginated PDF or JSON.

mod pdf;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::forecast::{Classification, ForecastResult, MAX_SCORE};
use crate::models::SectionSnapshot;
use crate::session::Workspace;

use pdf::{encode_latin1, Align, DocumentInfo, Font, PdfWriter};

pub const REPORT_TITLE: &str = "Enrollment & Growth Forecast Report";

/// Content of a generated report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    organization_name: String,
    generated_at: DateTime<Utc>,
    score: u32,
    classification: Classification,
    headline: String,
    sections: Vec<SectionSnapshot>,
}

impl ReportDocument {
    /// Freeze a workspace and its forecast into report content
    pub fn build(
        workspace: &Workspace,
        result: &ForecastResult,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            organization_name: workspace.organization_name().to_string(),
            generated_at,
            score: result.score(),
            classification: result.classification(),
            headline: result.classification().headline().to_string(),
            sections: workspace.sections(),
        }
    }

    pub fn organization_name(&self) -> &str {
        &self.organization_name
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn sections(&self) -> &[SectionSnapshot] {
        &self.sections
    }

    /// Suggested download name, e.g. `Forecaster_Report_Greenfield_Academy.pdf`
    pub fn file_name(&self, format: ReportFormat) -> String {
        let org: String = self
            .organization_name
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("Forecaster_Report_{}.{}", org, format.extension())
    }

    fn date_line(&self) -> String {
        format!("Date: {}", self.generated_at.format("%B %d, %Y"))
    }

    fn score_line(&self) -> String {
        format!("Growth Forecast Score: {}/{}", self.score, MAX_SCORE)
    }
}

/// Output format of a rendered report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Pdf,
    Json,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Json => "json",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Json => "application/json",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown report format: {s} (expected pdf or json)")),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Line of encoded report text with its style
struct Line {
    font: Font,
    size: f64,
    height: f64,
    align: Align,
    text: Vec<u8>,
}

impl Line {
    fn new(font: Font, size: f64, height: f64, context: &str, text: &str) -> Result<Self> {
        Ok(Self {
            font,
            size,
            height,
            align: Align::Left,
            text: encode_latin1(context, text)?,
        })
    }
}

/// Renders report documents to bytes
#[derive(Debug, Clone, Copy)]
pub struct ReportRenderer {
    compress: bool,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self { compress: true }
    }
}

impl ReportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave PDF content streams uncompressed so the text stays readable
    pub fn uncompressed() -> Self {
        Self { compress: false }
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn render(&self, doc: &ReportDocument, format: ReportFormat) -> Result<Vec<u8>> {
        let bytes = match format {
            ReportFormat::Pdf => self.render_pdf(doc)?,
            ReportFormat::Json => serde_json::to_vec_pretty(doc)?,
        };

        info!(
            organization = %doc.organization_name,
            format = %format,
            bytes = bytes.len(),
            "Report rendered"
        );
        Ok(bytes)
    }

    fn render_pdf(&self, doc: &ReportDocument) -> Result<Vec<u8>> {
        // Encode everything up front so a bad character fails before layout
        let mut title = Line::new(Font::Bold, 16.0, 10.0, "Report title", REPORT_TITLE)?;
        title.align = Align::Center;

        let header = [
            Line::new(
                Font::Regular,
                12.0,
                10.0,
                "Organization name",
                &format!("Organization: {}", doc.organization_name),
            )?,
            Line::new(Font::Regular, 12.0, 10.0, "Report date", &doc.date_line())?,
            Line::new(Font::Regular, 12.0, 10.0, "Score", &doc.score_line())?,
        ];

        let mut blocks = Vec::with_capacity(doc.sections.len());
        for section in &doc.sections {
            let heading = Line::new(
                Font::Bold,
                12.0,
                10.0,
                section.name.as_str(),
                &format!("--- {}: {} ---", section.name, section.title),
            )?;
            let entries = section
                .fields
                .iter()
                .map(|entry| {
                    Line::new(
                        Font::Regular,
                        10.0,
                        8.0,
                        &entry.name,
                        &format!("{}: {}", entry.name, entry.value),
                    )
                })
                .collect::<Result<Vec<_>>>()?;
            blocks.push((heading, entries));
        }

        let mut writer = PdfWriter::new();
        let emit = |writer: &mut PdfWriter, line: &Line| {
            writer.set_font(line.font, line.size);
            writer.cell(line.height, &line.text, line.align);
        };

        emit(&mut writer, &title);
        writer.ln(10.0);
        for line in &header {
            emit(&mut writer, line);
        }
        writer.ln(5.0);
        writer.rule();
        writer.ln(5.0);

        for (heading, entries) in &blocks {
            emit(&mut writer, heading);
            for entry in entries {
                emit(&mut writer, entry);
            }
            writer.ln(4.0);
        }

        let info = DocumentInfo {
            title: title.text.clone(),
            created_at: doc.generated_at,
        };
        debug!(pages = writer.page_count(), "PDF laid out");
        Ok(writer.finish(&info, self.compress)?)
    }
}

/// Render with default settings
pub fn render_report(doc: &ReportDocument, format: ReportFormat) -> Result<Vec<u8>> {
    ReportRenderer::default().render(doc, format)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::ZlibDecoder;

    use super::*;
    use crate::error::{Error, RenderError};
    use crate::models::{
        Capacity, EconomicStatus, ExternalFactors, HistoricalTrends, InquirySource, LocalGrowth,
        MarketData, SectionId,
    };
    use crate::session::SessionStore;

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-05T14:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn store(org: &str) -> SessionStore {
        let mut store = SessionStore::new();
        store.set_organization_name(org).unwrap();
        store
            .submit(HistoricalTrends {
                total_admissions: Some(1000),
                withdrawals: Some(20),
            })
            .unwrap();
        store
            .submit(MarketData {
                new_inquiries: Some(150),
                primary_source: Some(InquirySource::WordOfMouth),
                conversion_rate: Some(50),
            })
            .unwrap();
        store
            .submit(Capacity {
                max_capacity: Some(1000),
                promotion_rate: Some(80),
                sibling_families: Some(50),
            })
            .unwrap();
        store
            .submit(ExternalFactors {
                competitor_schools: Some(2),
                economic_status: Some(EconomicStatus::Developing),
                local_growth: Some(LocalGrowth::RapidlyIncreasing),
            })
            .unwrap();
        store
    }

    fn document(org: &str) -> ReportDocument {
        let (_, doc) = store(org).compute_forecast_at(fixed_time()).unwrap();
        doc
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }

    #[test]
    fn test_document_contents() {
        let doc = document("Greenfield Academy");
        assert_eq!(doc.score(), 140);
        assert_eq!(doc.classification(), Classification::Stable);
        assert_eq!(doc.sections().len(), 4);
        assert_eq!(doc.sections()[0].id, SectionId::A);
        assert_eq!(doc.sections()[1].fields.len(), 3);
        assert_eq!(doc.date_line(), "Date: March 05, 2026");
        assert_eq!(doc.score_line(), "Growth Forecast Score: 140/200");
    }

    #[test]
    fn test_build_is_deterministic() {
        let store = store("Greenfield Academy");
        let (result, first) = store.compute_forecast_at(fixed_time()).unwrap();
        let second = ReportDocument::build(store.workspace(), &result, Utc::now());

        assert_eq!(first.sections(), second.sections());
        assert_eq!(first.score(), second.score());
        assert_eq!(first.organization_name(), second.organization_name());
        assert_eq!(first.generated_at(), fixed_time());
    }

    #[test]
    fn test_unsubmitted_fields_are_omitted() {
        let mut store = SessionStore::new();
        store.set_organization_name("Partial School").unwrap();
        store
            .submit(HistoricalTrends {
                total_admissions: Some(500),
                withdrawals: None,
            })
            .unwrap();
        store
            .submit(MarketData {
                conversion_rate: Some(30),
                ..Default::default()
            })
            .unwrap();
        store
            .submit(Capacity {
                promotion_rate: Some(95),
                ..Default::default()
            })
            .unwrap();
        store
            .submit(ExternalFactors {
                local_growth: Some(LocalGrowth::Declining),
                ..Default::default()
            })
            .unwrap();

        let (_, doc) = store.compute_forecast_at(fixed_time()).unwrap();
        for section in doc.sections() {
            assert_eq!(section.fields.len(), 1, "{}", section.name);
        }
    }

    #[test]
    fn test_render_pdf_uncompressed_text() {
        let doc = document("Greenfield Academy");
        let bytes = ReportRenderer::uncompressed()
            .render(&doc, ReportFormat::Pdf)
            .unwrap();

        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(contains(&bytes, "(Enrollment & Growth Forecast Report) Tj"));
        assert!(contains(&bytes, "(Organization: Greenfield Academy) Tj"));
        assert!(contains(&bytes, "(Date: March 05, 2026) Tj"));
        assert!(contains(&bytes, "(Growth Forecast Score: 140/200) Tj"));
        assert!(contains(&bytes, "(--- Section A: Historical Trends ---) Tj"));
        assert!(contains(&bytes, "(Total Admissions \\(5yr\\): 1000) Tj"));
        assert!(contains(&bytes, "(Primary Source: Word of Mouth) Tj"));
        assert!(contains(&bytes, "(Local Growth: Rapidly Increasing) Tj"));
        assert!(!contains(&bytes, "FlateDecode"));
    }

    #[test]
    fn test_render_pdf_compressed_stream_decodes() {
        let doc = document("Greenfield Academy");
        let bytes = ReportRenderer::default()
            .render(&doc, ReportFormat::Pdf)
            .unwrap();
        assert!(contains(&bytes, "/Filter /FlateDecode"));
        assert!(!contains(&bytes, "Growth Forecast Score"));

        let start = bytes
            .windows(7)
            .position(|w| w == b"stream\n")
            .unwrap()
            + 7;
        let end = bytes
            .windows(10)
            .position(|w| w == b"\nendstream")
            .unwrap();

        let mut decoded = String::new();
        ZlibDecoder::new(&bytes[start..end])
            .read_to_string(&mut decoded)
            .unwrap();
        assert!(decoded.contains("(Growth Forecast Score: 140/200) Tj"));
    }

    #[test]
    fn test_render_pdf_latin1_organization() {
        let doc = document("École Saint-Andrés");
        let bytes = ReportRenderer::uncompressed()
            .render(&doc, ReportFormat::Pdf)
            .unwrap();
        let needle: &[u8] = b"(Organization: \xC9cole Saint-Andr\xE9s) Tj";
        assert!(bytes.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn test_render_pdf_rejects_non_latin1() {
        let doc = document("北京国际学校");
        let err = ReportRenderer::default()
            .render(&doc, ReportFormat::Pdf)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Render(RenderError::UnencodableCharacter { ch: '北', .. })
        ));

        // JSON has no such restriction
        assert!(ReportRenderer::default()
            .render(&doc, ReportFormat::Json)
            .is_ok());
    }

    #[test]
    fn test_render_json() {
        let doc = document("Greenfield Academy");
        let bytes = render_report(&doc, ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["organization_name"], "Greenfield Academy");
        assert_eq!(value["score"], 140);
        assert_eq!(value["classification"], "stable");
        assert_eq!(value["headline"], "Moderate/Stable Growth");
        assert_eq!(value["sections"][2]["title"], "Capacity");

        let back: ReportDocument = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_file_name_and_format() {
        let doc = document("Greenfield Academy");
        assert_eq!(
            doc.file_name(ReportFormat::Pdf),
            "Forecaster_Report_Greenfield_Academy.pdf"
        );
        assert_eq!(
            document("A/B").file_name(ReportFormat::Json),
            "Forecaster_Report_A_B.json"
        );
        assert_eq!("PDF".parse::<ReportFormat>().unwrap(), ReportFormat::Pdf);
        assert!("docx".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::Json.mime_type(), "application/json");
    }
}
