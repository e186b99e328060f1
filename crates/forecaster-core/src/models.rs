//! Domain models for the forecaster

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::schema::{self, fields};

/// One of the four fixed input sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SectionId {
    A,
    B,
    C,
    D,
}

impl SectionId {
    /// All sections in report order
    pub const ALL: [SectionId; 4] = [Self::A, Self::B, Self::C, Self::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }

    /// Display name used in reports ("Section A")
    pub fn name(&self) -> &'static str {
        match self {
            Self::A => "Section A",
            Self::B => "Section B",
            Self::C => "Section C",
            Self::D => "Section D",
        }
    }

    /// Thematic title of the section
    pub fn title(&self) -> &'static str {
        match self {
            Self::A => "Historical Trends",
            Self::B => "Market Data",
            Self::C => "Capacity",
            Self::D => "External Factors",
        }
    }
}

impl std::str::FromStr for SectionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let letter = normalized
            .strip_prefix("section")
            .map(|rest| rest.trim_start_matches([' ', '_', '-']))
            .unwrap_or(normalized.as_str());
        match letter {
            "a" => Ok(Self::A),
            "b" => Ok(Self::B),
            "c" => Ok(Self::C),
            "d" => Ok(Self::D),
            _ => Err(ValidationError::UnknownSection(s.to_string())),
        }
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where most new inquiries come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InquirySource {
    #[serde(rename = "Social Media")]
    SocialMedia,
    #[serde(rename = "Word of Mouth")]
    WordOfMouth,
    Signboards,
    Other,
}

impl InquirySource {
    pub const LABELS: &'static [&'static str] =
        &["Social Media", "Word of Mouth", "Signboards", "Other"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SocialMedia => "Social Media",
            Self::WordOfMouth => "Word of Mouth",
            Self::Signboards => "Signboards",
            Self::Other => "Other",
        }
    }
}

impl std::str::FromStr for InquirySource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Social Media" => Ok(Self::SocialMedia),
            "Word of Mouth" => Ok(Self::WordOfMouth),
            "Signboards" => Ok(Self::Signboards),
            "Other" => Ok(Self::Other),
            _ => Err(format!("Unknown inquiry source: {}", s)),
        }
    }
}

impl std::fmt::Display for InquirySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Economic status of the catchment area, ordered from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EconomicStatus {
    Developing,
    Stable,
    Affluent,
}

impl EconomicStatus {
    pub const LABELS: &'static [&'static str] = &["Developing", "Stable", "Affluent"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Developing => "Developing",
            Self::Stable => "Stable",
            Self::Affluent => "Affluent",
        }
    }
}

impl std::str::FromStr for EconomicStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Developing" => Ok(Self::Developing),
            "Stable" => Ok(Self::Stable),
            "Affluent" => Ok(Self::Affluent),
            _ => Err(format!("Unknown economic status: {}", s)),
        }
    }
}

impl std::fmt::Display for EconomicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Local population growth trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalGrowth {
    Declining,
    Stable,
    #[serde(rename = "Rapidly Increasing")]
    RapidlyIncreasing,
}

impl LocalGrowth {
    pub const LABELS: &'static [&'static str] = &["Declining", "Stable", "Rapidly Increasing"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Declining => "Declining",
            Self::Stable => "Stable",
            Self::RapidlyIncreasing => "Rapidly Increasing",
        }
    }
}

impl std::str::FromStr for LocalGrowth {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Declining" => Ok(Self::Declining),
            "Stable" => Ok(Self::Stable),
            "Rapidly Increasing" => Ok(Self::RapidlyIncreasing),
            _ => Err(format!("Unknown local growth: {}", s)),
        }
    }
}

impl std::fmt::Display for LocalGrowth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A field value as supplied by a front-end: a whole number or a choice label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A named field value, in schema order when listed for a section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub name: String,
    pub value: FieldValue,
}

impl FieldEntry {
    fn new(name: &'static str, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Section A: historical admissions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalTrends {
    /// Total admissions over the last five years
    pub total_admissions: Option<u32>,
    /// Transfer certificates issued (collected, not scored)
    pub withdrawals: Option<u32>,
}

/// Section B: market and inquiry data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketData {
    pub new_inquiries: Option<u32>,
    pub primary_source: Option<InquirySource>,
    /// Percentage of inquiries converted to admissions (0-100)
    pub conversion_rate: Option<u32>,
}

/// Section C: capacity and retention
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    /// Total classroom seats
    pub max_capacity: Option<u32>,
    /// Percentage of students promoted to the next grade (0-100)
    pub promotion_rate: Option<u32>,
    /// Families with more than one enrolled child
    pub sibling_families: Option<u32>,
}

/// Section D: external factors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFactors {
    pub competitor_schools: Option<u32>,
    pub economic_status: Option<EconomicStatus>,
    pub local_growth: Option<LocalGrowth>,
}

/// Typed contents of one section, tagged by which section it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "section", content = "fields")]
pub enum SectionData {
    #[serde(rename = "A")]
    HistoricalTrends(HistoricalTrends),
    #[serde(rename = "B")]
    MarketData(MarketData),
    #[serde(rename = "C")]
    Capacity(Capacity),
    #[serde(rename = "D")]
    ExternalFactors(ExternalFactors),
}

impl SectionData {
    /// An empty record for the given section
    pub fn empty(id: SectionId) -> Self {
        match id {
            SectionId::A => Self::HistoricalTrends(HistoricalTrends::default()),
            SectionId::B => Self::MarketData(MarketData::default()),
            SectionId::C => Self::Capacity(Capacity::default()),
            SectionId::D => Self::ExternalFactors(ExternalFactors::default()),
        }
    }

    /// The values the intake form starts with
    pub fn defaults(id: SectionId) -> Self {
        match id {
            SectionId::A => Self::HistoricalTrends(HistoricalTrends {
                total_admissions: Some(500),
                withdrawals: Some(20),
            }),
            SectionId::B => Self::MarketData(MarketData {
                new_inquiries: Some(150),
                primary_source: Some(InquirySource::SocialMedia),
                conversion_rate: Some(30),
            }),
            SectionId::C => Self::Capacity(Capacity {
                max_capacity: Some(1000),
                promotion_rate: Some(95),
                sibling_families: Some(50),
            }),
            SectionId::D => Self::ExternalFactors(ExternalFactors {
                competitor_schools: Some(2),
                economic_status: Some(EconomicStatus::Developing),
                local_growth: Some(LocalGrowth::Declining),
            }),
        }
    }

    pub fn id(&self) -> SectionId {
        match self {
            Self::HistoricalTrends(_) => SectionId::A,
            Self::MarketData(_) => SectionId::B,
            Self::Capacity(_) => SectionId::C,
            Self::ExternalFactors(_) => SectionId::D,
        }
    }

    /// Check every numeric field against its schema bounds
    ///
    /// Choice fields are typed and cannot hold an invalid value.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let id = self.id();
        let numbers: Vec<(&'static str, Option<u32>)> = match self {
            Self::HistoricalTrends(a) => vec![
                (fields::TOTAL_ADMISSIONS, a.total_admissions),
                (fields::WITHDRAWALS, a.withdrawals),
            ],
            Self::MarketData(b) => vec![
                (fields::NEW_INQUIRIES, b.new_inquiries),
                (fields::CONVERSION_RATE, b.conversion_rate),
            ],
            Self::Capacity(c) => vec![
                (fields::MAX_CAPACITY, c.max_capacity),
                (fields::PROMOTION_RATE, c.promotion_rate),
                (fields::SIBLING_FAMILIES, c.sibling_families),
            ],
            Self::ExternalFactors(d) => vec![(fields::COMPETITOR_SCHOOLS, d.competitor_schools)],
        };

        for (name, value) in numbers {
            if let Some(value) = value {
                schema::check_range(id, name, i64::from(value))?;
            }
        }
        Ok(())
    }

    /// Set fields in schema order; unset fields are left out
    pub fn entries(&self) -> Vec<FieldEntry> {
        let mut entries = Vec::new();
        match self {
            Self::HistoricalTrends(a) => {
                push(&mut entries, fields::TOTAL_ADMISSIONS, a.total_admissions);
                push(&mut entries, fields::WITHDRAWALS, a.withdrawals);
            }
            Self::MarketData(b) => {
                push(&mut entries, fields::NEW_INQUIRIES, b.new_inquiries);
                push(
                    &mut entries,
                    fields::PRIMARY_SOURCE,
                    b.primary_source.map(|s| s.as_str()),
                );
                push(&mut entries, fields::CONVERSION_RATE, b.conversion_rate);
            }
            Self::Capacity(c) => {
                push(&mut entries, fields::MAX_CAPACITY, c.max_capacity);
                push(&mut entries, fields::PROMOTION_RATE, c.promotion_rate);
                push(&mut entries, fields::SIBLING_FAMILIES, c.sibling_families);
            }
            Self::ExternalFactors(d) => {
                push(&mut entries, fields::COMPETITOR_SCHOOLS, d.competitor_schools);
                push(
                    &mut entries,
                    fields::ECONOMIC_STATUS,
                    d.economic_status.map(|s| s.as_str()),
                );
                push(
                    &mut entries,
                    fields::LOCAL_GROWTH,
                    d.local_growth.map(|g| g.as_str()),
                );
            }
        }
        entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

fn push<V: Into<FieldValue>>(entries: &mut Vec<FieldEntry>, name: &'static str, value: Option<V>) {
    if let Some(value) = value {
        entries.push(FieldEntry::new(name, value));
    }
}

impl From<HistoricalTrends> for SectionData {
    fn from(value: HistoricalTrends) -> Self {
        Self::HistoricalTrends(value)
    }
}

impl From<MarketData> for SectionData {
    fn from(value: MarketData) -> Self {
        Self::MarketData(value)
    }
}

impl From<Capacity> for SectionData {
    fn from(value: Capacity) -> Self {
        Self::Capacity(value)
    }
}

impl From<ExternalFactors> for SectionData {
    fn from(value: ExternalFactors) -> Self {
        Self::ExternalFactors(value)
    }
}

/// A section as listed in snapshots and reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSnapshot {
    pub id: SectionId,
    pub name: String,
    pub title: String,
    pub fields: Vec<FieldEntry>,
}

impl SectionSnapshot {
    pub fn of(data: &SectionData) -> Self {
        let id = data.id();
        Self {
            id,
            name: id.name().to_string(),
            title: id.title().to_string(),
            fields: data.entries(),
        }
    }
}

/// Fingerprint of an uploaded enrollment history file
///
/// The file content itself is never kept or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the content
    pub sha256: String,
}
