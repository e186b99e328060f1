//! Field schema for the four input sections
//!
//! Bounds and choice lists are enforced once, when a front-end submits a
//! section. Everything downstream (scoring, reports) relies on them holding.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ValidationError;
use crate::models::{
    Capacity, EconomicStatus, ExternalFactors, FieldValue, HistoricalTrends, InquirySource,
    LocalGrowth, MarketData, SectionData, SectionId,
};

/// Field names exactly as they appear in submissions and reports
pub mod fields {
    pub const TOTAL_ADMISSIONS: &str = "Total Admissions (5yr)";
    pub const WITHDRAWALS: &str = "Withdrawals";
    pub const NEW_INQUIRIES: &str = "New Inquiries";
    pub const PRIMARY_SOURCE: &str = "Primary Source";
    pub const CONVERSION_RATE: &str = "Conversion Rate";
    pub const MAX_CAPACITY: &str = "Max Capacity";
    pub const PROMOTION_RATE: &str = "Promotion Rate";
    pub const SIBLING_FAMILIES: &str = "Sibling Families";
    pub const COMPETITOR_SCHOOLS: &str = "Competitor Schools";
    pub const ECONOMIC_STATUS: &str = "Economic Status";
    pub const LOCAL_GROWTH: &str = "Local Growth";
}

/// Raw field values keyed by field name, as submitted by a front-end
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Value type and bounds of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Integer { min: i64, max: i64 },
    Percentage,
    Choice { options: &'static [&'static str] },
}

impl FieldKind {
    /// Inclusive numeric bounds, if the field is numeric
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match self {
            Self::Integer { min, max } => Some((*min, *max)),
            Self::Percentage => Some((0, 100)),
            Self::Choice { .. } => None,
        }
    }
}

/// Declaration of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub section: SectionId,
    pub name: &'static str,
    /// Prompt shown next to the input on the intake form
    pub label: &'static str,
    pub kind: FieldKind,
}

/// All fields, grouped by section, in declaration order
pub static SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        section: SectionId::A,
        name: fields::TOTAL_ADMISSIONS,
        label: "Total Admissions (Last 5 Years)",
        kind: FieldKind::Integer { min: 0, max: 10000 },
    },
    FieldSpec {
        section: SectionId::A,
        name: fields::WITHDRAWALS,
        label: "Total Withdrawals (TCs)",
        kind: FieldKind::Integer { min: 0, max: 1000 },
    },
    FieldSpec {
        section: SectionId::B,
        name: fields::NEW_INQUIRIES,
        label: "Number of New Inquiries",
        kind: FieldKind::Integer { min: 0, max: 5000 },
    },
    FieldSpec {
        section: SectionId::B,
        name: fields::PRIMARY_SOURCE,
        label: "Inquiry Source",
        kind: FieldKind::Choice {
            options: InquirySource::LABELS,
        },
    },
    FieldSpec {
        section: SectionId::B,
        name: fields::CONVERSION_RATE,
        label: "Conversion Rate %",
        kind: FieldKind::Percentage,
    },
    FieldSpec {
        section: SectionId::C,
        name: fields::MAX_CAPACITY,
        label: "Classroom Capacity (Total Seats)",
        kind: FieldKind::Integer { min: 1, max: 5000 },
    },
    FieldSpec {
        section: SectionId::C,
        name: fields::PROMOTION_RATE,
        label: "Promotion Rate %",
        kind: FieldKind::Percentage,
    },
    FieldSpec {
        section: SectionId::C,
        name: fields::SIBLING_FAMILIES,
        label: "Families with Multiple Kids",
        kind: FieldKind::Integer { min: 0, max: 1000 },
    },
    FieldSpec {
        section: SectionId::D,
        name: fields::COMPETITOR_SCHOOLS,
        label: "Nearby Competitor Schools",
        kind: FieldKind::Integer { min: 0, max: 20 },
    },
    FieldSpec {
        section: SectionId::D,
        name: fields::ECONOMIC_STATUS,
        label: "Area Economic Status",
        kind: FieldKind::Choice {
            options: EconomicStatus::LABELS,
        },
    },
    FieldSpec {
        section: SectionId::D,
        name: fields::LOCAL_GROWTH,
        label: "Population Growth",
        kind: FieldKind::Choice {
            options: LocalGrowth::LABELS,
        },
    },
];

/// Fields of one section in declaration order
pub fn section_fields(section: SectionId) -> impl Iterator<Item = &'static FieldSpec> {
    SCHEMA.iter().filter(move |spec| spec.section == section)
}

pub fn lookup(section: SectionId, name: &str) -> Option<&'static FieldSpec> {
    section_fields(section).find(|spec| spec.name == name)
}

/// Check a numeric value against the bounds declared for `name`
pub fn check_range(
    section: SectionId,
    name: &'static str,
    value: i64,
) -> std::result::Result<(), ValidationError> {
    let spec = lookup(section, name).ok_or_else(|| ValidationError::UnknownField {
        section,
        field: name.to_string(),
    })?;

    match spec.kind.bounds() {
        Some((min, max)) if value < min || value > max => Err(ValidationError::OutOfRange {
            field: spec.name,
            min,
            max,
            value,
        }),
        Some(_) => Ok(()),
        None => Err(ValidationError::InvalidChoice {
            field: spec.name,
            value: value.to_string(),
            allowed: match spec.kind {
                FieldKind::Choice { options } => options,
                _ => &[],
            },
        }),
    }
}

/// Parse a submitted field map into the typed record for `section`
///
/// Fields missing from the map stay unset. Any field outside the section's
/// schema, a value of the wrong type, an out-of-range number or an unknown
/// choice rejects the whole submission.
pub fn parse_section(
    section: SectionId,
    values: &FieldMap,
) -> std::result::Result<SectionData, ValidationError> {
    if let Some(unknown) = values.keys().find(|name| lookup(section, name).is_none()) {
        return Err(ValidationError::UnknownField {
            section,
            field: unknown.clone(),
        });
    }

    let reader = FieldReader {
        section,
        fields: values,
    };
    let data = match section {
        SectionId::A => SectionData::HistoricalTrends(HistoricalTrends {
            total_admissions: reader.number(fields::TOTAL_ADMISSIONS)?,
            withdrawals: reader.number(fields::WITHDRAWALS)?,
        }),
        SectionId::B => SectionData::MarketData(MarketData {
            new_inquiries: reader.number(fields::NEW_INQUIRIES)?,
            primary_source: reader.choice(fields::PRIMARY_SOURCE, InquirySource::LABELS)?,
            conversion_rate: reader.number(fields::CONVERSION_RATE)?,
        }),
        SectionId::C => SectionData::Capacity(Capacity {
            max_capacity: reader.number(fields::MAX_CAPACITY)?,
            promotion_rate: reader.number(fields::PROMOTION_RATE)?,
            sibling_families: reader.number(fields::SIBLING_FAMILIES)?,
        }),
        SectionId::D => SectionData::ExternalFactors(ExternalFactors {
            competitor_schools: reader.number(fields::COMPETITOR_SCHOOLS)?,
            economic_status: reader.choice(fields::ECONOMIC_STATUS, EconomicStatus::LABELS)?,
            local_growth: reader.choice(fields::LOCAL_GROWTH, LocalGrowth::LABELS)?,
        }),
    };
    Ok(data)
}

struct FieldReader<'a> {
    section: SectionId,
    fields: &'a FieldMap,
}

impl FieldReader<'_> {
    fn number(&self, name: &'static str) -> std::result::Result<Option<u32>, ValidationError> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(FieldValue::Integer(n)) => {
                check_range(self.section, name, *n)?;
                // Every declared bound sits inside u32
                u32::try_from(*n)
                    .map(Some)
                    .map_err(|_| ValidationError::ExpectedInteger { field: name })
            }
            Some(FieldValue::Text(_)) => Err(ValidationError::ExpectedInteger { field: name }),
        }
    }

    fn choice<T: std::str::FromStr>(
        &self,
        name: &'static str,
        allowed: &'static [&'static str],
    ) -> std::result::Result<Option<T>, ValidationError> {
        let invalid = |value: String| ValidationError::InvalidChoice {
            field: name,
            value,
            allowed,
        };
        match self.fields.get(name) {
            None => Ok(None),
            Some(FieldValue::Text(s)) => s.parse::<T>().map(Some).map_err(|_| invalid(s.clone())),
            Some(FieldValue::Integer(n)) => Err(invalid(n.to_string())),
        }
    }
}
