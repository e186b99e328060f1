//! Schema command implementation

use anyhow::Result;

use forecaster_core::{schema, FieldKind, FieldSpec, SectionData, SectionId};

/// Describe the accepted values of a field
pub fn describe_kind(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Integer { min, max } => format!("{}-{}", min, max),
        FieldKind::Percentage => "0-100 %".to_string(),
        FieldKind::Choice { options } => options.join(" | "),
    }
}

fn default_for(spec: &FieldSpec) -> String {
    SectionData::defaults(spec.section)
        .entries()
        .into_iter()
        .find(|entry| entry.name == spec.name)
        .map(|entry| entry.value.to_string())
        .unwrap_or_default()
}

pub fn cmd_schema() -> Result<()> {
    for id in SectionId::ALL {
        println!("📋 {}: {}", id.name(), id.title());
        for spec in schema::section_fields(id) {
            println!(
                "   {:<24} {:<40} default {}",
                spec.name,
                describe_kind(&spec.kind),
                default_for(spec)
            );
        }
        println!();
    }
    Ok(())
}
