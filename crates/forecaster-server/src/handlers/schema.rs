//! Health and field schema handlers

use axum::Json;
use serde::Serialize;

use forecaster_core::{schema, FieldSpec, FieldValue, SectionData, SectionId};

/// One input field with its form default
#[derive(Debug, Serialize)]
pub struct SchemaField {
    #[serde(flatten)]
    pub spec: FieldSpec,
    pub default: Option<FieldValue>,
}

/// Fields of one section
#[derive(Debug, Serialize)]
pub struct SchemaSection {
    pub id: SectionId,
    pub name: &'static str,
    pub title: &'static str,
    pub fields: Vec<SchemaField>,
}

/// GET /api/health - Liveness check (not gated)
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/schema - Sections, fields, bounds and defaults
pub async fn get_schema() -> Json<Vec<SchemaSection>> {
    Json(schema_sections())
}

pub(crate) fn schema_sections() -> Vec<SchemaSection> {
    SectionId::ALL
        .iter()
        .map(|&id| {
            let defaults = SectionData::defaults(id).entries();
            SchemaSection {
                id,
                name: id.name(),
                title: id.title(),
                fields: schema::section_fields(id)
                    .map(|spec| SchemaField {
                        spec: *spec,
                        default: defaults
                            .iter()
                            .find(|entry| entry.name == spec.name)
                            .map(|entry| entry.value.clone()),
                    })
                    .collect(),
            }
        })
        .collect()
}
