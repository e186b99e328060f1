//! Forecast command implementation

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

use forecaster_core::{
    FieldMap, ReportFormat, ReportRenderer, SectionId, SessionStore, MAX_SCORE,
};

/// Read a section file into per-section field maps
///
/// The format follows the extension: `.json` or `.toml`. Top-level keys name
/// the section (`A`, `b`, `Section C`, ...); values map field names to
/// numbers or choice labels.
pub fn load_sections(path: &Path) -> Result<Vec<(SectionId, FieldMap)>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let raw: BTreeMap<String, FieldMap> = match extension.as_str() {
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?,
        "toml" => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?,
        other => bail!(
            "Unsupported input format '{}' for {} (use .json or .toml)",
            other,
            path.display()
        ),
    };

    let mut sections = Vec::with_capacity(raw.len());
    for (key, values) in raw {
        let id: SectionId = key.parse()?;
        if sections.iter().any(|(existing, _)| *existing == id) {
            bail!("{} is given more than once in {}", id, path.display());
        }
        sections.push((id, values));
    }
    sections.sort_by_key(|(id, _)| *id);

    debug!(sections = sections.len(), path = %path.display(), "Loaded section file");
    Ok(sections)
}

/// Score an organization and write its report, returning the report path
pub fn cmd_forecast(
    org: &str,
    input: &Path,
    output: Option<&Path>,
    format: &str,
    no_compress: bool,
    history: Option<&Path>,
) -> Result<PathBuf> {
    let format: ReportFormat = format.parse().map_err(|e: String| anyhow!(e))?;
    let sections = load_sections(input)?;

    let mut store = SessionStore::new();
    store.initialize();
    store
        .set_organization_name(org)
        .context("Invalid organization name")?;

    for (id, values) in &sections {
        store
            .submit_section(*id, values)
            .with_context(|| format!("Invalid values for {}", id))?;
    }

    if let Some(path) = history {
        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Invalid history file path: {}", path.display()))?;
        let attachment = store.attach_history(file_name, &content)?;
        println!(
            "📎 History file: {} ({} bytes, sha256 {})",
            attachment.file_name,
            attachment.size_bytes,
            &attachment.sha256[..12]
        );
    }

    let (result, report) = store
        .compute_forecast()
        .context("Cannot compute forecast")?;

    let breakdown = result.breakdown();
    println!("📊 Growth forecast for {}", store.workspace().organization_name());
    println!();
    println!("   {:<22} {:>7.2}", SectionId::A.title(), breakdown.historical);
    println!("   {:<22} {:>7.2}", SectionId::B.title(), breakdown.market);
    println!("   {:<22} {:>7.2}", SectionId::C.title(), breakdown.capacity);
    println!("   {:<22} {:>7.2}", SectionId::D.title(), breakdown.external);
    println!("   {:<22} {:>7.2}", "Total", breakdown.raw_total);
    println!();
    println!(
        "   Score: {}/{} ({})",
        result.score(),
        MAX_SCORE,
        result.classification()
    );
    println!("   {}", result.classification().headline());

    let bytes = ReportRenderer::default()
        .with_compression(!no_compress)
        .render(&report, format)
        .context("Failed to render report")?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(report.file_name(format)));
    std::fs::write(&path, &bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!();
    println!("✅ Report written to {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}
