use std::collections::BTreeMap;

use anyhow::Context as _;
use serde::Serialize;

use crate::docs::DocumentService;
use crate::substitute::{SubstitutionReport, substitute};

#[derive(Debug, Clone, Serialize)]
pub struct FilledDocument {
    pub document_id: String,
    pub web_view_link: String,
    pub report: SubstitutionReport,
}

/// Copies `template_id` under `title` and substitutes placeholders in the copy.
/// The template itself is never modified.
pub async fn fill_template(
    service: &dyn DocumentService,
    template_id: &str,
    title: &str,
    replacements: BTreeMap<String, String>,
) -> anyhow::Result<FilledDocument> {
    let copy = service
        .copy_document(template_id, title)
        .await
        .with_context(|| format!("copy template {template_id}"))?;
    tracing::info!(template_id, document_id = %copy.id, title, "copied template");

    let report = substitute(service, &copy.id, replacements)
        .await
        .with_context(|| format!("fill copy {} of template {template_id}", copy.id))?;

    Ok(FilledDocument {
        document_id: copy.id,
        web_view_link: copy.web_view_link,
        report,
    })
}
