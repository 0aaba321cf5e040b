use std::collections::BTreeMap;
use std::io::Read as _;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::docs::Request;
use crate::patch::Patch;

/// `compile` output: the batch-update requests plus inserted length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledPatch {
    pub requests: Vec<Request>,
    pub length: usize,
}

impl From<Patch> for CompiledPatch {
    fn from(patch: Patch) -> Self {
        Self {
            length: patch.length,
            requests: patch.operations.into_iter().map(Request::from).collect(),
        }
    }
}

/// Accepts a bare document id or a document URL (`.../d/<id>/edit`).
pub fn parse_document_id(input: &str) -> anyhow::Result<String> {
    let input = input.trim();
    let id = match Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            let mut segments = url
                .path_segments()
                .with_context(|| format!("document url has no path: {input}"))?;
            segments
                .by_ref()
                .find(|segment| *segment == "d")
                .and_then(|_| segments.next())
                .with_context(|| format!("document url has no /d/<id> segment: {input}"))?
                .to_owned()
        }
        _ => input.to_owned(),
    };

    let valid = !id.is_empty()
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if !valid {
        anyhow::bail!("invalid document id: {id:?}");
    }
    Ok(id)
}

/// Placeholder values from a flat JSON object. Strings are markdown as-is,
/// booleans become `Yes`/`No`, numbers their JSON text, and nulls are skipped.
pub fn parse_replacements(raw: &str) -> anyhow::Result<BTreeMap<String, String>> {
    let value: Value = serde_json::from_str(raw).context("parse replacement values json")?;
    let Value::Object(object) = value else {
        anyhow::bail!("replacement values must be a JSON object");
    };

    let mut out = BTreeMap::new();
    for (key, value) in object {
        let text = match value {
            Value::Null => continue,
            Value::String(text) => text,
            Value::Bool(true) => "Yes".to_owned(),
            Value::Bool(false) => "No".to_owned(),
            Value::Number(number) => number.to_string(),
            Value::Array(_) | Value::Object(_) => {
                anyhow::bail!("replacement value for {key:?} must be a string, number, or bool")
            }
        };
        out.insert(key, text);
    }
    Ok(out)
}

/// Reads a file, or stdin when `path` is `-`.
pub async fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        return tokio::task::spawn_blocking(|| {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read stdin")?;
            Ok::<_, anyhow::Error>(buf)
        })
        .await
        .context("join stdin reader")?;
    }

    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read input: {path}"))
}

pub async fn read_replacements(path: &str) -> anyhow::Result<BTreeMap<String, String>> {
    let raw = read_input(path).await?;
    parse_replacements(&raw).with_context(|| format!("load replacement values: {path}"))
}
