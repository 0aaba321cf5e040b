use anyhow::Context as _;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::docs::model::Document;
use crate::docs::request::{BatchUpdateRequest, BatchUpdateResponse, Request};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopiedDocument {
    pub id: String,
    #[serde(default)]
    pub web_view_link: String,
}

/// Remote rich-text document service. Implementations must give
/// read-after-write consistency: a `get_document` issued after a successful
/// `batch_update` observes that update.
#[async_trait]
pub trait DocumentService: Send + Sync {
    async fn get_document(&self, document_id: &str) -> anyhow::Result<Document>;

    /// Applies `requests` atomically, in order, against one document snapshot.
    async fn batch_update(
        &self,
        document_id: &str,
        requests: &[Request],
    ) -> anyhow::Result<BatchUpdateResponse>;

    async fn copy_document(&self, template_id: &str, title: &str)
    -> anyhow::Result<CopiedDocument>;
}

#[derive(Debug, Clone)]
pub struct GoogleDocsClient {
    client: reqwest::Client,
    docs_base_url: String,
    drive_base_url: String,
    access_token: String,
}

impl GoogleDocsClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let access_token = config
            .access_token
            .clone()
            .ok_or_else(|| anyhow::anyhow!("DOCPATCH_GOOGLE_ACCESS_TOKEN is not set"))?;

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("build http client")?;

        Ok(Self {
            client,
            docs_base_url: config.docs_base_url.trim_end_matches('/').to_owned(),
            drive_base_url: config.drive_base_url.trim_end_matches('/').to_owned(),
            access_token,
        })
    }

    fn document_endpoint(&self, document_id: &str) -> String {
        format!("{}/v1/documents/{document_id}", self.docs_base_url)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> anyhow::Result<T> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .with_context(|| what.to_owned())?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .with_context(|| format!("read response body: {what}"))?;
        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
            anyhow::bail!("document service error ({status}): {message}");
        }

        serde_json::from_str(&raw).with_context(|| format!("parse response: {what}"))
    }
}

#[async_trait]
impl DocumentService for GoogleDocsClient {
    async fn get_document(&self, document_id: &str) -> anyhow::Result<Document> {
        let endpoint = self.document_endpoint(document_id);
        let request = self.client.get(&endpoint);
        self.send_json(request, &format!("GET {endpoint}")).await
    }

    async fn batch_update(
        &self,
        document_id: &str,
        requests: &[Request],
    ) -> anyhow::Result<BatchUpdateResponse> {
        let endpoint = format!("{}:batchUpdate", self.document_endpoint(document_id));
        tracing::debug!(document_id, requests = requests.len(), "batch update");
        let request = self
            .client
            .post(&endpoint)
            .json(&BatchUpdateRequest { requests });
        self.send_json(request, &format!("POST {endpoint}")).await
    }

    async fn copy_document(
        &self,
        template_id: &str,
        title: &str,
    ) -> anyhow::Result<CopiedDocument> {
        let endpoint = format!("{}/drive/v3/files/{template_id}/copy", self.drive_base_url);
        let request = self
            .client
            .post(&endpoint)
            .query(&[("fields", "id,webViewLink")])
            .json(&serde_json::json!({ "name": title }));
        self.send_json(request, &format!("POST {endpoint}")).await
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}
