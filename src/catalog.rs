//! Model catalog lookup and model selection.
//!
//! The session only needs two things from a catalog: the list of models, and a way to turn
//! a user-supplied name into the canonical identifier sent with each request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::chat::InputSource;
use crate::error::{Error, Result};
use crate::render::Renderer;

/// Default URL of the model catalog search endpoint.
pub const DEFAULT_CATALOG_URL: &str = "https://api.catalog.azureml.ms/asset-gallery/v1.0/models";

/// Inference task of models that can hold a chat.
pub const CHAT_COMPLETION_TASK: &str = "chat-completion";

const MODEL_NOT_FOUND: &str = "The specified model name is not found. Run `modelchat` without a model to select interactively.";

/// Summary of a catalog model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Catalog asset identifier.
    pub id: String,
    /// Model identifier sent with requests.
    pub name: String,
    /// Human-readable name.
    pub friendly_name: String,
    /// Primary inference task.
    pub task: String,
    /// Who publishes the model.
    pub publisher: String,
    /// One-line description.
    pub summary: String,
}

impl ModelSummary {
    /// Returns true if `name` matches the model name or display name, ignoring case.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.friendly_name.eq_ignore_ascii_case(name)
    }

    /// Returns true if the model can serve chat completions.
    pub fn is_chat_model(&self) -> bool {
        self.task == CHAT_COMPLETION_TASK
    }
}

/// Sorts models by display name, ignoring case.
pub fn sort_models(models: &mut [ModelSummary]) {
    models.sort_by_key(|m| m.friendly_name.to_lowercase());
}

/// Source of model summaries.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Lists every model the catalog knows about.
    async fn list_models(&self) -> Result<Vec<ModelSummary>>;
}

/// Catalog backed by the asset-gallery search endpoint.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: ReqwestClient,
    url: String,
}

impl HttpCatalog {
    /// Create a catalog client for the default endpoint.
    pub fn new() -> Result<Self> {
        Self::with_url(DEFAULT_CATALOG_URL)
    }

    /// Create a catalog client for a custom endpoint.
    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                Error::transport(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    summaries: Vec<SearchSummary>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSummary {
    #[serde(default)]
    asset_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    inference_tasks: Vec<String>,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    summary: String,
}

impl From<SearchSummary> for ModelSummary {
    fn from(summary: SearchSummary) -> Self {
        ModelSummary {
            id: summary.asset_id,
            name: summary.name,
            friendly_name: summary.display_name,
            task: summary.inference_tasks.into_iter().next().unwrap_or_default(),
            publisher: summary.publisher,
            summary: summary.summary,
        }
    }
}

#[async_trait]
impl ModelCatalog for HttpCatalog {
    async fn list_models(&self) -> Result<Vec<ModelSummary>> {
        let query = json!({
            "filters": [
                { "field": "freePlayground", "values": ["true"], "operator": "eq" },
                { "field": "labels", "values": ["latest"], "operator": "eq" }
            ],
            "order": [
                { "field": "displayName", "direction": "asc" }
            ]
        });
        let response = self
            .client
            .post(&self.url)
            .json(&query)
            .send()
            .await
            .map_err(|e| Error::transport(format!("Request failed: {}", e), Some(Box::new(e))))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::transport(
                format!("Failed to read catalog response: {}", e),
                Some(Box::new(e)),
            )
        })?;
        if !status.is_success() {
            return Err(Error::server(
                status.as_u16(),
                format!("unexpected response from the catalog: {status}"),
                body,
            ));
        }

        let search: SearchResponse = serde_json::from_str(&body)?;
        debug!(models = search.summaries.len(), "fetched model catalog");
        Ok(search.summaries.into_iter().map(ModelSummary::from).collect())
    }
}

/// Resolves `name` against `models`, returning the canonical model name.
pub fn validate_model_name(name: &str, models: &[ModelSummary]) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(model_not_found(name));
    }
    models
        .iter()
        .find(|m| m.has_name(name))
        .map(|m| m.name.clone())
        .ok_or_else(|| model_not_found(name))
}

/// Picks the model for a session.
///
/// A `requested` name is validated against the catalog.  Without one, the chat models are
/// listed and the user picks one by number or by name.
pub fn select_model(
    requested: Option<&str>,
    models: &[ModelSummary],
    input: &mut dyn InputSource,
    renderer: &mut dyn Renderer,
) -> Result<String> {
    if let Some(name) = requested {
        return validate_model_name(name, models);
    }

    let mut chat_models: Vec<ModelSummary> =
        models.iter().filter(|m| m.is_chat_model()).cloned().collect();
    sort_models(&mut chat_models);

    renderer.print_info("Select a model:");
    for (index, model) in chat_models.iter().enumerate() {
        renderer.print_info(&format!("  {:>2}. {}", index + 1, model.friendly_name));
    }
    let choice = input.read_line("> ")?.unwrap_or_default();
    let choice = choice.trim();

    match choice.parse::<usize>() {
        Ok(index) if (1..=chat_models.len()).contains(&index) => {
            Ok(chat_models[index - 1].name.clone())
        }
        Ok(_) => Err(model_not_found(choice)),
        Err(_) => validate_model_name(choice, &chat_models),
    }
}

fn model_not_found(name: &str) -> Error {
    Error::validation(MODEL_NOT_FOUND, Some(format!("model '{name}'")))
}
