//! Model listing and active-model switching over the runtime config (`openclaw.json`).
//!
//! The config is owned by the agent runtime, so it is handled as an untyped document:
//! only the provider declarations are decoded into typed shapes, and writes touch
//! nothing beyond `agents.defaults.model.primary` and `meta.lastTouchedAt`.

use std::{path::PathBuf, sync::Arc};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    document::{read_document, write_document},
    error::{Result, ViewerError},
};

pub const RESTART_HINT: &str = "Model switched. Restart OpenClaw gateway for changes to take effect.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    /// `<provider>/<modelId>`
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<Value>,
    #[serde(rename = "reasoning")]
    pub supports_reasoning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelListing {
    pub models: Vec<ModelDescriptor>,
    pub current_model: Option<String>,
    pub aliases: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSwitch {
    pub success: bool,
    pub previous_model: Option<String>,
    pub current_model: String,
    pub message: String,
}

#[derive(Clone)]
pub struct ModelCatalog {
    config_path: PathBuf,
    write_gate: Arc<Mutex<()>>,
}

fn config_not_found() -> ViewerError {
    ViewerError::NotFound("OpenClaw config not found".to_string())
}

fn providers(doc: &Value) -> Option<&Map<String, Value>> {
    doc.get("models")?.get("providers")?.as_object()
}

fn declared_models(provider: &Value) -> &[Value] {
    provider
        .get("models")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// One declared model. Only a string `id` is required; the numeric and cost
/// fields pass through in whatever form the config carries them.
fn describe_model(provider: &str, raw: &Value) -> Option<ModelDescriptor> {
    let id = raw.get("id")?.as_str()?;
    let display_name = raw
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .unwrap_or(id);
    Some(ModelDescriptor {
        id: format!("{provider}/{id}"),
        display_name: display_name.to_string(),
        provider: provider.to_string(),
        context_window: raw.get("contextWindow").cloned(),
        max_tokens: raw.get("maxTokens").cloned(),
        supports_reasoning: raw.get("reasoning").and_then(Value::as_bool).unwrap_or(false),
        cost: raw.get("cost").cloned(),
    })
}

/// Every provider's models, in declaration order.
pub fn flatten_providers(doc: &Value) -> Vec<ModelDescriptor> {
    let mut out = Vec::new();
    let Some(providers) = providers(doc) else {
        return out;
    };
    for (provider, decl) in providers {
        for raw in declared_models(decl) {
            match describe_model(provider, raw) {
                Some(model) => out.push(model),
                None => warn!("skipping model declaration without a string id under provider {provider}"),
            }
        }
    }
    out
}

fn primary_model(doc: &Value) -> Option<String> {
    let model = doc.get("agents")?.get("defaults")?.get("model")?;
    // The runtime also accepts the bare-string form `"model": "<provider>/<id>"`.
    model
        .as_str()
        .or_else(|| model.get("primary")?.as_str())
        .map(str::to_string)
}

fn aliases(doc: &Value) -> Map<String, Value> {
    doc.get("agents")
        .and_then(|a| a.get("defaults"))
        .and_then(|d| d.get("models"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// Set `value` at `path` below `target`, replacing anything on the way that is not an object.
fn set_nested(target: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = target;
    for key in parents {
        let slot = current
            .entry(*key)
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }
    current.insert(last.to_string(), value);
}

/// Check that `model_id` names a declared `<provider>/<model>` pair.
fn validate_model_id(doc: &Value, model_id: &str) -> Result<()> {
    let Some((provider, model)) = model_id
        .split_once('/')
        .filter(|(p, m)| !p.is_empty() && !m.is_empty())
    else {
        return Err(ViewerError::BadRequest(format!(
            "Model id '{model_id}' must look like <provider>/<model>"
        )));
    };
    let Some(decl) = providers(doc).and_then(|p| p.get(provider)) else {
        return Err(ViewerError::BadRequest(format!(
            "Provider '{provider}' not found"
        )));
    };
    let declared = declared_models(decl)
        .iter()
        .any(|m| m.get("id").and_then(Value::as_str) == Some(model));
    if !declared {
        return Err(ViewerError::BadRequest(format!(
            "Model '{model}' not found in provider '{provider}'"
        )));
    }
    Ok(())
}

impl ModelCatalog {
    pub fn new(config_path: impl Into<PathBuf>, write_gate: Arc<Mutex<()>>) -> Self {
        Self {
            config_path: config_path.into(),
            write_gate,
        }
    }

    async fn load(&self) -> Result<Value> {
        read_document(&self.config_path)
            .await?
            .ok_or_else(config_not_found)
    }

    pub async fn list_models(&self) -> Result<ModelListing> {
        let doc = self.load().await?;
        Ok(ModelListing {
            models: flatten_providers(&doc),
            current_model: primary_model(&doc),
            aliases: aliases(&doc),
        })
    }

    /// Make `model_id` the default model. The config is only rewritten once the id validates.
    pub async fn switch_model(&self, model_id: Option<&str>) -> Result<ModelSwitch> {
        let Some(model_id) = model_id.map(str::trim).filter(|m| !m.is_empty()) else {
            return Err(ViewerError::BadRequest("modelId is required".to_string()));
        };

        let _guard = self.write_gate.lock().await;
        let mut doc = self.load().await?;
        validate_model_id(&doc, model_id)?;

        let previous_model = primary_model(&doc);
        let Some(root) = doc.as_object_mut() else {
            return Err(ViewerError::BadRequest("OpenClaw config is not an object".to_string()));
        };
        set_nested(root, &["agents", "defaults", "model", "primary"], Value::from(model_id));
        set_nested(
            root,
            &["meta", "lastTouchedAt"],
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        write_document(&self.config_path, &doc).await?;
        info!(
            "default model {} -> {model_id}",
            previous_model.as_deref().unwrap_or("<unset>")
        );

        Ok(ModelSwitch {
            success: true,
            previous_model,
            current_model: model_id.to_string(),
            message: RESTART_HINT.to_string(),
        })
    }
}
