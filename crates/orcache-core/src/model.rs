use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::endpoint::{Endpoint, HasEndpoints, ModelEndpoints};

/// Canonical per-model summary, as stored in the cache file.
///
/// Field names follow the host application's camelCase cache format. Keys this
/// type does not know about are kept in `extra` so rewriting a cache entry
/// never drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub max_tokens: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub context_window: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub supports_images: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub supports_prompt_cache: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub input_price: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub output_price: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub cache_writes_price: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub cache_reads_price: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    /// Historically embedded; new entries keep this empty and carry endpoints
    /// in a [`ModelEndpoints`] collection instead.
    #[serde(deserialize_with = "null_as_default")]
    pub endpoints: Vec<Endpoint>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Read a JSON `null` as the type's default.
///
/// The host application writes non-finite numbers as `null`, so any field of a
/// cached entry may hold one.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl HasEndpoints for ModelInfo {
    fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }
}

/// Model ID → [`ModelInfo`]. The shape of the cache file.
pub type ModelInfoMap = BTreeMap<String, ModelInfo>;

/// Response of a refresh: the requested model's summary, keyed by model ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompatibleModelInfo {
    pub models: ModelInfoMap,
    #[serde(default, skip_serializing_if = "ModelEndpoints::is_empty")]
    pub endpoints: ModelEndpoints,
}

/// Pick the endpoint with the largest context window.
///
/// Ties keep the earliest endpoint: a later one only wins when strictly larger.
pub fn select_representative(endpoints: &[Endpoint]) -> Option<&Endpoint> {
    endpoints.iter().fold(None, |best, current| match best {
        Some(b) if current.context_length <= b.context_length => Some(b),
        _ => Some(current),
    })
}

/// Build the summary fields from a model's `data` object and its mapped endpoints.
///
/// Overrides are not applied here; see [`crate::overrides::OverrideTable`].
pub fn summarize(model_data: &Value, endpoints: &[Endpoint]) -> ModelInfo {
    let best = select_representative(endpoints);

    let supports_images = model_data
        .get("architecture")
        .and_then(|a| a.get("input_modalities"))
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().any(|m| m.as_str() == Some("image")))
        .unwrap_or(false);

    ModelInfo {
        max_tokens: best
            .map(|e| e.max_completion_tokens.unwrap_or(e.context_length))
            .unwrap_or(0),
        context_window: best.map(|e| e.context_length).unwrap_or(0),
        supports_images,
        supports_prompt_cache: false,
        input_price: best.and_then(|e| e.prompt_price).unwrap_or(0.0),
        output_price: best.and_then(|e| e.completion_price).unwrap_or(0.0),
        cache_writes_price: 0.0,
        cache_reads_price: 0.0,
        description: model_data
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        endpoints: Vec::new(),
        extra: Map::new(),
    }
}
