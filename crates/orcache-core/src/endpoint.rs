use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::null_as_default;
use crate::price::price_field;

/// One provider-specific route to a model, as reported by OpenRouter.
///
/// Prices are in currency per million tokens. `None` means the endpoint does
/// not price that dimension at all, which is different from a price of zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Endpoint {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub context_length: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub provider_name: String,
    /// Routing key, unique among the endpoints of one model.
    #[serde(deserialize_with = "null_as_default")]
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_prompt_tokens: Option<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub supported_parameters: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub status: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub uptime_last30m: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_search_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_reasoning_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_cache_read_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_cache_write_price: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub discount: f64,
}

/// An [`Endpoint`] tagged with the model it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEndpoint {
    pub model_id: String,
    #[serde(flatten)]
    pub endpoint: Endpoint,
}

/// Map one raw endpoint record from the `/endpoints` response.
///
/// Never fails: missing or mistyped fields fall back to their defaults.
pub fn parse_endpoint(data: &Value) -> Endpoint {
    let pricing = data.get("pricing");

    let mut supported_parameters: Vec<String> = Vec::new();
    if let Some(arr) = data.get("supported_parameters").and_then(|v| v.as_array()) {
        for p in arr.iter().filter_map(|v| v.as_str()) {
            if !supported_parameters.iter().any(|s| s == p) {
                supported_parameters.push(p.to_string());
            }
        }
    }

    Endpoint {
        name: str_field(data, "name"),
        context_length: u64_field(data, "context_length").unwrap_or(0),
        provider_name: str_field(data, "provider_name"),
        tag: str_field(data, "tag"),
        max_completion_tokens: u64_field(data, "max_completion_tokens"),
        max_prompt_tokens: u64_field(data, "max_prompt_tokens"),
        supported_parameters,
        status: data.get("status").and_then(|v| v.as_i64()).unwrap_or(0),
        uptime_last30m: data
            .get("uptime_last_30m")
            .and_then(|v| v.as_f64())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(0.0),
        quantization: data
            .get("quantization")
            .and_then(|v| v.as_str())
            .map(String::from),
        prompt_price: price_field(pricing, "prompt"),
        completion_price: price_field(pricing, "completion"),
        request_price: price_field(pricing, "request"),
        image_price: price_field(pricing, "image"),
        web_search_price: price_field(pricing, "web_search"),
        internal_reasoning_price: price_field(pricing, "internal_reasoning"),
        input_cache_read_price: price_field(pricing, "input_cache_read"),
        input_cache_write_price: price_field(pricing, "input_cache_write"),
        discount: pricing
            .and_then(|p| p.get("discount"))
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0),
    }
}

/// Map the `endpoints` array of a model's `data` object, in upstream order.
pub fn parse_endpoints(model_data: &Value) -> Vec<Endpoint> {
    model_data
        .get("endpoints")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().map(parse_endpoint).collect())
        .unwrap_or_default()
}

fn str_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

// Token counts occasionally arrive as floats ("8192.0"); accept those too.
fn u64_field(data: &Value, key: &str) -> Option<u64> {
    let v = data.get(key)?;
    v.as_u64().or_else(|| {
        v.as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    })
}

/// Anything that carries a list of endpoints, such as a model summary.
pub trait HasEndpoints {
    fn endpoints(&self) -> &[Endpoint];
}

impl HasEndpoints for Vec<Endpoint> {
    fn endpoints(&self) -> &[Endpoint] {
        self
    }
}

/// Which endpoint the user pinned for a model: model ID → endpoint tag.
pub type SelectedEndpoints = BTreeMap<String, String>;

/// Endpoints keyed by model ID. Models without endpoints are never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelEndpoints(BTreeMap<String, Vec<Endpoint>>);

impl ModelEndpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the collection from any model map whose values expose endpoints.
    pub fn from_models<'a, I, M>(models: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a M)>,
        M: HasEndpoints + 'a,
    {
        let mut out = Self::new();
        for (id, model) in models {
            out.insert(id.clone(), model.endpoints().to_vec());
        }
        out
    }

    /// Store `endpoints` under `model_id`. An empty list removes the model.
    pub fn insert(&mut self, model_id: impl Into<String>, endpoints: Vec<Endpoint>) {
        let model_id = model_id.into();
        if endpoints.is_empty() {
            self.0.remove(&model_id);
        } else {
            self.0.insert(model_id, endpoints);
        }
    }

    /// Endpoints for `model_id`, or an empty slice when the model is unknown.
    pub fn for_model(&self, model_id: &str) -> &[Endpoint] {
        self.0.get(model_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn model_ids(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn flatten(&self) -> Vec<ModelEndpoint> {
        self.0
            .iter()
            .flat_map(|(model_id, endpoints)| {
                endpoints.iter().map(move |e| ModelEndpoint {
                    model_id: model_id.clone(),
                    endpoint: e.clone(),
                })
            })
            .collect()
    }

    /// Resolve the pinned endpoint for `model_id`, if the tag still exists.
    pub fn selected(&self, selections: &SelectedEndpoints, model_id: &str) -> Option<&Endpoint> {
        let tag = selections.get(model_id)?;
        self.for_model(model_id).iter().find(|e| &e.tag == tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_record_gets_defaults() {
        let e = parse_endpoint(&json!({}));
        assert_eq!(e.name, "");
        assert_eq!(e.tag, "");
        assert_eq!(e.provider_name, "");
        assert_eq!(e.context_length, 0);
        assert_eq!(e.status, 0);
        assert_eq!(e.uptime_last30m, 0.0);
        assert!(e.supported_parameters.is_empty());
        assert!(e.prompt_price.is_none());
        assert_eq!(e.discount, 0.0);
    }

    #[test]
    fn mistyped_fields_are_defaulted() {
        let e = parse_endpoint(&json!({
            "name": 42,
            "context_length": "big",
            "tag": null,
            "uptime_last_30m": -3.0,
            "supported_parameters": "tools",
            "pricing": "free"
        }));
        assert_eq!(e.name, "");
        assert_eq!(e.context_length, 0);
        assert_eq!(e.tag, "");
        assert_eq!(e.uptime_last30m, 0.0);
        assert!(e.supported_parameters.is_empty());
        assert!(e.prompt_price.is_none());
    }

    #[test]
    fn supported_parameters_deduplicated_in_order() {
        let e = parse_endpoint(&json!({
            "supported_parameters": ["tools", "temperature", "tools"]
        }));
        assert_eq!(e.supported_parameters, vec!["tools", "temperature"]);
    }

    #[test]
    fn negative_status_survives() {
        let e = parse_endpoint(&json!({"status": -2}));
        assert_eq!(e.status, -2);
    }

    #[test]
    fn collection_from_plain_endpoint_lists() {
        let raw = BTreeMap::from([
            ("a/b".to_string(), vec![parse_endpoint(&json!({"tag": "x"}))]),
            ("c/d".to_string(), Vec::new()),
        ]);
        let collection = ModelEndpoints::from_models(&raw);
        assert_eq!(collection.model_ids(), vec!["a/b"]);
    }

    #[test]
    fn parse_endpoints_without_array() {
        assert!(parse_endpoints(&json!({"id": "x/y"})).is_empty());
        assert!(parse_endpoints(&json!({"endpoints": {}})).is_empty());
    }
}
