use async_trait::async_trait;
use serde_json::Value;

use crate::cache::CacheStore;
use crate::endpoint::{parse_endpoints, Endpoint, ModelEndpoints};
use crate::error::{OrcError, Result};
use crate::model::{select_representative, summarize, CompatibleModelInfo, ModelInfo, ModelInfoMap};
use crate::overrides::OverrideTable;

/// Where raw `/endpoints` responses come from.
///
/// Implementations report transport failures as [`OrcError::Http`] or
/// [`OrcError::Network`] and non-2xx responses as [`OrcError::Api`]; any of
/// those sends the refresh down the cache fallback path.
#[async_trait]
pub trait EndpointsSource: Send + Sync {
    async fn fetch_endpoints(&self, model_id: &str) -> Result<Value>;
}

/// A freshly built summary together with the endpoints it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Refreshed {
    pub info: ModelInfo,
    pub endpoints: Vec<Endpoint>,
}

/// Turn a raw `/endpoints` response into a [`ModelInfo`] with overrides applied.
///
/// Fails with [`OrcError::UpstreamData`] when the response has no `data` object.
pub fn build_model_info(
    model_id: &str,
    response: &Value,
    overrides: &OverrideTable,
) -> Result<Refreshed> {
    let data = response
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| OrcError::UpstreamData(model_id.to_string()))?;

    let endpoints = parse_endpoints(data);
    let info = summarize(data, &endpoints);

    // Upstream may canonicalize the ID; overrides key on that when present.
    let lookup_id = data
        .get("id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(model_id);
    let info = overrides.apply(lookup_id, info, select_representative(&endpoints));

    Ok(Refreshed { info, endpoints })
}

/// Refreshes one model's endpoint data and keeps the cache in step.
pub struct RefreshService<S> {
    source: S,
    cache: CacheStore,
    overrides: OverrideTable,
}

impl<S: EndpointsSource> RefreshService<S> {
    pub fn new(source: S, cache: CacheStore, overrides: OverrideTable) -> Self {
        Self {
            source,
            cache,
            overrides,
        }
    }

    /// Use the override table bundled with the crate.
    pub fn with_bundled_overrides(source: S, cache: CacheStore) -> Result<Self> {
        Ok(Self::new(source, cache, OverrideTable::bundled()?))
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Fetch fresh endpoint data for `model_id`, persist it, and return it.
    ///
    /// If upstream is unreachable, answers with an error status, or returns no
    /// `data`, the cached entry is returned instead and the cache is left
    /// untouched. The same happens when fresh data cannot be written to the
    /// cache. Only when neither source has the model does this fail, with
    /// [`OrcError::RefreshUnavailable`].
    pub async fn refresh_endpoints(&self, model_id: &str) -> Result<CompatibleModelInfo> {
        if model_id.is_empty() {
            return Err(OrcError::InvalidArgument("model ID is required".into()));
        }

        let refreshed = self
            .source
            .fetch_endpoints(model_id)
            .await
            .and_then(|response| build_model_info(model_id, &response, &self.overrides))
            .and_then(|refreshed| self.store(model_id, refreshed));

        match refreshed {
            Ok(out) => Ok(out),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(model_id, error = %e, "failed to refresh OpenRouter endpoints");
                self.from_cache(model_id)
            }
            Err(e) => Err(e),
        }
    }

    fn store(&self, model_id: &str, refreshed: Refreshed) -> Result<CompatibleModelInfo> {
        let Refreshed { info, endpoints } = refreshed;
        let update = ModelInfoMap::from([(model_id.to_string(), info.clone())]);
        let merged = self
            .cache
            .merge(update)
            .map_err(|e| OrcError::CacheWrite(e.to_string()))?;
        tracing::info!(
            model_id,
            cached_models = merged.len(),
            "OpenRouter endpoints refreshed and cached"
        );

        let mut collection = ModelEndpoints::new();
        collection.insert(model_id, endpoints);
        Ok(CompatibleModelInfo {
            models: ModelInfoMap::from([(model_id.to_string(), info)]),
            endpoints: collection,
        })
    }

    fn from_cache(&self, model_id: &str) -> Result<CompatibleModelInfo> {
        let Some(info) = self.cache.get(model_id) else {
            tracing::warn!(model_id, "no cached model information");
            return Err(OrcError::RefreshUnavailable(model_id.to_string()));
        };
        tracing::info!(model_id, "using cached model information");
        let models = ModelInfoMap::from([(model_id.to_string(), info)]);
        Ok(CompatibleModelInfo {
            endpoints: ModelEndpoints::from_models(&models),
            models,
        })
    }
}
