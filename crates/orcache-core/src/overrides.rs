use serde::Deserialize;

use crate::endpoint::Endpoint;
use crate::error::{OrcError, Result};
use crate::model::ModelInfo;

/// Which model IDs a rule applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    Exact(Vec<String>),
    Prefix(String),
}

impl Matcher {
    pub fn matches(&self, model_id: &str) -> bool {
        match self {
            Self::Exact(ids) => ids.iter().any(|id| id == model_id),
            Self::Prefix(prefix) => model_id.starts_with(prefix.as_str()),
        }
    }
}

/// What a matching rule does to a [`ModelInfo`].
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Enable prompt caching with fixed cache prices, optionally forcing the input price.
    FixedCachePricing {
        cache_writes_price: f64,
        cache_reads_price: f64,
        input_price: Option<f64>,
    },
    /// Enable prompt caching only if the representative endpoint has a nonzero
    /// cache-read price, copying its cache prices.
    EndpointCachePricing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverrideRule {
    pub matcher: Matcher,
    pub effect: Effect,
}

/// Ordered override rules. Exact matchers always come before prefix matchers.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideTable {
    rules: Vec<OverrideRule>,
}

#[derive(Debug, Deserialize)]
struct OverridesFile {
    #[serde(default)]
    rule: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    #[serde(default)]
    exact: Vec<String>,
    prefix: Option<String>,
    cache_writes_price: Option<f64>,
    cache_reads_price: Option<f64>,
    input_price: Option<f64>,
}

impl RawRule {
    fn into_rule(self, index: usize) -> Result<OverrideRule> {
        let bad = |msg: &str| OrcError::Config(format!("rule {}: {msg}", index + 1));
        match (self.exact.is_empty(), self.prefix) {
            (false, None) => {
                let (Some(cache_writes_price), Some(cache_reads_price)) =
                    (self.cache_writes_price, self.cache_reads_price)
                else {
                    return Err(bad("exact rules need cache_writes_price and cache_reads_price"));
                };
                Ok(OverrideRule {
                    matcher: Matcher::Exact(self.exact),
                    effect: Effect::FixedCachePricing {
                        cache_writes_price,
                        cache_reads_price,
                        input_price: self.input_price,
                    },
                })
            }
            (true, Some(prefix)) => {
                if prefix.is_empty() {
                    return Err(bad("prefix must not be empty"));
                }
                if self.cache_writes_price.is_some()
                    || self.cache_reads_price.is_some()
                    || self.input_price.is_some()
                {
                    return Err(bad("prefix rules take their prices from the endpoint"));
                }
                Ok(OverrideRule {
                    matcher: Matcher::Prefix(prefix),
                    effect: Effect::EndpointCachePricing,
                })
            }
            (false, Some(_)) => Err(bad("set either `exact` or `prefix`, not both")),
            (true, None) => Err(bad("missing `exact` or `prefix`")),
        }
    }
}

impl OverrideTable {
    pub fn new(mut rules: Vec<OverrideRule>) -> Self {
        // Stable: keeps file order within each group.
        rules.sort_by_key(|r| matches!(r.matcher, Matcher::Prefix(_)));
        Self { rules }
    }

    /// Parse an override table from TOML.
    pub fn parse(toml_str: &str) -> Result<Self> {
        let file: OverridesFile =
            toml::from_str(toml_str).map_err(|e| OrcError::Config(format!("{e}")))?;
        let rules = file
            .rule
            .into_iter()
            .enumerate()
            .map(|(i, raw)| raw.into_rule(i))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    /// The table shipped in `data/overrides.toml`.
    pub fn bundled() -> Result<Self> {
        Self::parse(include_str!("../../../data/overrides.toml"))
    }

    pub fn rules(&self) -> &[OverrideRule] {
        &self.rules
    }

    pub fn find(&self, model_id: &str) -> Option<&OverrideRule> {
        self.rules.iter().find(|r| r.matcher.matches(model_id))
    }

    /// Apply the first matching rule for `model_id`. Unmatched IDs pass through.
    pub fn apply(
        &self,
        model_id: &str,
        mut info: ModelInfo,
        representative: Option<&Endpoint>,
    ) -> ModelInfo {
        let Some(rule) = self.find(model_id) else {
            return info;
        };
        match rule.effect {
            Effect::FixedCachePricing {
                cache_writes_price,
                cache_reads_price,
                input_price,
            } => {
                info.supports_prompt_cache = true;
                info.cache_writes_price = cache_writes_price;
                info.cache_reads_price = cache_reads_price;
                if let Some(p) = input_price {
                    info.input_price = p;
                }
            }
            Effect::EndpointCachePricing => {
                let read = representative.and_then(|e| e.input_cache_read_price);
                if let Some(read) = read.filter(|p| *p != 0.0) {
                    info.supports_prompt_cache = true;
                    info.cache_reads_price = read;
                    info.cache_writes_price = representative
                        .and_then(|e| e.input_cache_write_price)
                        .unwrap_or(0.0);
                }
            }
        }
        info
    }
}
