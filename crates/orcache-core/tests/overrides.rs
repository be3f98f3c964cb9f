use orcache_core::endpoint::Endpoint;
use orcache_core::model::ModelInfo;
use orcache_core::overrides::OverrideTable;

fn table() -> OverrideTable {
    OverrideTable::bundled().expect("bundled overrides should parse")
}

fn base_info() -> ModelInfo {
    ModelInfo {
        max_tokens: 8192,
        context_window: 200_000,
        input_price: 3.0,
        output_price: 15.0,
        cache_writes_price: 99.0,
        cache_reads_price: 99.0,
        description: "base".into(),
        ..Default::default()
    }
}

fn cache_priced(read: Option<f64>, write: Option<f64>) -> Endpoint {
    Endpoint {
        tag: "t".into(),
        input_cache_read_price: read,
        input_cache_write_price: write,
        ..Default::default()
    }
}

fn assert_cache(id: &str, writes: f64, reads: f64) {
    let info = table().apply(id, base_info(), None);
    assert!(info.supports_prompt_cache, "{id}: prompt cache not enabled");
    assert_eq!(info.cache_writes_price, writes, "{id}: cache writes");
    assert_eq!(info.cache_reads_price, reads, "{id}: cache reads");
    assert_eq!(info.input_price, 3.0, "{id}: input price changed");
}

#[test]
fn sonnet_family() {
    for id in [
        "anthropic/claude-sonnet-4",
        "anthropic/claude-opus-4",
        "anthropic/claude-3-7-sonnet",
        "anthropic/claude-3-7-sonnet:beta",
        "anthropic/claude-3.7-sonnet",
        "anthropic/claude-3.7-sonnet:beta",
        "anthropic/claude-3.7-sonnet:thinking",
        "anthropic/claude-3.5-sonnet",
        "anthropic/claude-3.5-sonnet:beta",
        "anthropic/claude-3.5-sonnet-20240620",
        "anthropic/claude-3.5-sonnet-20240620:beta",
    ] {
        assert_cache(id, 3.75, 0.3);
    }
}

#[test]
fn haiku_3_5_family() {
    for id in [
        "anthropic/claude-3-5-haiku",
        "anthropic/claude-3-5-haiku:beta",
        "anthropic/claude-3-5-haiku-20241022",
        "anthropic/claude-3-5-haiku-20241022:beta",
        "anthropic/claude-3.5-haiku",
        "anthropic/claude-3.5-haiku:beta",
        "anthropic/claude-3.5-haiku-20241022",
        "anthropic/claude-3.5-haiku-20241022:beta",
    ] {
        assert_cache(id, 1.25, 0.1);
    }
}

#[test]
fn claude_3_opus_and_haiku() {
    assert_cache("anthropic/claude-3-opus", 18.75, 1.5);
    assert_cache("anthropic/claude-3-opus:beta", 18.75, 1.5);
    assert_cache("anthropic/claude-3-haiku", 0.3, 0.03);
    assert_cache("anthropic/claude-3-haiku:beta", 0.3, 0.03);
}

#[test]
fn claude_3_opus_ignores_prior_values() {
    let info = ModelInfo {
        supports_prompt_cache: false,
        cache_writes_price: 0.0,
        cache_reads_price: 0.0,
        ..Default::default()
    };
    let out = table().apply("anthropic/claude-3-opus", info, None);
    assert!(out.supports_prompt_cache);
    assert_eq!(out.cache_writes_price, 18.75);
    assert_eq!(out.cache_reads_price, 1.5);
}

#[test]
fn deepseek_chat_zeroes_input_price() {
    let info = table().apply("deepseek/deepseek-chat", base_info(), None);
    assert!(info.supports_prompt_cache);
    assert_eq!(info.input_price, 0.0);
    assert_eq!(info.output_price, 15.0);
    assert_eq!(info.cache_writes_price, 0.14);
    assert_eq!(info.cache_reads_price, 0.014);
}

#[test]
fn grok_3_beta() {
    assert_cache("x-ai/grok-3-beta", 0.75, 0.0);
}

#[test]
fn unknown_model_passes_through() {
    let info = table().apply("unknown/model-x", base_info(), Some(&cache_priced(Some(1.0), None)));
    assert_eq!(info, base_info());
}

#[test]
fn near_misses_do_not_match_exact_rules() {
    for id in ["anthropic/claude-3-opus:extended", "claude-3-opus", "anthropic/claude-3"] {
        assert_eq!(table().apply(id, base_info(), None), base_info(), "{id}");
    }
}

#[test]
fn openai_copies_endpoint_cache_pricing() {
    let ep = cache_priced(Some(0.5), Some(0.0));
    let info = table().apply("openai/gpt-4o", ModelInfo::default(), Some(&ep));
    assert!(info.supports_prompt_cache);
    assert_eq!(info.cache_reads_price, 0.5);
    assert_eq!(info.cache_writes_price, 0.0);
}

#[test]
fn google_without_write_price_gets_zero_writes() {
    let ep = cache_priced(Some(0.31), None);
    let info = table().apply("google/gemini-2.5-pro", ModelInfo::default(), Some(&ep));
    assert!(info.supports_prompt_cache);
    assert_eq!(info.cache_reads_price, 0.31);
    assert_eq!(info.cache_writes_price, 0.0);
}

#[test]
fn prefix_rule_needs_nonzero_cache_read() {
    for ep in [cache_priced(None, Some(1.0)), cache_priced(Some(0.0), Some(1.0))] {
        let info = table().apply("google/gemini-2.5-pro", ModelInfo::default(), Some(&ep));
        assert!(!info.supports_prompt_cache);
        assert_eq!(info.cache_reads_price, 0.0);
        assert_eq!(info.cache_writes_price, 0.0);
    }
    let info = table().apply("openai/gpt-4o", ModelInfo::default(), None);
    assert_eq!(info, ModelInfo::default());
}
