use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::Style;
use orcache_core::{
    cache::{default_storage_root, CacheStore},
    endpoint::Endpoint,
    model::{CompatibleModelInfo, ModelInfo},
    OpenRouterClient, RefreshService,
};
use tracing_subscriber::EnvFilter;

// ── Palette ──────────────────────────────────────────────────────────

fn s_header() -> Style { Style::new().color256(252).bold() }  // bright gray, bold
fn s_dim() -> Style    { Style::new().color256(248) }         // light gray
fn s_hint() -> Style   { Style::new().color256(243) }         // soft gray
fn s_hot() -> Style    { Style::new().color256(114) }         // green
fn s_err() -> Style    { Style::new().color256(167) }         // red
fn s_price() -> Style  { Style::new().color256(109) }         // teal

fn fmt_price(p: f64) -> String {
    format!("${p:.2}/M")
}

fn fmt_opt_price(p: Option<f64>) -> String {
    p.map(fmt_price).unwrap_or_else(|| "-".into())
}

fn fmt_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{}k", n / 1_000)
    } else {
        n.to_string()
    }
}

// ── CLI Args ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "orcache",
    about = "Refresh and cache OpenRouter per-model endpoint metadata",
    version,
    after_help = "examples:\n  \
        orcache refresh google/gemini-2.5-pro\n  \
        orcache refresh anthropic/claude-sonnet-4 --json\n  \
        orcache show deepseek/deepseek-chat\n  \
        orcache list"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Host storage root; the cache lives in <root>/cache.
    /// Defaults to $ORCACHE_HOME, then the platform data directory.
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,

    /// Upstream fetch timeout in seconds.
    #[arg(long, global = true, default_value_t = 15)]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch fresh endpoints for a model, update the cache, and print the result.
    Refresh {
        model: String,
        #[arg(long, short)]
        json: bool,
    },
    /// Print a model's cached summary without touching the network.
    Show {
        model: String,
        #[arg(long, short)]
        json: bool,
    },
    /// List every cached model.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("orcache=info,orcache_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = match cli.storage_root {
        Some(root) => root,
        None => default_storage_root()
            .ok_or_else(|| anyhow::anyhow!("cannot determine storage directory; pass --storage-root"))?,
    };
    let cache = CacheStore::in_storage_root(&root)?;

    let result = match cli.command {
        Commands::Refresh { model, json } => {
            let client = OpenRouterClient::with_auto_token(Duration::from_secs(cli.timeout))?;
            cmd_refresh(RefreshService::with_bundled_overrides(client, cache)?, &model, json).await
        }
        Commands::Show { model, json } => cmd_show(&cache, &model, json),
        Commands::List => cmd_list(&cache),
    };

    if let Err(e) = result {
        eprintln!("{}", s_err().apply_to(format!("error: {e:#}")));
        std::process::exit(1);
    }
    Ok(())
}

// ── Commands ─────────────────────────────────────────────────────────

async fn cmd_refresh(
    service: RefreshService<OpenRouterClient>,
    model_id: &str,
    json: bool,
) -> anyhow::Result<()> {
    let out = service.refresh_endpoints(model_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    print_result(model_id, &out);
    println!(
        "  {}",
        s_hint().apply_to(format!("cache: {}", service.cache().path().display()))
    );
    println!();
    Ok(())
}

fn cmd_show(cache: &CacheStore, model_id: &str, json: bool) -> anyhow::Result<()> {
    let info = cache
        .get(model_id)
        .ok_or_else(|| anyhow::anyhow!("{model_id} is not in the cache"))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!();
        print_summary(model_id, &info);
        print_endpoints(&info.endpoints);
        println!();
    }
    Ok(())
}

fn cmd_list(cache: &CacheStore) -> anyhow::Result<()> {
    let Some(models) = cache.read() else {
        println!("  {}", s_dim().apply_to("cache is empty"));
        return Ok(());
    };

    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("  Model").fg(Color::AnsiValue(243)),
        Cell::new("Context").fg(Color::AnsiValue(243)),
        Cell::new("Input").fg(Color::AnsiValue(243)),
        Cell::new("Output").fg(Color::AnsiValue(243)),
        Cell::new("Cache").fg(Color::AnsiValue(243)),
    ]);
    for (id, info) in &models {
        table.add_row(vec![
            Cell::new(format!("  {id}")).fg(Color::AnsiValue(252)),
            Cell::new(fmt_tokens(info.context_window)).fg(Color::AnsiValue(248)),
            Cell::new(fmt_price(info.input_price)).fg(Color::AnsiValue(109)),
            Cell::new(fmt_price(info.output_price)).fg(Color::AnsiValue(109)),
            cache_cell(info),
        ]);
    }
    println!();
    println!("{table}");
    println!();
    println!(
        "  {}",
        s_hint().apply_to(format!("{} models in {}", models.len(), cache.path().display()))
    );
    Ok(())
}

// ── Rendering ────────────────────────────────────────────────────────

fn cache_cell(info: &ModelInfo) -> Cell {
    if info.supports_prompt_cache {
        Cell::new(format!(
            "w {} r {}",
            fmt_price(info.cache_writes_price),
            fmt_price(info.cache_reads_price)
        ))
        .fg(Color::AnsiValue(114))
    } else {
        Cell::new("-").fg(Color::AnsiValue(245))
    }
}

fn print_result(model_id: &str, out: &CompatibleModelInfo) {
    println!();
    let Some(info) = out.models.get(model_id) else {
        return;
    };
    print_summary(model_id, info);
    print_endpoints(out.endpoints.for_model(model_id));
}

fn print_summary(model_id: &str, info: &ModelInfo) {
    println!("  {}", s_header().apply_to(model_id));
    if !info.description.is_empty() {
        let first_line = info.description.lines().next().unwrap_or_default();
        println!("  {}", s_dim().apply_to(first_line));
    }
    println!(
        "  {} ctx   {} max out   in {}   out {}",
        fmt_tokens(info.context_window),
        fmt_tokens(info.max_tokens),
        s_price().apply_to(fmt_price(info.input_price)),
        s_price().apply_to(fmt_price(info.output_price)),
    );
    if info.supports_prompt_cache {
        println!(
            "  {}   writes {}   reads {}",
            s_hot().apply_to("prompt cache"),
            s_price().apply_to(fmt_price(info.cache_writes_price)),
            s_price().apply_to(fmt_price(info.cache_reads_price)),
        );
    }
    if info.supports_images {
        println!("  {}", s_dim().apply_to("accepts images"));
    }
}

fn print_endpoints(endpoints: &[Endpoint]) {
    if endpoints.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("  Provider").fg(Color::AnsiValue(243)),
        Cell::new("Tag").fg(Color::AnsiValue(243)),
        Cell::new("Context").fg(Color::AnsiValue(243)),
        Cell::new("Input").fg(Color::AnsiValue(243)),
        Cell::new("Output").fg(Color::AnsiValue(243)),
        Cell::new("Cache read").fg(Color::AnsiValue(243)),
        Cell::new("Uptime").fg(Color::AnsiValue(243)),
    ]);
    for e in endpoints {
        let uptime_color = if e.uptime_last30m >= 99.0 {
            Color::AnsiValue(114)
        } else if e.uptime_last30m >= 90.0 {
            Color::AnsiValue(214)
        } else {
            Color::AnsiValue(167)
        };
        table.add_row(vec![
            Cell::new(format!("  {}", e.provider_name)).fg(Color::AnsiValue(252)),
            Cell::new(&e.tag).fg(Color::AnsiValue(248)),
            Cell::new(fmt_tokens(e.context_length)).fg(Color::AnsiValue(248)),
            Cell::new(fmt_opt_price(e.prompt_price)).fg(Color::AnsiValue(109)),
            Cell::new(fmt_opt_price(e.completion_price)).fg(Color::AnsiValue(109)),
            Cell::new(fmt_opt_price(e.input_cache_read_price)).fg(Color::AnsiValue(109)),
            Cell::new(format!("{:.1}%", e.uptime_last30m)).fg(uptime_color),
        ]);
    }
    println!();
    println!("{table}");
    println!();
}
