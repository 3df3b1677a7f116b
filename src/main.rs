//! evodex - evolution chart for one pokemon

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::{terminal, tty::IsTty};
use ratatui::{backend::CrosstermBackend, Terminal, TerminalOptions, Viewport};
use tracing_subscriber::EnvFilter;

use evodex::api::{HttpUpstream, Upstream};
use evodex::config::{Config, API_BASE, DEFAULT_CONCURRENCY};
use evodex::evolution::chart::chart_for_pokemon;
use evodex::render::{display_name, load_stage_cards, plain_text, EvolutionChartWidget};
use evodex::{OverrideTable, Resolver};

/// Print the evolution chart of a pokemon, regional forms included
#[derive(Parser, Debug)]
#[command(name = "evodex")]
#[command(about = "Evolution charts from PokeAPI with regional form handling")]
struct Args {
    /// Pokemon id, species slug or form slug (e.g. `vulpix-alola`)
    pokemon: String,

    /// PokeAPI base URL
    #[arg(long, env = "EVODEX_API_BASE", default_value = API_BASE)]
    api_base: String,

    /// Directory for cached API responses
    #[arg(long, env = "EVODEX_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Skip the on-disk response cache
    #[arg(long)]
    no_disk_cache: bool,

    /// Maximum upstream requests in flight
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// HTTP request timeout in seconds (0 disables it)
    #[arg(long, env = "EVODEX_TIMEOUT", default_value_t = 0)]
    timeout_secs: u64,

    /// RON override table to use instead of the built-in one
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Print plain text instead of drawing in the terminal
    #[arg(long)]
    plain: bool,

    /// Print the chart rows as JSON
    #[arg(long, conflicts_with = "plain")]
    json: bool,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::default()
        .with_api_base(args.api_base)
        .with_concurrency(args.concurrency)
        .with_timeout(Some(Duration::from_secs(args.timeout_secs)));
    let config = if args.no_disk_cache {
        config.with_cache_dir(None)
    } else if let Some(dir) = args.cache_dir {
        config.with_cache_dir(Some(dir))
    } else {
        config
    };

    let overrides = match &args.overrides {
        Some(path) => OverrideTable::load(path).await,
        None => OverrideTable::builtin(),
    }
    .map_err(io::Error::other)?;

    let upstream: Arc<dyn Upstream> =
        Arc::new(HttpUpstream::new(&config).map_err(io::Error::other)?);
    let resolver = Resolver::new(upstream, config);
    let chart = chart_for_pokemon(&resolver, &overrides, &args.pokemon).await;

    if args.json {
        let json = serde_json::to_string_pretty(&chart).map_err(io::Error::other)?;
        println!("{json}");
        return Ok(());
    }

    let cards = load_stage_cards(&resolver, &chart).await;
    if args.plain || !io::stdout().is_tty() {
        println!("{}", plain_text(&chart, &cards));
        return Ok(());
    }

    let widget = EvolutionChartWidget::new(&chart, &cards)
        .title(format!("EVOLUTION - {}", display_name(&args.pokemon)));
    let (_, rows) = terminal::size()?;
    let height = widget.height().min(rows.max(1));
    let mut terminal = Terminal::with_options(
        CrosstermBackend::new(io::stdout()),
        TerminalOptions {
            viewport: Viewport::Inline(height),
        },
    )?;
    terminal.draw(|frame| frame.render_widget(widget, frame.area()))?;
    println!();
    Ok(())
}
