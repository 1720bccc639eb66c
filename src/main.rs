//! Orbit command line: run one query through the built-in extensions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::Parser;

use orbit::core::{
    channel_sink, Dispatcher, ExtensionRegistry, Match, Publication, PublicationKind,
};
use orbit::{logging, services, Config};

#[derive(Parser)]
#[command(name = "orbit")]
#[command(about = "Launcher search core: run a query and print what it finds", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/orbit/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Tolerate typos when matching aliases
    #[arg(long)]
    fuzzy: bool,

    /// Response-time budget in milliseconds
    #[arg(long, value_name = "N")]
    budget_ms: Option<u64>,

    /// Activate the N-th result (1-based) and print its action
    #[arg(long, value_name = "N")]
    pick: Option<usize>,

    /// Log per-extension timings
    #[arg(short, long)]
    verbose: bool,

    /// The query, e.g. `gg rust traits` or `2^10`
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
}

/// Upper bound on how long to wait for slow extensions before exiting.
const MAX_WAIT: Duration = Duration::from_secs(10);

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(if cli.verbose { "orbit=debug" } else { "orbit=warn" });

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load(),
    };
    if cli.fuzzy {
        config.index.fuzzy = true;
    }
    if let Some(budget) = cli.budget_ms {
        config.query.budget_ms = budget.clamp(10, 2000);
    }

    let usage = services::open_usage(&config);
    let registry = Arc::new(ExtensionRegistry::new());
    for extension in services::builtin_extensions(&config, &usage) {
        registry.register(extension)?;
    }

    let (sink, publications) = channel_sink();
    let dispatcher = Dispatcher::new(registry, config.dispatch_config(), sink);
    dispatcher.setup_session();

    let input = cli.query.join(" ");
    let query = dispatcher.start_query(&input);

    let mut shown: Vec<Match> = Vec::new();
    let deadline = Instant::now() + MAX_WAIT;
    loop {
        match publications.recv_timeout(Duration::from_millis(20)) {
            Ok(publication) => print_publication(&publication, &mut shown),
            Err(_) if query.state().is_terminal() => break,
            Err(_) if Instant::now() >= deadline => {
                tracing::warn!("Giving up on outstanding extensions");
                break;
            }
            Err(_) => {}
        }
    }
    for publication in publications.try_iter() {
        print_publication(&publication, &mut shown);
    }
    if shown.is_empty() {
        println!("No results for '{}'", input);
    }

    let picked = match cli.pick {
        Some(n) => {
            let Some(m) = n.checked_sub(1).and_then(|i| shown.get(i)) else {
                bail!("There is no result #{} ({} shown)", n, shown.len());
            };
            Some(Arc::clone(&m.item))
        }
        None => None,
    };

    dispatcher.teardown_session();

    if let Some(item) = picked {
        usage.write().log_activation(&item);
        match item.default_action() {
            Some(action) => println!("\n{}: {:?}", item.text, action),
            None => println!("\n{}: no action", item.text),
        }
    }
    usage.write().flush().context("Failed to save usage data")?;

    Ok(())
}

fn print_publication(publication: &Publication, shown: &mut Vec<Match>) {
    let label = match publication.kind {
        PublicationKind::Sorted => "results",
        PublicationKind::Appended => "more results",
        PublicationKind::Fallbacks => "fallbacks",
    };
    if publication.matches.is_empty() {
        return;
    }

    println!("{}:", label);
    for m in &publication.matches {
        shown.push(m.clone());
        if m.item.subtext.is_empty() {
            println!("{:>3}. {}", shown.len(), m.item.text);
        } else {
            println!("{:>3}. {}  ({})", shown.len(), m.item.text, m.item.subtext);
        }
    }
}
