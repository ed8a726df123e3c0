//! pagepipe entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use pagepipe::{HttpTransport, PageLength, PageRequest, PagedResultCache, PipeConfig};
use pagepipe_cli::args::{parse_length, parse_param, parse_sort};
use pagepipe_cli::config::load_config;
use pagepipe_cli::pager::Pager;
use pagepipe_cli::render::{render_page, render_window};

#[derive(Parser)]
#[command(
    name = "pagepipe",
    about = "Pipelining page cache for server-side paged JSON tables",
    version
)]
struct Cli {
    /// Path to a JSON config file.
    /// Also reads PAGEPIPE_CONFIG, ./.pagepipe/config.json, ~/.pagepipe/config.json.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one or more consecutive pages through the cache.
    Fetch {
        /// Endpoint URL answering grid-control page queries.
        #[arg(short, long)]
        endpoint: String,

        /// Zero-based offset of the first row.
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Page length (number or "all"). Defaults to the configured page size.
        #[arg(short, long)]
        length: Option<String>,

        /// Number of consecutive pages to fetch.
        #[arg(long, default_value_t = 1)]
        pages: usize,

        /// Sort column as COLUMN[:asc|desc]; repeat for multi-column sorts.
        #[arg(long = "sort")]
        sort: Vec<String>,

        /// Free-text filter.
        #[arg(long)]
        search: Option<String>,

        /// Extra query parameter as KEY=VALUE; repeatable.
        #[arg(long = "param")]
        params: Vec<String>,

        /// Print aligned text instead of JSON.
        #[arg(long)]
        table: bool,
    },

    /// Page through a table interactively.
    Repl {
        /// Endpoint URL answering grid-control page queries.
        #[arg(short, long)]
        endpoint: String,

        /// Initial page length (number or "all").
        #[arg(short, long)]
        length: Option<String>,

        /// Extra query parameter as KEY=VALUE; repeatable.
        #[arg(long = "param")]
        params: Vec<String>,
    },

    /// Serve a generated demo table over HTTP.
    #[cfg(feature = "serve")]
    Serve {
        /// Listen address (host:port).
        #[arg(long, default_value = "127.0.0.1:3200")]
        addr: String,

        /// Number of rows in the demo table.
        #[arg(long, default_value_t = 1000)]
        rows: usize,
    },

    /// Print the effective configuration as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   pagepipe completions bash > ~/.local/share/bash-completion/completions/pagepipe
    ///   pagepipe completions zsh > ~/.zfunc/_pagepipe
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn page_length(raw: Option<&str>, config: &PipeConfig) -> anyhow::Result<PageLength> {
    match raw {
        Some(raw) => Ok(parse_length(raw)?),
        None => Ok(PageLength::Rows(config.default_page_size)),
    }
}

fn parse_params(raw: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    raw.iter()
        .map(|p| parse_param(p).map_err(anyhow::Error::from))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (config, config_path) = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Fetch {
            endpoint,
            start,
            length,
            pages,
            sort,
            search,
            params,
            table,
        } => {
            let length = page_length(length.as_deref(), &config)?;
            let params = parse_params(&params)?;
            let transport = HttpTransport::new(endpoint, &config)?;
            let cache = PagedResultCache::new(transport, config);

            let mut template = PageRequest::new(start, length);
            template.search = search;
            template.params = params;
            for spec in &sort {
                template.sort.push(parse_sort(spec)?);
            }

            let mut responses = Vec::new();
            for i in 0..pages.max(1) {
                let offset = match length {
                    PageLength::Rows(n) => start.saturating_add(i.saturating_mul(n)),
                    PageLength::All => start,
                };
                let mut request = template.clone().with_echo(i as u64 + 1);
                request.display_start = offset;
                let page = cache.resolve(&request).await?;

                if table {
                    println!("{}", render_page(&page, offset));
                }
                let last = page.rows.is_empty() || length.is_all();
                responses.push(page);
                if last {
                    break;
                }
            }

            if table {
                let snapshot = cache.snapshot().await;
                eprint!("{}", render_window(&snapshot, &cache.stats()));
            } else if responses.len() == 1 {
                println!("{}", serde_json::to_string_pretty(&responses[0])?);
            } else {
                println!("{}", serde_json::to_string_pretty(&responses)?);
            }

            let stats = cache.stats();
            tracing::info!(
                "{} pages: {} hits, {} misses",
                responses.len(),
                stats.hits,
                stats.misses
            );
        }

        Commands::Repl {
            endpoint,
            length,
            params,
        } => {
            let length = page_length(length.as_deref(), &config)?;
            let pager = Pager::new(length).with_params(parse_params(&params)?);
            let transport = HttpTransport::new(endpoint.clone(), &config)?;
            let cache = Arc::new(PagedResultCache::new(transport, config));
            let handle = tokio::runtime::Handle::current();

            tokio::task::spawn_blocking(move || {
                pagepipe_cli::repl::run(cache, pager, &endpoint, handle)
            })
            .await??;
        }

        #[cfg(feature = "serve")]
        Commands::Serve { addr, rows } => {
            let table = pagepipe::MemoryTable::generate(rows);
            pagepipe_cli::server::run(&addr, table).await?;
        }

        Commands::Info => {
            let info = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "config_path": config_path.map(|p| p.display().to_string()),
                "config": config,
                "features": {
                    "serve": cfg!(feature = "serve"),
                },
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "pagepipe", &mut std::io::stdout());
        }
    }

    Ok(())
}
