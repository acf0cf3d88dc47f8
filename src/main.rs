use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keeper_dashboard::api::{self, AppState};
use keeper_dashboard::client::{ConnectionState, DashboardClient, ReconnectingSubscriber};
use keeper_dashboard::config::DashboardConfig;
use keeper_dashboard::events::Broadcaster;
use keeper_dashboard::models::{ChangeEvent, ChangeKind, SeedDetail};
use keeper_dashboard::store::FileStore;
use keeper_dashboard::vault::{self, SectionBody};
use keeper_dashboard::watcher::ChangeWatcher;

#[derive(Parser)]
#[command(name = "keeper")]
#[command(about = "Live dashboard for Keeper seed vaults and decisions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard API and live-update stream
    Serve {
        /// Port for HTTP API (default: KEEPER_PORT or 3333)
        #[arg(short, long)]
        port: Option<u16>,

        /// Keeper root containing seeds/ and decisions/
        #[arg(short, long)]
        keeper_dir: Option<PathBuf>,

        /// Seed vault directory (overrides --keeper-dir)
        #[arg(long)]
        seeds_dir: Option<PathBuf>,

        /// Decision directory (overrides --keeper-dir)
        #[arg(long)]
        decisions_dir: Option<PathBuf>,
    },
    /// Follow live updates from a running dashboard, re-fetching what changed
    Watch {
        /// API base URL (default: KEEPER_URL or http://127.0.0.1:3333/api)
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Check server health
    Status {
        #[arg(short, long)]
        url: Option<String>,
    },
    /// List the seeds of a vault, or show one seed
    Seed {
        vault: String,
        seed: Option<String>,

        #[arg(short, long)]
        url: Option<String>,
    },
}

/// Initialize tracing with output to stderr (client commands) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "keeper_dashboard=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // Client commands print results on stdout
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = !matches!(cli.command, None | Some(Commands::Serve { .. }));
    init_tracing(use_stderr);

    match cli.command {
        Some(Commands::Serve {
            port,
            keeper_dir,
            seeds_dir,
            decisions_dir,
        }) => {
            let mut config = DashboardConfig::from_env();
            if let Some(root) = keeper_dir {
                let rooted = DashboardConfig::with_keeper_dir(root);
                config.seeds_dir = rooted.seeds_dir;
                config.decisions_dir = rooted.decisions_dir;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(dir) = seeds_dir {
                config.seeds_dir = dir;
            }
            if let Some(dir) = decisions_dir {
                config.decisions_dir = dir;
            }
            serve(config).await?;
        }
        Some(Commands::Watch { url }) => watch(client_for(url)).await?,
        Some(Commands::Status { url }) => {
            let client = client_for(url);
            let health = client.health().await?;
            println!(
                "{} is {} (server time {})",
                client.base_url(),
                health.status,
                health.timestamp.to_rfc3339()
            );
        }
        Some(Commands::Seed { vault, seed, url }) => {
            let client = client_for(url);
            match seed {
                Some(seed) => print_seed(&client.get_seed(&vault, &seed).await?)?,
                None => {
                    let list = client.list_seeds(&vault).await?;
                    println!("{} ({:?})", list.name, list.kind);
                    for seed in list.seeds {
                        println!("  {}", seed);
                    }
                }
            }
        }
        None => serve(DashboardConfig::from_env()).await?,
    }

    Ok(())
}

fn client_for(url: Option<String>) -> DashboardClient {
    match url {
        Some(url) => DashboardClient::new(url),
        None => DashboardClient::from_env(),
    }
}

async fn serve(config: DashboardConfig) -> anyhow::Result<()> {
    let store = FileStore::from_config(&config);
    let broadcaster = Broadcaster::new();

    let (changes_tx, changes_rx) = mpsc::unbounded_channel();
    let watcher = ChangeWatcher::start(&config.seeds_dir, &config.decisions_dir, changes_tx);
    tokio::spawn(broadcaster.clone().run(changes_rx));

    let app = api::create_router(AppState::new(store, broadcaster.clone()));

    let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
    tracing::info!("Keeper dashboard listening on http://{}", listener.local_addr()?);
    for dir in watcher.watched_dirs() {
        tracing::info!("Live updates for {}", dir.display());
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            let closed = broadcaster.disconnect_all();
            tracing::info!("Shutting down, closed {} live channel(s)", closed);
        })
        .await?;

    drop(watcher);
    Ok(())
}

async fn watch(client: DashboardClient) -> anyhow::Result<()> {
    let refresher = client.clone();
    let mut subscriber = ReconnectingSubscriber::spawn(client, move |event| {
        tokio::spawn(refresh(refresher.clone(), event));
    });

    let mut status = subscriber.watch_status();
    let indicator = tokio::spawn(async move {
        let mut shown = None;
        while status.changed().await.is_ok() {
            let state = status.borrow_and_update().state;
            if shown == Some(state) {
                continue;
            }
            shown = Some(state);
            match state {
                ConnectionState::Connected => println!("● Live"),
                ConnectionState::Connecting => println!("○ Connecting..."),
                ConnectionState::Disconnected => println!("○ Disconnected"),
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    subscriber.shutdown();
    indicator.abort();
    Ok(())
}

/// Re-read whatever an event points at. The event itself is only a hint.
async fn refresh(client: DashboardClient, event: ChangeEvent) {
    match event.kind {
        ChangeKind::VaultUpdated => {
            let name = event.resource_name();
            match client.get_vault(name).await {
                Ok(vault) => println!(
                    "vault {} refreshed ({} seeds)",
                    vault.name,
                    vault::seed_names(&vault.content).len()
                ),
                Err(e) => tracing::warn!("Failed to refresh vault {}: {}", name, e),
            }
        }
        ChangeKind::DecisionUpdated => match client.list_decisions().await {
            Ok(decisions) => {
                let latest = decisions.first().map(|d| d.id.as_str()).unwrap_or("-");
                println!(
                    "decisions refreshed ({} total, latest {})",
                    decisions.len(),
                    latest
                );
            }
            Err(e) => tracing::warn!("Failed to refresh decisions: {}", e),
        },
    }
}

fn print_seed(detail: &SeedDetail) -> anyhow::Result<()> {
    match &detail.container {
        Some(container) => println!("{} / {} / {}", detail.vault, container, detail.name),
        None => println!("{} / {}", detail.vault, detail.name),
    }

    for section in detail.attributes.sections() {
        println!();
        println!("{} {}", if section.danger { "!" } else { "#" }, section.title);
        match &section.body {
            SectionBody::Text(text) => println!("  {}", text),
            SectionBody::Code(code) => println!("  `{}`", code),
            SectionBody::Tags(tags) => {
                let tags: Vec<_> = tags.iter().map(|t| format!("[{}]", t)).collect();
                println!("  {}", tags.join(" "));
            }
            SectionBody::List(items) => {
                let bullet = if section.danger { "-" } else { "+" };
                for item in items {
                    println!("  {} {}", bullet, item);
                }
            }
            SectionBody::Flag(required) => {
                println!("  {}", if *required { "Required" } else { "Not required" })
            }
        }
    }

    println!();
    println!("# Raw Data");
    println!("{}", serde_json::to_string_pretty(&detail.raw)?);
    Ok(())
}
