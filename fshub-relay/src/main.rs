//! fshub-relay: FSHub webhook → Discord relay with audit log and admin API.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::DateTime;
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tracing_subscriber::{fmt, EnvFilter};

use fshub_core::config::{self, Config};
use fshub_core::{classify, transform, Classification, DiscordMessage};

mod db;
mod delivery;
mod pipeline;
mod web;

use delivery::DiscordClient;
use pipeline::Pipeline;
use web::AppState;

#[derive(Parser)]
#[command(name = "fshub-relay", version, about = "Relay FSHub webhooks to Discord")]
struct Cli {
    /// Config file (default: ~/.fshub-relay/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides config)
    #[arg(long, global = true, env = "FSHUB_DB")]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook receiver and admin API
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Externally reachable base URL shown as the FSHub webhook target
        #[arg(long)]
        public_url: Option<String>,

        /// Discord webhook URL (a URL stored via the admin API takes precedence)
        #[arg(long, env = "FSHUB_DISCORD_WEBHOOK")]
        discord_webhook: Option<String>,

        /// Bearer token for /admin routes
        #[arg(long, env = "FSHUB_ADMIN_TOKEN")]
        admin_token: Option<String>,
    },

    /// Show audit log counters
    Stats,

    /// Show the most recent audit records
    Logs {
        /// Number of records
        #[arg(short = 'n', long, default_value = "20")]
        limit: i64,
    },

    /// Send a canned test notification for an event type
    Test {
        /// flight.departed, flight.completed, airline.achievement or screenshots.uploaded
        event_type: String,

        /// Discord webhook URL (defaults to the stored or configured one)
        #[arg(long, env = "FSHUB_DISCORD_WEBHOOK")]
        discord_webhook: Option<String>,
    },

    /// Render a saved webhook body and print the Discord payload without sending
    Preview {
        /// Path to a JSON file, or "-" for stdin
        file: PathBuf,
    },

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    // RUST_LOG overrides, e.g. RUST_LOG=debug,tower_http=debug
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fshub_relay=info,fshub_core=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::config_file);
    let mut cfg = config::load_config_from(&config_path);
    if let Some(path) = cli.db_path {
        cfg.database.path = path;
    }

    match cli.command {
        Commands::Serve {
            host,
            port,
            public_url,
            discord_webhook,
            admin_token,
        } => {
            if let Some(h) = host {
                cfg.server.host = h;
            }
            if let Some(p) = port {
                cfg.server.port = p;
            }
            if public_url.is_some() {
                cfg.server.public_url = public_url;
            }
            if discord_webhook.is_some() {
                cfg.discord_webhook = discord_webhook;
            }
            if admin_token.is_some() {
                cfg.admin_token = admin_token;
            }
            cmd_serve(cfg).await
        }
        Commands::Stats => cmd_stats(&cfg.database.path),
        Commands::Logs { limit } => cmd_logs(&cfg.database.path, limit),
        Commands::Test {
            event_type,
            discord_webhook,
        } => cmd_test(cfg, &event_type, discord_webhook).await,
        Commands::Preview { file } => cmd_preview(&file),
        Commands::InitConfig { force } => cmd_init_config(&config_path, force),
    }
}

fn app_state(cfg: &Config) -> Arc<AppState> {
    if let Some(dir) = Path::new(&cfg.database.path)
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
    {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Error creating {}: {e}", dir.display());
            std::process::exit(1);
        }
    }
    // Fail early on an unusable database path
    if let Err(e) = db::Database::open(&cfg.database.path) {
        eprintln!("Error opening database {}: {e}", cfg.database.path);
        std::process::exit(1);
    }

    let discord = DiscordClient::new().unwrap_or_else(|e| {
        eprintln!("Error building HTTP client: {e}");
        std::process::exit(1);
    });

    Arc::new(AppState {
        db: Arc::new(db::SqliteDb::new(cfg.database.path.clone())),
        discord: Arc::new(discord),
        webhook_url: cfg.discord_webhook.clone(),
        admin_token: cfg.admin_token.clone(),
        public_url: cfg.server.base_url(),
    })
}

async fn cmd_serve(cfg: Config) {
    let state = app_state(&cfg);
    if let Err(e) = web::serve(state, &cfg.server.host, cfg.server.port).await {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}

fn open_db(db_path: &str) -> db::Database {
    db::Database::open(db_path).unwrap_or_else(|e| {
        eprintln!("Error opening database {db_path}: {e}");
        std::process::exit(1);
    })
}

fn cmd_stats(db_path: &str) {
    let database = open_db(db_path);
    let stats = database.stats();

    println!();
    println!("Database: {db_path}");
    println!();
    println!("  Webhooks received:  {}", stats.webhooks_received);
    println!("  Webhooks ignored:   {}", stats.webhooks_ignored);
    println!("  Discord sent:       {}", stats.discord_sent);
    println!("  Discord errors:     {}", stats.discord_errors);
    println!("  Tests sent:         {}", stats.tests_sent);
    println!("  Total records:      {}", database.count_all());
    println!();
}

fn format_timestamp(ts: f64) -> String {
    let secs = ts.floor() as i64;
    let nanos = ((ts - ts.floor()) * 1e9) as u32;
    DateTime::from_timestamp(secs, nanos)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".into())
}

fn cmd_logs(db_path: &str, limit: i64) {
    let database = open_db(db_path);
    let rows = database.recent(limit.max(1)).unwrap_or_else(|e| {
        eprintln!("Error reading audit log: {e}");
        std::process::exit(1);
    });

    if rows.is_empty() {
        println!("No audit records.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Time (UTC)", "Type", "Status", "Payload", "Message"]);

    for row in &rows {
        table.add_row(vec![
            Cell::new(row.id),
            Cell::new(format_timestamp(row.timestamp)),
            Cell::new(&row.log_type),
            Cell::new(&row.status),
            Cell::new(row.payload_id.as_deref().unwrap_or("-")),
            Cell::new(row.message.as_deref().unwrap_or("")),
        ]);
    }

    println!("{table}");
}

async fn cmd_test(cfg: Config, event_type: &str, discord_webhook: Option<String>) {
    let state = app_state(&cfg);
    let webhook_url = match discord_webhook {
        Some(url) => Some(url),
        None => state.effective_webhook().await.0,
    };

    let pipeline = Pipeline::new(
        webhook_url.as_deref(),
        state.discord.as_ref(),
        state.db.as_ref(),
    );
    let report = pipeline.run_test(event_type).await;

    println!("{} [{}] {}", report.test_sent, report.status.as_str(), report.message);
    if report.status != db::LogStatus::Success {
        std::process::exit(1);
    }
}

fn cmd_preview(file: &Path) {
    let mut raw = Vec::new();
    let read = if file.to_str() == Some("-") {
        std::io::stdin().read_to_end(&mut raw)
    } else {
        std::fs::File::open(file).and_then(|mut f| f.read_to_end(&mut raw))
    };
    if let Err(e) = read {
        eprintln!("Error reading {}: {e}", file.display());
        std::process::exit(1);
    }

    let (event_type, event) = match classify(&raw) {
        Classification::Rejected { reason } => {
            eprintln!("Rejected: {reason}");
            std::process::exit(1);
        }
        Classification::Ignored { event } => {
            println!(
                "Ignored event type: {}",
                event.event_type.unwrap_or_default()
            );
            return;
        }
        Classification::Accepted { event_type, event } => (event_type, event),
    };

    let message = DiscordMessage::from(&transform(event_type, &event.data));
    match serde_json::to_string_pretty(&message) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing payload: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_init_config(path: &Path, force: bool) {
    if path.exists() && !force {
        eprintln!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
        std::process::exit(1);
    }

    if let Err(e) = config::save_config_to(&Config::default(), path) {
        eprintln!("Error writing {}: {e}", path.display());
        std::process::exit(1);
    }
    println!("Wrote {}", path.display());
}
