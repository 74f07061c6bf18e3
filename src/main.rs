//! Binary entrypoint for the claimwarden CLI.
//!
//! Commands:
//! - `init` - write a starter `claimwarden.toml` and create the data directory
//! - `status` - print store contents and a brief summary
//! - `expire [--dry-run]` - run the claim expiry sweep once
//! - `migrate --to <backend> --to-dir <path>` - copy every record into another store
//!
//! See the library crate docs for module-level details: `claimwarden::`.
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};

use claimwarden::claims::{migrate, open_store, ClaimEngine, ClaimStore, Collaborators, StoreBackend};
use claimwarden::config::Config;

#[derive(Parser)]
#[command(name = "claimwarden")]
#[command(about = "Land claims, trust and claim blocks for shared block worlds")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "claimwarden.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Show store contents
    Status,
    /// Abandon claims whose owners have been away too long
    Expire {
        /// Only list the claims that would expire
        #[arg(long)]
        dry_run: bool,
    },
    /// Copy all claim data into another store
    Migrate {
        /// Target backend (sled or memory)
        #[arg(long)]
        to: StoreBackend,
        /// Target sled directory
        #[arg(long)]
        to_dir: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            info!("Initializing new claimwarden configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            let cfg = Config::default();
            tokio::fs::create_dir_all(&cfg.storage.data_dir).await?;
            info!("Data directory ready at {}", cfg.storage.data_dir);
        }
        Commands::Status => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            let store = open_configured_store(&config)?;
            let engine = ClaimEngine::open(config.claims.clone(), store, Collaborators::default())?;
            let caches = engine.caches();
            let top_level = engine.top_level_claims().len();
            println!("claimwarden v{}", env!("CARGO_PKG_VERSION"));
            println!("backend:      {}", engine.store().backend_name());
            println!("claims:       {} ({} top-level)", caches.claims.len(), top_level);
            println!("permissions:  {}", caches.permissions.len());
            println!("groups:       {}", caches.groups.len());
            println!("players:      {}", caches.players.len());
            if config.claims.claim_auto_expire {
                let expiring = engine.expiring_claims(chrono::Utc::now()).len();
                println!("expiring:     {expiring}");
            }
            engine.shutdown().await?;
        }
        Commands::Expire { dry_run } => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            let store = open_configured_store(&config)?;
            let mut engine = ClaimEngine::open(config.claims.clone(), store, Collaborators::default())?;
            let now = chrono::Utc::now();
            if dry_run {
                for claim in engine.expiring_claims(now) {
                    println!(
                        "claim {} owned by {} ({} days inactive)",
                        claim.key, claim.owner_name, claim.days_inactive
                    );
                }
            } else {
                if !config.claims.claim_auto_expire {
                    warn!("claims.claim_auto_expire is off; nothing will be expired");
                }
                let stats = engine.run_expiry_sweep(now);
                println!("{}", stats.summary_line());
            }
            engine.shutdown().await?;
        }
        Commands::Migrate { to, to_dir } => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            let source = open_configured_store(&config)?;
            // migrate flushes the target once at the end
            let target = open_store(to, &to_dir, false)?;
            let stats = tokio::task::spawn_blocking(move || migrate(source.as_ref(), target.as_ref())).await??;
            println!(
                "migrated {} claims, {} permissions, {} groups, {} player states to {} at {}",
                stats.claims, stats.permissions, stats.groups, stats.player_states, to, to_dir
            );
        }
    }

    Ok(())
}

fn open_configured_store(config: &Config) -> Result<Arc<dyn ClaimStore>> {
    let path = config.storage.claims_db_path();
    let store = open_store(config.storage.backend, &path, config.storage.flush_every_write)?;
    info!("opened {} store at {}", store.backend_name(), path.display());
    Ok(store)
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let log_file = config.as_ref().and_then(|cfg| cfg.logging.file.clone());
    if let Some(file) = log_file {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file)
        {
            let write_mutex = Arc::new(std::sync::Mutex::new(f));
            // Mirror to the console only when someone is watching
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
            let _ = builder.try_init();
            return;
        }
    }
    builder.format(|fmt, record| {
        writeln!(
            fmt,
            "{} [{}] {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            record.level(),
            record.args()
        )
    });
    let _ = builder.try_init();
}
