use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tst_tracker::config::TrackerConfig;
use tst_tracker::store::MemoryStore;
use tst_tracker::{web, Tracker};

#[derive(Parser)]
#[command(name = "tst-tracker")]
#[command(version, about = "Testing issue tracker dashboard backed by Supabase")]
struct Cli {
    /// Address to listen on, overriding TST_BIND
    #[arg(long)]
    bind: Option<String>,

    /// Run against an in-process store seeded with admin/admin
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("startup failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = TrackerConfig::from_env().context("Failed to read configuration")?;
    if let Some(bind) = cli.bind {
        config = config.with_bind_addr(&bind);
    }

    let tracker = if cli.memory {
        warn!("running against the in-memory store; data is lost on exit");
        if config.session_secret.is_empty() {
            let secret = format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple());
            config = config.with_session_secret(&secret);
        }
        let store = MemoryStore::new(&config.evidence_bucket).with_user("admin", "admin", Some("Administrator"));
        Tracker::in_memory(store, &config)?
    } else {
        Tracker::connect(&config)
            .await
            .context("Failed to connect to Supabase")?
    };

    info!(bind = %config.bind_addr, memory = cli.memory, "starting dashboard");
    web::serve(tracker, &config.bind_addr).await
}
