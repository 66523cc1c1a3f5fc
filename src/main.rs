use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use convo_journal::config::Config;
use convo_journal::poll;
use convo_journal::store::RedisKvStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Polls an LLM gateway's key-value store and journals normalized
/// conversation events per session.
#[derive(Parser)]
#[command(name = "convo-journal")]
#[command(about = "Incrementally journal LLM conversation traces from a key-value store", long_about = None)]
#[command(version)]
struct Cli {
    /// Perform exactly one pass and exit, instead of looping forever.
    #[arg(long)]
    once: bool,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().json())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn now_unix() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs_f64()
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(err.exit_code());
        }
    };

    let store = match RedisKvStore::connect(&config.redis_url).await {
        Ok(store) => store,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(err.exit_code());
        }
    };

    loop {
        let now = now_unix();
        match poll::run_pass(&store, &config, now).await {
            Ok(stats) => {
                tracing::info!(
                    sessions_scanned = stats.sessions_scanned,
                    sessions_errored = stats.sessions_errored,
                    "pass complete"
                );
            }
            Err(err) => {
                tracing::error!(error = %err, "pass failed");
            }
        }

        if cli.once {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(config.poll_interval_seconds)) => {}
            _ = wait_for_termination() => {
                tracing::info!("termination signal received, exiting after the current pass");
                break;
            }
        }
    }
}

/// Resolves once SIGTERM (or Ctrl-C) is received. A termination signal only
/// ever interrupts the inter-pass sleep, never a pass in progress, so the
/// state file always reflects a fully completed pass (§5).
async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = terminate.recv() => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
