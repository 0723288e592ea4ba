//! `thr-tui` — terminal console for the THR controls registry.
//!
//! Built on [ratatui](https://ratatui.rs). The selector bar picks a
//! technology family (tabs), a technology (dropdown) and a search term;
//! the table below lists the matching controls, expands one row into a
//! detail panel, and swaps to a full-record form for create/edit.
//!
//! Logs are written to a file (default `/tmp/thr-tui.log`) so they never
//! corrupt the terminal. A background data bridge forwards every
//! registry snapshot into the action loop.

mod action;
mod app;
mod component;
mod components;
mod data_bridge;
mod event;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use secrecy::SecretString;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use thr_core::{Registry, RegistryConfig};

use crate::app::App;

/// Terminal console for browsing and editing hardening controls.
#[derive(Parser, Debug)]
#[command(name = "thr-tui", version, about)]
struct Cli {
    /// Registry URL (e.g., https://abc.supabase.co)
    #[arg(short = 'u', long, env = "THR_URL")]
    url: Option<String>,

    /// API key for the registry
    #[arg(short = 'k', long, env = "THR_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Config profile to use when no URL is given
    #[arg(short = 'p', long, env = "THR_PROFILE")]
    profile: Option<String>,

    /// Run against built-in sample data instead of a remote registry
    #[arg(long)]
    demo: bool,

    /// Log file path (defaults to /tmp/thr-tui.log)
    #[arg(long, default_value = "/tmp/thr-tui.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. Nothing may log to stdout/stderr while the
/// terminal is in raw mode. The returned guard flushes on drop.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("thr_tui={log_level},thr_core={log_level},thr_api={log_level}"))
    });

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("thr-tui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Build a [`Registry`] from `--url` / `--api-key`, if both were given.
fn build_registry_from_flags(cli: &Cli) -> Result<Option<Registry>> {
    let (Some(url), Some(api_key)) = (cli.url.as_deref(), cli.api_key.as_deref()) else {
        return Ok(None);
    };
    let url = thr_config::parse_url(url)?;
    let config = RegistryConfig::new(url, SecretString::from(api_key.to_owned()));
    Ok(Some(Registry::connect(&config)?))
}

/// Build a [`Registry`] from the shared config file.
fn build_registry_from_config(cli: &Cli) -> Result<Registry> {
    let cfg = thr_config::load_config()?;
    let name = cfg.active_profile_name(cli.profile.as_deref());
    let profile = cfg.profile(&name)?;
    let config = thr_config::profile_to_registry_config(profile, &name)?;
    Ok(Registry::connect(&config)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Hooks first so a panic during init still restores the terminal
    tui::install_hooks()?;

    let _log_guard = setup_tracing(&cli);

    info!(
        url = cli.url.as_deref().unwrap_or("(not set)"),
        demo = cli.demo,
        "starting thr-tui"
    );

    // Priority: --demo > CLI flags > config file
    let registry = if cli.demo {
        Registry::demo()
    } else if let Some(registry) = build_registry_from_flags(&cli)? {
        registry
    } else {
        build_registry_from_config(&cli).wrap_err(
            "no registry configured: run `thr config init`, pass --url and --api-key, or use --demo",
        )?
    };

    let mut app = App::new(registry);
    app.run().await?;

    Ok(())
}
