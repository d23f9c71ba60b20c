//! usage-bar-gui - typing/break notification overlay
//!
//! Connects to the usage monitor's Unix socket and mirrors the current
//! notification state on every screen, either as a small corner indicator or
//! as a centered banner.

mod app;
mod config;
mod connection;
mod dispatch;
mod display;
mod logging;
mod notification;
mod overlay;
mod shutdown;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use crate::app::UsageBarApp;
use crate::config::AppConfig;
use crate::connection::UnixSocketConnector;
use crate::dispatch::{DispatchLoop, RetryPolicy};
use crate::display::x11::X11Display;
use crate::display::discover_screens;

/// usage-bar-gui - notification overlay for the usage monitor
#[derive(Parser, Debug)]
#[command(name = "usage-bar-gui")]
#[command(about = "Shows typing and break notifications as an overlay on every screen")]
struct Args {
    /// Configuration file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Socket path of the usage monitor
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// List the screens overlays would be drawn on and exit
    #[arg(long)]
    list_screens: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Write the effective configuration to PATH and exit
    #[arg(long, value_name = "PATH")]
    save_config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("usage-bar-gui: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = config::load_or_default(args.config.as_deref())?;
    if let Some(socket) = args.socket {
        config.connection.socket_path = socket;
    }

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Some(path) = args.save_config.as_deref() {
        config::save_config(&config, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Wrote configuration to {:?}", path);
        return Ok(());
    }

    let mut display = X11Display::connect(&config.overlay).context("Cannot open X display")?;

    if args.list_screens {
        list_screens(&mut display, &config);
        return Ok(());
    }

    info!("usage-bar-gui starting...");
    let shutdown = shutdown::install_signal_handler()?;

    let mut app = UsageBarApp::new(display, &config)?;

    let connection = &config.connection;
    let connector = UnixSocketConnector::new(&connection.socket_path, Some(connection.read_poll()));
    let policy = RetryPolicy {
        connect_retry: connection.connect_retry(),
        reconnect_delay: connection.reconnect_delay(),
    };
    let mut dispatch = DispatchLoop::new(connector, shutdown, policy, connection.read_buffer_size);

    app.run(&mut dispatch)?;

    info!("usage-bar-gui shutdown complete");
    Ok(())
}

fn list_screens(display: &mut X11Display, config: &AppConfig) {
    let screens = discover_screens(display, config.overlay.max_screens);
    println!("Available screens:");
    for (index, screen) in screens.iter().enumerate() {
        println!("  [{}] {}", index, screen);
    }
}
