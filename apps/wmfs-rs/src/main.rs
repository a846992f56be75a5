use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, Context as _, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wmfs_rs::commands::Bindings;
use wmfs_rs::core::context::Context;
use wmfs_rs::core::x11::X11Display;
use wmfs_rs::ewmh::setup::{set_status_text, setup_hints};
use wmfs_rs::window::draw::X11Renderer;
use wmfs_rs::window::error::WmError;
use wmfs_rs::window::events::RunOutcome;
use wmfs_rs::window::manager::WindowManager;
use wmfs_rs_config::WmConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file [default: $XDG_CONFIG_HOME/wmfs-rs/config.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replace the existing window manager
    #[arg(long)]
    replace: bool,

    /// Set the infobar status text of the running instance and exit
    #[arg(long, value_name = "TEXT")]
    status: Option<String>,

    /// Write the default configuration to PATH and exit
    #[arg(long, value_name = "PATH")]
    dump_config: Option<PathBuf>,

    /// Validate the configuration and its bindings, then exit
    #[arg(long)]
    check: bool,
}

fn load_config(path: &Path) -> Result<WmConfig> {
    WmConfig::load(path)
        .map_err(WmError::from)
        .with_context(|| format!("loading {}", path.display()))
}

/// Fails when any binding does not resolve.
fn check_config(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    let (_, errors) = Bindings::from_config(&config);
    for e in &errors {
        error!("{}", e);
    }
    if !errors.is_empty() {
        return Err(anyhow!("{} invalid binding(s) in {}", errors.len(), path.display()));
    }
    info!("{} is valid", path.display());
    Ok(())
}

fn run_manager(ctx: Rc<Context>, config_path: &Path) -> Result<()> {
    let mut config = load_config(config_path)?;
    setup_hints(&ctx)?;
    loop {
        let display = X11Display::new(Rc::clone(&ctx))?;
        let renderer = X11Renderer::new(Rc::clone(&ctx), &config)?;

        let mut wm = WindowManager::new(display, renderer, config)?;
        wm.scan()?;
        let outcome = wm.run();
        if let Err(e) = wm.shutdown() {
            warn!("Shutdown incomplete: {}", e);
        }

        match outcome? {
            RunOutcome::Quit => return Ok(()),
            RunOutcome::Reload => {
                info!("Reloading configuration from {}", config_path.display());
                config = match load_config(config_path) {
                    Ok(config) => config,
                    Err(e) => {
                        error!("Keeping previous configuration: {:#}", e);
                        wm.config
                    }
                };
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(WmConfig::default_path);

    if let Some(path) = args.dump_config {
        WmConfig::default().save(&path).await?;
        info!("Wrote default configuration to {}", path.display());
        return Ok(());
    }
    if args.check {
        return check_config(&config_path);
    }

    let ctx = Context::new().context("connecting to the X server")?;
    info!("Screen: {}, Root Window: {}", ctx.screen_num, ctx.root_window);

    if let Some(text) = args.status {
        return set_status_text(&ctx, &text);
    }

    ctx.acquire_wm_selection(args.replace)?;
    ctx.become_wm()?;

    info!("Starting wmfs-rs");
    run_manager(Rc::new(ctx), &config_path)
}
