use anyhow::Context;
use clap::Parser;
use detent::config;
use detent::pipeline::Core;
use detent::sys::event_loop;
use detent::sys::headless::{self, LogRender};
use detent::sys::runtime::{self, Services};
use detentctl::wire::SOCKET_PATH;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Input-to-action daemon for detented radial controllers", long_about = None)]
struct Args {
    /// Configuration file (defaults to the per-user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Socket that accepts raw input lines
    #[arg(short, long, default_value = SOCKET_PATH)]
    socket: PathBuf,

    /// Write the default configuration if none exists, then exit
    #[arg(long)]
    init: bool,

    /// Validate the configuration, then exit
    #[arg(long)]
    check: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => config::get_config_path()?,
    };

    if args.init {
        let written = config::write_default_config(&config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        if written {
            log::info!("Wrote default configuration to {}", config_path.display());
        } else {
            log::info!("{} already exists, left untouched", config_path.display());
        }
        return Ok(());
    }

    let config = config::load_or_default(&config_path)
        .with_context(|| format!("Invalid configuration {}", config_path.display()))?;
    let core = Core::new(
        &config,
        Box::new(headless::chooser(&config)),
        Box::new(LogRender::default()),
    )
    .with_context(|| format!("Invalid configuration {}", config_path.display()))?;

    if args.check {
        println!("{}: ok", config_path.display());
        return Ok(());
    }

    let (tx, rx) = async_channel::bounded(64);

    // Start Background Services
    runtime::start_background_services(
        Services {
            socket: args.socket,
            config_path: config_path.clone(),
            serial: config.serial.iter().map(|s| s.path.clone()).collect(),
        },
        tx,
    );

    event_loop::run(core, rx, &config_path)
}
