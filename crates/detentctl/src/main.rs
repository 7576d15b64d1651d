use anyhow::Context;
use clap::{Parser, Subcommand};
use detentctl::client::Client;
use detentctl::wire::{InputLine, RawEvent, SOCKET_PATH, Turn};
use fs_err as fs;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "detentctl", version, about, long_about = None)]
struct Cli {
    /// Path of the daemon's input socket
    #[arg(short = 's', long, default_value = SOCKET_PATH)]
    socket: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Press a press-release button and keep it down
    Press { device: String },
    /// Release a press-release button
    Release { device: String },
    /// Press and release a press-release button
    Tap {
        device: String,
        /// How long the button stays down
        #[arg(long, default_value_t = 50)]
        hold_ms: u64,
    },
    /// Click a click button
    Click { device: String },
    /// Turn a rotary encoder
    Turn {
        device: String,
        /// `up`/`cw` or `down`/`ccw`
        direction: Turn,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
        /// Pause between consecutive detents
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },
    /// Send a key to a keyboard device
    Key { device: String, key: String },
    /// Forward a stream of input lines from a file, or stdin when omitted
    Replay { file: Option<PathBuf> },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut client = Client::connect(&cli.socket)?;

    match cli.command {
        Commands::Press { device } => client.send(&InputLine::new(device, RawEvent::Press))?,
        Commands::Release { device } => client.send(&InputLine::new(device, RawEvent::Release))?,
        Commands::Tap { device, hold_ms } => {
            client.send(&InputLine::new(device.clone(), RawEvent::Press))?;
            thread::sleep(Duration::from_millis(hold_ms));
            client.send(&InputLine::new(device, RawEvent::Release))?;
        }
        Commands::Click { device } => client.send(&InputLine::new(device, RawEvent::Click))?,
        Commands::Turn {
            device,
            direction,
            count,
            interval_ms,
        } => {
            let line = InputLine::new(device, RawEvent::Turn(direction));
            for i in 0..count {
                if i > 0 && interval_ms > 0 {
                    thread::sleep(Duration::from_millis(interval_ms));
                }
                client.send(&line)?;
            }
        }
        Commands::Key { device, key } => client.send(&InputLine::new(device, RawEvent::Key(key)))?,
        Commands::Replay { file } => replay(&mut client, file)?,
    }

    Ok(())
}

fn replay(client: &mut Client, file: Option<PathBuf>) -> anyhow::Result<()> {
    let reader: Box<dyn BufRead> = match &file {
        Some(path) => Box::new(BufReader::new(fs::File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };

    for (n, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input stream")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match trimmed.parse::<InputLine>() {
            Ok(input) => client.send(&input)?,
            Err(e) => log::warn!("Skipping line {}: {}", n + 1, e),
        }
    }
    Ok(())
}
