use crate::events::CoreEvent;
use crate::sys::server::forward_lines;
use async_channel::Sender;
use std::path::PathBuf;
use tokio::io::BufReader;

/// Reads wire lines from a tty, fifo or plain file. Reports the loss of the
/// stream and stops; the core keeps running without it.
pub async fn run_serial(path: PathBuf, tx: Sender<CoreEvent>) {
    let adapter = path.display().to_string();

    let reason = match tokio::fs::File::open(&path).await {
        Ok(file) => {
            log::info!("Reading input from {}", adapter);
            match forward_lines(BufReader::new(file), &tx, &adapter).await {
                Ok(()) => "end of stream".to_string(),
                Err(e) => e.to_string(),
            }
        }
        Err(e) => e.to_string(),
    };

    let _ = tx.send(CoreEvent::AdapterLost { adapter, reason }).await;
}
