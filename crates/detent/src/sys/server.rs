use crate::events::CoreEvent;
use async_channel::Sender;
use detentctl::wire::InputLine;
use std::io;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::UnixListener;

pub async fn run_server(socket: PathBuf, tx: Sender<CoreEvent>) {
    // Cleanup old socket if it exists
    if fs_err::metadata(&socket).is_ok() {
        let _ = fs_err::remove_file(&socket);
    }

    let listener = match UnixListener::bind(&socket) {
        Ok(l) => l,
        Err(e) => {
            log::error!("Failed to bind unix socket {}: {}", socket.display(), e);
            return;
        }
    };
    log::info!("Listening for input on {}", socket.display());

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = forward_lines(BufReader::new(stream), &tx, "socket").await {
                        log::warn!("Socket client dropped: {}", e);
                    }
                });
            }
            Err(e) => {
                log::error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Parses wire lines from `reader` into input events until end of stream or
/// until the core stops listening.
pub async fn forward_lines<R>(reader: R, tx: &Sender<CoreEvent>, source: &str) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<InputLine>() {
            Ok(input) => {
                if tx.send(CoreEvent::from(input)).await.is_err() {
                    break;
                }
            }
            Err(e) => log::warn!("Rejected line from {}: '{}': {}", source, line, e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::DeviceId;
    use detentctl::wire::{RawEvent, Turn};

    #[test]
    fn test_forward_lines_skips_garbage() {
        let (tx, rx) = async_channel::unbounded();
        let input: &[u8] = b"enc1 turn up\n\nnonsense\nbtn1 press\n  kbd key Space  \n";

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(forward_lines(input, &tx, "test")).unwrap();
        drop(tx);

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| match e {
                CoreEvent::Input { device, event } => (device, event),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(
            events,
            [
                (DeviceId::new("enc1"), RawEvent::Turn(Turn::Up)),
                (DeviceId::new("btn1"), RawEvent::Press),
                (DeviceId::new("kbd"), RawEvent::Key("Space".into())),
            ]
        );
    }
}
