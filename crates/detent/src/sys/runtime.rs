use crate::events::CoreEvent;
use async_channel::Sender;
use std::path::PathBuf;
use std::thread;
use tokio::runtime::Runtime;

/// Where the background adapters read from.
#[derive(Debug, Clone)]
pub struct Services {
    pub socket: PathBuf,
    pub config_path: PathBuf,
    pub serial: Vec<PathBuf>,
}

pub fn start_background_services(services: Services, tx: Sender<CoreEvent>) {
    thread::spawn(move || {
        let rt = match Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("Failed to create Tokio runtime: {}", e);
                return;
            }
        };

        rt.block_on(async {
            {
                let tx = tx.clone();
                let socket = services.socket.clone();
                tokio::spawn(async move {
                    crate::sys::server::run_server(socket, tx).await;
                });
            }

            {
                let tx = tx.clone();
                let config_path = services.config_path.clone();
                tokio::spawn(async move {
                    crate::config::run_async_watcher(config_path, tx).await;
                });
            }

            for path in services.serial.iter().cloned() {
                let tx = tx.clone();
                tokio::spawn(async move {
                    crate::sys::serial::run_serial(path, tx).await;
                });
            }

            std::future::pending::<()>().await;
        });
    });
}
