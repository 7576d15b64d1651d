//! The single-threaded loop that owns the core.

use crate::config;
use crate::pipeline::Core;
use crate::events::CoreEvent;
use anyhow::Context;
use async_channel::Receiver;
use std::path::Path;
use std::time::Instant;

pub fn run(mut core: Core, rx: Receiver<CoreEvent>, config_path: &Path) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to create event loop runtime")?;

    rt.block_on(async move {
        loop {
            let event = match core.next_deadline() {
                Some(deadline) => tokio::select! {
                    event = rx.recv() => Some(event),
                    _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => None,
                },
                None => Some(rx.recv().await),
            };

            match event {
                Some(Ok(event)) => handle_event(&mut core, event, config_path, Instant::now()),
                Some(Err(_)) => {
                    log::info!("All input sources closed, shutting down");
                    break;
                }
                None => {}
            }
            core.on_timers(Instant::now());
        }
    });
    Ok(())
}

pub fn handle_event(core: &mut Core, event: CoreEvent, config_path: &Path, now: Instant) {
    match event {
        CoreEvent::Input { device, event } => {
            // anything that expired before this input happened first
            core.on_timers(now);
            log::debug!("{} {}", device, event);
            core.handle_input(&device, &event, now);
        }
        CoreEvent::ConfigReload => {
            if let Err(e) = config::load_or_default(config_path).and_then(|c| core.reload(&c)) {
                log::error!("Keeping the running configuration: {}", e);
            }
        }
        CoreEvent::AdapterLost { adapter, reason } => {
            log::warn!("Input adapter {} stopped: {}", adapter, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::pulse::DeviceId;
    use crate::sys::headless::{self, LogRender};
    use detentctl::wire::RawEvent;
    use std::path::PathBuf;
    use std::time::Duration;

    fn default_core() -> Core {
        let config = config::default_config().unwrap();
        Core::new(
            &config,
            Box::new(headless::chooser(&config)),
            Box::new(LogRender::default()),
        )
        .unwrap()
    }

    fn key(name: &str) -> CoreEvent {
        CoreEvent::Input {
            device: DeviceId::new("kbd"),
            event: RawEvent::Key(name.into()),
        }
    }

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("detent-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_keyboard_drives_default_config() {
        let mut core = default_core();
        let path = scratch("absent.toml");
        let now = Instant::now();

        handle_event(&mut core, key("Space"), &path, now);
        assert_eq!(core.mode(), Mode::Module);
        // "media" advertises 12 positions
        assert_eq!(core.engine().n_positions(), 12);

        handle_event(&mut core, key("Escape"), &path, now);
        assert_eq!(core.mode(), Mode::Wheel);
        assert_eq!(core.engine().n_positions(), 4);
    }

    #[test]
    fn test_quick_switch_in_module_mode_takes_module_detents() {
        let mut core = default_core();
        let path = scratch("absent.toml");
        let t0 = Instant::now();
        let at = |ms| t0 + Duration::from_millis(ms);
        let click = CoreEvent::Input {
            device: DeviceId::new("clk1"),
            event: RawEvent::Click,
        };

        handle_event(&mut core, key("Right"), &path, at(0));
        handle_event(&mut core, key("Space"), &path, at(10));
        // "color" advertises 24 positions
        assert_eq!(core.engine().n_positions(), 24);

        handle_event(&mut core, click.clone(), &path, at(100));
        handle_event(&mut core, click, &path, at(200));
        assert_eq!(core.mode(), Mode::Module);
        assert_eq!(core.wheel().n_positions(), 12);
        assert_eq!(core.engine().n_positions(), 12);
    }

    #[test]
    fn test_deferred_click_fires_before_next_input() {
        let mut core = default_core();
        let path = scratch("absent.toml");
        let t0 = Instant::now();
        let at = |ms| t0 + Duration::from_millis(ms);

        let input = |event| CoreEvent::Input {
            device: DeviceId::new("btn1"),
            event,
        };
        handle_event(&mut core, input(RawEvent::Press), &path, at(0));
        handle_event(&mut core, input(RawEvent::Release), &path, at(50));
        assert_eq!(core.next_deadline(), Some(at(350)));

        // the pending click selects before the keyboard input is seen
        handle_event(&mut core, key("Left"), &path, at(1_000));
        assert_eq!(core.mode(), Mode::Module);
    }

    #[test]
    fn test_reload_rejects_broken_file() {
        let mut core = default_core();
        let path = scratch("broken.toml");
        fs_err::write(&path, "selection_wheel_entries = \"many\"").unwrap();

        handle_event(&mut core, CoreEvent::ConfigReload, &path, Instant::now());
        handle_event(&mut core, key("Space"), &path, Instant::now());
        assert_eq!(core.mode(), Mode::Module);

        fs_err::remove_file(&path).unwrap();
    }

    #[test]
    fn test_adapter_loss_is_not_fatal() {
        let mut core = default_core();
        let path = scratch("absent.toml");
        handle_event(
            &mut core,
            CoreEvent::AdapterLost {
                adapter: "/dev/ttyACM0".into(),
                reason: "end of stream".into(),
            },
            &path,
            Instant::now(),
        );
        handle_event(&mut core, key("Space"), &path, Instant::now());
        assert_eq!(core.mode(), Mode::Module);
    }
}
