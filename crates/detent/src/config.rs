use crate::events::CoreEvent;
use crate::pulse::DeviceId;
use async_channel::Sender;
use directories::ProjectDirs;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use serde_with::DeserializeFromStr;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum::{Display as StrumDisplay, EnumString};
use thiserror::Error;

/// Coarse UI state, and the surface an action is native to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    DeserializeFromStr,
    EnumString,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[strum(to_string = "wheel", serialize = "w", serialize = "0")]
    Wheel,
    #[strum(to_string = "module", serialize = "m", serialize = "1")]
    Module,
}

impl Mode {
    pub fn as_index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccelerationConfig {
    /// Tick period in milliseconds.
    pub pulse_refresh_time: u64,
    pub click_accel: f64,
    pub max_accel: f64,
    pub friction: f64,
    pub gravity: f64,
    /// Degrees.
    pub deadzone: f64,
    pub max_stop_accel: f64,
    pub module_sections: usize,
}

impl Default for AccelerationConfig {
    fn default() -> Self {
        Self {
            pulse_refresh_time: 20,
            click_accel: 60.0,
            max_accel: 300.0,
            friction: 2.0,
            gravity: 40.0,
            deadzone: 0.5,
            max_stop_accel: 5.0,
            module_sections: 12,
        }
    }
}

fn default_threshold() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PressReleaseConfig {
    pub bind: DeviceId,
    #[serde(default = "default_threshold")]
    pub threshold: u64,
    /// press, click, double click
    pub commands: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClickButtonConfig {
    pub bind: DeviceId,
    #[serde(default = "default_threshold")]
    pub threshold: u64,
    /// click, double click
    pub commands: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncoderConfig {
    pub bind: DeviceId,
    /// Press-release button whose pending click a turn cancels.
    pub button: Option<DeviceId>,
    /// up, down, click up, click down, double up, double down
    pub commands: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeyboardConfig {
    pub bind: DeviceId,
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SectionConfig {
    pub name: String,
    /// Detent count the hosted module advertises.
    pub positions: Option<usize>,
}

/// One entry of the action catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionConfig {
    #[serde(rename = "type")]
    pub kind: Mode,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ActionSpec {
    pub name: String,
    pub mode: Mode,
    #[serde(default)]
    pub check_state: bool,
    pub on_state: Option<Mode>,
    #[serde(default)]
    pub repeat: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandBind {
    pub command: String,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

/// Wheel detents when neither the key nor any section is configured.
const FALLBACK_WHEEL_ENTRIES: usize = 8;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Detents on the section wheel. Derived from `sections` when absent.
    #[serde(default)]
    pub selection_wheel_entries: Option<usize>,
    #[serde(default)]
    pub acceleration: AccelerationConfig,
    #[serde(default)]
    pub sections: Vec<SectionConfig>,
    #[serde(default)]
    pub command_actions: Vec<ActionConfig>,
    #[serde(default)]
    pub command_bind: BTreeMap<DeviceId, Vec<CommandBind>>,
    #[serde(default)]
    pub keyboards: Vec<KeyboardConfig>,
    #[serde(default)]
    pub prbuttons: Vec<PressReleaseConfig>,
    #[serde(default)]
    pub clickbuttons: Vec<ClickButtonConfig>,
    #[serde(default)]
    pub encoders: Vec<EncoderConfig>,
    #[serde(default)]
    pub serial: Vec<SerialConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            selection_wheel_entries: None,
            acceleration: AccelerationConfig::default(),
            sections: Vec::new(),
            command_actions: Vec::new(),
            command_bind: BTreeMap::new(),
            keyboards: Vec::new(),
            prbuttons: Vec::new(),
            clickbuttons: Vec::new(),
            encoders: Vec::new(),
            serial: Vec::new(),
        }
    }
}

impl Config {
    /// One detent per section, unless `selection_wheel_entries` says otherwise.
    pub fn wheel_positions(&self) -> usize {
        match (self.selection_wheel_entries, self.sections.len()) {
            (Some(entries), _) => entries,
            (None, 0) => FALLBACK_WHEEL_ENTRIES,
            (None, sections) => sections,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let accel = &self.acceleration;
        match self.selection_wheel_entries {
            Some(0) => {
                return Err(ConfigError::Invalid(
                    "selection_wheel_entries must be at least 1".into(),
                ));
            }
            Some(entries) if !self.sections.is_empty() && entries != self.sections.len() => {
                return Err(ConfigError::Invalid(format!(
                    "selection_wheel_entries is {} but {} sections are configured",
                    entries,
                    self.sections.len()
                )));
            }
            _ => {}
        }
        if accel.module_sections == 0 {
            return Err(ConfigError::Invalid(
                "acceleration.module_sections must be at least 1".into(),
            ));
        }
        if accel.pulse_refresh_time == 0 {
            return Err(ConfigError::Invalid(
                "acceleration.pulse_refresh_time must be positive".into(),
            ));
        }
        if accel.max_accel <= 0.0 {
            return Err(ConfigError::Invalid(
                "acceleration.max_accel must be positive".into(),
            ));
        }
        if let Some(section) = self.sections.iter().find(|s| s.positions == Some(0)) {
            return Err(ConfigError::Invalid(format!(
                "section '{}' advertises zero positions",
                section.name
            )));
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    ConfigDirNotFound,
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Device '{0}' is declared more than once")]
    DuplicateDevice(DeviceId),
    #[error("Encoder '{encoder}' is linked to '{button}', which is not a press-release button")]
    UnknownLinkedButton { encoder: DeviceId, button: DeviceId },
    #[error("Device '{device}' needs {expected} commands, got {found}")]
    CommandCount {
        device: DeviceId,
        expected: usize,
        found: usize,
    },
    #[error("Action '{name}' of type {kind} is listed more than once")]
    DuplicateAction { kind: Mode, name: String },
    #[error("Unknown wheel action '{0}'")]
    UnknownWheelAction(String),
    #[error("'{bind}.{command}' refers to {mode} action '{name}', which is not in the catalog")]
    UnknownAction {
        bind: DeviceId,
        command: String,
        mode: Mode,
        name: String,
    },
}

pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs =
        ProjectDirs::from("org", "detent", "detent").ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("DETENT").separator("__")
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let s = config::Config::builder()
        .add_source(config::File::from(path).required(true))
        .add_source(environment())
        .build()?;

    let config: Config = s.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

pub fn default_config() -> Result<Config, ConfigError> {
    let s = config::Config::builder()
        .add_source(config::File::from_str(
            DEFAULT_CONFIG,
            config::FileFormat::Toml,
        ))
        .add_source(environment())
        .build()?;

    let config: Config = s.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Loads `path`, falling back to the embedded defaults when the file does not exist.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        log::info!(
            "No configuration at {}, using built-in defaults",
            path.display()
        );
        return default_config();
    }
    load_config(path)
}

pub fn write_default_config(path: &Path) -> std::io::Result<bool> {
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    if path.exists() {
        return Ok(false);
    }
    fs_err::write(path, DEFAULT_CONFIG)?;
    Ok(true)
}

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

/// Quiet period that closes a burst of filesystem events.
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(200);

type WatchResult = notify::Result<notify::Event>;

/// Posts one `ConfigReload` per burst of changes to `config_path`. Editors that
/// save through a temporary file emit several events per save.
pub async fn run_async_watcher(config_path: PathBuf, tx: Sender<CoreEvent>) {
    let Some(config_dir) = config_path.parent() else {
        return;
    };
    if let Err(e) = fs_err::create_dir_all(config_dir) {
        log::error!("Failed to create config directory for watching: {}", e);
        return;
    }

    let (bridge_tx, bridge_rx) = async_channel::unbounded();
    // dropping the watcher ends the bridge
    let _watcher = match watch_dir(config_dir, bridge_tx) {
        Ok(watcher) => watcher,
        Err(e) => {
            log::error!("Config watcher unavailable: {}", e);
            return;
        }
    };
    log::debug!("Watching {}", config_dir.display());

    while next_reload(&bridge_rx, &config_path).await {
        if tx.send(CoreEvent::ConfigReload).await.is_err() {
            break;
        }
    }
}

fn watch_dir(
    dir: &Path,
    bridge: async_channel::Sender<WatchResult>,
) -> Result<RecommendedWatcher, ConfigError> {
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = bridge.send_blocking(res);
        },
        notify::Config::default(),
    )?;
    // the directory, not the file: replacing the file would orphan a file watch
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Waits for a change to `path`, then swallows events until the directory has
/// been quiet for `RELOAD_DEBOUNCE`. False once the watcher is gone.
async fn next_reload(events: &async_channel::Receiver<WatchResult>, path: &Path) -> bool {
    loop {
        let Ok(res) = events.recv().await else {
            return false;
        };
        if touches(res, path) {
            break;
        }
    }
    while let Ok(Ok(_)) = tokio::time::timeout(RELOAD_DEBOUNCE, events.recv()).await {}
    true
}

fn touches(res: WatchResult, path: &Path) -> bool {
    match res {
        Ok(event) => {
            matches!(
                event.kind,
                EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
            ) && event.paths.iter().any(|p| p == path)
        }
        Err(e) => {
            log::error!("Watch error: {}", e);
            false
        }
    }
}
