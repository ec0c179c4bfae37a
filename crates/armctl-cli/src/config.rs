//! Configuration vault – reads/writes `~/.armctl/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use armctl_kinematics::{ChainConfig, ChainError};
use armctl_types::MovementStyle;
use serde::{Deserialize, Serialize};

/// Persisted operator configuration. Every field has a default, so a partial
/// file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// NDJSON file that `save_position` appends to.
    pub positions_path: PathBuf,
    /// Sampler period in milliseconds.
    pub telemetry_interval_ms: u64,
    /// Any motor strictly above this trips an emergency stop.
    pub overheat_threshold_c: f64,
    /// Lower bound of the simulated motor temperature.
    pub temperature_min_c: f64,
    /// Upper bound of the simulated motor temperature.
    pub temperature_max_c: f64,
    pub movement_style: MovementStyle,
    pub base_radius: f64,
    pub link_lengths: [f64; 3],
    pub jaw_open_width: f64,
    pub jaw_closed_width: f64,
}

impl Default for Config {
    fn default() -> Self {
        let chain = ChainConfig::default();
        Self {
            positions_path: PathBuf::from("positions.json"),
            telemetry_interval_ms: 1000,
            overheat_threshold_c: 60.0,
            temperature_min_c: 25.0,
            temperature_max_c: 45.0,
            movement_style: MovementStyle::Normal,
            base_radius: chain.base_radius,
            link_lengths: chain.link_lengths,
            jaw_open_width: chain.jaw_open_width,
            jaw_closed_width: chain.jaw_closed_width,
        }
    }
}

impl Config {
    /// Arm geometry described by this config, validated.
    pub fn chain_config(&self) -> Result<ChainConfig, ChainError> {
        let chain = ChainConfig {
            base_radius: self.base_radius,
            link_lengths: self.link_lengths,
            jaw_open_width: self.jaw_open_width,
            jaw_closed_width: self.jaw_closed_width,
            ..ChainConfig::default()
        };
        chain.validate()?;
        Ok(chain)
    }

    /// Check the safety values: the overheat threshold and both temperature
    /// bounds must be finite, with `temperature_min_c <= temperature_max_c`.
    pub fn validate(&self) -> Result<(), String> {
        let named = [
            ("overheat_threshold_c", self.overheat_threshold_c),
            ("temperature_min_c", self.temperature_min_c),
            ("temperature_max_c", self.temperature_max_c),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(format!("{name} must be a finite number, got {value}"));
            }
        }
        if self.temperature_min_c > self.temperature_max_c {
            return Err(format!(
                "temperature_min_c ({}) exceeds temperature_max_c ({})",
                self.temperature_min_c, self.temperature_max_c
            ));
        }
        Ok(())
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms.max(1))
    }
}

/// Return the path to `~/.armctl/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".armctl").join("config.toml")
}

/// Load the config from disk and apply environment overrides. `None` when
/// the file does not exist yet.
pub fn load() -> Result<Option<Config>, String> {
    Ok(load_from(&config_path())?.map(|mut cfg| {
        apply_env_overrides(&mut cfg);
        cfg
    }))
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `ARMCTL_*` environment overrides. Unparseable numbers are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `ARMCTL_POSITIONS_PATH` | `positions_path` |
/// | `ARMCTL_TELEMETRY_INTERVAL_MS` | `telemetry_interval_ms` |
/// | `ARMCTL_OVERHEAT_THRESHOLD_C` | `overheat_threshold_c` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ARMCTL_POSITIONS_PATH") {
        cfg.positions_path = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("ARMCTL_TELEMETRY_INTERVAL_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.telemetry_interval_ms = ms;
    }
    if let Ok(v) = std::env::var("ARMCTL_OVERHEAT_THRESHOLD_C")
        && let Ok(c) = v.parse::<f64>()
        && c.is_finite()
    {
        cfg.overheat_threshold_c = c;
    }
}

/// Save the config, creating `~/.armctl/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
