//! Configuration Vault – reads/writes `~/.tickbot/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tickbot_runtime::RobotConfig;
use tickbot_types::Pose2d;

/// Settings that only exist in simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Fraction by which simulated odometry over-reads motion.
    #[serde(default = "default_wheel_slip")]
    pub wheel_slip: f64,

    /// WPILib-format AprilTag layout JSON.  The built-in four-tag field is
    /// used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_layout: Option<PathBuf>,

    /// Where the robot starts on the field.
    #[serde(default = "default_start")]
    pub start: Pose2d,
}

fn default_wheel_slip() -> f64 {
    0.03
}
fn default_start() -> Pose2d {
    Pose2d::new(1.5, 4.0, 0.0)
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            wheel_slip: default_wheel_slip(),
            field_layout: None,
            start: default_start(),
        }
    }
}

/// Persisted configuration stored in `~/.tickbot/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sim: SimConfig,

    #[serde(default)]
    pub robot: RobotConfig,
}

/// Return the path to `~/.tickbot/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".tickbot").join("config.toml")
}

/// Load the config from `path`, or from [`config_path`] when `None`.
/// Falls back to defaults when the file does not exist.  Environment
/// overrides are applied either way.
pub fn load_or_default(path: Option<&Path>) -> Result<Config, String> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let mut cfg = load_from(&path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `TICKBOT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `TICKBOT_AUTO_PATH` | `robot.auto_path` |
/// | `TICKBOT_LOOP_PERIOD_MS` | `robot.loop_period_ms` |
/// | `TICKBOT_MAX_AMBIGUITY` | `robot.vision.max_ambiguity` |
/// | `TICKBOT_MAX_Z_ERROR` | `robot.vision.max_z_error` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("TICKBOT_AUTO_PATH") {
        cfg.robot.auto_path = v;
    }
    if let Ok(v) = std::env::var("TICKBOT_LOOP_PERIOD_MS")
        && let Ok(ms) = v.trim().parse::<u64>() {
            cfg.robot.loop_period_ms = ms;
        }
    if let Ok(v) = std::env::var("TICKBOT_MAX_AMBIGUITY")
        && let Ok(x) = v.trim().parse::<f64>() {
            cfg.robot.vision.max_ambiguity = x;
        }
    if let Ok(v) = std::env::var("TICKBOT_MAX_Z_ERROR")
        && let Ok(x) = v.trim().parse::<f64>() {
            cfg.robot.vision.max_z_error = x;
        }
}

/// Serialize `cfg` as it would be written to disk.
pub fn to_toml(cfg: &Config) -> Result<String, String> {
    toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))
}

/// Save the config to `path`, creating its directory if necessary.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        // Owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw = to_toml(cfg)?;
    // Owner-only read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

/// Save to `path`, or to [`config_path`] when `None`.  Returns the path
/// written.
pub fn save(cfg: &Config, path: Option<&Path>) -> Result<PathBuf, String> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    save_to(cfg, &path)?;
    Ok(path)
}
