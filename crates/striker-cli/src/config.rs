//! Runtime configuration – reads/writes `~/.striker/config.toml`.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use striker_types::{StrikerError, TeamColor};
use tracing::warn;

/// Persisted settings.  Every field has a default, so a partial file is
/// valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Vision multicast group (or unicast address) to listen on.
    #[serde(default = "default_vision_addr")]
    pub vision_addr: SocketAddr,

    /// Referee multicast group (or unicast address) to listen on.
    #[serde(default = "default_referee_addr")]
    pub referee_addr: SocketAddr,

    /// Radio transmitter receiving the 11-byte command frames.
    #[serde(default = "default_command_addr")]
    pub command_addr: SocketAddr,

    #[serde(default = "default_ally_color")]
    pub ally_color: TeamColor,

    /// `true` when our goal is on the negative-x side.
    #[serde(default = "default_true")]
    pub ally_plays_west: bool,

    /// Keeper used until the referee names our goalie.
    #[serde(default = "default_keeper_id")]
    pub keeper_id: u32,

    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    /// Detections below this confidence are ignored.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,

    /// Seconds without a detection before a robot is held still.
    #[serde(default = "default_stale_after")]
    pub stale_after: f64,

    /// Port of the WebSocket world feed; the feed is off when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_port: Option<u16>,

    #[serde(default = "default_feed_snapshot_ms")]
    pub feed_snapshot_ms: u64,

    /// Replay this match log instead of listening for vision and referee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Replay speed factor; `0` replays as fast as possible.
    #[serde(default = "default_replay_speed")]
    pub replay_speed: f64,
}

fn default_vision_addr() -> SocketAddr {
    SocketAddr::from(([224, 5, 23, 2], 10006))
}
fn default_referee_addr() -> SocketAddr {
    SocketAddr::from(([224, 5, 23, 1], 10003))
}
fn default_command_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 10010))
}
fn default_ally_color() -> TeamColor {
    TeamColor::Yellow
}
fn default_true() -> bool {
    true
}
fn default_keeper_id() -> u32 {
    1
}
fn default_tick_hz() -> u32 {
    striker_runtime::DEFAULT_TICK_HZ
}
fn default_min_confidence() -> f32 {
    0.1
}
fn default_stale_after() -> f64 {
    0.2
}
fn default_feed_snapshot_ms() -> u64 {
    100
}
fn default_replay_speed() -> f64 {
    1.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vision_addr: default_vision_addr(),
            referee_addr: default_referee_addr(),
            command_addr: default_command_addr(),
            ally_color: default_ally_color(),
            ally_plays_west: default_true(),
            keeper_id: default_keeper_id(),
            tick_hz: default_tick_hz(),
            min_confidence: default_min_confidence(),
            stale_after: default_stale_after(),
            feed_port: None,
            feed_snapshot_ms: default_feed_snapshot_ms(),
            log_file: None,
            replay_speed: default_replay_speed(),
        }
    }
}

/// Return the path to `~/.striker/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".striker").join("config.toml")
}

/// The file at [`config_path`] (or the defaults when it is missing) with
/// `STRIKER_*` overrides applied.
pub fn load() -> Result<Config, StrikerError> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Parse the config at `path`.  Returns `None` if the file does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, StrikerError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| StrikerError::Config(format!("failed to read {}: {e}", path.display())))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| StrikerError::Config(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(cfg))
}

/// Apply `STRIKER_*` environment overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `STRIKER_VISION_ADDR` | `vision_addr` |
/// | `STRIKER_REFEREE_ADDR` | `referee_addr` |
/// | `STRIKER_COMMAND_ADDR` | `command_addr` |
/// | `STRIKER_ALLY_COLOR` | `ally_color` |
/// | `STRIKER_TICK_HZ` | `tick_hz` |
/// | `STRIKER_FEED_PORT` | `feed_port` |
/// | `STRIKER_LOG_FILE` | `log_file` |
///
/// Unparseable values are ignored with a warning.
pub fn apply_env_overrides(cfg: &mut Config) {
    override_parsed("STRIKER_VISION_ADDR", &mut cfg.vision_addr);
    override_parsed("STRIKER_REFEREE_ADDR", &mut cfg.referee_addr);
    override_parsed("STRIKER_COMMAND_ADDR", &mut cfg.command_addr);
    override_parsed("STRIKER_ALLY_COLOR", &mut cfg.ally_color);
    override_parsed("STRIKER_TICK_HZ", &mut cfg.tick_hz);
    if let Ok(v) = std::env::var("STRIKER_FEED_PORT") {
        match v.parse::<u16>() {
            Ok(port) => cfg.feed_port = Some(port),
            Err(e) => warn!(var = "STRIKER_FEED_PORT", value = %v, error = %e, "ignoring override"),
        }
    }
    if let Ok(v) = std::env::var("STRIKER_LOG_FILE")
        && !v.is_empty()
    {
        cfg.log_file = Some(PathBuf::from(v));
    }
}

fn override_parsed<T>(var: &str, field: &mut T)
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(v) = std::env::var(var) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(e) => warn!(var, value = %v, error = %e, "ignoring override"),
        }
    }
}

/// Save `cfg` to [`config_path`], creating `~/.striker/` if necessary.
pub fn save(cfg: &Config) -> Result<(), StrikerError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), StrikerError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| StrikerError::Config(format!("failed to create {}: {e}", parent.display())))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| StrikerError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| StrikerError::Config(format!("failed to write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path)?;
        let loaded = load_from(&path)?.ok_or("config missing")?;
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.vision_addr.port(), 10006);
        assert_eq!(loaded.tick_hz, 60);
        assert_eq!(loaded.feed_port, None);
        Ok(())
    }

    #[test]
    fn partial_file_falls_back_to_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "ally_color = \"Blue\"\ntick_hz = 30\nfeed_port = 9100\n")?;

        let cfg = load_from(&path)?.ok_or("config missing")?;
        assert_eq!(cfg.ally_color, TeamColor::Blue);
        assert_eq!(cfg.tick_hz, 30);
        assert_eq!(cfg.feed_port, Some(9100));
        assert_eq!(cfg.referee_addr, default_referee_addr());
        assert!(cfg.ally_plays_west);
        Ok(())
    }

    #[test]
    fn config_path_points_to_striker_dir() {
        let p = config_path_for_home("/home/operator");
        assert!(p.to_string_lossy().contains(".striker"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        assert!(load_from(&dir.path().join("absent.toml"))?.is_none());
        Ok(())
    }

    #[test]
    fn malformed_file_is_a_config_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "tick_hz = \"fast\"")?;
        assert!(matches!(load_from(&path), Err(StrikerError::Config(_))));
        Ok(())
    }

    #[test]
    fn env_overrides_ally_color() {
        // SAFETY: no other test reads this variable.
        unsafe { std::env::set_var("STRIKER_ALLY_COLOR", "blue") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.ally_color, TeamColor::Blue);
        unsafe { std::env::remove_var("STRIKER_ALLY_COLOR") };
    }

    #[test]
    fn env_overrides_vision_addr() {
        // SAFETY: no other test reads this variable.
        unsafe { std::env::set_var("STRIKER_VISION_ADDR", "127.0.0.1:40000") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.vision_addr, SocketAddr::from(([127, 0, 0, 1], 40000)));
        unsafe { std::env::remove_var("STRIKER_VISION_ADDR") };
    }

    #[test]
    fn env_override_ignores_invalid_port() {
        // SAFETY: no other test reads this variable.
        unsafe { std::env::set_var("STRIKER_FEED_PORT", "not-a-port") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.feed_port, None);
        unsafe { std::env::remove_var("STRIKER_FEED_PORT") };
    }

    #[test]
    fn env_override_sets_log_file() {
        // SAFETY: no other test reads this variable.
        unsafe { std::env::set_var("STRIKER_LOG_FILE", "/tmp/match.log") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.log_file, Some(PathBuf::from("/tmp/match.log")));
        unsafe { std::env::remove_var("STRIKER_LOG_FILE") };
    }
}
