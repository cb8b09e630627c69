use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::battleground::BattlegroundOptions;
use crate::constants::{
    DEFAULT_PREMATURE_FINISH_MS, HONOR_KILLS_LOSER_FIRST, HONOR_KILLS_LOSER_LAST,
    HONOR_KILLS_WINNER_FIRST, HONOR_KILLS_WINNER_LAST, TICK_MS,
};
use crate::error::ConfigError;
use crate::types::{BattlegroundKind, InvitationType};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub battleground: BattlegroundSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Bots added per team when a match starts.
    #[serde(default)]
    pub bot_fill: usize,
    /// Directory of static client files served at `/`.
    #[serde(default)]
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattlegroundSettings {
    #[serde(default = "default_kind")]
    pub kind: BattlegroundKind,
    #[serde(default = "default_min_players")]
    pub min_players_per_team: u32,
    #[serde(default = "default_max_players")]
    pub max_players_per_team: u32,
    #[serde(default = "default_min_level")]
    pub min_level: u32,
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    #[serde(default = "default_premature_finish")]
    pub premature_finish_ms: u64,
    #[serde(default)]
    pub invitation_type: InvitationType,
    #[serde(default)]
    pub random: bool,
    #[serde(default)]
    pub weekend: bool,
    #[serde(default)]
    pub holiday: bool,
    #[serde(default = "default_true")]
    pub store_statistics: bool,
    #[serde(default = "default_true")]
    pub track_deserters: bool,
    #[serde(default)]
    pub testing: bool,
    #[serde(default = "default_winner_first")]
    pub honor_kills_winner_first: u32,
    #[serde(default = "default_winner_last")]
    pub honor_kills_winner_last: u32,
    #[serde(default = "default_loser_first")]
    pub honor_kills_loser_first: u32,
    #[serde(default = "default_loser_last")]
    pub honor_kills_loser_last: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_stats_path")]
    pub stats_path: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_tick_interval() -> u64 {
    TICK_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_kind() -> BattlegroundKind {
    BattlegroundKind::WarsongGulch
}

fn default_min_players() -> u32 {
    5
}

fn default_max_players() -> u32 {
    10
}

fn default_min_level() -> u32 {
    10
}

fn default_max_level() -> u32 {
    80
}

fn default_premature_finish() -> u64 {
    DEFAULT_PREMATURE_FINISH_MS
}

fn default_true() -> bool {
    true
}

fn default_winner_first() -> u32 {
    HONOR_KILLS_WINNER_FIRST
}

fn default_winner_last() -> u32 {
    HONOR_KILLS_WINNER_LAST
}

fn default_loser_first() -> u32 {
    HONOR_KILLS_LOSER_FIRST
}

fn default_loser_last() -> u32 {
    HONOR_KILLS_LOSER_LAST
}

fn default_stats_path() -> String {
    "data/pvpstats.json".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            tick_interval_ms: default_tick_interval(),
            bot_fill: 0,
            static_dir: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for BattlegroundSettings {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            min_players_per_team: default_min_players(),
            max_players_per_team: default_max_players(),
            min_level: default_min_level(),
            max_level: default_max_level(),
            premature_finish_ms: default_premature_finish(),
            invitation_type: InvitationType::default(),
            random: false,
            weekend: false,
            holiday: false,
            store_statistics: true,
            track_deserters: true,
            testing: false,
            honor_kills_winner_first: default_winner_first(),
            honor_kills_winner_last: default_winner_last(),
            honor_kills_loser_first: default_loser_first(),
            honor_kills_loser_last: default_loser_last(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            stats_path: default_stats_path(),
        }
    }
}

impl BattlegroundSettings {
    pub fn to_options(&self) -> BattlegroundOptions {
        BattlegroundOptions {
            min_players_per_team: self.min_players_per_team,
            max_players_per_team: self.max_players_per_team,
            min_level: self.min_level,
            max_level: self.max_level,
            premature_finish_ms: self.premature_finish_ms,
            invitation_type: self.invitation_type,
            random: self.random,
            weekend: self.weekend,
            holiday: self.holiday,
            store_statistics: self.store_statistics,
            track_deserters: self.track_deserters,
            testing: self.testing,
            honor_kills_winner_first: self.honor_kills_winner_first,
            honor_kills_winner_last: self.honor_kills_winner_last,
            honor_kills_loser_first: self.honor_kills_loser_first,
            honor_kills_loser_last: self.honor_kills_loser_last,
        }
    }
}

impl AppConfig {
    /// Reads the TOML file at `path`; a missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Applies `PORT` and `PVPSTATS_DB_PATH` when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var("PORT").ok(),
            std::env::var("PVPSTATS_DB_PATH").ok(),
        );
    }

    fn apply_overrides(&mut self, port: Option<String>, stats_path: Option<String>) {
        if let Some(raw) = port {
            match raw.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %raw, "ignoring invalid PORT"),
            }
        }
        if let Some(path) = stats_path.filter(|path| !path.trim().is_empty()) {
            self.storage.stats_path = path;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config =
            AppConfig::load_from_file(&dir.path().join("absent.toml")).expect("load defaults");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.battleground.kind, BattlegroundKind::WarsongGulch);
        assert_eq!(config.battleground.premature_finish_ms, 300_000);
        assert_eq!(config.battleground.honor_kills_winner_first, 30);
        assert!(config.battleground.store_statistics);
    }

    #[test]
    fn partial_file_keeps_field_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            "[battleground]\nkind = \"eye_of_the_storm\"\nweekend = true\n\n[logging]\njson = true"
        )
        .expect("write config");

        let config = AppConfig::load_from_file(file.path()).expect("load config");
        assert_eq!(config.battleground.kind, BattlegroundKind::EyeOfTheStorm);
        assert!(config.battleground.weekend);
        assert_eq!(config.battleground.max_players_per_team, 10);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[server\nport = ").expect("write config");
        let err = AppConfig::load_from_file(file.path()).expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn overrides_replace_port_and_path() {
        let mut config = AppConfig::default();
        config.apply_overrides(Some("9001".to_string()), Some("/tmp/stats.json".to_string()));
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.storage.stats_path, "/tmp/stats.json");

        config.apply_overrides(Some("not-a-port".to_string()), Some("  ".to_string()));
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.storage.stats_path, "/tmp/stats.json");
    }
}
