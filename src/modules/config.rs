use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::modules::pacing::PacingSchedule;
use crate::modules::types::{ItemKind, Location};

pub const SECRET_ENV: &str = "FIELDRUNNER_SECRET";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Trainer club username/password
    Ptc,
    /// Google account refresh token
    Google,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    pub auth: AuthMode,
    pub username: String,
    pub gateway_url: String,
    pub request_timeout_ms: u64,
    pub home: Location,
    pub walking_speed_kmh: f64,
    pub evolve_with_enough_candy: bool,
    pub transfer_duplicates: bool,
    pub keep_evolvable_duplicates: bool,
    /// Species allowed to evolve; empty means all.
    pub evolve_species: Vec<String>,
    /// Species never transferred.
    pub keep_species: Vec<String>,
    pub keep_min_iv_percentage: f64,
    pub keep_min_cp: u32,
    /// Most of each item kind to hold before recycling the excess.
    pub recycle_caps: BTreeMap<ItemKind, u32>,
    pub pacing: PacingSchedule,
}

impl Default for CycleConfig {
    fn default() -> Self {
        let recycle_caps = BTreeMap::from([
            (ItemKind::Potion, 20),
            (ItemKind::SuperPotion, 20),
            (ItemKind::HyperPotion, 20),
            (ItemKind::MaxPotion, 20),
            (ItemKind::Revive, 10),
            (ItemKind::MaxRevive, 10),
            (ItemKind::RazzBerry, 30),
            (ItemKind::Unknown, 0),
        ]);
        Self {
            auth: AuthMode::Ptc,
            username: String::new(),
            gateway_url: "http://127.0.0.1:8787".into(),
            request_timeout_ms: 15_000,
            home: Location::new(52.379189, 4.899431),
            walking_speed_kmh: 50.0,
            evolve_with_enough_candy: false,
            transfer_duplicates: false,
            keep_evolvable_duplicates: false,
            evolve_species: Vec::new(),
            keep_species: vec!["Dragonite".into(), "Snorlax".into(), "Lapras".into()],
            keep_min_iv_percentage: 95.0,
            keep_min_cp: 1000,
            recycle_caps,
            pacing: PacingSchedule::default(),
        }
    }
}

impl CycleConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.home.in_range() {
            return Err(format!("home coordinates out of range: {}", self.home));
        }
        if self.walking_speed_kmh <= 0.0 {
            return Err("walking_speed_kmh must be greater than 0".into());
        }
        if self.username.trim().is_empty() && self.auth == AuthMode::Ptc {
            return Err("username is required for ptc login; set it in config.json".into());
        }
        Ok(())
    }

    /// Whether a species passes the evolve allow-list.
    pub fn may_evolve(&self, species: &str) -> bool {
        self.evolve_species.is_empty()
            || self
                .evolve_species
                .iter()
                .any(|s| s.eq_ignore_ascii_case(species))
    }
}

fn config_dir() -> PathBuf {
    PathBuf::from(".fieldrunner")
}

fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

pub fn config_file_path() -> PathBuf {
    config_path()
}

pub fn load() -> io::Result<CycleConfig> {
    let path = config_path();
    if !path.exists() {
        return Ok(CycleConfig::default());
    }

    let bytes = fs::read(&path)?;
    if bytes.is_empty() {
        return Ok(CycleConfig::default());
    }

    let config: CycleConfig = serde_json::from_slice(&bytes).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "failed to parse config {}; fix it or delete it and run `fieldrunner init`: {}",
                path.display(),
                e
            ),
        )
    })?;
    Ok(config)
}

pub fn save(config: &CycleConfig) -> io::Result<()> {
    fs::create_dir_all(config_dir())?;
    let json = serde_json::to_vec_pretty(config)?;
    fs::write(config_path(), json)?;
    Ok(())
}

/// Resolve the login secret: explicit value, then env var, then `.fieldrunner/.secret`.
pub fn resolve_secret(explicit: Option<String>) -> Option<String> {
    explicit
        .or_else(|| env::var(SECRET_ENV).ok())
        .or_else(load_secret_from_file)
        .filter(|s| !s.trim().is_empty())
}

fn load_secret_from_file() -> Option<String> {
    let data = fs::read_to_string(config_dir().join(".secret")).ok()?;
    let trimmed = data.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
