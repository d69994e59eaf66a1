//! Simulation configuration.
//!
//! Two on-disk formats are accepted:
//! - `.toml` (primary): `[data]`, `[strategy]` and an optional `[replay]` table
//! - anything else: the legacy flat `Key=Value` format, `#` comments allowed
//!
//! Both produce the same [`SimConfig`]. Strategy values are kept raw here and
//! validated by [`SimConfig::strategy_params`], so a bad threshold surfaces
//! as a `ParamsError` rather than a parse error.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use arbsim_core::engine::DEFAULT_TRADE_LOG_CAPACITY;
use arbsim_core::rng::SeedHierarchy;
use arbsim_core::{ParamsError, StrategyParams, TieBreak};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("missing key: {0}")]
    MissingKey(String),

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("path for {key} escapes {base} or contains '..': {path}")]
    UnsafePath {
        key: String,
        path: String,
        base: PathBuf,
    },

    #[error("config serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimConfig {
    pub data: DataConfig,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// Paths to the two quote files, relative to the run's base directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    pub leg_a: String,
    pub leg_b: String,
}

/// Unvalidated strategy values as they appear in the file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StrategyConfig {
    pub min_arbitrage_edge: f64,
    pub max_abs_exposure_lots: i64,
    pub stop_loss_pnl: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakMode {
    #[default]
    SourceAFirst,
    Seeded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReplayConfig {
    pub tie_break: TieBreakMode,
    /// Master seed. Only read when `tie_break = "seeded"`.
    pub seed: u64,
    /// Event-time spacing of PnL snapshots; 0 disables them.
    pub pnl_snapshot_interval_secs: u64,
    pub trade_log_capacity: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            tie_break: TieBreakMode::SourceAFirst,
            seed: 0,
            pnl_snapshot_interval_secs: 60,
            trade_log_capacity: DEFAULT_TRADE_LOG_CAPACITY,
        }
    }
}

impl ReplayConfig {
    /// Resolve the merge policy for one dataset.
    ///
    /// A seeded run draws its tie-break seed from the master seed and the
    /// dataset hash, so two datasets under one master seed get independent
    /// but reproducible coin flips.
    pub fn tie_break_for(&self, dataset: &str) -> TieBreak {
        match self.tie_break {
            TieBreakMode::SourceAFirst => TieBreak::SourceAFirst,
            TieBreakMode::Seeded => TieBreak::Seeded {
                seed: SeedHierarchy::new(self.seed).sub_seed(dataset, "tie_break"),
            },
        }
    }
}

impl SimConfig {
    /// Load from `path`, choosing the format by extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_key_values(&content)
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse the legacy flat format.
    ///
    /// ```text
    /// # comment
    /// Data.FutureA = data/a.csv
    /// Strategy.MinArbitrageEdge = 1.5
    /// ```
    ///
    /// Lines without `=` are ignored; later keys overwrite earlier ones.
    pub fn from_key_values(content: &str) -> Result<Self, ConfigError> {
        let values = parse_key_values(content);
        let mut replay = ReplayConfig::default();
        if let Some(mode) = values.get("Replay.TieBreak") {
            replay.tie_break = parse_tie_break_mode(mode).ok_or_else(|| {
                ConfigError::InvalidValue {
                    key: "Replay.TieBreak".into(),
                    value: mode.clone(),
                }
            })?;
        }
        if values.contains_key("Replay.Seed") {
            replay.seed = typed(&values, "Replay.Seed")?;
        }

        Ok(Self {
            data: DataConfig {
                leg_a: required(&values, "Data.FutureA")?.to_string(),
                leg_b: required(&values, "Data.FutureB")?.to_string(),
            },
            strategy: StrategyConfig {
                min_arbitrage_edge: typed(&values, "Strategy.MinArbitrageEdge")?,
                max_abs_exposure_lots: typed(&values, "Strategy.MaxAbsExposureLots")?,
                stop_loss_pnl: typed(&values, "Strategy.StopLossPnl")?,
            },
            replay,
        })
    }

    pub fn strategy_params(&self) -> Result<StrategyParams, ParamsError> {
        let s = &self.strategy;
        StrategyParams::new(s.min_arbitrage_edge, s.max_abs_exposure_lots, s.stop_loss_pnl)
    }

    /// Resolve both data paths under `base_dir`, rejecting traversal.
    pub fn validated_data_paths(&self, base_dir: &Path) -> Result<(PathBuf, PathBuf), ConfigError> {
        let base = base_dir.canonicalize().map_err(|source| ConfigError::Io {
            path: base_dir.to_path_buf(),
            source,
        })?;
        Ok((
            resolve_within(&base, "data.leg_a", &self.data.leg_a)?,
            resolve_within(&base, "data.leg_b", &self.data.leg_b)?,
        ))
    }

    /// Content hash of the canonical JSON form of this config.
    pub fn run_id(&self) -> Result<String, ConfigError> {
        let mut hasher = blake3::Hasher::new();
        serde_json::to_writer(&mut hasher, self)?;
        Ok(hasher.finalize().to_hex().to_string())
    }
}

fn parse_key_values(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.split('#').next().unwrap_or("").trim();
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn required<'a>(values: &'a HashMap<String, String>, key: &str) -> Result<&'a str, ConfigError> {
    values
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
}

fn typed<T: std::str::FromStr>(
    values: &HashMap<String, String>,
    key: &str,
) -> Result<T, ConfigError> {
    let raw = required(values, key)?;
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn parse_tie_break_mode(raw: &str) -> Option<TieBreakMode> {
    let normalized: String = raw
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect::<String>()
        .to_ascii_lowercase();
    match normalized.as_str() {
        "sourceafirst" => Some(TieBreakMode::SourceAFirst),
        "seeded" => Some(TieBreakMode::Seeded),
        _ => None,
    }
}

/// `base` must already be canonical.
fn resolve_within(base: &Path, key: &str, raw: &str) -> Result<PathBuf, ConfigError> {
    let unsafe_path = || ConfigError::UnsafePath {
        key: key.to_string(),
        path: raw.to_string(),
        base: base.to_path_buf(),
    };
    if raw.contains("..") {
        return Err(unsafe_path());
    }

    let joined = base.join(raw);
    // Missing files are reported later by the reader; resolve lexically.
    let resolved = joined
        .canonicalize()
        .unwrap_or_else(|_| lexical_normalize(&joined));
    if resolved.starts_with(base) {
        Ok(resolved)
    } else {
        Err(unsafe_path())
    }
}

fn lexical_normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
