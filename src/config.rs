//! Session configuration, loadable from JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

/// Engine parameters for building and running a TLD tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TldParams {
    pub win_size: WindowSize,
    pub level: u32,
    pub min_forward_backward_error: f32,
    pub min_eigen: f32,
    pub min_win: u32,
    pub interval: u32,
    pub shift: f32,
    pub top_n: u32,
    pub rotation: u32,
    pub include_overlap: f32,
    pub exclude_overlap: f32,
    pub structs: u32,
    pub features: u32,
    pub validate_set: f32,
    pub nnc_same: f32,
    pub nnc_thres: f32,
    pub nnc_verify: f32,
    pub nnc_beyond: f32,
    pub nnc_collect: f32,
    pub bad_patches: u32,
    pub new_deform: u32,
    pub track_deform: u32,
    pub new_deform_angle: f32,
    pub track_deform_angle: f32,
    pub new_deform_scale: f32,
    pub track_deform_scale: f32,
    pub new_deform_shift: f32,
    pub track_deform_shift: f32,
}

impl Default for TldParams {
    fn default() -> Self {
        Self {
            win_size: WindowSize {
                width: 15,
                height: 15,
            },
            level: 5,
            min_forward_backward_error: 100.0,
            min_eigen: 0.025,
            min_win: 20,
            interval: 3,
            shift: 0.1,
            top_n: 100,
            rotation: 0,
            include_overlap: 0.7,
            exclude_overlap: 0.2,
            structs: 40,
            features: 18,
            validate_set: 0.5,
            nnc_same: 0.95,
            nnc_thres: 0.65,
            nnc_verify: 0.7,
            nnc_beyond: 0.8,
            nnc_collect: 0.5,
            bad_patches: 100,
            new_deform: 20,
            track_deform: 10,
            new_deform_angle: 20.0,
            track_deform_angle: 10.0,
            new_deform_scale: 0.02,
            track_deform_scale: 0.02,
            new_deform_shift: 0.02,
            track_deform_shift: 0.02,
        }
    }
}

/// Optical flow parameters. Defaults follow the TLD tracker's own flow settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LkParams {
    pub win_size: WindowSize,
    pub level: u32,
    /// Minimal eigenvalue for a valid flow computation.
    pub min_eigen: f32,
}

impl Default for LkParams {
    fn default() -> Self {
        let tld = TldParams::default();
        Self {
            win_size: tld.win_size,
            level: tld.level,
            min_eigen: tld.min_eigen,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LkConfig {
    pub params: LkParams,
    /// Points per side used by `reseed_default`.
    pub grid_size: usize,
    /// Largest points-per-side a reseed request may ask for.
    pub max_grid_size: usize,
}

impl Default for LkConfig {
    fn default() -> Self {
        Self {
            params: LkParams::default(),
            grid_size: 10,
            max_grid_size: 100,
        }
    }
}

/// Configuration for both session variants and their presentation feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub tld: TldParams,
    pub lk: LkConfig,
    /// Side of the square box built around a click when seeding TLD.
    pub seed_box_size: f32,
    /// Step segment sets kept by the track history feed.
    pub history_len: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tld: TldParams::default(),
            lk: LkConfig::default(),
            seed_box_size: 20.0,
            history_len: 20,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

impl TrackingConfig {
    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lk.grid_size == 0 {
            return Err(ConfigError::Invalid("lk.grid_size must be at least 1"));
        }
        if self.lk.grid_size > self.lk.max_grid_size {
            return Err(ConfigError::Invalid("lk.grid_size exceeds lk.max_grid_size"));
        }
        if self.history_len == 0 {
            return Err(ConfigError::Invalid("history_len must be at least 1"));
        }
        if !(self.seed_box_size.is_finite() && self.seed_box_size > 0.0) {
            return Err(ConfigError::Invalid("seed_box_size must be positive"));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<TrackingConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    TrackingConfig::from_json_str(&data)
}
