//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReelcutError, ReelcutResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Segment selection parameters.
    pub analysis: AnalysisDefaults,

    /// Encoder settings handed to the video writer.
    pub encoder: EncoderDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// How a dense flow field is reduced to a single motion score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPolicy {
    /// High percentile of the magnitude over a central region of interest.
    RoiPercentile,
    /// Mean magnitude over the full frame.
    Mean,
}

/// Default segment selection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisDefaults {
    /// Sharpness cutoff (variance of Laplacian). Frames at or below it are blurred.
    pub blur_threshold: f64,

    /// Percentage of the action score distribution to keep, in `(0, 100]`.
    pub top_percent: f64,

    /// Minimum steady run length (seconds).
    pub min_steady_duration_secs: f64,

    /// Minimum action run length (seconds).
    pub min_action_duration_secs: f64,

    /// Motion summary policy for the action stage.
    pub motion_policy: MotionPolicy,

    /// Percentile used by [`MotionPolicy::RoiPercentile`].
    pub motion_percentile: f64,

    /// Fraction cropped from each edge by [`MotionPolicy::RoiPercentile`].
    pub roi_margin: f64,

    /// Frame rates above this are treated as undetermined. `None` disables the check.
    pub max_frame_rate: Option<f64>,

    /// Also write the steady-only concatenation as a separate artifact.
    pub persist_steady: bool,

    /// Dense optical flow parameters.
    pub flow: FlowDefaults,
}

/// Dense optical flow parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowDefaults {
    /// Scale between successive pyramid levels.
    pub pyramid_scale: f64,
    /// Number of pyramid levels, including the full-resolution one.
    pub levels: u32,
    /// Averaging window side length (pixels).
    pub window: u32,
    /// Refinement iterations per level.
    pub iterations: u32,
}

/// Encoder parameters. Passed through to the writer untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderDefaults {
    pub video_codec: String,
    pub audio_codec: String,
    pub threads: u32,
    pub preset: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelcut=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            blur_threshold: 60.0,
            top_percent: 20.0,
            min_steady_duration_secs: 1.0,
            min_action_duration_secs: 2.0,
            motion_policy: MotionPolicy::RoiPercentile,
            motion_percentile: 95.0,
            roi_margin: 0.1,
            max_frame_rate: None,
            persist_steady: false,
            flow: FlowDefaults::default(),
        }
    }
}

impl Default for FlowDefaults {
    fn default() -> Self {
        Self {
            pyramid_scale: 0.5,
            levels: 3,
            window: 15,
            iterations: 3,
        }
    }
}

impl Default for EncoderDefaults {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            threads: 4,
            preset: "medium".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AnalysisDefaults {
    /// Reject values the selection stages cannot work with.
    pub fn validate(&self) -> ReelcutResult<()> {
        if !self.blur_threshold.is_finite() || self.blur_threshold < 0.0 {
            return Err(ReelcutError::config(format!(
                "blur_threshold must be a non-negative number, got {}",
                self.blur_threshold
            )));
        }
        if !(self.top_percent > 0.0 && self.top_percent <= 100.0) {
            return Err(ReelcutError::config(format!(
                "top_percent must be in (0, 100], got {}",
                self.top_percent
            )));
        }
        for (name, value) in [
            ("min_steady_duration_secs", self.min_steady_duration_secs),
            ("min_action_duration_secs", self.min_action_duration_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ReelcutError::config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if !(0.0..=100.0).contains(&self.motion_percentile) {
            return Err(ReelcutError::config(format!(
                "motion_percentile must be in [0, 100], got {}",
                self.motion_percentile
            )));
        }
        if !(0.0..0.5).contains(&self.roi_margin) {
            return Err(ReelcutError::config(format!(
                "roi_margin must be in [0, 0.5), got {}",
                self.roi_margin
            )));
        }
        if let Some(ceiling) = self.max_frame_rate {
            if !ceiling.is_finite() || ceiling <= 0.0 {
                return Err(ReelcutError::config(format!(
                    "max_frame_rate must be positive, got {ceiling}"
                )));
            }
        }
        self.flow.validate()
    }
}

impl FlowDefaults {
    pub fn validate(&self) -> ReelcutResult<()> {
        if !(self.pyramid_scale > 0.0 && self.pyramid_scale < 1.0) {
            return Err(ReelcutError::config(format!(
                "flow.pyramid_scale must be in (0, 1), got {}",
                self.pyramid_scale
            )));
        }
        if self.levels == 0 || self.iterations == 0 {
            return Err(ReelcutError::config(
                "flow.levels and flow.iterations must be at least 1",
            ));
        }
        if self.window < 3 || self.window % 2 == 0 {
            return Err(ReelcutError::config(format!(
                "flow.window must be an odd number >= 3, got {}",
                self.window
            )));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit file. Errors are returned, not swallowed.
    pub fn load_from(path: &Path) -> ReelcutResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReelcutError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.analysis.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelcut").join("config.json")
}
