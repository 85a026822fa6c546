//! Resolved pipeline settings.

use serde::{Deserialize, Serialize};

use reelcut_common::config::{AnalysisDefaults, AppConfig, EncoderDefaults, MotionPolicy};
use reelcut_common::error::ReelcutResult;
use reelcut_processing_core::flow::FlowParams;
use reelcut_processing_core::{ActionConfig, MotionScorer, MotionSummary, StabilityConfig};
use reelcut_render_engine::EncoderSettings;

/// Everything one pipeline run needs to know, resolved from [`AppConfig`]
/// and command-line overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub analysis: AnalysisDefaults,
    pub encoder: EncoderDefaults,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            analysis: config.analysis.clone(),
            encoder: config.encoder.clone(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> ReelcutResult<()> {
        self.analysis.validate()
    }

    pub fn stability(&self) -> StabilityConfig {
        StabilityConfig::from(&self.analysis)
    }

    pub fn action(&self) -> ActionConfig {
        ActionConfig::from(&self.analysis)
    }

    pub fn motion(&self) -> MotionScorer {
        let a = &self.analysis;
        let summary = match a.motion_policy {
            MotionPolicy::RoiPercentile => MotionSummary::RoiPercentile {
                percentile: a.motion_percentile,
                roi_margin: a.roi_margin,
            },
            MotionPolicy::Mean => MotionSummary::Mean,
        };
        let flow = FlowParams {
            pyramid_scale: a.flow.pyramid_scale,
            levels: a.flow.levels,
            window: a.flow.window,
            iterations: a.flow.iterations,
        };
        MotionScorer::new(flow, summary)
    }

    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings::from(&self.encoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_policy_maps_to_mean_summary() {
        let mut config = PipelineConfig::default();
        assert!(matches!(
            config.motion().summary,
            MotionSummary::RoiPercentile { percentile, roi_margin }
                if percentile == 95.0 && roi_margin == 0.1
        ));

        config.analysis.motion_policy = MotionPolicy::Mean;
        assert_eq!(config.motion().summary, MotionSummary::Mean);
    }

    #[test]
    fn stage_configs_follow_analysis_defaults() {
        let mut config = PipelineConfig::default();
        config.analysis.blur_threshold = 90.0;
        config.analysis.top_percent = 10.0;
        assert_eq!(config.stability().blur_threshold, 90.0);
        assert_eq!(config.stability().min_duration_secs, 1.0);
        assert_eq!(config.action().top_percent, 10.0);
        assert_eq!(config.action().min_duration_secs, 2.0);
        assert_eq!(config.encoder_settings().preset, "medium");
    }
}
