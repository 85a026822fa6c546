mod support;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reelcut_common::config::MotionPolicy;
use reelcut_media_model::Interval;
use reelcut_pipeline::naming::{default_highlight_path, steady_path_for};
use reelcut_pipeline::{HighlightPipeline, PipelineConfig, PipelineState, RunMode};
use reelcut_processing_core::{CancelFlag, ScanControl};

use support::{drift, fog, gimbal, ride, SyntheticBackend};

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    // Leaves the still transitions below the cutoff, so it lands on zero.
    config.analysis.top_percent = 40.0;
    config
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn assert_span(actual: Interval, start: f64, end: f64) {
    assert!(
        approx(actual.start, start) && approx(actual.end, end),
        "expected ({start}, {end}), got {actual:?}"
    );
}

struct Fixture {
    _dir: tempfile::TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Fixture {
    /// Staging files still lying around in the fixture directory.
    fn leftovers(&self) -> usize {
        std::fs::read_dir(self._dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".reelcut-"))
            .count()
    }
}

fn fixture(name: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join(name);
    let output = default_highlight_path(&input);
    Fixture {
        _dir: dir,
        input,
        output,
    }
}

fn pipeline(backend: &Arc<SyntheticBackend>, config: PipelineConfig) -> HighlightPipeline {
    HighlightPipeline::new(backend.clone(), config)
}

#[test]
fn highlight_keeps_steady_action() {
    let fx = fixture("ride.mp4");
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fx.input, 20.0, Some(10.0), ride);
    let backend = Arc::new(backend);

    let result = pipeline(&backend, config()).run(&fx.input, &fx.output);

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.mode, RunMode::Highlight);
    assert_eq!(result.state, PipelineState::Done);
    assert!(!result.degraded);
    assert_eq!(result.output_path.as_deref(), Some(fx.output.as_path()));

    assert_eq!(result.steady_intervals.len(), 1);
    assert_span(result.steady_intervals[0], 4.0, 16.0);

    assert_eq!(result.threshold, Some(0.0));
    assert_eq!(result.action_intervals.len(), 1);
    assert_span(result.action_intervals[0], 5.1, 8.1);

    let writes = backend.write_calls();
    assert_eq!(writes.len(), 1);
    assert!(writes[0].staged_for(&fx.output));
    assert!(fx.output.exists());
    assert_eq!(fx.leftovers(), 0);
    assert_eq!(writes[0].clips.len(), 1);
    assert_eq!(writes[0].clips[0].0, fx.input);
    assert_span(writes[0].clips[0].1, 9.1, 12.1);
    assert_eq!(writes[0].settings.video_codec, "libx264");
    assert_eq!(writes[0].settings.threads, 4);

    let visited: Vec<PipelineState> = result.timings.iter().map(|t| t.state).collect();
    assert_eq!(visited, PipelineState::HIGHLIGHT[..7].to_vec());
}

#[test]
fn sources_are_released_after_every_run() {
    let fx = fixture("ride.mp4");
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fx.input, 20.0, Some(10.0), ride);
    let backend = Arc::new(backend);

    let ok = pipeline(&backend, config()).run(&fx.input, &fx.output);
    assert!(ok.success);
    assert_eq!(backend.live_sources(), 0);

    let mut strict = config();
    strict.analysis.blur_threshold = 1e12;
    let failed = pipeline(&backend, strict).run(&fx.input, &fx.output);
    assert!(!failed.success);
    assert_eq!(backend.live_sources(), 0);
}

#[test]
fn nothing_steady_aborts_without_writing() {
    let fx = fixture("fog.mp4");
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fx.input, 5.0, Some(10.0), fog);
    let backend = Arc::new(backend);

    let result = pipeline(&backend, config()).run(&fx.input, &fx.output);

    assert!(!result.success);
    assert_eq!(result.state, PipelineState::Aborted);
    let error = result.error.expect("failure recorded");
    assert_eq!(error.kind, "empty_segment_set");
    assert_eq!(error.state, PipelineState::StabilityFilter);
    assert!(error.message.contains("stability"));
    assert!(result.output_path.is_none());
    assert!(backend.write_calls().is_empty());
    assert!(!fx.output.exists());
}

#[test]
fn undetermined_frame_rate_keeps_whole_input() {
    let fx = fixture("drift.mp4");
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fx.input, 9.0, Some(0.0), drift);
    let backend = Arc::new(backend);

    let mut config = config();
    config.analysis.min_action_duration_secs = 0.5;
    let result = pipeline(&backend, config).run(&fx.input, &fx.output);

    assert!(result.degraded);
    assert_eq!(result.steady_intervals.len(), 1);
    assert_span(result.steady_intervals[0], 0.0, 9.0);
    assert!(result.success, "{:?}", result.error);
}

#[test]
fn frame_rate_above_ceiling_is_undetermined() {
    let fx = fixture("gimbal.mp4");
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fx.input, 9.0, Some(10.0), gimbal);
    let backend = Arc::new(backend);

    let mut config = config();
    config.analysis.max_frame_rate = Some(5.0);
    config.analysis.min_action_duration_secs = 0.5;
    let result = pipeline(&backend, config).run(&fx.input, &fx.output);
    assert!(result.degraded);
    assert!(result.success, "{:?}", result.error);
    assert_span(result.action_intervals[0], 91.0 / 30.0, 121.0 / 30.0);
}

#[test]
fn encoder_failure_removes_partial_output() {
    let fx = fixture("ride.mp4");
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fx.input, 20.0, Some(10.0), ride);
    backend.fail_writes = true;
    let backend = Arc::new(backend);

    let result = pipeline(&backend, config()).run(&fx.input, &fx.output);

    assert!(!result.success);
    let error = result.error.expect("failure recorded");
    assert_eq!(error.kind, "encode_failure");
    assert_eq!(error.state, PipelineState::Write);
    assert!(!fx.output.exists());
    assert_eq!(fx.leftovers(), 0);
}

#[test]
fn failed_write_keeps_existing_output() {
    let fx = fixture("ride.mp4");
    std::fs::write(&fx.output, b"previous highlight").unwrap();
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fx.input, 20.0, Some(10.0), ride);
    backend.refuse_writes = true;
    let backend = Arc::new(backend);

    let result = pipeline(&backend, config()).run(&fx.input, &fx.output);

    assert!(!result.success);
    assert_eq!(result.error.unwrap().state, PipelineState::Write);
    assert_eq!(std::fs::read(&fx.output).unwrap(), b"previous highlight");
    assert_eq!(fx.leftovers(), 0);
}

#[test]
fn successful_run_replaces_existing_output() {
    let fx = fixture("ride.mp4");
    std::fs::write(&fx.output, b"previous highlight").unwrap();
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fx.input, 20.0, Some(10.0), ride);
    let backend = Arc::new(backend);

    let result = pipeline(&backend, config()).run(&fx.input, &fx.output);

    assert!(result.success, "{:?}", result.error);
    assert_eq!(std::fs::read(&fx.output).unwrap(), b"partial");
    assert_eq!(fx.leftovers(), 0);
}

#[test]
fn output_naming_the_input_is_rejected() {
    let fx = fixture("ride.mp4");
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fx.input, 20.0, Some(10.0), ride);
    backend.refuse_writes = true;
    let backend = Arc::new(backend);

    let highlight = pipeline(&backend, config()).run(&fx.input, &fx.input);
    let action = pipeline(&backend, config()).run_action(&fx.input, &fx.input);

    for result in [highlight, action] {
        assert!(!result.success);
        let error = result.error.unwrap();
        assert_eq!(error.kind, "config");
        assert_eq!(error.state, PipelineState::Init);
    }
    assert!(backend.opened.lock().unwrap().is_empty());
    assert_eq!(std::fs::read(&fx.input).unwrap(), b"synthetic");
}

#[test]
fn cancellation_aborts_the_scan() {
    let fx = fixture("ride.mp4");
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fx.input, 20.0, Some(10.0), ride);
    let backend = Arc::new(backend);

    let cancel = CancelFlag::new();
    cancel.cancel();
    let result = pipeline(&backend, config())
        .with_control(ScanControl::default().with_cancel(cancel))
        .run(&fx.input, &fx.output);

    assert!(!result.success);
    let error = result.error.expect("failure recorded");
    assert_eq!(error.kind, "cancelled");
    assert_eq!(error.state, PipelineState::StabilityFilter);
    assert!(backend.write_calls().is_empty());
}

#[test]
fn backend_panic_becomes_a_failed_result() {
    let fx = fixture("ride.mp4");
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fx.input, 20.0, Some(10.0), ride);
    backend.panic_on_open = true;
    let backend = Arc::new(backend);

    let result = pipeline(&backend, config()).run(&fx.input, &fx.output);

    assert!(!result.success);
    let error = result.error.expect("failure recorded");
    assert_eq!(error.kind, "unexpected_fault");
    assert_eq!(error.state, PipelineState::Decode);
    assert!(error.message.contains("decoder crashed"));
}

#[test]
fn missing_input_is_unreadable() {
    let fx = fixture("ride.mp4");
    let backend = Arc::new(SyntheticBackend::new());
    let result = pipeline(&backend, config()).run(&fx.input, &fx.output);
    assert_eq!(result.error.unwrap().kind, "source_unreadable");
}

#[test]
fn invalid_config_fails_before_decoding() {
    let fx = fixture("ride.mp4");
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fx.input, 20.0, Some(10.0), ride);
    let backend = Arc::new(backend);

    let mut config = config();
    config.analysis.top_percent = 150.0;
    let result = pipeline(&backend, config).run(&fx.input, &fx.output);
    let error = result.error.unwrap();
    assert_eq!(error.kind, "config");
    assert_eq!(error.state, PipelineState::Init);
    assert_eq!(backend.live_sources(), 0);
}

#[test]
fn persisted_steady_cut_is_written_first() {
    let fx = fixture("ride.mp4");
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fx.input, 20.0, Some(10.0), ride);
    let backend = Arc::new(backend);

    let mut config = config();
    config.analysis.persist_steady = true;
    let result = pipeline(&backend, config).run(&fx.input, &fx.output);

    assert!(result.success, "{:?}", result.error);
    let steady = steady_path_for(&fx.output, &fx.input);
    assert_eq!(result.steady_path.as_deref(), Some(steady.as_path()));
    assert!(steady.exists());

    let writes = backend.write_calls();
    assert_eq!(writes.len(), 2);
    assert!(writes[0].staged_for(&steady));
    assert_span(writes[0].clips[0].1, 4.0, 16.0);
    assert!(writes[1].staged_for(&fx.output));
    assert_eq!(fx.leftovers(), 0);
}

#[test]
fn persisted_steady_cut_is_removed_when_action_fails() {
    let fx = fixture("ride.mp4");
    let mut backend = SyntheticBackend::new();
    // Sharp but perfectly still: no transition beats the cutoff.
    backend.add_source(&fx.input, 8.0, Some(10.0), |_| support::with_square(20));
    let backend = Arc::new(backend);

    let mut config = config();
    config.analysis.persist_steady = true;
    let result = pipeline(&backend, config).run(&fx.input, &fx.output);

    assert!(!result.success);
    let error = result.error.unwrap();
    assert_eq!(error.kind, "empty_segment_set");
    assert_eq!(error.state, PipelineState::ActionScore);
    assert!(result.steady_path.is_none());
    assert!(!steady_path_for(&fx.output, &fx.input).exists());
    assert_eq!(fx.leftovers(), 0);
}

#[test]
fn steady_mode_joins_inputs_and_skips_missing() {
    let dir = tempfile::tempdir().unwrap();
    let ride_path = dir.path().join("ride.mp4");
    let gimbal_path = dir.path().join("gimbal.mp4");
    let missing = dir.path().join("missing.mp4");
    let output = dir.path().join("steady_all.mp4");

    let mut backend = SyntheticBackend::new();
    backend.add_source(&ride_path, 20.0, Some(10.0), ride);
    backend.add_source(&gimbal_path, 6.0, Some(10.0), gimbal);
    let backend = Arc::new(backend);

    let result = pipeline(&backend, config()).run_steady(
        &[ride_path.clone(), missing, gimbal_path.clone()],
        &output,
    );

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.mode, RunMode::SteadyOnly);
    assert!(result.action_intervals.is_empty());
    assert!(result.threshold.is_none());

    let writes = backend.write_calls();
    assert_eq!(writes.len(), 1);
    let sources: Vec<&Path> = writes[0].clips.iter().map(|(p, _)| p.as_path()).collect();
    assert_eq!(sources, vec![ride_path.as_path(), gimbal_path.as_path()]);
    assert_span(writes[0].clips[0].1, 4.0, 16.0);
    assert_span(writes[0].clips[1].1, 0.0, 6.0);
    assert_eq!(backend.live_sources(), 0);
}

#[test]
fn steady_mode_with_nothing_sharp_fails() {
    let dir = tempfile::tempdir().unwrap();
    let fog_path = dir.path().join("fog.mp4");
    let output = dir.path().join("steady_fog.mp4");
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fog_path, 5.0, Some(10.0), fog);
    let backend = Arc::new(backend);

    let result = pipeline(&backend, config()).run_steady(&[fog_path], &output);
    assert!(!result.success);
    let error = result.error.unwrap();
    assert_eq!(error.kind, "empty_segment_set");
    assert_eq!(error.state, PipelineState::ConcatenateSteady);
    assert!(!output.exists());
}

#[test]
fn action_mode_with_mean_policy() {
    let fx = fixture("gimbal.mp4");
    let mut backend = SyntheticBackend::new();
    backend.add_source(&fx.input, 9.0, Some(10.0), gimbal);
    let backend = Arc::new(backend);

    let mut config = config();
    config.analysis.motion_policy = MotionPolicy::Mean;
    let result = pipeline(&backend, config).run_action(&fx.input, &fx.output);

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.mode, RunMode::ActionOnly);
    assert!(result.steady_intervals.is_empty());
    assert_eq!(result.action_intervals.len(), 1);
    assert_span(result.action_intervals[0], 3.1, 6.1);

    let writes = backend.write_calls();
    assert_span(writes[0].clips[0].1, 3.1, 6.1);
}
