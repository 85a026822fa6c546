//! Source clips and the views carved from them.
//!
//! A [`SourceClip`] is opened once and shared through `Arc`. A [`SubClip`]
//! is a read-only view over one span of a source. It holds a strong
//! reference, so the source stays alive as long as any view does. A
//! [`Concatenation`] sutures views end to end and exposes its own time
//! base, starting at zero. Nothing here copies media. Dropping the last
//! view releases the source.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::interval::Interval;

/// Spans shorter than this are treated as empty when splitting at seams.
const SEAM_EPSILON_SECS: f64 = 1e-9;

/// Probed properties of a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub path: PathBuf,
    /// Total duration (seconds).
    pub duration_secs: f64,
    /// Native frame rate, if the container reports a usable one.
    pub frame_rate: Option<f64>,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
}

/// An opened source video.
#[derive(Debug)]
pub struct SourceClip {
    info: SourceInfo,
}

impl SourceClip {
    pub fn open(info: SourceInfo) -> Arc<Self> {
        Arc::new(Self { info })
    }

    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    pub fn path(&self) -> &Path {
        &self.info.path
    }

    pub fn duration(&self) -> f64 {
        self.info.duration_secs
    }

    /// The whole source as one view. `None` if the source has no duration.
    pub fn full(self: &Arc<Self>) -> Option<SubClip> {
        self.subclip(Interval::new(0.0, self.info.duration_secs)?)
    }

    /// A view restricted to `interval`, clamped to the source duration.
    pub fn subclip(self: &Arc<Self>, interval: Interval) -> Option<SubClip> {
        let clamped = Interval::new(interval.start, interval.end.min(self.info.duration_secs))?;
        Some(SubClip {
            source: Arc::clone(self),
            interval: clamped,
        })
    }
}

/// A read-only view over part of a [`SourceClip`].
#[derive(Debug, Clone)]
pub struct SubClip {
    source: Arc<SourceClip>,
    interval: Interval,
}

impl SubClip {
    pub fn source(&self) -> &Arc<SourceClip> {
        &self.source
    }

    /// Span in source time.
    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn duration(&self) -> f64 {
        self.interval.duration()
    }

    pub fn path(&self) -> &Path {
        self.source.path()
    }
}

/// Views played back to back, with their own zero-based time base.
#[derive(Debug, Clone, Default)]
pub struct Concatenation {
    clips: Vec<SubClip>,
    /// Start of each clip in concatenated time.
    offsets: Vec<f64>,
    duration: f64,
}

impl Concatenation {
    pub fn new(clips: Vec<SubClip>) -> Self {
        let mut offsets = Vec::with_capacity(clips.len());
        let mut cursor = 0.0;
        for clip in &clips {
            offsets.push(cursor);
            cursor += clip.duration();
        }
        Self {
            clips,
            offsets,
            duration: cursor,
        }
    }

    pub fn clips(&self) -> &[SubClip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Total duration in concatenated time (seconds).
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Concatenated-time span occupied by each clip.
    pub fn seams(&self) -> impl Iterator<Item = (f64, &SubClip)> + '_ {
        self.offsets.iter().copied().zip(self.clips.iter())
    }

    /// Map a concatenated-time interval to views on the underlying sources.
    ///
    /// An interval that crosses a seam comes back as one view per clip it
    /// touches, in playback order.
    pub fn project(&self, interval: &Interval) -> Vec<SubClip> {
        let mut pieces = Vec::new();
        for (offset, clip) in self.seams() {
            let local_start = (interval.start - offset).max(0.0);
            let local_end = (interval.end - offset).min(clip.duration());
            if local_end - local_start <= SEAM_EPSILON_SECS {
                continue;
            }
            let base = clip.interval().start;
            if let Some(span) = Interval::new(base + local_start, base + local_end) {
                if let Some(piece) = clip.source().subclip(span) {
                    pieces.push(piece);
                }
            }
        }
        pieces
    }

    /// Project every interval and concatenate the resulting views.
    pub fn select(&self, intervals: &[Interval]) -> Concatenation {
        Concatenation::new(
            intervals
                .iter()
                .flat_map(|interval| self.project(interval))
                .collect(),
        )
    }
}

impl FromIterator<SubClip> for Concatenation {
    fn from_iter<I: IntoIterator<Item = SubClip>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(duration: f64) -> Arc<SourceClip> {
        SourceClip::open(SourceInfo {
            path: PathBuf::from("ride.mp4"),
            duration_secs: duration,
            frame_rate: Some(30.0),
            width: 64,
            height: 48,
            has_audio: true,
        })
    }

    fn span(start: f64, end: f64) -> Interval {
        Interval::new(start, end).unwrap()
    }

    #[test]
    fn subclip_is_clamped_to_source() {
        let src = source(10.0);
        let clip = src.subclip(span(8.0, 12.0)).unwrap();
        assert_eq!(clip.interval(), span(8.0, 10.0));
        assert!(src.subclip(span(10.0, 11.0)).is_none());
    }

    #[test]
    fn views_keep_source_alive_until_dropped() {
        let src = source(10.0);
        let steady = Concatenation::new(vec![
            src.subclip(span(1.0, 3.0)).unwrap(),
            src.subclip(span(5.0, 9.0)).unwrap(),
        ]);
        assert_eq!(Arc::strong_count(&src), 3);

        let best = steady.select(&[span(1.0, 3.0)]);
        assert_eq!(Arc::strong_count(&src), 5);

        drop(steady);
        drop(best);
        assert_eq!(Arc::strong_count(&src), 1);
    }

    #[test]
    fn project_splits_at_seams() {
        let src = source(10.0);
        let steady = Concatenation::new(vec![
            src.subclip(span(1.0, 3.0)).unwrap(),
            src.subclip(span(5.0, 9.0)).unwrap(),
        ]);
        assert!((steady.duration() - 6.0).abs() < 1e-12);

        // [1.5, 3.0) in concatenated time straddles the seam at 2.0.
        let pieces = steady.project(&span(1.5, 3.0));
        let spans: Vec<Interval> = pieces.iter().map(SubClip::interval).collect();
        assert_eq!(spans, vec![span(2.5, 3.0), span(5.0, 6.0)]);
    }

    #[test]
    fn project_inside_one_clip() {
        let src = source(10.0);
        let steady = Concatenation::new(vec![
            src.subclip(span(1.0, 3.0)).unwrap(),
            src.subclip(span(5.0, 9.0)).unwrap(),
        ]);
        let pieces = steady.project(&span(3.0, 5.0));
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].interval(), span(6.0, 8.0));
    }

    #[test]
    fn empty_concatenation() {
        let empty = Concatenation::default();
        assert!(empty.is_empty());
        assert_eq!(empty.duration(), 0.0);
        assert!(empty.project(&span(0.0, 1.0)).is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn projection_preserves_covered_duration(
                spans in prop::collection::vec((0.0f64..50.0, 0.1f64..5.0), 1..6),
                start_frac in 0.0f64..1.0,
                len_frac in 0.01f64..1.0,
            ) {
                let src = source(100.0);
                let concat: Concatenation = spans
                    .iter()
                    .filter_map(|(s, d)| src.subclip(Interval::new(*s, s + d)?))
                    .collect();
                let total = concat.duration();
                let start = start_frac * total;
                let end = (start + len_frac * total).min(total);
                prop_assume!(end - start > 1e-6);

                let wanted = Interval::new(start, end).unwrap();
                let covered: f64 = concat.project(&wanted).iter().map(SubClip::duration).sum();
                prop_assert!((covered - wanted.duration()).abs() < 1e-6);
            }
        }
    }
}
