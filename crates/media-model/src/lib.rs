//! Reelcut Media Model
//!
//! Defines the data contracts shared by the analysis and render crates:
//! - **Frame:** a decoded intensity image with its timestamp
//! - **ScoredSample / Interval:** per-frame metrics and the time spans selected from them
//! - **SourceClip / SubClip / Concatenation:** reference-counted views over source media
//!
//! Times are seconds, expressed in the time base of the clip they describe.

pub mod clip;
pub mod frame;
pub mod interval;

pub use clip::*;
pub use frame::*;
pub use interval::*;
