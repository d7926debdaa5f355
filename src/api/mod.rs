//! WASM API
//!
//! JavaScript-facing entry points.
//!
//! - `helpers`: console logging, serde conversions, the shared converter
//! - `export`: conversion functions

pub mod helpers;
pub mod export;

pub use export::{
    convert_midi_to_lilypond, convert_smf_track_to_lilypond, list_smf_tracks, render_standalone,
};
