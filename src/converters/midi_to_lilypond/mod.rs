//! MIDI to LilyPond converter module
//!
//! Turns the note events of one voice into a LilyPond music expression.
//!
//! # Overview
//!
//! The converter runs a five-stage pipeline:
//! 1. **Quantize**: snap ticks to the 1/32 and 1/32-triplet raster
//! 2. **Group**: merge overlapping notes into chords, fill gaps with rests
//! 3. **Measures**: cut groups at bar lines, tying the pieces
//! 4. **Rhythm**: split groups into legally notated, tied pieces
//! 5. **Render**: relative pitches or drum names, durations, ties,
//!    `\triplets { }` brackets and bar checks
//!
//! # Features
//!
//! - Best-effort conversion (always produces complete output)
//! - Multi-language note names (Nederlands, English, Deutsch, Italiano)
//! - Chord repeat shorthand (`q`) and drum mode
//! - Strict or adapted (syncopated) notation
//! - Diagnostics collected as warnings
//!
//! # Basic Usage
//!
//! ```ignore
//! use midi_lilypond::converters::midi_to_lilypond::{convert, NoteEvent};
//!
//! let events = vec![NoteEvent { pitch: 60, start_tick: 0, end_tick: 1920 }];
//! let source = convert(&events, &[1920], 1920, 480, Some(60), false);
//! assert_eq!(source, "\\relative c' {\n  c1 |\n}");
//! ```

pub mod converter;
pub mod errors;
pub mod groups;
pub mod lilypond;
pub mod measures;
pub mod pitch;
pub mod quantizer;
pub mod rhythm;
pub mod templates;
pub mod types;

// Re-export main API
pub use converter::{convert, ConversionContext, MidiToLilypondConverter};
pub use errors::{ConversionError, ConversionWarning};
pub use templates::render_standalone_document;
pub use types::{
    ConversionInput, ConversionResult, ConversionSettings, NoteEvent, PitchLanguage, Ticks,
};
