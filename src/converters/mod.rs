//! Format converters
//!
//! - `midi_to_lilypond`: note events to LilyPond notation
//! - `smf`: Standard MIDI File import feeding the converter

pub mod midi_to_lilypond;
pub mod smf;

// Re-export for convenience
pub use midi_to_lilypond::{convert, ConversionInput, ConversionSettings, MidiToLilypondConverter};
pub use smf::{read_smf, read_smf_file, SmfTrack};
