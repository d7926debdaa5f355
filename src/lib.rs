//! MIDI to LilyPond rhythm engine
//!
//! Converts timed MIDI note events into LilyPond notation: chords and rests
//! on a gap-free timeline, durations split into legally notated tied
//! pieces, relative pitches or drum names. Ships with WASM bindings for
//! browser use and a Standard MIDI File importer.

pub mod api;
pub mod converters;

// Re-export commonly used types
pub use converters::midi_to_lilypond::{
    convert, render_standalone_document, ConversionError, ConversionInput, ConversionResult,
    ConversionSettings, ConversionWarning, MidiToLilypondConverter, NoteEvent, PitchLanguage,
    Ticks,
};
pub use converters::smf::{read_smf, read_smf_file, SmfTrack};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    {
        if console_log::init_with_level(log::Level::Debug).is_err() {
            crate::wasm_warn!("logger was already initialized");
        }
    }

    log::info!("MIDI to LilyPond WASM module initialized");
}
