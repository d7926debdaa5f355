//! Error types for MIDI to LilyPond conversion
//!
//! Two tiers, mirroring how the engine treats problems:
//! - `ConversionError`: returned by constructors and adapters (bad input
//!   objects, unreadable MIDI files, malformed settings). The engine itself
//!   never returns it.
//! - `ConversionWarning`: recorded while converting. The conversion always
//!   finishes and the warning shows up in the report and the log.

use serde::Serialize;
use thiserror::Error;

use crate::converters::midi_to_lilypond::types::Ticks;

/// Fatal errors raised outside the conversion pipeline
#[derive(Debug, Error)]
pub enum ConversionError {
    /// A note event violates `start < end` or the MIDI pitch range
    #[error("Invalid note event: {0}")]
    InvalidNote(String),

    /// Ticks per quarter note must be positive
    #[error("Invalid resolution: {0} ticks per quarter note")]
    InvalidResolution(u32),

    /// Settings JSON could not be parsed
    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] serde_json::Error),

    /// Standard MIDI file could not be read
    #[error("MIDI import failed: {0}")]
    Midi(String),

    /// Standalone document template failed to render
    #[error("Template rendering failed: {0}")]
    Template(#[from] mustache::Error),

    /// File access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Non-fatal diagnostics collected during a conversion
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConversionWarning {
    /// Note collapsed to zero length on the raster
    #[error("note {pitch} at tick {start} has no duration after quantisation")]
    EmptyNote { pitch: u8, start: Ticks },

    /// Note overlaps an earlier note of the same pitch
    #[error("note {pitch} at tick {start} overlaps a note of the same pitch sounding until tick {previous_end}")]
    OverlappingNote {
        pitch: u8,
        start: Ticks,
        previous_end: Ticks,
    },

    /// No legal notation within the piece limit; group rendered with a placeholder
    #[error("no notatable split for {duration} ticks at tick {position} (measure offset {offset})")]
    UndecomposableDuration {
        position: Ticks,
        offset: Ticks,
        duration: Ticks,
    },

    /// Percussion pitch without a drum name
    #[error("drum pitch {pitch} is outside the supported range 35..=81")]
    UnknownDrumPitch { pitch: u8 },

    /// Measure tick list was not strictly ascending
    #[error("measure tick {tick} is not after the previous measure tick {previous}")]
    MeasureTickOutOfOrder { tick: Ticks, previous: Ticks },

    /// Resolution outside the supported range; converted with `used` instead
    #[error("resolution of {requested} ticks per quarter note is unsupported, using {used}")]
    UnsupportedResolution { requested: Ticks, used: Ticks },
}
