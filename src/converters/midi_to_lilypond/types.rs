//! Type definitions for MIDI to LilyPond conversion
//!
//! This module defines the types shared by the pipeline stages:
//! - Public API types (ConversionInput, ConversionResult, ConversionSettings)
//! - Input events (NoteEvent)
//! - Musical attribute types (Pitch, NoteLength)

use serde::{Deserialize, Serialize};

use crate::converters::midi_to_lilypond::errors::{ConversionError, ConversionWarning};

/// Absolute or relative position/length in MIDI ticks
pub type Ticks = u32;

/// Finest supported resolution; finer inputs are clamped
pub const MAX_TICKS_PER_QUARTER_NOTE: Ticks = 1 << 20;

// ============================================================================
// PUBLIC API TYPES
// ============================================================================

/// A single sounding note as delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    /// MIDI pitch (0-127)
    pub pitch: u8,

    /// Note-on position in ticks
    pub start_tick: Ticks,

    /// Note-off position in ticks (exclusive)
    pub end_tick: Ticks,
}

impl NoteEvent {
    /// Create a new note event with validation
    pub fn new(pitch: u8, start_tick: Ticks, end_tick: Ticks) -> Result<Self, ConversionError> {
        if pitch > 127 {
            return Err(ConversionError::InvalidNote(format!(
                "pitch {} is outside the MIDI range 0-127",
                pitch
            )));
        }
        if start_tick >= end_tick {
            return Err(ConversionError::InvalidNote(format!(
                "pitch {} starts at tick {} but ends at tick {}",
                pitch, start_tick, end_tick
            )));
        }
        Ok(Self {
            pitch,
            start_tick,
            end_tick,
        })
    }

    /// Length in ticks (zero for degenerate events)
    pub fn duration(&self) -> Ticks {
        self.end_tick.saturating_sub(self.start_tick)
    }
}

/// Everything one conversion call needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionInput {
    /// Notes of one voice/track, any order
    pub events: Vec<NoteEvent>,

    /// Start tick of every measure after the first, ascending
    pub measure_ticks: Vec<Ticks>,

    /// End of the material (the output is padded with rests up to here)
    pub end_tick: Ticks,

    /// MIDI resolution
    pub ticks_per_quarter_note: Ticks,

    /// Initial reference pitch for `\relative`; `None` selects drum mode
    pub reference_pitch: Option<u8>,

    /// Allow syncopated and off-beat dotted notation
    #[serde(default)]
    pub adapted_notation: bool,
}

/// Result of a conversion
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    /// Generated LilyPond music expression (always complete)
    pub lilypond_source: String,

    /// Diagnostics collected while converting
    pub warnings: Vec<ConversionWarning>,
}

/// Configuration options for conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionSettings {
    /// Note name language
    pub language: PitchLanguage,

    /// Maximum width of an output line before wrapping at a bar
    pub line_width: usize,

    /// Indentation of the music lines inside the braces
    pub indent: usize,

    /// Whether rests may use dotted durations
    pub dotted_rests: bool,

    /// Target LilyPond version for standalone documents
    pub lilypond_version: String,

    /// Title for standalone documents
    pub title: Option<String>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            language: PitchLanguage::Nederlands,
            line_width: 80,
            indent: 2,
            dotted_rests: true,
            lilypond_version: "2.24.0".to_string(),
            title: None,
        }
    }
}

impl ConversionSettings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConversionError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Note naming language for LilyPond output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PitchLanguage {
    /// Dutch: c d e f g a b (cis/es for sharps/flats) - LilyPond default
    Nederlands,

    /// English: c d e f g a b (cs/ef for sharps/flats)
    English,

    /// German: c d e f g a h (cis/es for sharps/flats)
    Deutsch,

    /// Italian: do re mi fa sol la si (dod/mib for sharps/flats)
    Italiano,
}

impl PitchLanguage {
    /// Argument for LilyPond's `\language` command
    pub fn lilypond_name(self) -> &'static str {
        match self {
            PitchLanguage::Nederlands => "nederlands",
            PitchLanguage::English => "english",
            PitchLanguage::Deutsch => "deutsch",
            PitchLanguage::Italiano => "italiano",
        }
    }
}

// ============================================================================
// PITCH
// ============================================================================

/// Spelling of the twelve pitch classes as (step, alteration)
const CHROMATIC_SPELLING: [(u8, i8); 12] = [
    (0, 0),  // c
    (0, 1),  // cis
    (1, 0),  // d
    (2, -1), // es
    (2, 0),  // e
    (3, 0),  // f
    (3, 1),  // fis
    (4, 0),  // g
    (4, 1),  // gis
    (5, 0),  // a
    (6, -1), // bes
    (6, 0),  // b
];

/// Musical pitch representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pitch {
    /// Scale degree (0=C, 1=D, 2=E, 3=F, 4=G, 5=A, 6=B)
    pub step: u8,

    /// Accidental (-1=flat, 0=natural, +1=sharp)
    pub alteration: i8,

    /// Octave number (4 = middle C octave)
    pub octave: i8,
}

impl Pitch {
    /// Spell a MIDI pitch with the fixed chromatic table (60 = c')
    pub fn from_midi(midi: u8) -> Self {
        let (step, alteration) = CHROMATIC_SPELLING[(midi % 12) as usize];
        Self {
            step,
            alteration,
            octave: (midi / 12) as i8 - 1,
        }
    }

    /// Position on the staff counted in diatonic steps
    pub fn diatonic_index(&self) -> i32 {
        self.octave as i32 * 7 + self.step as i32
    }

    /// Absolute LilyPond notation, e.g. `c'` for middle C
    pub fn to_lilypond_string(&self, language: PitchLanguage) -> String {
        let marks = self.octave as i32 - 3;
        format!("{}{}", self.note_name(language), octave_marks(marks))
    }

    /// Notation inside `\relative` given the previous pitch
    ///
    /// The unmarked note lands within a fourth of `reference`; every octave
    /// between that placement and the real pitch adds a `'` or `,`.
    pub fn relative_to(&self, reference: &Pitch, language: PitchLanguage) -> String {
        let mut step_distance = (self.step as i32 - reference.step as i32).rem_euclid(7);
        if step_distance > 3 {
            step_distance -= 7;
        }
        let unmarked = reference.diatonic_index() + step_distance;
        let marks = (self.diatonic_index() - unmarked) / 7;
        format!("{}{}", self.note_name(language), octave_marks(marks))
    }

    /// Note name without octave marks
    pub fn note_name(&self, language: PitchLanguage) -> String {
        match language {
            PitchLanguage::Nederlands => self.note_name_nederlands(),
            PitchLanguage::English => self.note_name_english(),
            PitchLanguage::Deutsch => self.note_name_deutsch(),
            PitchLanguage::Italiano => self.note_name_italiano(),
        }
    }

    fn note_name_nederlands(&self) -> String {
        let base = ["c", "d", "e", "f", "g", "a", "b"][self.step as usize];
        match self.alteration {
            -1 if base == "e" || base == "a" => format!("{}s", base),
            -1 => format!("{}es", base),
            1 => format!("{}is", base),
            _ => base.to_string(),
        }
    }

    fn note_name_english(&self) -> String {
        let base = ["c", "d", "e", "f", "g", "a", "b"][self.step as usize];
        match self.alteration {
            -1 => format!("{}f", base),
            1 => format!("{}s", base),
            _ => base.to_string(),
        }
    }

    fn note_name_deutsch(&self) -> String {
        match (self.step, self.alteration) {
            // B flat is "b" in German, B natural is "h"
            (6, -1) => "b".to_string(),
            (2, -1) => "es".to_string(),
            (5, -1) => "as".to_string(),
            (step, alteration) => {
                let base = ["c", "d", "e", "f", "g", "a", "h"][step as usize];
                match alteration {
                    -1 => format!("{}es", base),
                    1 => format!("{}is", base),
                    _ => base.to_string(),
                }
            }
        }
    }

    fn note_name_italiano(&self) -> String {
        let base = ["do", "re", "mi", "fa", "sol", "la", "si"][self.step as usize];
        match self.alteration {
            -1 => format!("{}b", base),
            1 => format!("{}d", base),
            _ => base.to_string(),
        }
    }
}

fn octave_marks(count: i32) -> String {
    if count >= 0 {
        "'".repeat(count as usize)
    } else {
        ",".repeat(count.unsigned_abs() as usize)
    }
}

// ============================================================================
// NOTE LENGTHS
// ============================================================================

/// Notation variant of a base note value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LengthKind {
    Plain,
    Dotted,
    Triplet,
    DottedTriplet,
}

impl LengthKind {
    pub const ALL: [LengthKind; 4] = [
        LengthKind::Plain,
        LengthKind::Dotted,
        LengthKind::Triplet,
        LengthKind::DottedTriplet,
    ];

    /// Preference weight used to break ties between equally long splits
    pub fn complexity(self) -> u32 {
        match self {
            LengthKind::Plain => 2,
            LengthKind::Dotted => 3,
            LengthKind::Triplet => 4,
            LengthKind::DottedTriplet => 2,
        }
    }

    pub fn is_triplet(self) -> bool {
        matches!(self, LengthKind::Triplet | LengthKind::DottedTriplet)
    }

    pub fn is_dotted(self) -> bool {
        matches!(self, LengthKind::Dotted | LengthKind::DottedTriplet)
    }
}

/// Shortest base value: 1/32 note
pub const SHORTEST_LOG: u8 = 5;

/// A notatable length: base value plus variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NoteLength {
    /// Logarithmic base value (0=whole, 1=half, 2=quarter, ... 5=1/32)
    pub log: u8,

    pub kind: LengthKind,
}

impl NoteLength {
    pub fn new(log: u8, kind: LengthKind) -> Self {
        Self { log, kind }
    }

    /// Length of the undotted, non-triplet base value in ticks
    pub fn base_ticks(&self, ticks_per_quarter_note: Ticks) -> Option<Ticks> {
        let whole = ticks_per_quarter_note.checked_mul(4)?;
        let divisor = 1 << self.log;
        if whole % divisor == 0 {
            Some(whole / divisor)
        } else {
            None
        }
    }

    /// Sounding length in ticks, `None` when not an integer at this resolution
    pub fn ticks(&self, ticks_per_quarter_note: Ticks) -> Option<Ticks> {
        let base = self.base_ticks(ticks_per_quarter_note)?;
        match self.kind {
            LengthKind::Plain | LengthKind::DottedTriplet => Some(base),
            LengthKind::Dotted => (base % 2 == 0).then(|| base / 2 * 3),
            LengthKind::Triplet => (base * 2 % 3 == 0).then(|| base * 2 / 3),
        }
    }

    pub fn complexity(&self) -> u32 {
        self.kind.complexity()
    }

    pub fn is_triplet(&self) -> bool {
        self.kind.is_triplet()
    }

    /// LilyPond duration (e.g. "4", "8."); triplets are bracketed elsewhere
    pub fn to_lilypond_string(&self) -> String {
        let dot = if self.kind.is_dotted() { "." } else { "" };
        format!("{}{}", 1u32 << self.log, dot)
    }
}
