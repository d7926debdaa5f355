//! Pitch tokens: relative note names, chords, chord repeats and drum names

use crate::converters::midi_to_lilypond::converter::ConversionContext;
use crate::converters::midi_to_lilypond::errors::ConversionWarning;
use crate::converters::midi_to_lilypond::groups::NoteGroup;
use crate::converters::midi_to_lilypond::types::{Pitch, PitchLanguage};

/// Lowest pitch with a General MIDI percussion name
pub const FIRST_DRUM_PITCH: u8 = 35;

/// `\drummode` names for GM percussion, starting at `FIRST_DRUM_PITCH`
const DRUM_NAMES: [&str; 47] = [
    "bda", "bd", "ss", "sna", "hc", "sne", "tomfl", "hhc", "tomfh", "hhp", "toml", "hho",
    "tomml", "tommh", "cymca", "tomh", "cymra", "cymch", "rb", "tamb", "cyms", "cb", "cymcb",
    "vibs", "cymrb", "boh", "bol", "cghm", "cgho", "cgl", "timh", "timl", "agh", "agl", "cab",
    "mar", "whs", "whl", "guis", "guil", "cl", "wbh", "wbl", "cuim", "cuio", "trim", "trio",
];

/// Emitted for percussion pitches without a name
pub const UNKNOWN_DRUM: &str = "??";

/// Percussion name for a MIDI pitch
pub fn drum_name(pitch: u8) -> Option<&'static str> {
    pitch
        .checked_sub(FIRST_DRUM_PITCH)
        .and_then(|index| DRUM_NAMES.get(index as usize))
        .copied()
}

/// How pitches are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingMode {
    /// `\relative` note names
    Relative,
    /// `\drummode` instrument names
    Drums,
}

/// Running state while walking the groups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceState {
    /// Reference for the next relative note
    pub last_pitch: Option<Pitch>,
    /// Pitch set of the previous group when it was a chord
    pub last_chord: Option<Vec<u8>>,
    /// Duration token that the next group may omit
    pub last_duration: Option<String>,
    /// Inside a `\triplets { }` bracket
    pub in_triplets: bool,
}

impl ReferenceState {
    pub fn new(reference_pitch: Option<u8>) -> Self {
        Self {
            last_pitch: reference_pitch.map(Pitch::from_midi),
            ..Self::default()
        }
    }
}

/// Pitch part of a group's token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PitchToken {
    pub text: String,
    /// A `~` follows the duration
    pub tied: bool,
}

impl PitchToken {
    fn new(text: impl Into<String>, tied: bool) -> Self {
        Self {
            text: text.into(),
            tied,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PitchEncoder {
    mode: EncodingMode,
    language: PitchLanguage,
}

impl PitchEncoder {
    pub fn new(mode: EncodingMode, language: PitchLanguage) -> Self {
        Self { mode, language }
    }

    /// Encode one group
    ///
    /// `tied_onward` lists the pitches of `group` that continue into the
    /// next group.
    pub fn encode(
        &self,
        group: &NoteGroup,
        tied_onward: &[u8],
        state: &mut ReferenceState,
        context: &mut ConversionContext,
    ) -> PitchToken {
        if group.is_rest {
            state.last_chord = None;
            return PitchToken::new("r", false);
        }

        let pitches: Vec<u8> = group.pitches().collect();
        let tie_count = pitches.iter().filter(|p| tied_onward.contains(p)).count();
        let all_tied = tie_count == pitches.len();

        if !group.is_chord() {
            state.last_chord = None;
            let text = self.name(pitches[0], state, context);
            return PitchToken::new(text, all_tied);
        }

        if state.last_chord.as_deref() == Some(pitches.as_slice()) && (all_tied || tie_count == 0) {
            return PitchToken::new("q", all_tied);
        }

        let mut names = Vec::with_capacity(pitches.len());
        for &pitch in &pitches {
            let mut name = self.name(pitch, state, context);
            if !all_tied && tied_onward.contains(&pitch) {
                name.push('~');
            }
            names.push(name);
        }

        // After the chord, relative placement continues from its lowest note
        if self.mode == EncodingMode::Relative {
            state.last_pitch = Some(Pitch::from_midi(pitches[0]));
        }
        state.last_chord = Some(pitches);

        PitchToken::new(format!("<{}>", names.join(" ")), all_tied)
    }

    /// Name of a single pitch; advances the relative reference
    fn name(&self, pitch: u8, state: &mut ReferenceState, context: &mut ConversionContext) -> String {
        match self.mode {
            EncodingMode::Drums => match drum_name(pitch) {
                Some(name) => name.to_string(),
                None => {
                    context.add_warning(ConversionWarning::UnknownDrumPitch { pitch });
                    UNKNOWN_DRUM.to_string()
                }
            },
            EncodingMode::Relative => {
                let target = Pitch::from_midi(pitch);
                let reference = state.last_pitch.unwrap_or(target);
                state.last_pitch = Some(target);
                target.relative_to(&reference, self.language)
            }
        }
    }
}
