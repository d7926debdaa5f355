//! LilyPond text generation
//!
//! Walks the rhythm-split groups and emits the music expression: pitch
//! tokens with durations, ties, `\triplets { }` brackets and bar checks,
//! packed into lines of at most `line_width` characters.

use crate::converters::midi_to_lilypond::converter::ConversionContext;
use crate::converters::midi_to_lilypond::groups::NoteGroupSequence;
use crate::converters::midi_to_lilypond::measures::MeasureGrid;
use crate::converters::midi_to_lilypond::pitch::{EncodingMode, PitchEncoder, ReferenceState};
use crate::converters::midi_to_lilypond::types::{ConversionSettings, Pitch};

/// Duration token for groups without a notatable length
pub const UNKNOWN_DURATION: &str = "*?";

/// Render the sequence as a `\relative` or `\drummode` block
///
/// `reference_pitch` of `None` selects drum mode.
pub fn generate_music(
    sequence: &NoteGroupSequence,
    grid: &MeasureGrid,
    reference_pitch: Option<u8>,
    settings: &ConversionSettings,
    context: &mut ConversionContext,
) -> String {
    let (header, mode) = match reference_pitch {
        Some(pitch) => (
            format!(
                "\\relative {} {{",
                Pitch::from_midi(pitch).to_lilypond_string(settings.language)
            ),
            EncodingMode::Relative,
        ),
        None => ("\\drummode {".to_string(), EncodingMode::Drums),
    };

    let measures = generate_measures(sequence, grid, mode, reference_pitch, settings, context);
    let lines = wrap_measures(&measures, settings.line_width, settings.indent);

    let mut output = header;
    output.push('\n');
    for line in lines {
        output.push_str(&line);
        output.push('\n');
    }
    output.push('}');
    output
}

/// One string per measure, tokens separated by spaces
fn generate_measures(
    sequence: &NoteGroupSequence,
    grid: &MeasureGrid,
    mode: EncodingMode,
    reference_pitch: Option<u8>,
    settings: &ConversionSettings,
    context: &mut ConversionContext,
) -> Vec<String> {
    let encoder = PitchEncoder::new(mode, settings.language);
    let mut state = ReferenceState::new(reference_pitch);
    let mut measures = Vec::new();
    let mut tokens: Vec<String> = Vec::new();

    for (index, group) in sequence.groups.iter().enumerate() {
        let is_triplet = group.length.map_or(false, |length| length.is_triplet());
        if is_triplet && !state.in_triplets {
            tokens.push("\\triplets {".to_string());
            state.in_triplets = true;
        } else if !is_triplet && state.in_triplets {
            tokens.push("}".to_string());
            state.in_triplets = false;
        }

        let tied_onward: Vec<u8> = sequence
            .groups
            .get(index + 1)
            .map(|next| next.tied_pitches().collect())
            .unwrap_or_default();
        let pitch = encoder.encode(group, &tied_onward, &mut state, context);

        let mut token = pitch.text;
        match group.length {
            Some(length) => {
                let duration = length.to_lilypond_string();
                if state.last_duration.as_deref() != Some(duration.as_str()) {
                    token.push_str(&duration);
                    state.last_duration = Some(duration);
                }
            }
            None => {
                token.push_str(UNKNOWN_DURATION);
                state.last_duration = None;
            }
        }
        if pitch.tied {
            token.push('~');
        }
        tokens.push(token);

        if grid.is_boundary(group.end_position()) {
            if state.in_triplets {
                tokens.push("}".to_string());
                state.in_triplets = false;
            }
            tokens.push("|".to_string());
            state.last_duration = None;
            measures.push(tokens.join(" "));
            tokens.clear();
        }
    }

    if state.in_triplets {
        tokens.push("}".to_string());
    }
    if !tokens.is_empty() {
        measures.push(tokens.join(" "));
    }

    log::debug!("rendered {} groups into {} measures", sequence.len(), measures.len());
    measures
}

/// Greedily pack measures into indented lines
///
/// A measure wider than the line gets a line of its own.
fn wrap_measures(measures: &[String], line_width: usize, indent: usize) -> Vec<String> {
    let prefix = " ".repeat(indent);
    let mut lines = Vec::new();
    let mut line = String::new();

    for measure in measures {
        if !line.is_empty() && prefix.len() + line.len() + 1 + measure.len() > line_width {
            lines.push(format!("{}{}", prefix, line));
            line.clear();
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(measure);
    }
    if !line.is_empty() {
        lines.push(format!("{}{}", prefix, line));
    }

    lines
}
