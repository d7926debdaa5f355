//! Conversion pipeline
//!
//! quantize -> build groups -> split at measures -> split rhythmically -> render

use crate::converters::midi_to_lilypond::errors::ConversionWarning;
use crate::converters::midi_to_lilypond::groups::build_note_groups;
use crate::converters::midi_to_lilypond::lilypond::generate_music;
use crate::converters::midi_to_lilypond::measures::{split_at_measures, MeasureGrid};
use crate::converters::midi_to_lilypond::quantizer::Quantizer;
use crate::converters::midi_to_lilypond::rhythm::{split_rhythmically, RasterTableCache};
use crate::converters::midi_to_lilypond::types::{
    ConversionInput, ConversionResult, ConversionSettings, NoteEvent, Ticks,
    MAX_TICKS_PER_QUARTER_NOTE,
};

/// Diagnostics collected during one conversion
#[derive(Debug, Default)]
pub struct ConversionContext {
    pub warnings: Vec<ConversionWarning>,
}

impl ConversionContext {
    pub fn add_warning(&mut self, warning: ConversionWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Conversion service
///
/// Owns the settings and the raster tables, which are reused across calls
/// with the same resolution.
#[derive(Debug, Default)]
pub struct MidiToLilypondConverter {
    settings: ConversionSettings,
    raster_tables: RasterTableCache,
}

impl MidiToLilypondConverter {
    pub fn new(settings: ConversionSettings) -> Self {
        Self {
            settings,
            raster_tables: RasterTableCache::new(),
        }
    }

    pub fn set_settings(&mut self, settings: ConversionSettings) {
        self.settings = settings;
    }

    /// Number of raster tables built so far
    pub fn cached_tables(&self) -> usize {
        self.raster_tables.len()
    }

    /// Convert one voice to a LilyPond music expression
    ///
    /// Never fails. Problems are reported in `warnings` and show up in the
    /// output as placeholder tokens.
    pub fn convert(&mut self, input: &ConversionInput) -> ConversionResult {
        let mut context = ConversionContext::default();
        let ticks_per_quarter_note = input
            .ticks_per_quarter_note
            .clamp(1, MAX_TICKS_PER_QUARTER_NOTE);
        if ticks_per_quarter_note != input.ticks_per_quarter_note {
            context.add_warning(ConversionWarning::UnsupportedResolution {
                requested: input.ticks_per_quarter_note,
                used: ticks_per_quarter_note,
            });
        }

        let quantizer = Quantizer::new(ticks_per_quarter_note);
        let events = quantizer.quantize_events(&input.events);
        let end_tick = quantizer.quantize_tick(input.end_tick);
        let grid = MeasureGrid::new(&input.measure_ticks, &quantizer, &mut context);

        let mut sequence = build_note_groups(&events, end_tick, &mut context);
        split_at_measures(&mut sequence, &grid);

        let table = self
            .raster_tables
            .get_or_build(ticks_per_quarter_note, input.adapted_notation);
        split_rhythmically(
            &mut sequence,
            &grid,
            &table,
            self.settings.dotted_rests,
            &mut context,
        );

        let lilypond_source = generate_music(
            &sequence,
            &grid,
            input.reference_pitch,
            &self.settings,
            &mut context,
        );

        log::debug!(
            "converted {} events into {} groups with {} warnings",
            input.events.len(),
            sequence.len(),
            context.warnings.len()
        );

        ConversionResult {
            lilypond_source,
            warnings: context.warnings,
        }
    }
}

/// One-shot conversion with default settings
pub fn convert(
    events: &[NoteEvent],
    measure_ticks: &[Ticks],
    end_tick: Ticks,
    ticks_per_quarter_note: Ticks,
    reference_pitch: Option<u8>,
    adapted_notation: bool,
) -> String {
    let input = ConversionInput {
        events: events.to_vec(),
        measure_ticks: measure_ticks.to_vec(),
        end_tick,
        ticks_per_quarter_note,
        reference_pitch,
        adapted_notation,
    };
    MidiToLilypondConverter::default()
        .convert(&input)
        .lilypond_source
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(pitch: u8, start_tick: Ticks, end_tick: Ticks) -> NoteEvent {
        NoteEvent { pitch, start_tick, end_tick }
    }

    #[test]
    fn test_whole_note() {
        let output = convert(&[note(60, 0, 1920)], &[1920], 1920, 480, Some(60), false);
        assert_eq!(output, "\\relative c' {\n  c1 |\n}");
    }

    #[test]
    fn test_three_and_a_half_quarters() {
        let output = convert(&[note(60, 0, 1680)], &[1920], 1920, 480, Some(60), false);
        assert_eq!(output, "\\relative c' {\n  c2.~ c8 r |\n}");
    }

    #[test]
    fn test_rest_between_notes() {
        let output = convert(
            &[note(60, 0, 480), note(64, 960, 1440)],
            &[1920],
            1920,
            480,
            Some(60),
            false,
        );
        assert_eq!(output, "\\relative c' {\n  c4 r e r |\n}");
    }

    #[test]
    fn test_repeated_chord() {
        let events = [
            note(60, 0, 480),
            note(64, 0, 480),
            note(67, 0, 480),
            note(60, 480, 960),
            note(64, 480, 960),
            note(67, 480, 960),
        ];
        let output = convert(&events, &[], 960, 480, Some(60), false);
        assert_eq!(output, "\\relative c' {\n  <c e g>4 q\n}");
    }

    #[test]
    fn test_raster_tables_are_cached() {
        let mut converter = MidiToLilypondConverter::default();
        let input = ConversionInput {
            events: vec![note(60, 0, 480)],
            measure_ticks: vec![1920],
            end_tick: 1920,
            ticks_per_quarter_note: 480,
            reference_pitch: Some(60),
            adapted_notation: false,
        };
        converter.convert(&input);
        converter.convert(&input);
        assert_eq!(converter.cached_tables(), 1);

        converter.convert(&ConversionInput {
            ticks_per_quarter_note: 96,
            ..input
        });
        assert_eq!(converter.cached_tables(), 2);
    }

    #[test]
    fn test_warnings_are_collected() {
        let mut converter = MidiToLilypondConverter::default();
        let input = ConversionInput {
            events: vec![note(60, 0, 960), note(60, 480, 1440)],
            measure_ticks: vec![1920],
            end_tick: 1920,
            ticks_per_quarter_note: 480,
            reference_pitch: Some(60),
            adapted_notation: false,
        };
        let result = converter.convert(&input);
        assert_eq!(
            result.warnings,
            vec![ConversionWarning::OverlappingNote {
                pitch: 60,
                start: 480,
                previous_end: 960
            }]
        );
        assert_eq!(result.lilypond_source, "\\relative c' {\n  c4 c~ c r |\n}");
    }

    #[test]
    fn test_resolution_not_divisible_by_24() {
        let events = [
            note(60, 0, 100),
            note(62, 100, 200),
            note(64, 200, 300),
            note(65, 300, 400),
        ];
        let output = convert(&events, &[400], 400, 100, Some(60), false);
        assert_eq!(output, "\\relative c' {\n  c4 d e f |\n}");
    }

    #[test]
    fn test_end_tick_near_limit() {
        let mut converter = MidiToLilypondConverter::default();
        let result = converter.convert(&ConversionInput {
            events: vec![note(60, 0, 480)],
            measure_ticks: vec![1920],
            end_tick: Ticks::MAX - 5,
            ticks_per_quarter_note: 480,
            reference_pitch: Some(60),
            adapted_notation: false,
        });
        assert!(result.lilypond_source.contains("c4 r2. | r*?"));
        assert!(matches!(
            result.warnings.as_slice(),
            [ConversionWarning::UndecomposableDuration { position: 1920, .. }]
        ));
    }

    #[test]
    fn test_huge_resolution_is_clamped() {
        let mut converter = MidiToLilypondConverter::default();
        let result = converter.convert(&ConversionInput {
            events: vec![note(60, 0, 480)],
            measure_ticks: vec![],
            end_tick: 1920,
            ticks_per_quarter_note: 1_000_000_000,
            reference_pitch: Some(60),
            adapted_notation: false,
        });
        assert_eq!(
            result.warnings[0],
            ConversionWarning::UnsupportedResolution {
                requested: 1_000_000_000,
                used: MAX_TICKS_PER_QUARTER_NOTE,
            }
        );
        assert!(result.lilypond_source.starts_with("\\relative c' {"));
    }

    #[test]
    fn test_zero_resolution_does_not_panic() {
        let output = convert(&[note(60, 0, 8)], &[], 8, 0, Some(60), false);
        assert!(output.starts_with("\\relative c' {"));
    }
}
