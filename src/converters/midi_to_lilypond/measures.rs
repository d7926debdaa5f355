//! Measure boundaries and bar splitting
//!
//! Groups that cross a bar line are cut at the bar, the later piece tied to
//! the earlier one, so that the rhythm splitter only ever works inside a
//! single measure.

use crate::converters::midi_to_lilypond::converter::ConversionContext;
use crate::converters::midi_to_lilypond::errors::ConversionWarning;
use crate::converters::midi_to_lilypond::groups::NoteGroupSequence;
use crate::converters::midi_to_lilypond::quantizer::Quantizer;
use crate::converters::midi_to_lilypond::types::Ticks;

/// Start ticks of every measure after the first, strictly ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasureGrid {
    boundaries: Vec<Ticks>,
}

impl MeasureGrid {
    /// Quantize the caller's measure ticks and drop entries that are not ascending
    pub fn new(
        measure_ticks: &[Ticks],
        quantizer: &Quantizer,
        context: &mut ConversionContext,
    ) -> Self {
        let mut boundaries: Vec<Ticks> = Vec::with_capacity(measure_ticks.len());
        for &tick in measure_ticks {
            let quantized = quantizer.quantize_tick(tick);
            if quantized != tick {
                log::debug!("measure tick {} moved to raster point {}", tick, quantized);
            }
            let previous = boundaries.last().copied().unwrap_or(0);
            if quantized <= previous {
                context.add_warning(ConversionWarning::MeasureTickOutOfOrder {
                    tick: quantized,
                    previous,
                });
                continue;
            }
            boundaries.push(quantized);
        }
        Self { boundaries }
    }

    /// Grid from ticks that are already ascending and on the raster
    pub fn from_boundaries(boundaries: Vec<Ticks>) -> Self {
        Self { boundaries }
    }

    pub fn boundaries(&self) -> &[Ticks] {
        &self.boundaries
    }

    /// Smallest boundary strictly after `position`
    pub fn next_boundary_after(&self, position: Ticks) -> Option<Ticks> {
        let index = self.boundaries.partition_point(|&tick| tick <= position);
        self.boundaries.get(index).copied()
    }

    /// Start of the measure containing `position`
    pub fn measure_start(&self, position: Ticks) -> Ticks {
        let index = self.boundaries.partition_point(|&tick| tick <= position);
        if index == 0 {
            0
        } else {
            self.boundaries[index - 1]
        }
    }

    pub fn is_boundary(&self, position: Ticks) -> bool {
        self.boundaries.binary_search(&position).is_ok()
    }
}

/// Split every group that straddles a measure boundary
///
/// A group spanning several bars is cut repeatedly; each piece ends exactly
/// on a boundary, so the loop terminates.
pub fn split_at_measures(sequence: &mut NoteGroupSequence, grid: &MeasureGrid) {
    let mut index = 0;
    let mut splits = 0;

    while index < sequence.groups.len() {
        let group = &mut sequence.groups[index];
        if let Some(boundary) = grid.next_boundary_after(group.start_position) {
            if let Some(later) = group.split_at(boundary) {
                sequence.groups.insert(index + 1, later);
                splits += 1;
            }
        }
        index += 1;
    }

    log::debug!("split {} groups at measure boundaries", splits);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::midi_to_lilypond::groups::{NoteGroup, PitchEntry};

    fn grid(boundaries: &[Ticks]) -> MeasureGrid {
        MeasureGrid::from_boundaries(boundaries.to_vec())
    }

    #[test]
    fn test_lookups() {
        let grid = grid(&[1920, 3840]);
        assert_eq!(grid.next_boundary_after(0), Some(1920));
        assert_eq!(grid.next_boundary_after(1920), Some(3840));
        assert_eq!(grid.next_boundary_after(3840), None);
        assert_eq!(grid.measure_start(100), 0);
        assert_eq!(grid.measure_start(1920), 1920);
        assert_eq!(grid.measure_start(2000), 1920);
        assert!(grid.is_boundary(3840));
        assert!(!grid.is_boundary(0));
    }

    #[test]
    fn test_new_quantizes_and_reports_disorder() {
        let mut context = ConversionContext::default();
        let quantizer = Quantizer::new(480);
        let grid = MeasureGrid::new(&[1921, 1440, 3840], &quantizer, &mut context);
        assert_eq!(grid.boundaries(), &[1920, 3840]);
        assert_eq!(
            context.warnings,
            vec![ConversionWarning::MeasureTickOutOfOrder {
                tick: 1440,
                previous: 1920
            }]
        );
    }

    #[test]
    fn test_note_across_two_bar_lines() {
        let mut sequence = NoteGroupSequence {
            groups: vec![
                NoteGroup::rest(0, 960),
                NoteGroup::chord(960, 4800, vec![PitchEntry::new(60, false)]),
            ],
            end_position: 5760,
        };
        split_at_measures(&mut sequence, &grid(&[1920, 3840]));

        let spans: Vec<(Ticks, Ticks)> = sequence
            .iter()
            .map(|g| (g.start_position, g.duration))
            .collect();
        assert_eq!(spans, vec![(0, 960), (960, 960), (1920, 1920), (3840, 1920)]);
        assert!(!sequence.groups[1].pitch_entries[0].is_tied);
        assert!(sequence.groups[2].pitch_entries[0].is_tied);
        assert!(sequence.groups[3].pitch_entries[0].is_tied);
        assert!(sequence.is_contiguous());
    }

    #[test]
    fn test_no_group_straddles_a_boundary() {
        let mut sequence = NoteGroupSequence {
            groups: vec![NoteGroup::rest(0, 7000)],
            end_position: 7000,
        };
        let grid = grid(&[1440, 2880, 4320, 5760]);
        split_at_measures(&mut sequence, &grid);

        for group in sequence.iter() {
            if let Some(boundary) = grid.next_boundary_after(group.start_position) {
                assert!(group.end_position() <= boundary);
            }
        }
        assert_eq!(sequence.len(), 5);
    }
}
