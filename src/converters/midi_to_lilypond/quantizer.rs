//! Snapping of raw MIDI ticks to the notation raster
//!
//! The raster is the union of two grids: the binary 1/32 grid and the
//! 1/32-triplet grid. Anything finer cannot be notated. Grid points are
//! exact fractions of the resolution rounded to whole ticks, so they stay
//! on note boundaries even when the resolution is not divisible by 24.

use crate::converters::midi_to_lilypond::types::{NoteEvent, Ticks};

/// Grid points per quarter note on the binary 1/32 grid
pub const BINARY_DIVISIONS: Ticks = 8;
/// Grid points per quarter note on the 1/32-triplet grid
pub const TRIPLET_DIVISIONS: Ticks = 12;

/// Raster snapping for one resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    ticks_per_quarter_note: Ticks,
}

impl Quantizer {
    pub fn new(ticks_per_quarter_note: Ticks) -> Self {
        Self {
            ticks_per_quarter_note: ticks_per_quarter_note.max(1),
        }
    }

    /// Nearest raster point; exact ties go to the later point
    pub fn quantize_tick(&self, tick: Ticks) -> Ticks {
        let binary = nearest_grid_point(tick, self.ticks_per_quarter_note, BINARY_DIVISIONS);
        let triplet = nearest_grid_point(tick, self.ticks_per_quarter_note, TRIPLET_DIVISIONS);
        let tick = u64::from(tick);
        let binary_distance = binary.abs_diff(tick);
        let triplet_distance = triplet.abs_diff(tick);

        let snapped = if binary_distance < triplet_distance {
            binary
        } else if triplet_distance < binary_distance {
            triplet
        } else {
            binary.max(triplet)
        };
        Ticks::try_from(snapped).unwrap_or(Ticks::MAX)
    }

    /// Quantize all events and sort them by onset, longer notes first
    pub fn quantize_events(&self, events: &[NoteEvent]) -> Vec<NoteEvent> {
        let mut quantized: Vec<NoteEvent> = events
            .iter()
            .map(|event| NoteEvent {
                pitch: event.pitch,
                start_tick: self.quantize_tick(event.start_tick),
                end_tick: self.quantize_tick(event.end_tick),
            })
            .collect();

        quantized.sort_by(|a, b| {
            a.start_tick
                .cmp(&b.start_tick)
                .then(b.end_tick.cmp(&a.end_tick))
                .then(a.pitch.cmp(&b.pitch))
        });
        quantized
    }
}

/// Tick of the grid point nearest to `tick` on a grid of `divisions` per quarter
///
/// Point `k` lies at `k·tpq/divisions`, rounded half up to a whole tick.
/// The index is chosen by rounding half up as well. Computed in `u64`, so
/// the result may lie past `Ticks::MAX`.
pub fn nearest_grid_point(tick: Ticks, ticks_per_quarter_note: Ticks, divisions: Ticks) -> u64 {
    let tpq = u64::from(ticks_per_quarter_note.max(1));
    let divisions = u64::from(divisions.max(1));
    let index = (u64::from(tick) * divisions * 2 + tpq) / (tpq * 2);
    (index * tpq * 2 + divisions) / (divisions * 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_points_for_standard_resolution() {
        assert_eq!(nearest_grid_point(61, 480, BINARY_DIVISIONS), 60);
        assert_eq!(nearest_grid_point(61, 480, TRIPLET_DIVISIONS), 80);
        // Round half up between 0 and 40
        assert_eq!(nearest_grid_point(19, 480, TRIPLET_DIVISIONS), 0);
        assert_eq!(nearest_grid_point(20, 480, TRIPLET_DIVISIONS), 40);
    }

    #[test]
    fn test_grid_points_are_exact_fractions() {
        // 1/32 at 100 ticks per quarter is 12.5 ticks; point 8 is the quarter
        assert_eq!(nearest_grid_point(100, 100, BINARY_DIVISIONS), 100);
        assert_eq!(nearest_grid_point(100, 100, TRIPLET_DIVISIONS), 100);
        assert_eq!(nearest_grid_point(200, 100, BINARY_DIVISIONS), 200);
        // Eighth triplet at 100 ticks per quarter is 33.3 ticks
        assert_eq!(nearest_grid_point(33, 100, TRIPLET_DIVISIONS), 33);
        assert_eq!(nearest_grid_point(67, 100, TRIPLET_DIVISIONS), 67);
    }

    #[test]
    fn test_quantize_prefers_nearest_grid() {
        let quantizer = Quantizer::new(480);
        // 58 is 2 from the 1/32 point 60 and 18 from the triplet point 40
        assert_eq!(quantizer.quantize_tick(58), 60);
        // 161 is closest to the triplet eighth at 160
        assert_eq!(quantizer.quantize_tick(161), 160);
        assert_eq!(quantizer.quantize_tick(479), 480);
        assert_eq!(quantizer.quantize_tick(0), 0);
    }

    #[test]
    fn test_quantize_tie_goes_to_later_point() {
        let quantizer = Quantizer::new(480);
        // 50 is 10 away from both 40 and 60
        assert_eq!(quantizer.quantize_tick(50), 60);
    }

    #[test]
    fn test_quarter_boundaries_stay_put_at_odd_resolution() {
        let quantizer = Quantizer::new(100);
        for tick in [0, 100, 200, 300, 400, 1000] {
            assert_eq!(quantizer.quantize_tick(tick), tick);
        }
        assert_eq!(quantizer.quantize_tick(50), 50);
        assert_eq!(quantizer.quantize_tick(25), 25);
    }

    #[test]
    fn test_quantize_near_tick_limit() {
        let quantizer = Quantizer::new(480);
        assert_eq!(quantizer.quantize_tick(Ticks::MAX - 5), 4_294_967_280);
        // Nearest point is the triplet point 4294967333, past the limit
        let quantizer = Quantizer::new(1000);
        assert_eq!(quantizer.quantize_tick(Ticks::MAX), Ticks::MAX);
    }

    #[test]
    fn test_quantize_events_sorting() {
        let quantizer = Quantizer::new(480);
        let events = vec![
            NoteEvent { pitch: 64, start_tick: 482, end_tick: 958 },
            NoteEvent { pitch: 60, start_tick: 0, end_tick: 478 },
            NoteEvent { pitch: 67, start_tick: 479, end_tick: 1921 },
        ];
        let quantized = quantizer.quantize_events(&events);
        assert_eq!(
            quantized,
            vec![
                NoteEvent { pitch: 60, start_tick: 0, end_tick: 480 },
                NoteEvent { pitch: 67, start_tick: 480, end_tick: 1920 },
                NoteEvent { pitch: 64, start_tick: 480, end_tick: 960 },
            ]
        );
    }

    #[test]
    fn test_quantize_keeps_zero_length_events() {
        let quantizer = Quantizer::new(480);
        let events = vec![NoteEvent { pitch: 60, start_tick: 100, end_tick: 110 }];
        let quantized = quantizer.quantize_events(&events);
        assert_eq!(quantized[0].duration(), 0);
    }
}
