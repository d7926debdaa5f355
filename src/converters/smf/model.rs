use crate::converters::midi_to_lilypond::types::{ConversionInput, NoteEvent, Ticks};

/// MIDI channel reserved for percussion (channel 10, zero-based)
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Relative reference for pitched tracks
pub const DEFAULT_REFERENCE_PITCH: u8 = 60;

/// One note-carrying track of a MIDI file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmfTrack {
    pub index: usize,                 // Position in the file
    pub name: Option<String>,
    pub ticks_per_quarter_note: Ticks,
    pub is_percussion: bool,          // All notes on the percussion channel
    pub notes: Vec<NoteEvent>,        // Sorted by start tick
    pub measure_ticks: Vec<Ticks>,    // Start of every measure after the first
    pub end_tick: Ticks,              // End of the last measure holding a note
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSig {
    pub tick: Ticks,
    pub num: u8,   // Numerator (e.g., 3 in 3/4)
    pub den: u32,  // Denominator (e.g., 4 in 3/4)
}

impl TimeSig {
    pub const COMMON: TimeSig = TimeSig { tick: 0, num: 4, den: 4 };

    /// Measure length in ticks
    pub fn measure_length(&self, ticks_per_quarter_note: Ticks) -> Ticks {
        (ticks_per_quarter_note.saturating_mul(4 * self.num as Ticks) / self.den.max(1)).max(1)
    }
}

/// Bar lines up to the end of the material
///
/// `timesigs` must be sorted by tick. Measures run in 4/4 until the first
/// time signature; a signature that falls inside a measure starts a new one
/// at its own tick. Returns every measure start after 0 up to the first
/// one at or after `last_note_end`, and that last start as the end tick.
pub fn measure_ticks(
    timesigs: &[TimeSig],
    ticks_per_quarter_note: Ticks,
    last_note_end: Ticks,
) -> (Vec<Ticks>, Ticks) {
    let mut boundaries = Vec::new();
    let mut position: Ticks = 0;

    while position < last_note_end {
        let active = timesigs
            .iter()
            .take_while(|ts| ts.tick <= position)
            .last()
            .copied()
            .unwrap_or(TimeSig::COMMON);
        let mut next = position.saturating_add(active.measure_length(ticks_per_quarter_note));
        if let Some(change) = timesigs.iter().find(|ts| ts.tick > position && ts.tick < next) {
            next = change.tick;
        }
        boundaries.push(next);
        position = next;
    }

    (boundaries, position)
}

impl ConversionInput {
    /// Conversion input for an imported track
    ///
    /// Percussion tracks are rendered in drum mode, others relative to c'.
    pub fn from_track(track: &SmfTrack) -> Self {
        Self {
            events: track.notes.clone(),
            measure_ticks: track.measure_ticks.clone(),
            end_tick: track.end_tick,
            ticks_per_quarter_note: track.ticks_per_quarter_note,
            reference_pitch: (!track.is_percussion).then_some(DEFAULT_REFERENCE_PITCH),
            adapted_notation: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_time_grid() {
        let (bars, end) = measure_ticks(&[], 480, 3000);
        assert_eq!(bars, vec![1920, 3840]);
        assert_eq!(end, 3840);
    }

    #[test]
    fn test_time_signature_change() {
        let timesigs = [
            TimeSig { tick: 0, num: 3, den: 4 },
            TimeSig { tick: 2880, num: 6, den: 8 },
        ];
        let (bars, end) = measure_ticks(&timesigs, 480, 4000);
        assert_eq!(bars, vec![1440, 2880, 4320]);
        assert_eq!(end, 4320);
    }

    #[test]
    fn test_signature_inside_measure_starts_new_bar() {
        let timesigs = [TimeSig { tick: 960, num: 2, den: 4 }];
        let (bars, _) = measure_ticks(&timesigs, 480, 1920);
        assert_eq!(bars, vec![960, 1920]);
    }

    #[test]
    fn test_no_notes_no_bars() {
        let (bars, end) = measure_ticks(&[], 480, 0);
        assert!(bars.is_empty());
        assert_eq!(end, 0);
    }

    #[test]
    fn test_from_track_selects_mode() {
        let mut track = SmfTrack {
            index: 1,
            name: None,
            ticks_per_quarter_note: 480,
            is_percussion: false,
            notes: vec![NoteEvent { pitch: 60, start_tick: 0, end_tick: 480 }],
            measure_ticks: vec![1920],
            end_tick: 1920,
        };
        assert_eq!(ConversionInput::from_track(&track).reference_pitch, Some(60));
        track.is_percussion = true;
        assert_eq!(ConversionInput::from_track(&track).reference_pitch, None);
    }
}
