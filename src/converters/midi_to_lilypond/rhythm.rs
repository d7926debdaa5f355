//! Rhythmic decomposition of note groups
//!
//! # Overview
//!
//! A group that fits into one measure may still have a length that cannot be
//! written as a single note (3.5 quarters) or that starts somewhere a note of
//! its length should not start (a half note on beat 2 of 4/4). Such groups are
//! split into tied pieces, each of which is a legal note at its position.
//!
//! # Raster table
//!
//! For every base value (whole down to 1/32) and every variant (plain, dotted,
//! triplet, dotted triplet) the table records the offsets inside a measure at
//! which that length may start:
//!
//! - plain `L`: multiples of `L`
//! - dotted `3L/2`: downbeat or first off-beat of the `2L` grouping
//! - triplet `2L/3`: multiples of its own length
//! - dotted triplet `L`: downbeat of the `2L` grouping or one triplet later
//!
//! Adapted notation additionally allows syncopated plain notes up to a
//! quarter and dotted notes on any multiple of their base value.
//!
//! All rules repeat every two whole notes, which is the table's period.
//!
//! # Search
//!
//! The decomposition is the shortest sequence (at most four pieces) of legal
//! lengths that fills the group. Among equally short sequences the one with
//! the lowest total complexity wins; remaining ties keep the candidate found
//! first. At each offset the current triplet context is searched before the
//! flipped one, longer lengths before shorter ones.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::converters::midi_to_lilypond::converter::ConversionContext;
use crate::converters::midi_to_lilypond::errors::ConversionWarning;
use crate::converters::midi_to_lilypond::groups::{NoteGroup, NoteGroupSequence};
use crate::converters::midi_to_lilypond::measures::MeasureGrid;
use crate::converters::midi_to_lilypond::quantizer::BINARY_DIVISIONS;
use crate::converters::midi_to_lilypond::types::{
    LengthKind, NoteLength, Ticks, MAX_TICKS_PER_QUARTER_NOTE, SHORTEST_LOG,
};

/// Upper bound on the number of tied pieces per group
pub const MAX_PIECES: usize = 4;

/// A length usable at some raster position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterEntry {
    pub ticks: Ticks,
    pub length: NoteLength,
}

/// Result of splitting one duration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    /// Pieces in time order
    pub pieces: Vec<RasterEntry>,
    /// Sum of the pieces' complexity scores
    pub complexity: u32,
    /// Whether the last piece is a triplet
    pub ends_as_triplet: bool,
}

impl Decomposition {
    fn single(entry: RasterEntry) -> Self {
        Self {
            pieces: vec![entry],
            complexity: entry.length.complexity(),
            ends_as_triplet: entry.length.is_triplet(),
        }
    }

    fn prepend(mut self, entry: RasterEntry) -> Self {
        self.pieces.insert(0, entry);
        self.complexity += entry.length.complexity();
        self
    }

    fn is_better_than(&self, other: &Decomposition) -> bool {
        (self.pieces.len(), self.complexity) < (other.pieces.len(), other.complexity)
    }

    pub fn total_ticks(&self) -> Ticks {
        self.pieces.iter().map(|piece| piece.ticks).sum()
    }
}

/// Legal lengths per `(offset within period, triplet context)`
#[derive(Debug, Clone)]
pub struct DurationRasterTable {
    ticks_per_quarter_note: Ticks,
    adapted_notation: bool,
    period: Ticks,
    slots: HashMap<(Ticks, bool), Vec<RasterEntry>>,
}

impl DurationRasterTable {
    pub fn new(ticks_per_quarter_note: Ticks, adapted_notation: bool) -> Self {
        let ticks_per_quarter_note = ticks_per_quarter_note.clamp(1, MAX_TICKS_PER_QUARTER_NOTE);
        let period = ticks_per_quarter_note.saturating_mul(8);
        let quarter = ticks_per_quarter_note;
        let mut slots: HashMap<(Ticks, bool), Vec<RasterEntry>> = HashMap::new();

        for log in 0..=SHORTEST_LOG {
            for kind in LengthKind::ALL {
                let length = NoteLength::new(log, kind);
                let (Some(ticks), Some(base)) = (
                    length.ticks(ticks_per_quarter_note),
                    length.base_ticks(ticks_per_quarter_note),
                ) else {
                    continue;
                };

                let mut offsets = BTreeSet::new();
                match kind {
                    LengthKind::Plain => {
                        add_every(&mut offsets, period, base, 0);
                        if adapted_notation && base <= quarter && base % 2 == 0 {
                            add_every(&mut offsets, period, base / 2, 0);
                        }
                    }
                    LengthKind::Dotted => {
                        add_every(&mut offsets, period, base * 2, 0);
                        add_every(&mut offsets, period, base * 2, base / 2);
                        if adapted_notation {
                            add_every(&mut offsets, period, base, 0);
                        }
                    }
                    LengthKind::Triplet => {
                        add_every(&mut offsets, period, ticks, 0);
                    }
                    LengthKind::DottedTriplet => {
                        add_every(&mut offsets, period, base * 2, 0);
                        if base * 2 % 3 == 0 {
                            add_every(&mut offsets, period, base * 2, base * 2 / 3);
                        }
                    }
                }

                for offset in offsets {
                    slots
                        .entry((offset, kind.is_triplet()))
                        .or_default()
                        .push(RasterEntry { ticks, length });
                }
            }
        }

        for entries in slots.values_mut() {
            entries.sort_by(|a, b| b.ticks.cmp(&a.ticks));
        }

        log::debug!(
            "built duration raster for {} ticks per quarter (adapted: {}), {} slots",
            ticks_per_quarter_note,
            adapted_notation,
            slots.len()
        );

        Self {
            ticks_per_quarter_note,
            adapted_notation,
            period,
            slots,
        }
    }

    pub fn ticks_per_quarter_note(&self) -> Ticks {
        self.ticks_per_quarter_note
    }

    pub fn adapted_notation(&self) -> bool {
        self.adapted_notation
    }

    /// Lengths that may start at `offset`, longest first
    pub fn durations_at(&self, offset: Ticks, triplet: bool) -> &[RasterEntry] {
        self.slots
            .get(&(offset % self.period, triplet))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_legal(&self, offset: Ticks, triplet: bool, ticks: Ticks) -> bool {
        self.durations_at(offset, triplet)
            .iter()
            .any(|entry| entry.ticks == ticks)
    }

    /// Triplet context at `offset` after a piece that was (or was not) a triplet
    ///
    /// A triplet run is complete once it is back on the binary 1/32 raster.
    pub fn carried_context(&self, previous_was_triplet: bool, offset: Ticks) -> bool {
        let on_binary_raster = u64::from(offset) * u64::from(BINARY_DIVISIONS)
            % u64::from(self.ticks_per_quarter_note)
            == 0;
        previous_was_triplet && !on_binary_raster
    }

    /// Split `duration` starting at measure offset `offset` into legal pieces
    pub fn decompose(
        &self,
        offset: Ticks,
        duration: Ticks,
        triplet_context: bool,
        dotted_allowed: bool,
    ) -> Option<Decomposition> {
        if duration == 0 {
            return None;
        }
        let mut search = Search {
            table: self,
            dotted_allowed,
            memo: HashMap::new(),
        };
        search.best(offset, duration, triplet_context, MAX_PIECES)
    }
}

fn add_every(offsets: &mut BTreeSet<Ticks>, period: Ticks, step: Ticks, phase: Ticks) {
    if step == 0 {
        return;
    }
    let mut offset = Some(phase);
    while let Some(current) = offset.filter(|&o| o < period) {
        offsets.insert(current);
        offset = current.checked_add(step);
    }
}

type SearchKey = (Ticks, Ticks, bool, usize);

struct Search<'a> {
    table: &'a DurationRasterTable,
    dotted_allowed: bool,
    memo: HashMap<SearchKey, Option<Decomposition>>,
}

impl Search<'_> {
    fn best(
        &mut self,
        offset: Ticks,
        remaining: Ticks,
        context: bool,
        pieces_left: usize,
    ) -> Option<Decomposition> {
        if pieces_left == 0 {
            return None;
        }
        let key = (offset % self.table.period, remaining, context, pieces_left);
        if let Some(cached) = self.memo.get(&key) {
            return cached.clone();
        }

        let mut best = None;
        for triplet in [context, !context] {
            let candidate = self.best_in_context(offset, remaining, triplet, pieces_left);
            best = keep_better(best, candidate);
        }

        self.memo.insert(key, best.clone());
        best
    }

    fn best_in_context(
        &mut self,
        offset: Ticks,
        remaining: Ticks,
        triplet: bool,
        pieces_left: usize,
    ) -> Option<Decomposition> {
        let table = self.table;
        let mut best = None;

        for &entry in table.durations_at(offset, triplet) {
            if entry.ticks > remaining || (!self.dotted_allowed && entry.length.kind.is_dotted()) {
                continue;
            }

            let candidate = if entry.ticks == remaining {
                Some(Decomposition::single(entry))
            } else {
                let next_offset = offset + entry.ticks;
                let next_context = table.carried_context(entry.length.is_triplet(), next_offset);
                self.best(next_offset, remaining - entry.ticks, next_context, pieces_left - 1)
                    .map(|rest| rest.prepend(entry))
            };
            best = keep_better(best, candidate);
        }

        best
    }
}

fn keep_better(current: Option<Decomposition>, candidate: Option<Decomposition>) -> Option<Decomposition> {
    match (current, candidate) {
        (Some(current), Some(candidate)) if candidate.is_better_than(&current) => Some(candidate),
        (Some(current), _) => Some(current),
        (None, candidate) => candidate,
    }
}

/// Raster tables keyed by `(ticks per quarter, adapted notation)`
#[derive(Debug, Default)]
pub struct RasterTableCache {
    tables: HashMap<(Ticks, bool), Rc<DurationRasterTable>>,
}

impl RasterTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached table, built on first use
    pub fn get_or_build(&mut self, ticks_per_quarter_note: Ticks, adapted_notation: bool) -> Rc<DurationRasterTable> {
        self.tables
            .entry((ticks_per_quarter_note, adapted_notation))
            .or_insert_with(|| Rc::new(DurationRasterTable::new(ticks_per_quarter_note, adapted_notation)))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Replace every group by its tied, legally notated pieces
///
/// Each measure starts outside triplet context. Groups without a legal split
/// stay whole with no length and are reported.
pub fn split_rhythmically(
    sequence: &mut NoteGroupSequence,
    grid: &MeasureGrid,
    table: &DurationRasterTable,
    dotted_rests: bool,
    context: &mut ConversionContext,
) {
    let groups = std::mem::take(&mut sequence.groups);
    let mut result = Vec::with_capacity(groups.len());
    let mut previous_was_triplet = false;

    for group in groups {
        let offset = group.start_position - grid.measure_start(group.start_position);
        if offset == 0 {
            previous_was_triplet = false;
        }
        let triplet_context = table.carried_context(previous_was_triplet, offset);
        let dotted_allowed = dotted_rests || !group.is_rest;

        match table.decompose(offset, group.duration, triplet_context, dotted_allowed) {
            Some(decomposition) => {
                previous_was_triplet = decomposition.ends_as_triplet;
                result.extend(materialize(group, &decomposition));
            }
            None => {
                context.add_warning(ConversionWarning::UndecomposableDuration {
                    position: group.start_position,
                    offset,
                    duration: group.duration,
                });
                previous_was_triplet = false;
                result.push(group);
            }
        }
    }

    sequence.groups = result;
}

/// Cut a group into the decomposition's pieces, working from the tail
///
/// The head keeps the group's own tie flags; every later piece is tied.
fn materialize(mut head: NoteGroup, decomposition: &Decomposition) -> Vec<NoteGroup> {
    let mut pieces = Vec::with_capacity(decomposition.pieces.len());
    let mut cut = head.end_position();

    for entry in decomposition.pieces.iter().skip(1).rev() {
        cut -= entry.ticks;
        if let Some(mut tail) = head.split_at(cut) {
            tail.length = Some(entry.length);
            pieces.push(tail);
        }
    }
    head.length = decomposition.pieces.first().map(|entry| entry.length);
    pieces.push(head);
    pieces.reverse();
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::midi_to_lilypond::groups::PitchEntry;

    fn ticks_of(decomposition: &Decomposition) -> Vec<Ticks> {
        decomposition.pieces.iter().map(|piece| piece.ticks).collect()
    }

    #[test]
    fn test_downbeat_offers_every_length() {
        let table = DurationRasterTable::new(480, false);
        let ticks: Vec<Ticks> = table.durations_at(0, false).iter().map(|e| e.ticks).collect();
        assert_eq!(
            ticks,
            vec![2880, 1920, 1440, 960, 720, 480, 360, 240, 180, 120, 90, 60]
        );
    }

    #[test]
    fn test_triplet_context_ends_on_binary_raster() {
        let table = DurationRasterTable::new(480, false);
        assert!(table.carried_context(true, 160));
        assert!(!table.carried_context(true, 480));
        assert!(!table.carried_context(false, 160));

        // 1/32 is 12.5 ticks here; 25 is on the raster, 33 is not
        let table = DurationRasterTable::new(100, false);
        assert!(!table.carried_context(true, 25));
        assert!(table.carried_context(true, 33));
    }

    #[test]
    fn test_second_beat_raster() {
        let table = DurationRasterTable::new(480, false);
        let ticks: Vec<Ticks> = table.durations_at(480, false).iter().map(|e| e.ticks).collect();
        assert_eq!(ticks, vec![1440, 480, 360, 240, 180, 120, 90, 60]);
        assert!(!table.is_legal(480, false, 960));
    }

    #[test]
    fn test_triplet_raster() {
        let table = DurationRasterTable::new(480, false);
        assert!(table.is_legal(160, true, 160));
        assert!(table.is_legal(320, true, 160));
        assert!(!table.is_legal(160, false, 160));
        assert!(table.durations_at(20, false).is_empty());
    }

    #[test]
    fn test_raster_repeats_every_two_whole_notes() {
        let table = DurationRasterTable::new(480, false);
        assert_eq!(table.durations_at(480, false), table.durations_at(480 + 3840, false));
    }

    #[test]
    fn test_whole_note_is_one_piece() {
        let table = DurationRasterTable::new(480, false);
        let decomposition = table.decompose(0, 1920, false, true).expect("whole note");
        assert_eq!(ticks_of(&decomposition), vec![1920]);
        assert_eq!(decomposition.complexity, 2);
        assert!(!decomposition.ends_as_triplet);
    }

    #[test]
    fn test_three_and_a_half_quarters() {
        let table = DurationRasterTable::new(480, false);
        let decomposition = table.decompose(0, 1680, false, true).expect("two pieces");
        assert_eq!(ticks_of(&decomposition), vec![1440, 240]);
        assert_eq!(decomposition.pieces[0].length, NoteLength::new(1, LengthKind::Dotted));
        assert_eq!(decomposition.pieces[1].length, NoteLength::new(3, LengthKind::Plain));
        assert_eq!(decomposition.complexity, 5);
    }

    #[test]
    fn test_half_note_on_second_beat_is_split() {
        let table = DurationRasterTable::new(480, false);
        let decomposition = table.decompose(480, 960, false, true).expect("split");
        assert_eq!(ticks_of(&decomposition), vec![480, 480]);
    }

    #[test]
    fn test_triplet_eighth_flips_context() {
        let table = DurationRasterTable::new(480, false);
        let decomposition = table.decompose(0, 160, false, true).expect("triplet");
        assert_eq!(ticks_of(&decomposition), vec![160]);
        assert_eq!(decomposition.pieces[0].length, NoteLength::new(3, LengthKind::Triplet));
        assert!(decomposition.ends_as_triplet);
    }

    #[test]
    fn test_current_context_wins_ties() {
        let table = DurationRasterTable::new(480, false);
        // A quarter at the downbeat is both a plain quarter and a dotted triplet quarter
        let normal = table.decompose(0, 480, false, true).expect("quarter");
        assert_eq!(normal.pieces[0].length.kind, LengthKind::Plain);
        let triplet = table.decompose(0, 480, true, true).expect("quarter");
        assert_eq!(triplet.pieces[0].length.kind, LengthKind::DottedTriplet);
    }

    #[test]
    fn test_dotted_lengths_can_be_disallowed() {
        let table = DurationRasterTable::new(480, false);
        let decomposition = table.decompose(0, 1440, false, false).expect("split");
        assert_eq!(ticks_of(&decomposition), vec![960, 480]);
        assert!(decomposition.pieces.iter().all(|p| !p.length.kind.is_dotted()));
    }

    #[test]
    fn test_adapted_notation_allows_syncopation() {
        let strict = DurationRasterTable::new(480, false);
        let adapted = DurationRasterTable::new(480, true);
        assert_eq!(ticks_of(&strict.decompose(240, 480, false, true).expect("split")), vec![240, 240]);
        assert_eq!(ticks_of(&adapted.decompose(240, 480, false, true).expect("single")), vec![480]);
    }

    #[test]
    fn test_undecomposable_durations() {
        let table = DurationRasterTable::new(480, false);
        assert!(table.decompose(0, 20, false, true).is_none());
        assert!(table.decompose(20, 460, false, true).is_none());
        assert!(table.decompose(0, 0, false, true).is_none());
    }

    #[test]
    fn test_pieces_are_legal_and_sum_to_duration() {
        let table = DurationRasterTable::new(480, false);
        for offset in (0..1920).step_by(120) {
            for duration in (60..=(1920 - offset)).step_by(60) {
                let Some(decomposition) = table.decompose(offset, duration, false, true) else {
                    continue;
                };
                assert!(decomposition.pieces.len() <= MAX_PIECES);
                assert_eq!(decomposition.total_ticks(), duration);
                let mut position = offset;
                for piece in &decomposition.pieces {
                    assert!(
                        table.is_legal(position, piece.length.is_triplet(), piece.ticks),
                        "{} ticks illegal at {}",
                        piece.ticks,
                        position
                    );
                    position += piece.ticks;
                }
            }
        }
    }

    #[test]
    fn test_cache_builds_once_per_key() {
        let mut cache = RasterTableCache::new();
        let first = cache.get_or_build(480, false);
        let second = cache.get_or_build(480, false);
        assert!(Rc::ptr_eq(&first, &second));
        cache.get_or_build(480, true);
        cache.get_or_build(960, false);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_split_rhythmically_ties_later_pieces() {
        let mut sequence = NoteGroupSequence {
            groups: vec![
                NoteGroup::chord(0, 1680, vec![PitchEntry::new(60, false)]),
                NoteGroup::rest(1680, 240),
            ],
            end_position: 1920,
        };
        let grid = MeasureGrid::from_boundaries(vec![1920]);
        let table = DurationRasterTable::new(480, false);
        let mut context = ConversionContext::default();
        split_rhythmically(&mut sequence, &grid, &table, true, &mut context);

        assert_eq!(sequence.len(), 3);
        assert_eq!(sequence.groups[0].duration, 1440);
        assert!(!sequence.groups[0].pitch_entries[0].is_tied);
        assert_eq!(sequence.groups[1].duration, 240);
        assert!(sequence.groups[1].pitch_entries[0].is_tied);
        assert!(sequence.groups.iter().all(|g| g.length.is_some()));
        assert!(sequence.is_contiguous());
        assert!(context.warnings.is_empty());
    }

    #[test]
    fn test_split_rhythmically_reports_leftovers() {
        let mut sequence = NoteGroupSequence {
            groups: vec![
                NoteGroup::chord(0, 20, vec![PitchEntry::new(60, false)]),
                NoteGroup::rest(20, 1900),
            ],
            end_position: 1920,
        };
        let grid = MeasureGrid::default();
        let table = DurationRasterTable::new(480, false);
        let mut context = ConversionContext::default();
        split_rhythmically(&mut sequence, &grid, &table, true, &mut context);

        assert_eq!(sequence.groups[0].length, None);
        assert_eq!(sequence.groups[0].duration, 20);
        assert!(!context.warnings.is_empty());
        assert!(sequence.is_contiguous());
    }
}
