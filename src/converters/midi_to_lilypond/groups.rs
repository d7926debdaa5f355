//! Note groups: the contiguous chord/rest timeline
//!
//! Raw note events overlap freely. The group builder turns them into a
//! sequence of groups covering `[0, end_position)` without gaps, where each
//! group is either a rest or a set of simultaneously sounding pitches.
//! Pitches that keep sounding from the previous group are marked as tied.

use std::collections::{BTreeSet, HashMap};

use crate::converters::midi_to_lilypond::converter::ConversionContext;
use crate::converters::midi_to_lilypond::errors::ConversionWarning;
use crate::converters::midi_to_lilypond::types::{NoteEvent, NoteLength, Ticks};

/// One pitch of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchEntry {
    pub pitch: u8,
    /// Continues from the previous group instead of starting fresh
    pub is_tied: bool,
}

impl PitchEntry {
    pub fn new(pitch: u8, is_tied: bool) -> Self {
        Self { pitch, is_tied }
    }
}

/// A rest or a chord occupying `[start_position, start_position + duration)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteGroup {
    pub is_rest: bool,
    pub start_position: Ticks,
    pub duration: Ticks,
    /// Ascending by pitch, no duplicates; empty for rests
    pub pitch_entries: Vec<PitchEntry>,
    /// Notated length, assigned by the rhythm splitter
    pub length: Option<NoteLength>,
}

impl NoteGroup {
    pub fn rest(start_position: Ticks, duration: Ticks) -> Self {
        Self {
            is_rest: true,
            start_position,
            duration,
            pitch_entries: Vec::new(),
            length: None,
        }
    }

    /// Build a chord; entries are sorted and duplicate pitches collapsed
    ///
    /// A collapsed pitch counts as tied only if every voice holding it was tied.
    /// An empty entry list yields a rest.
    pub fn chord(start_position: Ticks, duration: Ticks, mut entries: Vec<PitchEntry>) -> Self {
        entries.sort_by_key(|entry| entry.pitch);
        let mut pitch_entries: Vec<PitchEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            match pitch_entries.last_mut() {
                Some(last) if last.pitch == entry.pitch => last.is_tied &= entry.is_tied,
                _ => pitch_entries.push(entry),
            }
        }

        Self {
            is_rest: pitch_entries.is_empty(),
            start_position,
            duration,
            pitch_entries,
            length: None,
        }
    }

    pub fn end_position(&self) -> Ticks {
        self.start_position + self.duration
    }

    pub fn is_chord(&self) -> bool {
        self.pitch_entries.len() > 1
    }

    pub fn pitches(&self) -> impl Iterator<Item = u8> + '_ {
        self.pitch_entries.iter().map(|entry| entry.pitch)
    }

    /// Pitches carried over from the previous group
    pub fn tied_pitches(&self) -> impl Iterator<Item = u8> + '_ {
        self.pitch_entries
            .iter()
            .filter(|entry| entry.is_tied)
            .map(|entry| entry.pitch)
    }

    /// Split at an absolute position strictly inside the group
    ///
    /// `self` keeps `[start, position)`; the returned group covers
    /// `[position, end)` and all of its pitches are tied into it.
    pub fn split_at(&mut self, position: Ticks) -> Option<NoteGroup> {
        if position <= self.start_position || position >= self.end_position() {
            return None;
        }

        let later = NoteGroup {
            is_rest: self.is_rest,
            start_position: position,
            duration: self.end_position() - position,
            pitch_entries: self
                .pitch_entries
                .iter()
                .map(|entry| PitchEntry::new(entry.pitch, true))
                .collect(),
            length: None,
        };
        self.duration = position - self.start_position;
        self.length = None;
        Some(later)
    }
}

/// Ordered, gap-free cover of `[0, end_position)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteGroupSequence {
    pub groups: Vec<NoteGroup>,
    pub end_position: Ticks,
}

impl NoteGroupSequence {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NoteGroup> {
        self.groups.iter()
    }

    /// Every group starts where the previous one ended, from 0 to the end
    pub fn is_contiguous(&self) -> bool {
        let mut position = 0;
        for group in &self.groups {
            if group.start_position != position || group.duration == 0 {
                return false;
            }
            position = group.end_position();
        }
        position == self.end_position
    }
}

/// Resolve same-pitch conflicts between sorted events
///
/// Events sharing onset and pitch collapse into the first (longest) one.
/// An event starting inside an earlier same-pitch event cuts that event
/// short at its own onset. Zero-length events are dropped.
fn resolve_overlaps(events: &[NoteEvent], context: &mut ConversionContext) -> Vec<NoteEvent> {
    let mut accepted: Vec<NoteEvent> = Vec::with_capacity(events.len());
    let mut last_by_pitch: HashMap<u8, usize> = HashMap::new();

    for event in events {
        if event.start_tick >= event.end_tick {
            context.add_warning(ConversionWarning::EmptyNote {
                pitch: event.pitch,
                start: event.start_tick,
            });
            continue;
        }

        if let Some(&index) = last_by_pitch.get(&event.pitch) {
            let previous = accepted[index];
            if previous.end_tick > event.start_tick {
                context.add_warning(ConversionWarning::OverlappingNote {
                    pitch: event.pitch,
                    start: event.start_tick,
                    previous_end: previous.end_tick,
                });
                if previous.start_tick == event.start_tick {
                    continue;
                }
                accepted[index].end_tick = event.start_tick;
            }
        }

        last_by_pitch.insert(event.pitch, accepted.len());
        accepted.push(*event);
    }

    accepted
}

/// Merge quantized, sorted events into a contiguous group sequence
///
/// The sequence ends at `end_position` or at the last note-off, whichever
/// is later.
pub fn build_note_groups(
    events: &[NoteEvent],
    end_position: Ticks,
    context: &mut ConversionContext,
) -> NoteGroupSequence {
    let mut events = resolve_overlaps(events, context);
    events.sort_by_key(|event| event.start_tick);

    let end_position = events
        .iter()
        .map(|event| event.end_tick)
        .max()
        .unwrap_or(0)
        .max(end_position);

    let mut boundaries: BTreeSet<Ticks> = BTreeSet::new();
    boundaries.insert(0);
    boundaries.insert(end_position);
    for event in &events {
        boundaries.insert(event.start_tick);
        boundaries.insert(event.end_tick);
    }
    let boundaries: Vec<Ticks> = boundaries.into_iter().collect();

    let mut groups = Vec::with_capacity(boundaries.len());
    let mut active: Vec<NoteEvent> = Vec::new();
    let mut next_event = 0;

    for window in boundaries.windows(2) {
        let (start, end) = (window[0], window[1]);

        active.retain(|event| event.end_tick > start);
        while next_event < events.len() && events[next_event].start_tick == start {
            active.push(events[next_event]);
            next_event += 1;
        }

        let entries: Vec<PitchEntry> = active
            .iter()
            .map(|event| PitchEntry::new(event.pitch, event.start_tick < start))
            .collect();
        groups.push(NoteGroup::chord(start, end - start, entries));
    }

    log::debug!(
        "built {} note groups from {} events up to tick {}",
        groups.len(),
        events.len(),
        end_position
    );

    NoteGroupSequence {
        groups,
        end_position,
    }
}
