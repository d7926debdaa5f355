use std::collections::{HashMap, VecDeque};
use std::path::Path;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use crate::converters::midi_to_lilypond::errors::ConversionError;
use crate::converters::midi_to_lilypond::types::{NoteEvent, Ticks};
use crate::converters::smf::model::{measure_ticks, SmfTrack, TimeSig, PERCUSSION_CHANNEL};

/// Read all note-carrying tracks of a Standard MIDI File
pub fn read_smf(bytes: &[u8]) -> Result<Vec<SmfTrack>, ConversionError> {
    let smf = Smf::parse(bytes)
        .map_err(|e| ConversionError::Midi(format!("Failed to parse MIDI: {}", e)))?;

    let ticks_per_quarter_note = match smf.header.timing {
        Timing::Metrical(tpq) => tpq.as_int() as Ticks,
        Timing::Timecode(..) => {
            return Err(ConversionError::Midi(
                "SMPTE timecode timing is not supported".to_string(),
            ))
        }
    };
    if ticks_per_quarter_note == 0 {
        return Err(ConversionError::InvalidResolution(0));
    }

    let mut timesigs = Vec::new();
    let mut raw_tracks = Vec::new();

    for (index, track) in smf.tracks.iter().enumerate() {
        let mut tick: Ticks = 0;
        let mut name = None;
        let mut open: HashMap<(u8, u8), VecDeque<Ticks>> = HashMap::new();
        let mut notes = Vec::new();
        let mut channels = Vec::new();

        for event in track {
            tick += event.delta.as_int();
            match event.kind {
                TrackEventKind::Meta(MetaMessage::TimeSignature(num, den_power, _, _)) => {
                    timesigs.push(TimeSig {
                        tick,
                        num,
                        den: 1u32 << den_power.min(6),
                    });
                }
                TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => {
                    name = Some(String::from_utf8_lossy(bytes).into_owned());
                }
                TrackEventKind::Midi { channel, message } => {
                    let channel = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            open.entry((channel, key.as_int())).or_default().push_back(tick);
                            if !channels.contains(&channel) {
                                channels.push(channel);
                            }
                        }
                        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                            let pitch = key.as_int();
                            match open.get_mut(&(channel, pitch)).and_then(VecDeque::pop_front) {
                                Some(start) if start < tick => notes.push(NoteEvent {
                                    pitch,
                                    start_tick: start,
                                    end_tick: tick,
                                }),
                                Some(start) => {
                                    log::debug!("track {}: dropping empty note {} at tick {}", index, pitch, start)
                                }
                                None => {
                                    log::debug!("track {}: note off {} at tick {} without note on", index, pitch, tick)
                                }
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        // Close notes left hanging at the end of the track
        for ((_, pitch), starts) in open {
            for start in starts {
                if start < tick {
                    log::warn!("track {}: note {} at tick {} never ends, closing at {}", index, pitch, start, tick);
                    notes.push(NoteEvent {
                        pitch,
                        start_tick: start,
                        end_tick: tick,
                    });
                }
            }
        }

        if notes.is_empty() {
            continue;
        }
        notes.sort_by_key(|note| (note.start_tick, note.pitch));
        let is_percussion = channels.iter().all(|&channel| channel == PERCUSSION_CHANNEL);
        raw_tracks.push((index, name, is_percussion, notes));
    }

    timesigs.sort_by_key(|ts| ts.tick);

    let tracks: Vec<SmfTrack> = raw_tracks
        .into_iter()
        .map(|(index, name, is_percussion, notes)| {
            let last_note_end = notes.iter().map(|note| note.end_tick).max().unwrap_or(0);
            let (measure_ticks, end_tick) =
                measure_ticks(&timesigs, ticks_per_quarter_note, last_note_end);
            SmfTrack {
                index,
                name,
                ticks_per_quarter_note,
                is_percussion,
                notes,
                measure_ticks,
                end_tick,
            }
        })
        .collect();

    log::debug!(
        "read {} note tracks at {} ticks per quarter note",
        tracks.len(),
        ticks_per_quarter_note
    );
    Ok(tracks)
}

/// Read a Standard MIDI File from disk
pub fn read_smf_file(path: impl AsRef<Path>) -> Result<Vec<SmfTrack>, ConversionError> {
    let bytes = std::fs::read(path)?;
    read_smf(&bytes)
}
