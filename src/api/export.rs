//! Conversion entry points for JavaScript
//!
//! - `convertMidiToLilypond`: note events from the host to LilyPond
//! - `convertSmfTrackToLilypond`: one track of an uploaded MIDI file
//! - `listSmfTracks`: what a MIDI file contains, for track selection
//! - `renderStandaloneDocument`: wrap converted music in a full `.ly` file

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::api::helpers::{deserialize, js_error, parse_settings, serialize, with_converter};
use crate::converters::midi_to_lilypond::{render_standalone_document, ConversionInput};
use crate::converters::smf::read_smf;
use crate::{wasm_info, wasm_log, wasm_warn};

/// Track overview returned by `listSmfTracks`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmfTrackSummary {
    pub index: usize,
    pub name: Option<String>,
    pub is_percussion: bool,
    pub note_count: usize,
    pub measure_count: usize,
}

/// Convert note events to LilyPond
///
/// # Arguments
/// * `input` - `{ events: [{pitch, startTick, endTick}], measureTicks, endTick,
///   ticksPerQuarterNote, referencePitch, adaptedNotation }`
/// * `settings_json` - Optional `ConversionSettings` as JSON
///
/// # Returns
/// `{ lilypondSource, warnings }`
#[wasm_bindgen(js_name = convertMidiToLilypond)]
pub fn convert_midi_to_lilypond(input: JsValue, settings_json: Option<String>) -> Result<JsValue, JsValue> {
    wasm_info!("convertMidiToLilypond called");

    let input: ConversionInput = deserialize(input, "Invalid conversion input")?;
    let settings = parse_settings(settings_json)?;
    wasm_log!(
        "  {} events, {} measures, {} ticks per quarter",
        input.events.len(),
        input.measure_ticks.len() + 1,
        input.ticks_per_quarter_note
    );

    let result = with_converter(settings, |converter| converter.convert(&input));
    for warning in &result.warnings {
        wasm_warn!("  {}", warning);
    }
    wasm_info!("  LilyPond generated: {} bytes", result.lilypond_source.len());

    serialize(&result, "Result serialization error")
}

/// Convert one track of a Standard MIDI File to LilyPond
///
/// `track_index` counts only tracks that contain notes, as listed by
/// `listSmfTracks`.
#[wasm_bindgen(js_name = convertSmfTrackToLilypond)]
pub fn convert_smf_track_to_lilypond(
    bytes: &[u8],
    track_index: usize,
    settings_json: Option<String>,
) -> Result<JsValue, JsValue> {
    wasm_info!("convertSmfTrackToLilypond called ({} bytes, track {})", bytes.len(), track_index);

    let tracks = read_smf(bytes).map_err(|e| js_error("MIDI import error", e))?;
    let track = tracks.get(track_index).ok_or_else(|| {
        js_error(
            "MIDI import error",
            format!("track {} not found, file has {} note tracks", track_index, tracks.len()),
        )
    })?;
    let settings = parse_settings(settings_json)?;

    let input = ConversionInput::from_track(track);
    let result = with_converter(settings, |converter| converter.convert(&input));
    for warning in &result.warnings {
        wasm_warn!("  {}", warning);
    }
    wasm_info!("  LilyPond generated: {} bytes", result.lilypond_source.len());

    serialize(&result, "Result serialization error")
}

/// Summaries of the note tracks in a Standard MIDI File
#[wasm_bindgen(js_name = listSmfTracks)]
pub fn list_smf_tracks(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let tracks = read_smf(bytes).map_err(|e| js_error("MIDI import error", e))?;
    let summaries: Vec<SmfTrackSummary> = tracks
        .iter()
        .map(|track| SmfTrackSummary {
            index: track.index,
            name: track.name.clone(),
            is_percussion: track.is_percussion,
            note_count: track.notes.len(),
            measure_count: track.measure_ticks.len(),
        })
        .collect();
    wasm_log!("listSmfTracks: {} note tracks", summaries.len());

    serialize(&summaries, "Track list serialization error")
}

/// Wrap a converted music expression in a complete LilyPond document
#[wasm_bindgen(js_name = renderStandaloneDocument)]
pub fn render_standalone(music: String, settings_json: Option<String>) -> Result<String, JsValue> {
    let settings = parse_settings(settings_json)?;
    render_standalone_document(&music, &settings).map_err(|e| js_error("Template error", e))
}
