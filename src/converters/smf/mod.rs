//! Standard MIDI File import
//!
//! Reads an SMF with midly and turns every track that contains notes into
//! an `SmfTrack`: paired note events, the bar grid derived from the file's
//! time signatures and the resolution. `ConversionInput::from_track` feeds
//! a track straight into the converter.

mod model;
mod parse;

pub use model::*;
pub use parse::{read_smf, read_smf_file};
